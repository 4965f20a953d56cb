//! Ordered parameter walks shared by the global network and its replicas.
//!
//! Parameters are paired by enumeration order, never by [`ParamId`], so a
//! replica built by its own factory call can be synchronized with the global
//! network as long as both have the same layout.

use burn::{
    module::{ModuleMapper, ModuleVisitor, ParamId},
    prelude::*,
};
use std::{any::Any, collections::VecDeque, marker::PhantomData};

use crate::error::{A3cError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterLayout {
    pub ids: Vec<ParamId>,
    pub shapes: Vec<Vec<usize>>,
}

struct LayoutVisitor {
    ids: Vec<ParamId>,
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for LayoutVisitor {
    fn visit_float<const D: usize>(&mut self, id: ParamId, tensor: &Tensor<B, D>) {
        self.ids.push(id);
        self.shapes.push(tensor.dims().to_vec());
    }
}

impl ParameterLayout {
    pub fn of<B: Backend, M: Module<B>>(module: &M) -> Self {
        let mut visitor = LayoutVisitor {
            ids: Vec::new(),
            shapes: Vec::new(),
        };
        module.visit(&mut visitor);
        ParameterLayout {
            ids: visitor.ids,
            shapes: visitor.shapes,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Same number of parameters with the same shapes, in the same order.
    pub fn check_compatible(&self, other: &ParameterLayout) -> Result<()> {
        if self.len() != other.len() {
            return Err(A3cError::Configuration(format!(
                "parameter count mismatch: global network has {}, replica has {}",
                self.len(),
                other.len()
            )));
        }
        if let Some((index, (expected, actual))) = self
            .shapes
            .iter()
            .zip(&other.shapes)
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(A3cError::Configuration(format!(
                "parameter {index} shape mismatch: global network has {expected:?}, replica has {actual:?}"
            )));
        }
        Ok(())
    }
}

struct ValueCollector<B: Backend> {
    values: VecDeque<Box<dyn Any + Send>>,
    backend: PhantomData<B>,
}

impl<B: Backend> ModuleVisitor<B> for ValueCollector<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.values.push_back(Box::new(tensor.clone()));
    }
}

struct ValueWriter<B: Backend> {
    values: VecDeque<Box<dyn Any + Send>>,
    mismatched: usize,
    backend: PhantomData<B>,
}

impl<B: Backend> ModuleMapper<B> for ValueWriter<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let source = self
            .values
            .pop_front()
            .map(|item| item.downcast::<Tensor<B, D>>());
        match source {
            Some(Ok(source)) => {
                let require_grad = tensor.is_require_grad();
                source.detach().set_require_grad(require_grad)
            }
            _ => {
                self.mismatched += 1;
                tensor
            }
        }
    }
}

/// Writes the parameter values of `source` into `target`, keeping the
/// target's parameter ids. The copy is detached from any autodiff graph the
/// source belongs to.
pub fn copy_parameters<B: Backend, M: Module<B>>(source: &M, target: M) -> Result<M> {
    let mut collector = ValueCollector::<B> {
        values: VecDeque::new(),
        backend: PhantomData,
    };
    source.visit(&mut collector);
    let expected = collector.values.len();

    let mut writer = ValueWriter::<B> {
        values: collector.values,
        mismatched: 0,
        backend: PhantomData,
    };
    let target = target.map(&mut writer);
    if writer.mismatched > 0 || !writer.values.is_empty() {
        return Err(A3cError::Configuration(format!(
            "unable to copy {expected} parameters: {} mismatched, {} left over",
            writer.mismatched,
            writer.values.len()
        )));
    }
    Ok(target)
}

struct ValueReader {
    values: Vec<f32>,
    error: Option<String>,
}

impl<B: Backend> ModuleVisitor<B> for ValueReader {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        match tensor.to_data().convert::<f32>().to_vec::<f32>() {
            Ok(values) => self.values.extend(values),
            Err(err) => {
                self.error.get_or_insert_with(|| format!("{err:?}"));
            }
        }
    }
}

/// Every parameter value of `module`, flattened in enumeration order.
pub fn parameter_values<B: Backend, M: Module<B>>(module: &M) -> Result<Vec<f32>> {
    let mut reader = ValueReader {
        values: Vec::new(),
        error: None,
    };
    module.visit(&mut reader);
    match reader.error {
        Some(err) => Err(A3cError::Tensor(err)),
        None => Ok(reader.values),
    }
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        module::Param,
    };
    use nn::{Linear, LinearConfig};

    use super::*;

    fn reset_weights<B: Backend, const D: usize>(
        param: &Param<Tensor<B, D, Float>>,
        weight: f64,
    ) -> Param<Tensor<B, D, Float>> {
        Param::initialized(param.id, Tensor::ones_like(&param.val()) * weight)
    }

    fn values<B: Backend>(model: &Linear<B>) -> Vec<f32> {
        let mut values = model.weight.val().into_data().to_vec::<f32>().unwrap();
        if let Some(bias) = &model.bias {
            values.extend(bias.val().into_data().to_vec::<f32>().unwrap());
        }
        values
    }

    #[test]
    fn test_layout() {
        let device = &Default::default();
        let model: Linear<NdArray> = LinearConfig::new(4, 2).init(device);
        let layout = ParameterLayout::of(&model);
        assert_eq!(layout.shapes, vec![vec![4, 2], vec![2]]);

        let wider: Linear<NdArray> = LinearConfig::new(4, 3).init(device);
        assert!(layout.check_compatible(&ParameterLayout::of(&model)).is_ok());
        assert!(matches!(
            layout.check_compatible(&ParameterLayout::of(&wider)),
            Err(A3cError::Configuration(_))
        ));
        let no_bias: Linear<NdArray> = LinearConfig::new(4, 2).with_bias(false).init(device);
        assert!(layout.check_compatible(&ParameterLayout::of(&no_bias)).is_err());
    }

    #[test]
    fn test_copy_parameters_keeps_target_ids() {
        let device = &Default::default();
        let mut source: Linear<Autodiff<NdArray>> = LinearConfig::new(4, 2).init(device);
        source.weight = reset_weights(&source.weight, 1.5);
        let target: Linear<Autodiff<NdArray>> = LinearConfig::new(4, 2).init(device);
        let target_ids = ParameterLayout::of(&target).ids;

        let target = copy_parameters(&source, target).unwrap();
        assert_eq!(values(&source), values(&target));
        assert_eq!(
            parameter_values(&source).unwrap(),
            parameter_values(&target).unwrap()
        );
        assert_eq!(parameter_values(&target).unwrap().len(), 10);
        assert_eq!(ParameterLayout::of(&target).ids, target_ids);
        assert_ne!(ParameterLayout::of(&source).ids, target_ids);
        assert!(target.weight.val().is_require_grad());
    }

    #[test]
    fn test_copy_parameters_rejects_other_layout() {
        let device = &Default::default();
        let source: Linear<NdArray> = LinearConfig::new(4, 2).init(device);
        let target: Linear<NdArray> = LinearConfig::new(4, 2).with_bias(false).init(device);
        assert!(copy_parameters(&source, target).is_err());
    }
}
