use burn::module::Module;
use burn::nn::Linear;
use burn::prelude::*;
use nn::{LeakyRelu, LeakyReluConfig, LinearConfig};

use crate::error::{A3cError, Result as A3cResult};

#[derive(Config, Debug)]
pub struct MultiLayerPerceptronConfig {
    input_size: usize,
    hidden_sizes: Vec<usize>,
    output_size: usize,
}

#[derive(Module, Debug)]
pub struct MultiLayerPerceptron<B: Backend> {
    linear_layers: Vec<Linear<B>>,
    activation: LeakyRelu,
}

impl MultiLayerPerceptronConfig {
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> A3cResult<MultiLayerPerceptron<B>> {
        let mut sizes = Vec::with_capacity(self.hidden_sizes.len() + 2);
        sizes.push(self.input_size);
        sizes.extend(self.hidden_sizes.iter().copied());
        sizes.push(self.output_size);

        if let Some(position) = sizes.iter().position(|size| *size == 0) {
            return Err(A3cError::Configuration(format!(
                "unable to construct MLP, layer {position} has size 0 in {sizes:?}"
            )));
        }

        let linear_layers = sizes
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();
        Ok(MultiLayerPerceptron {
            linear_layers,
            activation: LeakyReluConfig::new().init(),
        })
    }
}

impl<B: Backend> MultiLayerPerceptron<B> {
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut x = input;

        match self.linear_layers.split_last() {
            Some((last, hidden)) => {
                for layer in hidden {
                    x = self.activation.forward(layer.forward(x));
                }
                last.forward(x)
            }
            None => x,
        }
    }
}
