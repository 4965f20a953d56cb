use std::f32::consts::PI;

use burn::{prelude::Backend, tensor::Tensor};

/// Per-dimension density of a diagonal Gaussian.
///
/// `exp(-(a - mu)^2 / (2 var)) / sqrt(2 pi var)`
pub fn gaussian_density<B: Backend, const D: usize>(
    action: Tensor<B, D>,
    mean: Tensor<B, D>,
    variance: Tensor<B, D>,
) -> Tensor<B, D> {
    let exponent = (action - mean)
        .powf_scalar(2.0)
        .neg()
        .div(variance.clone().mul_scalar(2.0));
    let normalizer = variance.mul_scalar(2.0 * PI).sqrt();
    exponent.exp().div(normalizer)
}

/// Per-dimension entropy of a diagonal Gaussian, `0.5 (1 + log(2 pi var))`.
pub fn gaussian_entropy<B: Backend, const D: usize>(variance: Tensor<B, D>) -> Tensor<B, D> {
    variance
        .mul_scalar(2.0 * PI)
        .log()
        .add_scalar(1.0)
        .mul_scalar(0.5)
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, tensor::ElementConversion};

    use super::*;

    #[test]
    fn test_density_at_mean() {
        let device = &Default::default();
        for variance in [0.25f32, 1.0, 4.0] {
            let mean = Tensor::<NdArray, 1>::from_floats([0.3], device);
            let density = gaussian_density(
                mean.clone(),
                mean,
                Tensor::<NdArray, 1>::from_floats([variance], device),
            );
            let density = density.into_scalar().elem::<f32>();
            let expected = 1.0 / (2.0 * PI * variance).sqrt();
            assert!((density - expected).abs() < 1e-6, "{density} != {expected}");
        }
    }

    #[test]
    fn test_density_decays_away_from_mean() {
        let device = &Default::default();
        let density = gaussian_density(
            Tensor::<NdArray, 1>::from_floats([0.0, 1.0, 2.0], device),
            Tensor::zeros([3], device),
            Tensor::ones([3], device),
        )
        .into_data()
        .to_vec::<f32>()
        .unwrap();
        assert!(density[0] > density[1] && density[1] > density[2]);
        let expected = (-0.5f32).exp() / (2.0 * PI).sqrt();
        assert!((density[1] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unit_variance_entropy() {
        let device = &Default::default();
        let entropy = gaussian_entropy(Tensor::<NdArray, 1>::from_floats([1.0], device))
            .into_scalar()
            .elem::<f32>();
        let expected = 0.5 * (1.0 + (2.0 * PI).ln());
        assert!((entropy - expected).abs() < 1e-6);
    }
}
