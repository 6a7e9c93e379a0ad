use fastrand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    core::utils::{RandChoice, SampleFloat},
    traits::Mixture,
    DMatrix, DVector, Float, GmmError, GmmResult, PI,
};

/// A Gaussian mixture with diagonal covariances, stored as a weight vector and two
/// `n_components x n_inputs` matrices.
///
/// This is the crate's own implementation of [`Mixture`]; the trainers work with any other
/// implementation of the trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianMixture {
    weights: DVector<Float>,
    means: DMatrix<Float>,
    variances: DMatrix<Float>,
}

impl GaussianMixture {
    /// Create a mixture of `n_components` standard normal components in `n_inputs` dimensions
    /// with uniform weights.
    ///
    /// # Panics
    ///
    /// This method will panic if `n_components` or `n_inputs` is zero.
    pub fn new(n_components: usize, n_inputs: usize) -> Self {
        assert!(n_components > 0, "a mixture needs at least one component");
        assert!(n_inputs > 0, "a mixture needs at least one input dimension");
        Self {
            weights: DVector::from_element(n_components, 1.0 / n_components as Float),
            means: DMatrix::zeros(n_components, n_inputs),
            variances: DMatrix::from_element(n_components, n_inputs, 1.0),
        }
    }

    /// Create a mixture from explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::ParameterShape`] if the shapes of `weights`, `means` and `variances`
    /// disagree, and [`GmmError::InvalidParameters`] if the mixture is empty, the weights do not
    /// sum to one or any variance is not strictly positive.
    pub fn from_parameters(
        weights: DVector<Float>,
        means: DMatrix<Float>,
        variances: DMatrix<Float>,
    ) -> GmmResult<Self> {
        let (n_components, n_inputs) = means.shape();
        if n_components == 0 || n_inputs == 0 {
            return Err(GmmError::InvalidParameters {
                reason: "a mixture needs at least one component and one input dimension"
                    .to_string(),
            });
        }
        check_shape("weights", (n_components, 1), weights.shape())?;
        check_shape("variances", (n_components, n_inputs), variances.shape())?;
        let mixture = Self {
            weights,
            means,
            variances,
        };
        mixture.validate(Float::sqrt(Float::EPSILON))?;
        Ok(mixture)
    }

    /// Draw `n_samples` samples from the mixture.
    pub fn sample(&self, n_samples: usize, rng: &mut Rng) -> Vec<DVector<Float>> {
        let last = self.weights.len() - 1;
        let std_devs = self.variances.map(Float::sqrt);
        (0..n_samples)
            .map(|_| {
                let k = rng
                    .choice_weighted(self.weights.as_slice())
                    .unwrap_or(last)
                    .min(last);
                DVector::from_iterator(
                    self.means.ncols(),
                    self.means
                        .row(k)
                        .iter()
                        .zip(std_devs.row(k).iter())
                        .map(|(&mu, &sigma)| rng.normal(mu, sigma)),
                )
            })
            .collect()
    }
}

fn check_shape(
    parameter: &'static str,
    expected: (usize, usize),
    found: (usize, usize),
) -> GmmResult<()> {
    if expected != found {
        return Err(GmmError::ParameterShape {
            parameter,
            expected,
            found,
        });
    }
    Ok(())
}

impl Mixture for GaussianMixture {
    fn n_components(&self) -> usize {
        self.means.nrows()
    }
    fn n_inputs(&self) -> usize {
        self.means.ncols()
    }
    fn weights(&self) -> &DVector<Float> {
        &self.weights
    }
    fn set_weights(&mut self, weights: &DVector<Float>) -> GmmResult<()> {
        check_shape("weights", self.weights.shape(), weights.shape())?;
        self.weights.copy_from(weights);
        Ok(())
    }
    fn means(&self) -> &DMatrix<Float> {
        &self.means
    }
    fn set_means(&mut self, means: &DMatrix<Float>) -> GmmResult<()> {
        check_shape("means", self.means.shape(), means.shape())?;
        self.means.copy_from(means);
        Ok(())
    }
    fn variances(&self) -> &DMatrix<Float> {
        &self.variances
    }
    fn set_variances(&mut self, variances: &DMatrix<Float>) -> GmmResult<()> {
        check_shape("variances", self.variances.shape(), variances.shape())?;
        self.variances.copy_from(variances);
        Ok(())
    }
}

/// Per-component terms of the weighted log-density, computed once per pass over a dataset:
/// ```math
/// \ln w_k - \frac{1}{2}\left(D \ln 2\pi + \sum_d \ln \sigma_{kd}^2\right)
/// ```
/// and the inverse variances. A zero weight yields a constant of $`-\infty`$, i.e. a component
/// which never takes responsibility.
pub(crate) struct LogGaussianTerms<'a> {
    constants: DVector<Float>,
    means: &'a DMatrix<Float>,
    inv_variances: DMatrix<Float>,
}

impl<'a> LogGaussianTerms<'a> {
    pub(crate) fn new(
        weights: &DVector<Float>,
        means: &'a DMatrix<Float>,
        variances: &DMatrix<Float>,
    ) -> Self {
        let n_inputs = means.ncols() as Float;
        let log_two_pi = Float::ln(2.0 * PI);
        let constants = DVector::from_iterator(
            weights.len(),
            weights.iter().zip(variances.row_iter()).map(|(w, row)| {
                let log_det = row.iter().map(|v| v.ln()).sum::<Float>();
                w.ln() - 0.5 * n_inputs.mul_add(log_two_pi, log_det)
            }),
        );
        Self {
            constants,
            means,
            inv_variances: variances.map(Float::recip),
        }
    }

    /// Write $`\ln w_k + \ln \mathcal{N}(x | \mu_k, \sigma_k^2)`$ for every component into `out`.
    pub(crate) fn log_joint(&self, x: &[Float], out: &mut DVector<Float>) {
        for (k, value) in out.iter_mut().enumerate() {
            let mahalanobis = x
                .iter()
                .enumerate()
                .map(|(d, &x_d)| {
                    let diff = x_d - self.means[(k, d)];
                    diff * diff * self.inv_variances[(k, d)]
                })
                .sum::<Float>();
            *value = self.constants[k] - 0.5 * mahalanobis;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Dataset;
    use approx::assert_relative_eq;

    fn two_component() -> GaussianMixture {
        GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.25, 0.75]),
            DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 2.0, 1.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 2.0, 1.0]),
        )
        .unwrap()
    }

    #[test]
    fn test_new_is_valid() {
        let gmm = GaussianMixture::new(4, 3);
        assert_eq!(gmm.shape(), (4, 3));
        assert!(gmm.validate(Float::EPSILON).is_ok());
        assert_relative_eq!(gmm.weights()[2], 0.25);
    }

    #[test]
    #[should_panic(expected = "a mixture needs at least one component")]
    fn test_new_without_components() {
        let _ = GaussianMixture::new(0, 3);
    }

    #[test]
    fn test_from_parameters_rejects_bad_shapes() {
        let result = GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::zeros(2, 3),
            DMatrix::from_element(2, 2, 1.0),
        );
        assert_eq!(
            result.unwrap_err(),
            GmmError::ParameterShape {
                parameter: "variances",
                expected: (2, 3),
                found: (2, 2)
            }
        );
    }

    #[test]
    fn test_from_parameters_rejects_invalid_values() {
        let unnormalized = GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.5, 0.6]),
            DMatrix::zeros(2, 1),
            DMatrix::from_element(2, 1, 1.0),
        );
        assert!(matches!(
            unnormalized,
            Err(GmmError::InvalidParameters { .. })
        ));
        let negative_variance = GaussianMixture::from_parameters(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::zeros(2, 1),
            DMatrix::from_column_slice(2, 1, &[1.0, -1.0]),
        );
        assert!(matches!(
            negative_variance,
            Err(GmmError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_setters_keep_shape() {
        let mut gmm = GaussianMixture::new(2, 2);
        assert!(gmm.set_means(&DMatrix::zeros(3, 2)).is_err());
        assert!(gmm.set_weights(&DVector::zeros(3)).is_err());
        assert!(gmm.set_variances(&DMatrix::zeros(2, 1)).is_err());
        assert_eq!(gmm, GaussianMixture::new(2, 2));
        gmm.set_means(&DMatrix::from_element(2, 2, 3.0)).unwrap();
        assert_eq!(gmm.means()[(1, 1)], 3.0);
    }

    #[test]
    fn test_copy_parameters_from() {
        let source = two_component();
        let mut target = GaussianMixture::new(2, 2);
        target.copy_parameters_from(&source).unwrap();
        assert_eq!(target, source);
        let mut wrong = GaussianMixture::new(3, 2);
        assert_eq!(
            wrong.copy_parameters_from(&source).unwrap_err(),
            GmmError::PriorShape {
                expected: (3, 2),
                found: (2, 2)
            }
        );
        assert_eq!(wrong, GaussianMixture::new(3, 2));
    }

    #[test]
    fn test_standard_normal_log_likelihood() {
        let gmm = GaussianMixture::new(1, 1);
        assert_relative_eq!(
            gmm.log_likelihood(&[0.0]).unwrap(),
            -0.5 * Float::ln(2.0 * PI),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            gmm.log_likelihood(&[2.0]).unwrap(),
            -0.5 * Float::ln(2.0 * PI) - 2.0,
            epsilon = 1e-12
        );
        assert!(gmm.log_likelihood(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_mixture_log_likelihood_matches_direct_sum() {
        let gmm = two_component();
        let x = [0.5, -0.25];
        let density = |k: usize| {
            let mut p = gmm.weights()[k];
            for d in 0..2 {
                let var = gmm.variances()[(k, d)];
                let diff = x[d] - gmm.means()[(k, d)];
                p *= Float::exp(-0.5 * diff * diff / var) / Float::sqrt(2.0 * PI * var);
            }
            p
        };
        assert_relative_eq!(
            gmm.log_likelihood(&x).unwrap(),
            Float::ln(density(0) + density(1)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_far_away_sample_does_not_underflow() {
        let gmm = GaussianMixture::new(2, 64);
        let x = vec![1.0e3; 64];
        let ll = gmm.log_likelihood(&x).unwrap();
        assert!(ll.is_finite());
        assert!(ll < -1.0e7);
    }

    #[test]
    fn test_zero_weight_component_is_ignored() {
        let gmm = GaussianMixture::from_parameters(
            DVector::from_vec(vec![1.0, 0.0]),
            DMatrix::from_column_slice(2, 1, &[0.0, 5.0]),
            DMatrix::from_element(2, 1, 1.0),
        )
        .unwrap();
        assert_relative_eq!(
            gmm.log_likelihood(&[0.0]).unwrap(),
            -0.5 * Float::ln(2.0 * PI),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sampling_recovers_moments() {
        let gmm = two_component();
        let mut rng = Rng::with_seed(0);
        let samples = gmm.sample(20_000, &mut rng);
        assert_eq!(Dataset::len(&samples), 20_000);
        let mean = samples.iter().sum::<DVector<Float>>() / samples.len() as Float;
        // 0.25 * (-1, 0) + 0.75 * (2, 1)
        assert_relative_eq!(mean[0], 1.25, epsilon = 0.05);
        assert_relative_eq!(mean[1], 0.75, epsilon = 0.05);
        assert!(gmm.average_log_likelihood(&samples).unwrap().is_finite());
    }
}
