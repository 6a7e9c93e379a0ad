use std::fmt::Debug;

use logsumexp::LogSumExp;

use crate::{
    core::mixture::LogGaussianTerms, traits::Dataset, DMatrix, DVector, Float, GmmError,
    GmmResult,
};

/// A diagonal-covariance Gaussian mixture whose parameters can be read and replaced.
///
/// The trainers in this crate never construct, resize or destroy a [`Mixture`]; they only read its
/// current parameters and overwrite them with vectors/matrices of the same shape. Means and
/// variances are `n_components x n_inputs` matrices with one row per component.
pub trait Mixture: Debug {
    /// The number of Gaussian components $`K`$.
    fn n_components(&self) -> usize;
    /// The dimension of the input space $`D`$.
    fn n_inputs(&self) -> usize;
    /// The component weights (length $`K`$).
    fn weights(&self) -> &DVector<Float>;
    /// Replace the component weights.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::ParameterShape`] if `weights` does not have length $`K`$.
    fn set_weights(&mut self, weights: &DVector<Float>) -> GmmResult<()>;
    /// The component means ($`K \times D`$).
    fn means(&self) -> &DMatrix<Float>;
    /// Replace the component means.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::ParameterShape`] if `means` is not $`K \times D`$.
    fn set_means(&mut self, means: &DMatrix<Float>) -> GmmResult<()>;
    /// The diagonal component variances ($`K \times D`$).
    fn variances(&self) -> &DMatrix<Float>;
    /// Replace the diagonal component variances.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::ParameterShape`] if `variances` is not $`K \times D`$.
    fn set_variances(&mut self, variances: &DMatrix<Float>) -> GmmResult<()>;

    /// The `(components, inputs)` shape of the mixture.
    fn shape(&self) -> (usize, usize) {
        (self.n_components(), self.n_inputs())
    }

    /// Copy the weights, means and variances of `other` into this mixture.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::PriorShape`] if the two mixtures have different shapes. Nothing is
    /// modified in that case.
    fn copy_parameters_from(&mut self, other: &dyn Mixture) -> GmmResult<()> {
        if other.shape() != self.shape() {
            return Err(GmmError::PriorShape {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        self.set_weights(other.weights())?;
        self.set_means(other.means())?;
        self.set_variances(other.variances())
    }

    /// The log-density $`\ln p(x)`$ of a single sample under the mixture.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::SampleDimension`] if `x` does not have length $`D`$.
    fn log_likelihood(&self, x: &[Float]) -> GmmResult<Float> {
        if x.len() != self.n_inputs() {
            return Err(GmmError::SampleDimension {
                index: 0,
                expected: self.n_inputs(),
                found: x.len(),
            });
        }
        let terms = LogGaussianTerms::new(self.weights(), self.means(), self.variances());
        let mut log_joint = DVector::zeros(self.n_components());
        terms.log_joint(x, &mut log_joint);
        Ok(LogSumExp::ln_sum_exp(log_joint.iter()))
    }

    /// The mean log-density of every sample in `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::EmptyDataset`] for an empty dataset and
    /// [`GmmError::SampleDimension`] if any sample does not have length $`D`$.
    fn average_log_likelihood(&self, dataset: &dyn Dataset) -> GmmResult<Float> {
        if dataset.is_empty() {
            return Err(GmmError::EmptyDataset);
        }
        let terms = LogGaussianTerms::new(self.weights(), self.means(), self.variances());
        let mut log_joint = DVector::zeros(self.n_components());
        let mut total = 0.0;
        for index in 0..dataset.len() {
            let x = dataset.sample(index);
            if x.len() != self.n_inputs() {
                return Err(GmmError::SampleDimension {
                    index,
                    expected: self.n_inputs(),
                    found: x.len(),
                });
            }
            terms.log_joint(x, &mut log_joint);
            total += LogSumExp::ln_sum_exp(log_joint.iter());
        }
        Ok(total / dataset.len() as Float)
    }

    /// Check the parameter invariants of the mixture: weights are non-negative and sum to one
    /// within `tolerance`, and every variance is finite and strictly positive.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::InvalidParameters`] describing the first violated invariant.
    fn validate(&self, tolerance: Float) -> GmmResult<()> {
        let weights = self.weights();
        if let Some(k) = weights.iter().position(|w| w.is_nan() || *w < 0.0) {
            return Err(GmmError::InvalidParameters {
                reason: format!("weight #{k} = {} is negative or NaN", weights[k]),
            });
        }
        let total = weights.sum();
        if Float::abs(total - 1.0) > tolerance {
            return Err(GmmError::InvalidParameters {
                reason: format!("weights sum to {total}"),
            });
        }
        let variances = self.variances();
        for k in 0..variances.nrows() {
            for d in 0..variances.ncols() {
                let v = variances[(k, d)];
                if !(v.is_finite() && v > 0.0) {
                    return Err(GmmError::InvalidParameters {
                        reason: format!("variance ({k}, {d}) = {v} is not strictly positive"),
                    });
                }
            }
        }
        Ok(())
    }
}
