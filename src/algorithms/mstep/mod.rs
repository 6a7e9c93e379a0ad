use serde::{Deserialize, Serialize};

use crate::{
    core::{utils::maybe_warn, SufficientStatistics},
    traits::Mixture,
    DMatrix, DVector, Float, GmmError, GmmResult,
};

/// Module containing the maximum-likelihood M-step.
pub mod ml;
pub use ml::MaximumLikelihood;

/// Module containing the MAP-adaptation M-step.
pub mod map;
pub use map::MapAdaptation;

/// The default lower bound applied to every updated variance.
pub const DEFAULT_VARIANCE_FLOOR: Float = 1e-6;

/// Options shared by every M-step strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateOptions {
    update_weights: bool,
    update_means: bool,
    update_variances: bool,
    responsibility_threshold: Float,
    variance_floor: Float,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            update_weights: true,
            update_means: true,
            update_variances: true,
            responsibility_threshold: 0.0,
            variance_floor: DEFAULT_VARIANCE_FLOOR,
        }
    }
}

impl UpdateOptions {
    /// Enable or disable the weight update (default = `true`).
    pub const fn with_update_weights(mut self, value: bool) -> Self {
        self.update_weights = value;
        self
    }
    /// Enable or disable the mean update (default = `true`).
    pub const fn with_update_means(mut self, value: bool) -> Self {
        self.update_means = value;
        self
    }
    /// Enable or disable the variance update (default = `true`).
    pub const fn with_update_variances(mut self, value: bool) -> Self {
        self.update_variances = value;
        self
    }
    /// Set the minimum responsibility mass $`\tau`$ a component needs for its mean and variance to
    /// be re-estimated (default = `0`). The weight update ignores this threshold.
    ///
    /// # Panics
    ///
    /// This method will panic if $`\tau < 0`$ or $`\tau`$ is NaN.
    pub fn with_responsibility_threshold(mut self, value: Float) -> Self {
        assert!(value >= 0.0, "the responsibility threshold must be non-negative");
        self.responsibility_threshold = value;
        self
    }
    /// Set the lower bound applied to every updated variance (default =
    /// [`DEFAULT_VARIANCE_FLOOR`]).
    ///
    /// # Panics
    ///
    /// This method will panic if the floor is not strictly positive and finite.
    pub fn with_variance_floor(mut self, value: Float) -> Self {
        assert!(
            value > 0.0 && value.is_finite(),
            "the variance floor must be strictly positive"
        );
        self.variance_floor = value;
        self
    }
    /// Returns `true` if weights are updated.
    pub const fn update_weights(&self) -> bool {
        self.update_weights
    }
    /// Returns `true` if means are updated.
    pub const fn update_means(&self) -> bool {
        self.update_means
    }
    /// Returns `true` if variances are updated.
    pub const fn update_variances(&self) -> bool {
        self.update_variances
    }
    /// The responsibility threshold $`\tau`$.
    pub const fn responsibility_threshold(&self) -> Float {
        self.responsibility_threshold
    }
    /// The variance floor.
    pub const fn variance_floor(&self) -> Float {
        self.variance_floor
    }
    /// Returns `true` if a component with responsibility mass `n_k` is too weakly supported to
    /// have its mean and variance re-estimated. A component without any mass always is.
    pub fn is_below_threshold(&self, n_k: Float) -> bool {
        n_k < self.responsibility_threshold || n_k <= 0.0
    }
    pub(crate) fn below_threshold(&self, stats: &SufficientStatistics) -> Vec<usize> {
        if !(self.update_means || self.update_variances) {
            return Vec::new();
        }
        stats
            .n()
            .iter()
            .enumerate()
            .filter(|(_, n_k)| self.is_below_threshold(**n_k))
            .map(|(k, _)| k)
            .collect()
    }
}

/// Numerical degeneracies absorbed during an M-step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Components whose mean and variance were not re-estimated from the data because their
    /// responsibility mass was below the threshold (or zero).
    pub below_threshold: Vec<usize>,
    /// The number of variance entries raised to the variance floor.
    pub floored_variances: usize,
}

/// New parameters computed by an [`MStep`](crate::traits::MStep), staged until they are applied
/// to a [`Mixture`].
///
/// A [`None`] entry leaves the corresponding parameter of the model untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    /// The new component weights.
    pub weights: Option<DVector<Float>>,
    /// The new component means.
    pub means: Option<DMatrix<Float>>,
    /// The new component variances.
    pub variances: Option<DMatrix<Float>>,
    /// The degeneracies encountered while computing the update.
    pub diagnostics: Diagnostics,
}

impl ParameterUpdate {
    /// Commit the update to `model`, writing weights, then means, then variances.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::ParameterShape`] if any staged parameter does not match the shape of
    /// `model`. Shapes are checked before anything is written, so the model is left unchanged on
    /// error.
    pub fn apply(&self, model: &mut dyn Mixture) -> GmmResult<()> {
        let (n_components, n_inputs) = model.shape();
        if let Some(weights) = &self.weights {
            check_shape("weights", (n_components, 1), weights.shape())?;
        }
        if let Some(means) = &self.means {
            check_shape("means", (n_components, n_inputs), means.shape())?;
        }
        if let Some(variances) = &self.variances {
            check_shape("variances", (n_components, n_inputs), variances.shape())?;
        }
        if let Some(weights) = &self.weights {
            model.set_weights(weights)?;
        }
        if let Some(means) = &self.means {
            model.set_means(means)?;
        }
        if let Some(variances) = &self.variances {
            model.set_variances(variances)?;
        }
        Ok(())
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

/// Ensure `stats` were accumulated for a model of the shape of `model` and hold at least one
/// sample.
pub(crate) fn check_statistics(stats: &SufficientStatistics, model: &dyn Mixture) -> GmmResult<()> {
    if stats.shape() != model.shape() {
        return Err(GmmError::StatisticsShape {
            expected: model.shape(),
            found: stats.shape(),
        });
    }
    if stats.n_samples() == 0 {
        return Err(GmmError::EmptyStatistics);
    }
    Ok(())
}

/// Raise every variance below `floor` (or NaN) to `floor` and return how many were raised.
pub(crate) fn floor_variances(variances: &mut DMatrix<Float>, floor: Float) -> usize {
    let mut n_floored = 0;
    for v in variances.iter_mut() {
        if v.is_nan() || *v < floor {
            *v = floor;
            n_floored += 1;
        }
    }
    if n_floored > 0 {
        maybe_warn(&format!(
            "{n_floored} variance(s) fell below {floor:e} and were floored"
        ));
    }
    n_floored
}
