use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::{
    algorithms::ParameterUpdate,
    core::SufficientStatistics,
    traits::{Dataset, Mixture},
    GmmResult,
};

/// The M-step strategy plugged into an [`EMTrainer`](crate::algorithms::EMTrainer).
///
/// A strategy prepares the model once before the first E-step and then turns each round of
/// [`SufficientStatistics`] into a [`ParameterUpdate`]. Computing the update must not mutate the
/// model; the trainer commits the returned update only when the strategy succeeds, so an error
/// always leaves the model untouched.
pub trait MStep: DynClone + Debug {
    /// Prepare `model` for training on `dataset`.
    ///
    /// `prior` is the frozen prior model configured on the trainer, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the strategy cannot be initialized (for instance, a strategy that
    /// starts from the prior model fails with
    /// [`GmmError::MissingPriorModel`](crate::GmmError::MissingPriorModel) when `prior` is
    /// [`None`]).
    fn initialize(
        &mut self,
        model: &mut dyn Mixture,
        dataset: &dyn Dataset,
        prior: Option<&dyn Mixture>,
    ) -> GmmResult<()>;

    /// Compute the new parameters of `model` from one round of statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the statistics, model and prior are inconsistent or if a required prior
    /// is missing.
    fn compute_update(
        &mut self,
        stats: &SufficientStatistics,
        model: &dyn Mixture,
        prior: Option<&dyn Mixture>,
    ) -> GmmResult<ParameterUpdate>;
}
dyn_clone::clone_trait_object!(MStep);
