/// [`Callbacks`] and the [`DebugObserver`].
pub mod callbacks;
/// [`GaussianMixture`], the crate's diagonal-covariance mixture container.
pub mod mixture;
/// [`SufficientStatistics`] accumulated by the E-step.
pub mod stats;
/// [`TrainingSummary`] type for the result of a training run.
pub mod summary;
/// Random-number helpers and the warnings facility.
pub mod utils;

pub use callbacks::{Callbacks, DebugObserver};
pub use mixture::GaussianMixture;
pub use stats::SufficientStatistics;
pub use summary::TrainingSummary;
