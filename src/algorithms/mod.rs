/// The [`EMTrainer`] and its configuration and terminators.
pub mod em;
pub use em::{EMConfig, EMTrainer, IterationBudget, LikelihoodTerminator};

/// [`EMStatus`] type for EM training runs.
pub mod em_status;
pub use em_status::{EMStatus, TrainingState};

/// M-step strategies and the types they share.
pub mod mstep;
pub use mstep::{
    Diagnostics, MapAdaptation, MaximumLikelihood, ParameterUpdate, UpdateOptions,
    DEFAULT_VARIANCE_FLOOR,
};

/// k-means seeding for maximum-likelihood training.
pub mod kmeans;
pub use kmeans::KMeansInitializer;
