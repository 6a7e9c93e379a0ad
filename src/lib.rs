//! `gmm-adapt` fits diagonal-covariance Gaussian mixture models with Expectation-Maximization and
//! adapts previously trained ("prior", "world" or "background") mixtures toward small enrollment
//! datasets with Maximum A Posteriori (MAP) adaptation.
//!
//! The crate is built around a single generic driver, [`EMTrainer`](algorithms::EMTrainer),
//! which alternates an E-step (filling [`SufficientStatistics`](core::SufficientStatistics) from
//! the current model and a dataset) with a pluggable M-step strategy:
//!
//! * [`MaximumLikelihood`](algorithms::MaximumLikelihood) re-estimates every parameter purely
//!   from the accumulated statistics.
//! * [`MapAdaptation`](algorithms::MapAdaptation) blends the statistics with a frozen prior model
//!   using the data-dependent adaptation coefficient of Reynolds et al.[^1]
//!
//! # Table of Contents
//! - [Quick Start](#quick-start)
//! - [MAP Adaptation](#map-adaptation)
//! - [Warnings](#warnings)
//!
//! # Quick Start
//!
//! Any type implementing [`Mixture`](traits::Mixture) can be trained, and any type implementing
//! [`Dataset`](traits::Dataset) can be used as training data. The crate ships a concrete
//! [`GaussianMixture`](core::GaussianMixture) and implements [`Dataset`](traits::Dataset) for
//! vectors of samples:
//!
//! ```rust
//! use gmm_adapt::prelude::*;
//!
//! # fn main() -> Result<(), GmmError> {
//! let data: Vec<Vec<f64>> = vec![vec![-2.1], vec![-1.9], vec![-2.0], vec![2.0], vec![2.2], vec![1.8]];
//! let mut model = GaussianMixture::new(2, 1);
//! let mut trainer = EMTrainer::new(
//!     MaximumLikelihood::default().with_initializer(KMeansInitializer::default()),
//! );
//! let summary = trainer.train(&mut model, &data, EMConfig::default())?;
//! assert!(summary.converged);
//! # Ok(())
//! # }
//! ```
//!
//! # MAP Adaptation
//!
//! For each component $`k`$ with responsibility mass $`n_k`$ the adaptation coefficient is
//! ```math
//! \alpha_k = \frac{n_k}{n_k + r}
//! ```
//! where $`r`$ is the relevance factor. The new parameters are then
//! ```math
//! \begin{aligned}
//! w_k' &\propto \alpha_k \frac{n_k}{T} + (1 - \alpha_k) w_k^{\text{prior}} \\
//! \mu_k' &= \alpha_k E_k[x] + (1 - \alpha_k) \mu_k^{\text{prior}} \\
//! \sigma_k'^2 &= \alpha_k E_k[x^2] + (1 - \alpha_k)\left(\sigma_k^{2,\text{prior}} + (\mu_k^{\text{prior}})^2\right) - (\mu_k')^2
//! \end{aligned}
//! ```
//! Components whose responsibility mass falls below a configurable threshold keep the prior mean
//! and have the prior variance recentred on it.
//!
//! ```rust
//! use gmm_adapt::prelude::*;
//!
//! # fn main() -> Result<(), GmmError> {
//! let prior = GaussianMixture::from_parameters(
//!     DVector::from_vec(vec![1.0]),
//!     DMatrix::from_element(1, 1, 0.0),
//!     DMatrix::from_element(1, 1, 1.0),
//! )?;
//! let enrollment = vec![vec![10.0]; 4];
//! let mut model = GaussianMixture::new(1, 1);
//! let mut trainer = EMTrainer::new(MapAdaptation::new(16.0));
//! trainer.train(
//!     &mut model,
//!     &enrollment,
//!     EMConfig::default().with_prior_model(prior).with_max_iterations(1),
//! )?;
//! assert!((model.means()[(0, 0)] - 2.0).abs() < 1e-12);
//! # Ok(())
//! # }
//! ```
//!
//! # Warnings
//!
//! Numerical degeneracies (floored variances, starved components) never abort training. They are
//! recorded in the [`Diagnostics`](algorithms::Diagnostics) of each step and reported on stderr
//! through [`maybe_warn`](core::utils::maybe_warn), which can be silenced with
//! [`disable_warnings`](core::utils::disable_warnings) or `GMM_ADAPT_WARNINGS=0`.
//!
//! [^1]: [D. A. Reynolds, T. F. Quatieri, and R. B. Dunn, ‘Speaker Verification Using Adapted Gaussian Mixture Models’, Digital Signal Processing, vol. 10, no. 1–3, pp. 19–41, 2000.](https://doi.org/10.1006/dspr.1999.0361)
#![warn(
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::doc_link_with_quotes,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::perf,
    clippy::style,
    missing_docs
)]

/// Module containing the EM trainer, its M-step strategies and initializers.
pub mod algorithms;
/// Module containing the mixture container, sufficient statistics, callbacks and summaries.
pub mod core;
/// Module containing the crate's error type.
pub mod error;
/// Module containing the traits which define the boundaries of the trainer.
pub mod traits;

pub use error::{GmmError, GmmResult};
pub use nalgebra::{DMatrix, DVector};

/// The floating-point type used throughout the crate.
#[cfg(not(feature = "f32"))]
pub type Float = f64;

/// The floating-point type used throughout the crate.
#[cfg(feature = "f32")]
pub type Float = f32;

/// The mathematical constant $`\pi`$.
#[cfg(not(feature = "f32"))]
pub const PI: Float = std::f64::consts::PI;

/// The mathematical constant $`\pi`$.
#[cfg(feature = "f32")]
pub const PI: Float = std::f32::consts::PI;

/// Prelude module containing everything someone should need to use this crate for non-development
/// purposes.
pub mod prelude {
    pub use crate::{
        algorithms::{
            EMConfig, EMStatus, EMTrainer, KMeansInitializer, MapAdaptation, MaximumLikelihood,
            TrainingState, UpdateOptions,
        },
        core::{Callbacks, GaussianMixture, SufficientStatistics, TrainingSummary},
        traits::{Algorithm, Dataset, Initializer, MStep, Mixture},
        DMatrix, DVector, Float, GmmError, GmmResult,
    };
}
