use std::{ops::ControlFlow, sync::Arc};

use crate::{
    algorithms::{Diagnostics, EMStatus, TrainingState},
    core::{Callbacks, SufficientStatistics, TrainingSummary},
    traits::{Algorithm, Dataset, MStep, Mixture, Status, Terminator},
    Float, GmmError, GmmResult,
};

/// The configuration struct for the [`EMTrainer`].
#[derive(Debug, Clone)]
pub struct EMConfig {
    prior: Option<Arc<dyn Mixture>>,
    convergence_threshold: Float,
    max_iterations: usize,
}

impl Default for EMConfig {
    fn default() -> Self {
        Self {
            prior: None,
            convergence_threshold: 1e-3,
            max_iterations: 100,
        }
    }
}

impl EMConfig {
    /// Set the frozen prior model used by MAP adaptation.
    pub fn with_prior_model<M: Mixture + 'static>(mut self, prior: M) -> Self {
        self.prior = Some(Arc::new(prior));
        self
    }
    /// Set a shared, frozen prior model used by MAP adaptation.
    pub fn with_shared_prior_model(mut self, prior: Arc<dyn Mixture>) -> Self {
        self.prior = Some(prior);
        self
    }
    /// Replace the prior model.
    ///
    /// # Errors
    ///
    /// Returns [`GmmError::MissingPriorModel`] if `prior` is [`None`], in which case the current
    /// prior (if any) is kept.
    pub fn set_prior_model(&mut self, prior: Option<Arc<dyn Mixture>>) -> GmmResult<()> {
        let prior = prior.ok_or(GmmError::MissingPriorModel)?;
        self.prior = Some(prior);
        Ok(())
    }
    /// The prior model, if one was set.
    pub fn prior_model(&self) -> Option<&dyn Mixture> {
        self.prior.as_deref()
    }
    /// Set the relative change in average log-likelihood below which training is considered
    /// converged (default = `1e-3`).
    ///
    /// # Panics
    ///
    /// This method will panic if $`\epsilon <= 0`$.
    pub fn with_convergence_threshold(mut self, value: Float) -> Self {
        assert!(value > 0.0, "the convergence threshold must be strictly positive");
        self.convergence_threshold = value;
        self
    }
    /// Set the maximum number of EM iterations (default = `100`).
    ///
    /// # Panics
    ///
    /// This method will panic if `max_iterations` is zero.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        assert!(max_iterations > 0, "at least one iteration is required");
        self.max_iterations = max_iterations;
        self
    }
    /// The convergence threshold.
    pub const fn convergence_threshold(&self) -> Float {
        self.convergence_threshold
    }
    /// The maximum number of EM iterations.
    pub const fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

/// Stops training once the average log-likelihood stops improving.
///
/// With $`L_{i}`$ the average log-likelihood of step $`i`$, training converges when
/// ```math
/// \left|\frac{L_{i-1} - L_i}{L_{i-1}}\right| \le \varepsilon
/// ```
/// or, if $`L_{i-1} = 0`$, when $`|L_{i-1} - L_i| \le \varepsilon`$.
#[derive(Debug, Clone, Copy, Default)]
pub struct LikelihoodTerminator;
impl<P, U> Terminator<EMTrainer, P, EMStatus, U, GmmError> for LikelihoodTerminator
where
    P: Mixture,
    U: Dataset,
{
    fn check_for_termination(
        &mut self,
        _current_step: usize,
        algorithm: &mut EMTrainer,
        _problem: &P,
        status: &mut EMStatus,
        _args: &U,
    ) -> ControlFlow<()> {
        let Some(previous) = status.previous_log_likelihood else {
            return ControlFlow::Continue(());
        };
        let change = if previous == 0.0 {
            Float::abs(previous - status.log_likelihood)
        } else {
            Float::abs((previous - status.log_likelihood) / previous)
        };
        if change <= algorithm.config.convergence_threshold {
            status.set_converged();
            status.update_message(&format!(
                "log-likelihood converged (change = {change:.3e})"
            ));
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// Stops training after [`EMConfig::max_iterations`] steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct IterationBudget;
impl<P, U> Terminator<EMTrainer, P, EMStatus, U, GmmError> for IterationBudget
where
    P: Mixture,
    U: Dataset,
{
    fn check_for_termination(
        &mut self,
        current_step: usize,
        algorithm: &mut EMTrainer,
        _problem: &P,
        status: &mut EMStatus,
        _args: &U,
    ) -> ControlFlow<()> {
        let max_iterations = algorithm.config.max_iterations;
        if current_step + 1 >= max_iterations {
            status.finish(
                TrainingState::Exhausted,
                &format!("maximum number of iterations reached ({max_iterations})"),
            );
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// The Expectation-Maximization trainer.
///
/// Each step runs an E-step, which accumulates [`SufficientStatistics`] of the dataset under the
/// current model, followed by an M-step, which hands the statistics to the configured [`MStep`]
/// strategy and commits the parameters it computes. The average log-likelihood of each E-step
/// is tracked in the [`EMStatus`] and drives the [`LikelihoodTerminator`].
///
/// ```rust
/// use gmm_adapt::prelude::*;
///
/// # fn main() -> Result<(), GmmError> {
/// let truth = GaussianMixture::from_parameters(
///     DVector::from_vec(vec![0.5, 0.5]),
///     DMatrix::from_row_slice(2, 1, &[-4.0, 4.0]),
///     DMatrix::from_row_slice(2, 1, &[1.0, 1.0]),
/// )?;
/// let data = truth.sample(1000, &mut fastrand::Rng::with_seed(0));
/// let mut model = GaussianMixture::new(2, 1);
/// let mut trainer = EMTrainer::new(
///     MaximumLikelihood::default().with_initializer(KMeansInitializer::default()),
/// );
/// let summary = trainer.train(&mut model, &data, EMConfig::default())?;
/// println!("{}", summary);
/// assert!(summary.converged);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EMTrainer {
    config: EMConfig,
    mstep: Box<dyn MStep>,
    stats: SufficientStatistics,
}

impl EMTrainer {
    /// Create a trainer which uses the given M-step strategy.
    pub fn new<M: MStep + 'static>(mstep: M) -> Self {
        Self {
            config: EMConfig::default(),
            mstep: Box::new(mstep),
            stats: SufficientStatistics::default(),
        }
    }
    /// The M-step strategy.
    pub fn mstep(&self) -> &dyn MStep {
        self.mstep.as_ref()
    }
    /// The configuration of the current (or most recent) run.
    pub const fn config(&self) -> &EMConfig {
        &self.config
    }
    /// The statistics accumulated by the most recent E-step.
    pub const fn statistics(&self) -> &SufficientStatistics {
        &self.stats
    }

    fn expectation_maximization(
        &mut self,
        model: &mut dyn Mixture,
        dataset: &dyn Dataset,
    ) -> GmmResult<(Float, Diagnostics)> {
        let (n_components, n_inputs) = model.shape();
        self.stats.resize(n_components, n_inputs);
        self.stats.accumulate(&*model, dataset)?;
        let log_likelihood = self.stats.average_log_likelihood()?;
        let update = self
            .mstep
            .compute_update(&self.stats, &*model, self.config.prior.as_deref())?;
        update.apply(model)?;
        Ok((log_likelihood, update.diagnostics))
    }

    /// Run a single E-step followed by a single M-step and return the average log-likelihood of
    /// the dataset under the parameters *before* the update.
    ///
    /// This uses the prior model of the most recent [`EMConfig`] passed to
    /// [`EMTrainer::train`] (or [`Algorithm::process`]), and does not run the M-step's
    /// initialization.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset does not match the model or the M-step fails. The model is
    /// left unchanged on error.
    pub fn em_step(&mut self, model: &mut dyn Mixture, dataset: &dyn Dataset) -> GmmResult<Float> {
        self.expectation_maximization(model, dataset)
            .map(|(log_likelihood, _)| log_likelihood)
    }

    /// Train `model` on `dataset` until the log-likelihood converges or the iteration budget runs
    /// out, using the default callbacks.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is empty or does not match the model, if the prior model
    /// is missing or has the wrong shape, or if any step fails. Running out of iterations is not
    /// an error and is reported as [`TrainingState::Exhausted`] in the summary.
    pub fn train<P, U>(
        &mut self,
        model: &mut P,
        dataset: &U,
        config: EMConfig,
    ) -> GmmResult<TrainingSummary>
    where
        P: Mixture,
        U: Dataset,
    {
        let callbacks = <Self as Algorithm<P, EMStatus, U, GmmError>>::default_callbacks();
        self.process(model, dataset, config, callbacks)
    }
}

impl<P, U> Algorithm<P, EMStatus, U, GmmError> for EMTrainer
where
    P: Mixture,
    U: Dataset,
{
    type Summary = TrainingSummary;
    type Config = EMConfig;

    fn initialize(
        &mut self,
        config: Self::Config,
        problem: &mut P,
        status: &mut EMStatus,
        args: &U,
    ) -> GmmResult<()> {
        self.config = config;
        if args.is_empty() {
            return Err(GmmError::EmptyDataset);
        }
        let (n_components, n_inputs) = problem.shape();
        if args.n_inputs() != n_inputs {
            return Err(GmmError::SampleDimension {
                index: 0,
                expected: n_inputs,
                found: args.n_inputs(),
            });
        }
        if let Some(prior) = self.config.prior.as_deref() {
            if prior.shape() != problem.shape() {
                return Err(GmmError::PriorShape {
                    expected: problem.shape(),
                    found: prior.shape(),
                });
            }
        }
        self.mstep
            .initialize(problem, args, self.config.prior.as_deref())?;
        self.stats = SufficientStatistics::new(n_components, n_inputs);
        status.n_samples = args.len();
        status.state = TrainingState::Initialized;
        Ok(())
    }

    fn step(
        &mut self,
        _current_step: usize,
        problem: &mut P,
        status: &mut EMStatus,
        args: &U,
    ) -> GmmResult<()> {
        let (log_likelihood, diagnostics) = self.expectation_maximization(problem, args)?;
        status.record_step(log_likelihood, diagnostics);
        Ok(())
    }

    fn postprocessing(&mut self, _problem: &P, status: &mut EMStatus, _args: &U) -> GmmResult<()> {
        if status.state == TrainingState::Iterating {
            status.state = TrainingState::Stopped;
            if status.message.is_empty() {
                status.update_message("stopped by a callback");
            }
        }
        Ok(())
    }

    fn summarize(
        &self,
        _current_step: usize,
        problem: &P,
        status: &EMStatus,
        _args: &U,
    ) -> GmmResult<TrainingSummary> {
        Ok(TrainingSummary {
            message: status.message.clone(),
            state: status.state,
            converged: status.converged,
            iterations: status.iterations,
            log_likelihood: status.log_likelihood,
            log_likelihood_history: status.log_likelihood_history.clone(),
            n_samples: status.n_samples,
            n_components: problem.n_components(),
            n_inputs: problem.n_inputs(),
            diagnostics: status.diagnostics.clone(),
        })
    }

    fn reset(&mut self) {
        self.stats.reset();
    }

    fn default_callbacks() -> Callbacks<Self, P, EMStatus, U, GmmError>
    where
        Self: Sized,
    {
        Callbacks::empty()
            .with_terminator(LikelihoodTerminator)
            .with_terminator(IterationBudget)
    }
}
