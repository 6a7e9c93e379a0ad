use crate::{
    core::Callbacks,
    traits::{Status, Terminator},
};
use std::convert::Infallible;

/// A trait representing an iterative training algorithm.
///
/// This trait is implemented for the trainers found in the [`algorithms`](crate::algorithms)
/// module, and contains all the methods needed to be run by [`Algorithm::process`]. The generic
/// `P` is the object being trained (mutated in place), `U` is read-only data consumed by every
/// step, `S` is the [`Status`] tracked across steps and `E` is the error type.
pub trait Algorithm<P, S: Status, U = (), E = Infallible> {
    /// A type which holds a summary of the algorithm's ending state.
    type Summary;
    /// The configuration struct for the algorithm.
    type Config;

    /// Any setup work done before the main steps of the algorithm should be done here.
    ///
    /// # Errors
    ///
    /// Returns an `Err(E)` if the problem or data cannot be trained with the given configuration.
    fn initialize(
        &mut self,
        config: Self::Config,
        problem: &mut P,
        status: &mut S,
        args: &U,
    ) -> Result<(), E>;

    /// The main "step" of an algorithm, which is repeated until termination conditions are met.
    ///
    /// # Errors
    ///
    /// Returns an `Err(E)` if the step fails. Implementors should leave `problem` untouched when
    /// they return an error.
    fn step(
        &mut self,
        current_step: usize,
        problem: &mut P,
        status: &mut S,
        args: &U,
    ) -> Result<(), E>;

    /// Runs any steps needed by the [`Algorithm`] after termination or convergence. This will run
    /// regardless of whether the [`Algorithm`] converged.
    ///
    /// # Errors
    ///
    /// Returns an `Err(E)` if any final evaluation fails.
    #[allow(unused_variables)]
    fn postprocessing(&mut self, problem: &P, status: &mut S, args: &U) -> Result<(), E> {
        Ok(())
    }

    /// Generates a new [`Algorithm::Summary`] from the current state of the [`Algorithm`], which
    /// can be displayed or used elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an `Err(E)` if any internal evaluation fails while creating the summary.
    fn summarize(
        &self,
        current_step: usize,
        problem: &P,
        status: &S,
        args: &U,
    ) -> Result<Self::Summary, E>;

    /// Reset the algorithm to its initial state.
    fn reset(&mut self) {}

    /// The set of [`Callbacks`] an [`Algorithm`] should use when no others are given.
    fn default_callbacks() -> Callbacks<Self, P, S, U, E>
    where
        Self: Sized,
    {
        Callbacks::empty()
    }

    /// Process the given problem: initialize, then step until one of the `callbacks` requests
    /// termination, then postprocess and summarize.
    ///
    /// # Errors
    ///
    /// Returns an `Err(E)` if initialization or any step fails. Ordinary termination (including
    /// running out of steps) is reported through the summary, never as an error.
    fn process(
        &mut self,
        problem: &mut P,
        args: &U,
        config: Self::Config,
        mut callbacks: Callbacks<Self, P, S, U, E>,
    ) -> Result<Self::Summary, E>
    where
        Self: Sized,
    {
        let mut status = S::default();
        self.initialize(config, problem, &mut status, args)?;
        let mut current_step = 0;
        loop {
            self.step(current_step, problem, &mut status, args)?;
            if callbacks
                .check_for_termination(current_step, self, problem, &mut status, args)
                .is_break()
            {
                break;
            }
            current_step += 1;
        }
        self.postprocessing(problem, &mut status, args)?;
        self.summarize(current_step, problem, &status, args)
    }
}
