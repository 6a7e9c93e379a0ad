use crate::traits::{Algorithm, Observer, Status, Terminator};
use std::{fmt::Debug, ops::ControlFlow};

enum CallbackLike<A, P, S, U, E> {
    Terminator(Box<dyn Terminator<A, P, S, U, E>>),
    Observer(Box<dyn Observer<A, P, S, U, E>>),
}
impl<A, P, S, U, E> CallbackLike<A, P, S, U, E>
where
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    fn callback(
        &mut self,
        current_step: usize,
        algorithm: &mut A,
        problem: &P,
        status: &mut S,
        args: &U,
    ) -> ControlFlow<()> {
        match self {
            Self::Terminator(terminator) => {
                terminator.check_for_termination(current_step, algorithm, problem, status, args)
            }
            Self::Observer(observer) => {
                observer.observe(current_step, algorithm, problem, status, args);
                ControlFlow::Continue(())
            }
        }
    }
}

/// A set of [`Terminator`]s and/or [`Observer`]s which can be used as an input to
/// [`Algorithm::process`].
///
/// Callbacks run in the order they were added, and the first one to request termination ends the
/// step's checks.
pub struct Callbacks<A, P, S, U, E>(Vec<CallbackLike<A, P, S, U, E>>);
impl<A, P, S, U, E> Callbacks<A, P, S, U, E> {
    /// Create an empty set of callbacks.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// The number of registered callbacks.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no callbacks are registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Return the set of [`Callbacks`] with an additional [`Terminator`] added.
    pub fn with_terminator<T>(mut self, terminator: T) -> Self
    where
        T: Terminator<A, P, S, U, E> + 'static,
        A: Algorithm<P, S, U, E>,
        S: Status,
    {
        self.0.push(CallbackLike::Terminator(Box::new(terminator)));
        self
    }

    /// Return the set of [`Callbacks`] with an additional [`Observer`] added.
    pub fn with_observer<O>(mut self, observer: O) -> Self
    where
        O: Observer<A, P, S, U, E> + 'static,
        A: Algorithm<P, S, U, E>,
        S: Status,
    {
        self.0.push(CallbackLike::Observer(Box::new(observer)));
        self
    }
}
impl<A, P, S, U, E> Terminator<A, P, S, U, E> for Callbacks<A, P, S, U, E>
where
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    fn check_for_termination(
        &mut self,
        current_step: usize,
        algorithm: &mut A,
        problem: &P,
        status: &mut S,
        args: &U,
    ) -> ControlFlow<()> {
        if self.0.iter_mut().any(|callback| {
            callback
                .callback(current_step, algorithm, problem, status, args)
                .is_break()
        }) {
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }
}

/// A debugging callback which prints out the step and status at the current step of an
/// algorithm.
///
/// # Usage:
///
/// ```rust
/// use gmm_adapt::prelude::*;
/// use gmm_adapt::core::DebugObserver;
///
/// let data: Vec<Vec<f64>> = vec![vec![0.0], vec![1.0], vec![2.0]];
/// let mut model = GaussianMixture::new(1, 1);
/// let mut trainer = EMTrainer::new(MaximumLikelihood::default());
/// let summary = trainer
///     .process(
///         &mut model,
///         &data,
///         EMConfig::default(),
///         EMTrainer::default_callbacks().with_observer(DebugObserver),
///     )
///     .unwrap();
/// // ^ This will print debug messages for each step
/// assert!(summary.converged);
/// ```
pub struct DebugObserver;
impl<A, P, S, U, E> Observer<A, P, S, U, E> for DebugObserver
where
    A: Algorithm<P, S, U, E>,
    S: Status + Debug,
{
    fn observe(&mut self, current_step: usize, _algorithm: &A, _problem: &P, status: &S, _args: &U) {
        println!("Step: {}\n{:#?}", current_step, status);
    }
}
