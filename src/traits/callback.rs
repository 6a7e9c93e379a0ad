use parking_lot::RwLock;
use std::{cell::RefCell, ops::ControlFlow, rc::Rc, sync::Arc};

use crate::traits::{Algorithm, Status};

/// A trait for all kinds of terminators used in [`Algorithm`]s.
///
/// These can be implemented for different kinds of [`Algorithm`]s (`A`), problems (`P`),
/// [`Status`]es (`S`), and data (`U`). A terminator may mutate both the [`Algorithm`] and its
/// [`Status`], and ends the run by returning [`ControlFlow::Break`].
pub trait Terminator<A, P, S, U, E>
where
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    /// A termination check which is called after each step of an [`Algorithm`].
    fn check_for_termination(
        &mut self,
        current_step: usize,
        algorithm: &mut A,
        problem: &P,
        status: &mut S,
        args: &U,
    ) -> ControlFlow<()>;
}
impl<T, A, P, S, U, E> Terminator<A, P, S, U, E> for Rc<RefCell<T>>
where
    T: Terminator<A, P, S, U, E>,
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
        self.borrow_mut()
            .check_for_termination(current_step, algorithm, problem, status, args)
    }
}
impl<T, A, P, S, U, E> Terminator<A, P, S, U, E> for Arc<RwLock<T>>
where
    T: Terminator<A, P, S, U, E>,
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
        self.write()
            .check_for_termination(current_step, algorithm, problem, status, args)
    }
}

/// A trait for all kinds of observers used in [`Algorithm`]s.
///
/// This is the most restrictive type of callback and is not able to mutate any of its inputs
/// aside from itself.
pub trait Observer<A, P, S, U, E>
where
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    /// An observation method which is called after each step of an [`Algorithm`].
    fn observe(&mut self, current_step: usize, algorithm: &A, problem: &P, status: &S, args: &U);
}
impl<O, A, P, S, U, E> Observer<A, P, S, U, E> for Rc<RefCell<O>>
where
    O: Observer<A, P, S, U, E>,
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    fn observe(&mut self, current_step: usize, algorithm: &A, problem: &P, status: &S, args: &U) {
        self.borrow_mut()
            .observe(current_step, algorithm, problem, status, args)
    }
}
impl<O, A, P, S, U, E> Observer<A, P, S, U, E> for Arc<RwLock<O>>
where
    O: Observer<A, P, S, U, E>,
    A: Algorithm<P, S, U, E>,
    S: Status,
{
    fn observe(&mut self, current_step: usize, algorithm: &A, problem: &P, status: &S, args: &U) {
        self.write()
            .observe(current_step, algorithm, problem, status, args)
    }
}
