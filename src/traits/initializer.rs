use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::{
    traits::{Dataset, Mixture},
    GmmResult,
};

/// A trait for seeding the parameters of a [`Mixture`] from data before maximum-likelihood
/// training begins.
pub trait Initializer: DynClone + Debug {
    /// Overwrite the parameters of `model` with values estimated from `dataset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the dataset is empty or its samples do not match the dimension of the
    /// model.
    fn initialize(&mut self, model: &mut dyn Mixture, dataset: &dyn Dataset) -> GmmResult<()>;
}
dyn_clone::clone_trait_object!(Initializer);
