/// Module containing the [`Algorithm`] trait.
pub mod algorithm;
/// Module containing the [`Terminator`] and [`Observer`] traits.
pub mod callback;
/// Module containing the [`Dataset`] trait and its implementations for common containers.
pub mod dataset;
/// Module containing the [`Initializer`] trait.
pub mod initializer;
/// Module containing the [`Mixture`] trait.
pub mod mixture;
/// Module containing the [`MStep`] trait.
pub mod mstep;
/// Module containing the [`Status`] trait.
pub mod status;

pub use algorithm::Algorithm;
pub use callback::{Observer, Terminator};
pub use dataset::Dataset;
pub use initializer::Initializer;
pub use mixture::Mixture;
pub use mstep::MStep;
pub use status::Status;
