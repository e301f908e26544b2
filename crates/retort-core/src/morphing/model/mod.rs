//! Model loaders and dumpers
//!
//! A model is any type with a shape. The providers here fetch the shape and
//! the name layout of the model, ask for a loader (dumper) of every mapped
//! field, then compile the crown into a plan that the produced closure
//! interprets:
//!
//! - [`loader_gen`] - input crown to [`ModelLoaderPlan`]
//! - [`dumper_gen`] - output crown to [`ModelDumperPlan`]
//! - [`provider`] - [`ModelLoaderProvider`] and [`ModelDumperProvider`]

pub mod dumper_gen;
pub mod loader_gen;
pub mod provider;

pub use dumper_gen::{ModelDumperGen, ModelDumperPlan};
pub use loader_gen::{ModelLoaderGen, ModelLoaderPlan};
pub use provider::{ModelDumperProvider, ModelLoaderProvider};
