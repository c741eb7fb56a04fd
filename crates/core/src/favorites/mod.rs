//! Favorites domain models and retry policy helpers.

mod favorites_model;
mod favorites_policy;

pub use favorites_model::*;
pub use favorites_policy::*;
