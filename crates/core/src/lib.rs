//! Domain models and collaborator contracts shared by the marketplace client crates.

pub mod errors;
pub mod favorites;
pub mod session;
pub mod storage;

pub use errors::{Error, Result};
