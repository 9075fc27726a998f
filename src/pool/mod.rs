//! Collection pool
//!
//! Stores admitted values and credits each admission to its submitter.

pub mod collection;
pub mod results;

pub use collection::{CollectionPool, Scoreboard};
pub use results::AdmitResult;
