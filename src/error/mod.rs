//! Error handling
//!
//! Defines error types and handling for the collector.

pub mod handlers;
pub mod types;

pub use types::*;
