//! Prime collector
//!
//! A collector that admits signed prime numbers from many concurrent
//! producers until a target count of distinct values is reached, plus the
//! producer side of the same protocol.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod pool;
pub mod primes;
pub mod producer;
pub mod protocol;
pub mod server;

pub use config::CollectorConfig;
pub use server::{CollectorServer, Report};
