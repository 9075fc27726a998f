//! Server core functionality
//!
//! This module contains the accept loop, shutdown coordination and the
//! final report.

pub mod core;
pub mod report;
pub mod shutdown;

pub use self::core::CollectorServer;
pub use report::Report;
pub use shutdown::ShutdownCoordinator;
