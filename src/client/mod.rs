//! Producer connection management
//!
//! Handles identity assignment, the live connection set, and the per-connection
//! session lifecycle.

pub mod handler;
pub mod identity;
pub mod registry;
pub mod session;
pub mod state;

pub use handler::handle_client;
pub use identity::Identity;
pub use registry::{ConnectionRegistry, SharedWriter, shared_writer};
pub use session::{Session, SessionContext};
pub use state::{SessionEnd, SessionState};
