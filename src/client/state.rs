//! Module `state`
//!
//! Defines the states a producer session moves through and the ways it can end.

use std::fmt;

use crate::client::Identity;
use crate::protocol::ResponseCode;

/// Position of a session in its protocol.
///
/// `AwaitingKey -> Registered -> (Receiving <-> Responding) -> Terminated`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No usable public key has arrived yet.
    AwaitingKey,
    /// The key was bound to an identity and the identity sent to the peer.
    Registered(Identity),
    /// Waiting for the next submission.
    Receiving(Identity),
    /// A response for the last submission is pending.
    Responding(Identity, ResponseCode),
    Terminated(SessionEnd),
}

/// Why a session stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection between submissions.
    Disconnected,
    /// This session's admission filled the pool and it drove the shutdown.
    Completed,
    /// The collector shut down because another session filled the pool.
    Shutdown,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEnd::Disconnected => write!(f, "disconnected"),
            SessionEnd::Completed => write!(f, "completed the collection"),
            SessionEnd::Shutdown => write!(f, "stopped by shutdown"),
        }
    }
}
