//! Error handlers
//!
//! Provides logging for faults that end a single session.

use crate::error::types::{AuthError, CollectorError};
use log::{error, info, warn};

/// Log a session-ending error at a level matching its cause.
///
/// Peer disconnects are routine, decode faults point at a misbehaving
/// producer, anything else is a collector-side problem.
pub fn handle_error(peer: &str, err: &CollectorError) {
    if err.is_disconnect() {
        info!("Session {} ended: {}", peer, err);
        return;
    }

    match err {
        CollectorError::Protocol(_)
        | CollectorError::Auth(AuthError::MalformedKey(_) | AuthError::MalformedSignature { .. }) => {
            warn!("Dropping {}: {}", peer, err);
        }
        _ => error!("Session {} failed: {}", peer, err),
    }
}
