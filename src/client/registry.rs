//! Connection registry
//!
//! Assigns identities, binds them to public keys and tracks live connections
//! so the shutdown broadcast can reach them.

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWrite;

use crate::auth::PublicKey;
use crate::client::Identity;
use crate::error::{CollectorError, RegistryError};
use crate::protocol::{ResponseCode, write_response};

/// Upper bound on delivering a shutdown code, lock wait included.
pub(crate) const SHUTDOWN_WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Write half of a connection. Responses and broadcasts share it, so every
/// write happens under its lock.
pub type ConnectionWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type SharedWriter = Arc<tokio::sync::Mutex<ConnectionWriter>>;

/// Wraps a write half for registration.
pub fn shared_writer<W>(writer: W) -> SharedWriter
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    Arc::new(tokio::sync::Mutex::new(Box::new(writer)))
}

/// Writes `code` to a connection, giving up after [`SHUTDOWN_WRITE_TIMEOUT`].
///
/// The deadline covers waiting for the writer lock, so a session stuck
/// writing to a peer that stopped reading cannot hold shutdown up.
pub(crate) async fn send_code(
    writer: &SharedWriter,
    code: ResponseCode,
) -> Result<(), CollectorError> {
    let deliver = async {
        let mut writer = writer.lock().await;
        write_response(&mut *writer, code).await
    };

    match tokio::time::timeout(SHUTDOWN_WRITE_TIMEOUT, deliver).await {
        Ok(result) => result,
        Err(_) => {
            Err(io::Error::new(io::ErrorKind::TimedOut, "peer is not accepting writes").into())
        }
    }
}

struct LiveConnection {
    peer: String,
    writer: SharedWriter,
}

/// Registry for tracking registered producers
pub struct ConnectionRegistry {
    next_identity: Mutex<Identity>,
    bindings: RwLock<HashMap<Identity, Arc<PublicKey>>>,
    live: Mutex<HashMap<Identity, LiveConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_identity: Mutex::new(Identity::FIRST),
            bindings: RwLock::new(HashMap::new()),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// Assigns the next identity, binds `key` to it and marks the connection live.
    ///
    /// The counter lock is held until the binding is published, so an
    /// identity is never observable before its key. Fails once the identity
    /// space is used up.
    pub fn register(
        &self,
        peer: &str,
        writer: SharedWriter,
        key: PublicKey,
    ) -> Result<Identity, RegistryError> {
        let mut next = self.next_identity.lock();
        let identity = *next;
        *next = identity.next().ok_or(RegistryError::IdentitiesExhausted)?;

        self.bindings.write().insert(identity, Arc::new(key));
        self.live.lock().insert(
            identity,
            LiveConnection {
                peer: peer.to_string(),
                writer,
            },
        );

        debug!("Registered {} as identity {}", peer, identity);
        Ok(identity)
    }

    pub fn lookup_key(&self, identity: Identity) -> Result<Arc<PublicKey>, RegistryError> {
        self.bindings
            .read()
            .get(&identity)
            .cloned()
            .ok_or(RegistryError::UnknownIdentity(identity))
    }

    /// Removes a connection from the live set. Calling it twice is harmless.
    ///
    /// The key binding stays, identities are never reused.
    pub fn unregister(&self, identity: Identity) -> bool {
        self.live.lock().remove(&identity).is_some()
    }

    /// Sends `code` to every live connection except `excluding`.
    ///
    /// Best effort: a failed or stalled peer is logged and skipped. Every
    /// targeted connection leaves the live set. Returns how many peers were
    /// reached.
    pub async fn broadcast(&self, code: ResponseCode, excluding: Identity) -> usize {
        let targets: Vec<(Identity, LiveConnection)> = {
            let mut live = self.live.lock();
            let ids: Vec<Identity> = live.keys().copied().filter(|id| *id != excluding).collect();
            ids.into_iter()
                .filter_map(|id| live.remove(&id).map(|conn| (id, conn)))
                .collect()
        };

        let mut delivered = 0;
        for (identity, conn) in targets {
            match send_code(&conn.writer, code).await {
                Ok(()) => delivered += 1,
                Err(e) => warn!(
                    "Failed to send {:?} to client {} ({}): {}",
                    code, identity, conn.peer, e
                ),
            }
        }

        delivered
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn is_live(&self, identity: Identity) -> bool {
        self.live.lock().contains_key(&identity)
    }

    /// Number of identities handed out so far.
    #[cfg(test)]
    pub fn registered_count(&self) -> usize {
        self.bindings.read().len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
