//! Shutdown coordination
//!
//! Runs once, from the session whose admission filled the pool: captures the
//! report, answers that session with Completion, tells every other live
//! connection to stop, then fires the cancellation token the accept loop and
//! all sessions select on.

use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::Identity;
use crate::client::registry::{ConnectionRegistry, SharedWriter, send_code};
use crate::pool::CollectionPool;
use crate::protocol::ResponseCode;
use crate::server::report::Report;

pub struct ShutdownCoordinator {
    started: Instant,
    pool: Arc<CollectionPool>,
    registry: Arc<ConnectionRegistry>,
    token: CancellationToken,
    fired: AtomicBool,
    report: OnceLock<Report>,
}

impl ShutdownCoordinator {
    /// Starts the clock used for the report's elapsed time.
    pub fn new(pool: Arc<CollectionPool>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            started: Instant::now(),
            pool,
            registry,
            token: CancellationToken::new(),
            fired: AtomicBool::new(false),
            report: OnceLock::new(),
        }
    }

    /// Get a clone of the cancellation token for use in tasks
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes the run on behalf of the session that filled the pool.
    ///
    /// Only the first call has any effect; later calls return `None`.
    pub async fn trigger(&self, identity: Identity, writer: &SharedWriter) -> Option<Report> {
        if self.fired.swap(true, Ordering::SeqCst) {
            warn!("Shutdown already triggered, ignoring client {}", identity);
            return None;
        }

        let report = self.snapshot(Some(identity));
        info!(
            "Collected {} numbers, final pool length: {}",
            report.capacity,
            self.pool.size()
        );

        if let Err(e) = send_code(writer, ResponseCode::Completion).await {
            warn!("Error sending completion to client {}: {}", identity, e);
        }

        let notified = self.registry.broadcast(ResponseCode::Abort, identity).await;
        info!("Notified {} other clients, shutting down", notified);

        let _ = self.report.set(report.clone());
        self.token.cancel();
        Some(report)
    }

    /// Stops the run without a triggering session, e.g. on Ctrl-C.
    pub fn interrupt(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let _ = self.report.set(self.snapshot(None));
        }
        self.token.cancel();
    }

    /// The report captured at shutdown, or a live snapshot if none was captured.
    pub fn report(&self) -> Report {
        self.report
            .get()
            .cloned()
            .unwrap_or_else(|| self.snapshot(None))
    }

    fn snapshot(&self, triggered_by: Option<Identity>) -> Report {
        Report {
            capacity: self.pool.capacity(),
            scoreboard: self.pool.scoreboard(),
            elapsed: self.started.elapsed(),
            triggered_by,
        }
    }
}
