use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;

use crate::client::handle_client;
use crate::client::registry::ConnectionRegistry;
use crate::client::session::SessionContext;
use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::pool::CollectionPool;
use crate::server::report::Report;
use crate::server::shutdown::ShutdownCoordinator;

pub struct CollectorServer {
    listener: TcpListener,
    config: Arc<CollectorConfig>,
    registry: Arc<ConnectionRegistry>,
    pool: Arc<CollectionPool>,
    coordinator: Arc<ShutdownCoordinator>,
    tracker: TaskTracker,
}

impl CollectorServer {
    /// Binds the listener and starts the collection clock.
    pub async fn bind(config: CollectorConfig) -> Result<Self, CollectorError> {
        config.validate()?;

        let socket = config.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e.into());
            }
        };

        let registry = Arc::new(ConnectionRegistry::new());
        let pool = Arc::new(CollectionPool::new(config.capacity));
        let coordinator = Arc::new(ShutdownCoordinator::new(
            Arc::clone(&pool),
            Arc::clone(&registry),
        ));

        Ok(Self {
            listener,
            config: Arc::new(config),
            registry,
            pool,
            coordinator,
            tracker: TaskTracker::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, CollectorError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn coordinator(&self) -> Arc<ShutdownCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Accepts producers until the pool fills (or the run is interrupted),
    /// then waits briefly for sessions to wind down and returns the report.
    pub async fn run(self) -> Result<Report, CollectorError> {
        info!(
            "Collecting {} unique primes on {}",
            self.config.capacity,
            self.local_addr()?
        );

        let token = self.coordinator.token();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("Accepted connection from {}", addr);
                        // Spawn a task for each client so accept loop doesn't block
                        self.tracker.spawn(handle_client(stream, addr, self.session_context()));
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                    }
                },
            }
        }

        drop(self.listener);
        self.tracker.close();
        if tokio::time::timeout(self.config.shutdown_grace(), self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                "{} sessions still running after shutdown grace period",
                self.tracker.len()
            );
        }

        info!("Server shutting down");
        Ok(self.coordinator.report())
    }

    fn session_context(&self) -> SessionContext {
        SessionContext {
            registry: Arc::clone(&self.registry),
            pool: Arc::clone(&self.pool),
            coordinator: Arc::clone(&self.coordinator),
            max_key_length: self.config.max_key_length,
        }
    }
}
