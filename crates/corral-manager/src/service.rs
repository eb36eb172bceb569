//! Service lifecycle management.
//!
//! Provides the main service runner with signal handling and graceful shutdown.

use std::sync::Arc;

use corral_inventory::{AssetInventory, Inventory, MemoryInventoryClient};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::api;
use crate::config::ManagerConfig;
use crate::configuration::{create_configuration, Configuration};
use crate::error::{ManagerError, ManagerResult};
use crate::manager::Manager;
use crate::monitor::{Monitor, StaticMonitor};

/// The manager service.
///
/// Manages the lifecycle of the manager, including:
/// - Inventory, configuration and monitoring subsystems
/// - The event processor
/// - HTTP API server
/// - Signal handling and graceful shutdown
pub struct ManagerService {
    config: ManagerConfig,
    cancel: CancellationToken,
}

impl ManagerService {
    /// Create a new manager service with the given configuration.
    #[must_use]
    pub fn new(config: ManagerConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Run the manager service.
    ///
    /// This will:
    /// 1. Create the inventory, configuration and monitoring subsystems
    /// 2. Start the event processor
    /// 3. Start the monitor
    /// 4. Serve the HTTP API until a shutdown signal
    pub async fn run(&self) -> ManagerResult<()> {
        let inventory: Arc<dyn Inventory> =
            Arc::new(AssetInventory::new(Arc::new(MemoryInventoryClient::new())));
        let configuration = self.create_configuration()?;
        let monitor = Arc::new(StaticMonitor::new(self.config.monitor.nodes.clone()));

        let (manager, processor) = Manager::new(
            inventory,
            configuration,
            monitor.as_ref(),
            &self.config.manager,
        )?;
        let processor = processor.spawn();

        let monitor_task = {
            let cancel = self.cancel.child_token();
            let monitor = Arc::clone(&monitor);
            tokio::spawn(async move {
                if let Err(e) = monitor.run(cancel).await {
                    error!(error = %e, "monitor stopped");
                }
            })
        };

        let app = api::router(api::AppState { manager });

        let listener = tokio::net::TcpListener::bind(self.config.server.listen_addr)
            .await
            .map_err(|e| ManagerError::Config(format!("failed to bind TCP: {e}")))?;

        info!(listen_addr = %self.config.server.listen_addr, "manager listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(self.cancel.clone()))
            .await
            .map_err(|e| ManagerError::Config(format!("server error: {e}")));

        self.cancel.cancel();
        if let Err(e) = monitor_task.await {
            error!(error = %e, "monitor task failed");
        }
        processor.shutdown().await;

        served?;
        info!("manager service shutdown complete");
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn create_configuration(&self) -> ManagerResult<Arc<dyn Configuration>> {
        let configuration = create_configuration(&self.config.configuration)?;
        info!(
            configuration_type = ?self.config.configuration.configuration_type,
            "configuration subsystem ready"
        );
        Ok(configuration)
    }
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("received SIGTERM, initiating shutdown");
        }
        () = cancel.cancelled() => {
            info!("shutdown requested");
        }
    }
}
