//! Monitor over a fixed node list.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{Monitor, MonitorCallback, MonitorEventKind, MonitorNode};
use crate::error::{ManagerError, ManagerResult};

/// Monitor that announces a configured node list as discovered on startup.
///
/// Further presence changes can be injected with [`StaticMonitor::announce`].
#[derive(Default)]
pub struct StaticMonitor {
    nodes: Vec<MonitorNode>,
    callbacks: RwLock<HashMap<MonitorEventKind, Vec<MonitorCallback>>>,
}

impl StaticMonitor {
    /// Create a monitor that announces `nodes` when run.
    #[must_use]
    pub fn new(nodes: Vec<MonitorNode>) -> Self {
        Self {
            nodes,
            callbacks: RwLock::default(),
        }
    }

    /// Fire the callbacks registered for `kind`.
    pub async fn announce(&self, kind: MonitorEventKind, node: MonitorNode) -> ManagerResult<()> {
        let callbacks = self
            .callbacks
            .read()
            .map_err(|_| ManagerError::monitoring("lock poisoned"))?
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if callbacks.is_empty() {
            debug!(?kind, node = %node, "no callback registered");
        }

        for callback in callbacks {
            callback(node.clone()).await;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StaticMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticMonitor")
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Monitor for StaticMonitor {
    fn register_callback(
        &self,
        kind: MonitorEventKind,
        callback: MonitorCallback,
    ) -> ManagerResult<()> {
        self.callbacks
            .write()
            .map_err(|_| ManagerError::monitoring("lock poisoned"))?
            .entry(kind)
            .or_default()
            .push(callback);
        Ok(())
    }

    async fn run(&self, cancel: CancellationToken) -> ManagerResult<()> {
        info!(count = self.nodes.len(), "announcing configured nodes");
        for node in &self.nodes {
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.announce(MonitorEventKind::Discovered, node.clone())
                .await?;
        }

        cancel.cancelled().await;
        Ok(())
    }
}
