//! Common test utilities for manager integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use corral_inventory::{Asset, AssetInventory, Inventory, MemoryInventoryClient};
use corral_manager::{
    api::{router, AppState},
    context::ManagerContext,
    Event, Manager, ManagerResult, MockConfiguration, MonitorEventKind, MonitorNode,
    ProcessorConfig, ProcessorHandle, StaticMonitor,
};

/// Event that does nothing; waiting on it flushes everything queued before.
struct Barrier;

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("barrier")
    }
}

#[async_trait]
impl Event for Barrier {
    async fn apply(&mut self, _ctx: &mut ManagerContext) -> ManagerResult<()> {
        Ok(())
    }
}

/// Manager wired to in-memory subsystems with a running processor.
pub struct TestManager {
    pub manager: Manager,
    pub client: Arc<MemoryInventoryClient>,
    pub inventory: Arc<AssetInventory>,
    pub configuration: Arc<MockConfiguration>,
    pub monitor: Arc<StaticMonitor>,
    pub processor: ProcessorHandle,
}

impl TestManager {
    pub fn new() -> Self {
        let client = Arc::new(MemoryInventoryClient::new());
        let inventory = Arc::new(AssetInventory::new(client.clone()));
        let configuration = Arc::new(MockConfiguration::new());
        let monitor = Arc::new(StaticMonitor::default());

        let (manager, processor) = Manager::new(
            inventory.clone(),
            configuration.clone(),
            monitor.as_ref(),
            &ProcessorConfig::default(),
        )
        .unwrap();

        Self {
            manager,
            client,
            inventory,
            configuration,
            monitor,
            processor: processor.spawn(),
        }
    }

    /// Wait until every event queued so far, and its follow-ups, has run.
    pub async fn settle(&self) {
        self.manager.events().enqueue_and_wait(Barrier).await.unwrap();
    }

    /// Report a node as discovered and wait for the event to be applied.
    pub async fn discover(&self, label: &str, addr: &str) -> String {
        let node = MonitorNode::new(label, "1", addr);
        let name = node.node_name();
        self.monitor
            .announce(MonitorEventKind::Discovered, node)
            .await
            .unwrap();
        self.settle().await;
        name
    }

    /// Report a node as gone and wait for the event to be applied.
    pub async fn disappear(&self, label: &str, addr: &str) {
        self.monitor
            .announce(MonitorEventKind::Disappeared, MonitorNode::new(label, "1", addr))
            .await
            .unwrap();
        self.settle().await;
    }

    /// Discover and fully commission a node.
    pub async fn commissioned(&self, label: &str, addr: &str) -> String {
        let name = self.discover(label, addr).await;
        self.manager.commission_node(&name, "").await.unwrap();
        self.settle().await;
        name
    }

    pub async fn asset(&self, name: &str) -> Asset {
        self.inventory.get_asset(name).await.unwrap()
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            manager: self.manager.clone(),
        }
    }

    pub fn router(&self) -> axum::Router {
        router(self.app_state())
    }
}

impl Default for TestManager {
    fn default() -> Self {
        Self::new()
    }
}
