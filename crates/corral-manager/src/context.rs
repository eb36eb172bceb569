//! State owned by the event processor.

use std::collections::VecDeque;
use std::sync::Arc;

use corral_inventory::{Asset, Inventory, Transition};
use tokio::sync::watch;

use crate::configuration::Configuration;
use crate::error::{ManagerError, ManagerResult};
use crate::event::Event;
use crate::registry::{ClusterSnapshot, NodeRegistry};

/// Everything an event may touch while it is applied.
///
/// Only the processor task holds a context, so events mutate the registry
/// without locking.
pub struct ManagerContext {
    /// Registered nodes.
    pub nodes: NodeRegistry,
    /// Inventory subsystem.
    pub inventory: Arc<dyn Inventory>,
    /// Configuration subsystem.
    pub configuration: Arc<dyn Configuration>,
    follow_ups: VecDeque<Box<dyn Event>>,
    snapshots: watch::Sender<ClusterSnapshot>,
}

impl ManagerContext {
    #[must_use]
    pub fn new(inventory: Arc<dyn Inventory>, configuration: Arc<dyn Configuration>) -> Self {
        Self {
            nodes: NodeRegistry::new(),
            inventory,
            configuration,
            follow_ups: VecDeque::new(),
            snapshots: watch::channel(ClusterSnapshot::new()).0,
        }
    }

    /// Publish the current registry to snapshot subscribers.
    pub fn publish(&self) {
        self.snapshots.send_replace(self.nodes.snapshot());
    }

    /// Receiver for the snapshots published by [`ManagerContext::publish`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClusterSnapshot> {
        self.snapshots.subscribe()
    }

    /// Queue an event to run after the current one, ahead of new external events.
    pub fn queue(&mut self, event: impl Event + 'static) {
        self.follow_ups.push_back(Box::new(event));
    }

    /// Next queued follow-up event, oldest first.
    pub fn next_follow_up(&mut self) -> Option<Box<dyn Event>> {
        self.follow_ups.pop_front()
    }

    #[must_use]
    pub fn pending_follow_ups(&self) -> usize {
        self.follow_ups.len()
    }

    /// Apply a lifecycle step to a node's asset and refresh the cached view.
    ///
    /// The cache is refreshed whether or not the inventory accepted the step.
    pub async fn update_asset(
        &mut self,
        name: &str,
        transition: Transition,
    ) -> ManagerResult<Asset> {
        let result = self.inventory.transition(name, transition).await;
        self.refresh_asset(name).await;
        result.map_err(ManagerError::from)
    }

    /// Add a newly discovered node's asset and cache it.
    pub async fn add_asset(&mut self, name: &str) -> ManagerResult<Asset> {
        let result = self.inventory.add_asset(name).await;
        self.refresh_asset(name).await;
        result.map_err(ManagerError::from)
    }

    async fn refresh_asset(&mut self, name: &str) {
        let asset = self.inventory.get_asset(name).await;
        if let Ok(node) = self.nodes.find_node_mut(name) {
            node.inventory = asset;
        }
    }
}

impl std::fmt::Debug for ManagerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerContext")
            .field("nodes", &self.nodes)
            .field("follow_ups", &self.follow_ups.len())
            .finish_non_exhaustive()
    }
}
