//! Node registry.
//!
//! The registry aggregates, per node, the three views the manager tracks:
//! what monitoring last reported, the cached inventory asset, and the host
//! configuration handed to automation. It is owned by the processor task and
//! never shared; readers get a [`ClusterSnapshot`] instead.

use std::collections::BTreeMap;

use corral_inventory::{Asset, AssetState, AssetStatus};
use serde::Serialize;

use crate::configuration::{HostConfig, MASTER_GROUP, WORKER_GROUP};
use crate::error::{ManagerError, ManagerResult};
use crate::monitor::MonitorNode;

/// A node as seen by the three subsystems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Node {
    #[serde(rename = "monitoring-state")]
    pub monitoring: Option<MonitorNode>,
    #[serde(rename = "inventory-state")]
    pub inventory: Option<Asset>,
    #[serde(rename = "configuration-state")]
    pub configuration: Option<HostConfig>,
}

/// Point-in-time copy of every node, published after each processed event.
pub type ClusterSnapshot = BTreeMap<String, Node>;

/// Nodes keyed by name, iterated in name order.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: BTreeMap<String, Node>,
}

impl NodeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_node(&self, name: &str) -> ManagerResult<&Node> {
        self.nodes
            .get(name)
            .ok_or_else(|| ManagerError::NodeNotFound(name.to_owned()))
    }

    pub fn find_node_mut(&mut self, name: &str) -> ManagerResult<&mut Node> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| ManagerError::NodeNotFound(name.to_owned()))
    }

    /// Find the node whose monitoring view reports `addr`.
    pub fn find_node_by_mgmt_address(&self, addr: &str) -> ManagerResult<(&str, &Node)> {
        self.nodes
            .iter()
            .find(|(_, node)| {
                node.monitoring
                    .as_ref()
                    .is_some_and(|m| m.mgmt_address == addr)
            })
            .map(|(name, node)| (name.as_str(), node))
            .ok_or_else(|| ManagerError::AddressNotFound(addr.to_owned()))
    }

    /// Get a node, inserting the result of `create` if it is absent.
    pub fn get_or_insert_with(&mut self, name: &str, create: impl FnOnce() -> Node) -> &mut Node {
        self.nodes.entry(name.to_owned()).or_insert_with(create)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> ClusterSnapshot {
        self.nodes.clone()
    }

    fn configuration(&self, name: &str) -> ManagerResult<&HostConfig> {
        self.find_node(name)?
            .configuration
            .as_ref()
            .ok_or_else(|| ManagerError::missing_view(name, "configuration"))
    }

    fn asset(&self, name: &str) -> ManagerResult<&Asset> {
        self.find_node(name)?
            .inventory
            .as_ref()
            .ok_or_else(|| ManagerError::missing_view(name, "inventory"))
    }

    /// Node's host config is in the master group.
    pub fn is_master_node(&self, name: &str) -> ManagerResult<bool> {
        Ok(self.configuration(name)?.group() == MASTER_GROUP)
    }

    /// Node's host config is in the worker group.
    pub fn is_worker_node(&self, name: &str) -> ManagerResult<bool> {
        Ok(self.configuration(name)?.group() == WORKER_GROUP)
    }

    /// Node is currently visible to monitoring.
    pub fn is_discovered_node(&self, name: &str) -> ManagerResult<bool> {
        Ok(self.asset(name)?.state() == AssetState::Discovered)
    }

    /// Node is visible and commissioned.
    pub fn is_discovered_and_allocated_node(&self, name: &str) -> ManagerResult<bool> {
        let asset = self.asset(name)?;
        Ok(asset.state() == AssetState::Discovered && asset.status() == AssetStatus::Commissioned)
    }
}
