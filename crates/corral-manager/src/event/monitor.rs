//! Events fed by presence monitoring.

use std::fmt;

use async_trait::async_trait;
use corral_inventory::Transition;
use tracing::info;

use super::Event;
use crate::configuration::{HostConfig, MASTER_GROUP};
use crate::context::ManagerContext;
use crate::error::ManagerResult;
use crate::monitor::MonitorNode;
use crate::registry::Node;

/// A node became reachable.
///
/// Creates the node on first sight, then records the asset as discovered.
#[derive(Debug, Clone)]
pub struct NodeDiscovered {
    node: MonitorNode,
}

impl NodeDiscovered {
    #[must_use]
    pub const fn new(node: MonitorNode) -> Self {
        Self { node }
    }
}

impl fmt::Display for NodeDiscovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node discovered: {}", self.node)
    }
}

#[async_trait]
impl Event for NodeDiscovered {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let name = self.node.node_name();
        let addr = &self.node.mgmt_address;

        // role is settled when the node is configured
        let node = ctx.nodes.get_or_insert_with(&name, || Node {
            configuration: Some(HostConfig::for_node(&name, addr, MASTER_GROUP)),
            ..Node::default()
        });
        node.monitoring = Some(self.node.clone());

        if ctx.inventory.get_asset(&name).await.is_none() {
            ctx.add_asset(&name).await?;
            info!(node = %name, "new node added to inventory");
        } else {
            ctx.update_asset(&name, Transition::Discovered).await?;
        }
        Ok(())
    }
}

/// A node stopped reporting.
#[derive(Debug, Clone)]
pub struct NodeDisappeared {
    node: MonitorNode,
}

impl NodeDisappeared {
    #[must_use]
    pub const fn new(node: MonitorNode) -> Self {
        Self { node }
    }
}

impl fmt::Display for NodeDisappeared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node disappeared: {}", self.node)
    }
}

#[async_trait]
impl Event for NodeDisappeared {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let name = self.node.node_name();
        ctx.nodes.find_node_mut(&name)?.monitoring = Some(self.node.clone());
        ctx.update_asset(&name, Transition::Disappeared).await?;
        Ok(())
    }
}
