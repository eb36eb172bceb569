//! Node lifecycle events: commission, decommission and maintenance, plus the
//! configuration runs they trigger.

use std::fmt;

use async_trait::async_trait;
use corral_inventory::Transition;
use tracing::{debug, error, info};

use super::Event;
use crate::configuration::{
    drain_output, HostConfig, MASTER_ADDR_VAR, MASTER_GROUP, MASTER_NAME_VAR, WORKER_GROUP,
};
use crate::context::ManagerContext;
use crate::error::{ManagerError, ManagerResult};
use crate::extra_vars::ExtraVars;
use crate::registry::NodeRegistry;

macro_rules! node_event {
    ($(#[$meta:meta])* $name:ident, $description:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            name: String,
            extra_vars: ExtraVars,
        }

        impl $name {
            #[must_use]
            pub fn new(name: impl Into<String>, extra_vars: ExtraVars) -> Self {
                Self {
                    name: name.into(),
                    extra_vars,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($description, ": {}"), self.name)
            }
        }
    };
}

node_event!(
    /// Operator asked to bring a node into the cluster.
    NodeCommissioned,
    "node commissioned"
);
node_event!(
    /// Provision a node, choosing its role first.
    NodeConfigure,
    "node configure"
);
node_event!(
    /// Operator asked to take a node out of the cluster.
    NodeDecommissioned,
    "node decommissioned"
);
node_event!(
    /// Tear down a node's services.
    NodeCleanup,
    "node cleanup"
);
node_event!(
    /// Operator asked to put a node into maintenance.
    NodeInMaintenance,
    "node in maintenance"
);
node_event!(
    /// Upgrade a node's services.
    NodeUpgrade,
    "node upgrade"
);

/// Host config of a node, failing if the node or its configuration view is missing.
fn host_config(nodes: &NodeRegistry, name: &str) -> ManagerResult<HostConfig> {
    nodes
        .find_node(name)?
        .configuration
        .clone()
        .ok_or_else(|| ManagerError::missing_view(name, "configuration"))
}

/// Result of a node check; a failed check counts as false.
fn holds(check: ManagerResult<bool>, node: &str) -> bool {
    check.unwrap_or_else(|e| {
        debug!(%node, error = %e, "node check failed");
        false
    })
}

/// First commissioned, reachable master other than `name`, as `(address, name)`.
fn find_master(nodes: &NodeRegistry, name: &str) -> Option<(String, String)> {
    let (_, master) = nodes.iter().find(|(other, _)| {
        *other != name
            && holds(nodes.is_discovered_and_allocated_node(other), other)
            && holds(nodes.is_master_node(other), other)
    })?;

    let addr = master
        .monitoring
        .as_ref()
        .map(|m| m.mgmt_address.clone())
        .unwrap_or_default();
    let tag = master
        .configuration
        .as_ref()
        .map(|c| c.tag().to_owned())
        .unwrap_or_default();
    Some((addr, tag))
}

/// Any commissioned, reachable worker other than `name`.
fn find_worker<'a>(nodes: &'a NodeRegistry, name: &str) -> Option<&'a str> {
    nodes
        .iter()
        .map(|(other, _)| other)
        .find(|other| {
            *other != name
                && holds(nodes.is_discovered_and_allocated_node(other), other)
                && holds(nodes.is_worker_node(other), other)
        })
}

#[async_trait]
impl Event for NodeCommissioned {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        if !ctx.nodes.is_discovered_node(&self.name)? {
            return Err(ManagerError::precondition(format!(
                "node {:?} has disappeared from monitoring subsystem, it can't be commissioned. \
                 Please check node's network reachability",
                self.name
            )));
        }

        ctx.update_asset(&self.name, Transition::Provisioning).await?;
        ctx.queue(NodeConfigure::new(self.name.clone(), self.extra_vars.clone()));
        Ok(())
    }
}

#[async_trait]
impl Event for NodeConfigure {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let mut host = host_config(&ctx.nodes, &self.name)?;

        // Only one master is supported: the first node commissioned becomes
        // the master and every later node joins it as a worker.
        match find_master(&ctx.nodes, &self.name) {
            Some((addr, master)) => {
                host.set_group(WORKER_GROUP);
                host.set_var(MASTER_ADDR_VAR, addr);
                host.set_var(MASTER_NAME_VAR, master);
            }
            None => {
                host.set_group(MASTER_GROUP);
                host.set_var(MASTER_ADDR_VAR, "");
                host.set_var(MASTER_NAME_VAR, "");
            }
        }
        ctx.nodes.find_node_mut(&self.name)?.configuration = Some(host.clone());
        info!(node = %self.name, group = %host.group(), "configuring node");

        let run = ctx
            .configuration
            .configure(std::slice::from_ref(&host), &self.extra_vars)
            .await;
        if let Err(e) = drain_output(run).await {
            error!(node = %self.name, error = %e, "configuration failed");
            ctx.update_asset(&self.name, Transition::Unallocated).await?;
            return Err(e);
        }

        ctx.update_asset(&self.name, Transition::Commissioned).await?;
        Ok(())
    }
}

#[async_trait]
impl Event for NodeDecommissioned {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        // Workers depend on the master; it goes last.
        if ctx.nodes.is_master_node(&self.name)? {
            if let Some(worker) = find_worker(&ctx.nodes, &self.name) {
                debug!(node = %self.name, %worker, "worker still commissioned");
                return Err(ManagerError::precondition(format!(
                    "{:?} is a master node and it can only be decommissioned after all worker \
                     nodes have been decommissioned",
                    self.name
                )));
            }
        }

        ctx.update_asset(&self.name, Transition::Cancelled).await?;
        ctx.queue(NodeCleanup::new(self.name.clone(), self.extra_vars.clone()));
        Ok(())
    }
}

#[async_trait]
impl Event for NodeCleanup {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let host = host_config(&ctx.nodes, &self.name)?;

        let run = ctx
            .configuration
            .cleanup(std::slice::from_ref(&host), &self.extra_vars)
            .await;
        if let Err(e) = drain_output(run).await {
            error!(node = %self.name, error = %e, "cleanup failed");
        }

        ctx.update_asset(&self.name, Transition::Decommissioned).await?;
        Ok(())
    }
}

#[async_trait]
impl Event for NodeInMaintenance {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        ctx.update_asset(&self.name, Transition::InMaintenance).await?;
        ctx.queue(NodeUpgrade::new(self.name.clone(), self.extra_vars.clone()));
        Ok(())
    }
}

#[async_trait]
impl Event for NodeUpgrade {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let host = host_config(&ctx.nodes, &self.name)?;

        let run = ctx
            .configuration
            .upgrade(std::slice::from_ref(&host), &self.extra_vars)
            .await;
        if let Err(e) = drain_output(run).await {
            error!(node = %self.name, error = %e, "upgrade failed");
            ctx.update_asset(&self.name, Transition::Unallocated).await?;
            return Err(e);
        }

        ctx.update_asset(&self.name, Transition::Commissioned).await?;
        Ok(())
    }
}
