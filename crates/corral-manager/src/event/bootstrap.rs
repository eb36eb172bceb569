//! Events that act on the cluster rather than on a registered node.

use std::fmt;

use async_trait::async_trait;
use tracing::{error, info};

use super::Event;
use crate::configuration::{drain_output, HostConfig, DISCOVER_GROUP};
use crate::context::ManagerContext;
use crate::error::{ManagerError, ManagerResult};
use crate::extra_vars::ExtraVars;

/// Name given to the temporary host while it is bootstrapped.
const BOOTSTRAP_HOST: &str = "node1";

/// Bootstrap the host at an address onto the cluster network so that
/// monitoring can discover it.
#[derive(Debug, Clone)]
pub struct NodeDiscover {
    addr: String,
    extra_vars: ExtraVars,
}

impl NodeDiscover {
    #[must_use]
    pub fn new(addr: impl Into<String>, extra_vars: ExtraVars) -> Self {
        Self {
            addr: addr.into(),
            extra_vars,
        }
    }
}

impl fmt::Display for NodeDiscover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node discover: {}", self.addr)
    }
}

#[async_trait]
impl Event for NodeDiscover {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        if let Ok((name, _)) = ctx.nodes.find_node_by_mgmt_address(&self.addr) {
            return Err(ManagerError::precondition(format!(
                "a node {name:?} already exists with the management address {:?}",
                self.addr
            )));
        }

        let host = HostConfig::for_node(BOOTSTRAP_HOST, &self.addr, DISCOVER_GROUP);
        let run = ctx
            .configuration
            .configure(std::slice::from_ref(&host), &self.extra_vars)
            .await;
        drain_output(run).await.inspect_err(|e| {
            error!(addr = %self.addr, error = %e, "discover failed");
        })?;

        info!(addr = %self.addr, "host bootstrapped");
        Ok(())
    }
}

/// Replace the cluster-wide configuration variables.
#[derive(Debug, Clone)]
pub struct SetGlobals {
    extra_vars: ExtraVars,
}

impl SetGlobals {
    #[must_use]
    pub const fn new(extra_vars: ExtraVars) -> Self {
        Self { extra_vars }
    }
}

impl fmt::Display for SetGlobals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("set globals")
    }
}

#[async_trait]
impl Event for SetGlobals {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        ctx.configuration.set_globals(&self.extra_vars).await
    }
}
