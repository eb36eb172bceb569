//! Outward surface of the manager.

use std::sync::Arc;

use corral_inventory::Inventory;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::ProcessorConfig;
use crate::configuration::Configuration;
use crate::context::ManagerContext;
use crate::error::{ManagerError, ManagerResult};
use crate::event::{
    Event, NodeCommissioned, NodeDecommissioned, NodeDisappeared, NodeDiscover, NodeDiscovered,
    NodeInMaintenance, SetGlobals,
};
use crate::extra_vars::ExtraVars;
use crate::monitor::{callback, Monitor, MonitorEventKind};
use crate::processor::{event_queue, EventProcessor, EventSender};
use crate::registry::{ClusterSnapshot, Node};

/// Name reported when caller-supplied extra variables are malformed.
const EXTRA_VARS: &str = "extra-vars";

/// Entry point for requests against the cluster.
///
/// Mutating operations are turned into events and wait until the processor
/// has applied them. Follow-up work (configuration, cleanup, upgrade) runs
/// after the call returns. Reads are served from the latest published
/// snapshot.
#[derive(Clone)]
pub struct Manager {
    events: EventSender,
    snapshots: watch::Receiver<ClusterSnapshot>,
    configuration: Arc<dyn Configuration>,
}

impl Manager {
    /// Wire the subsystems together.
    ///
    /// Registers monitoring callbacks that feed presence changes into the
    /// queue. The returned processor must be run for any request to
    /// complete.
    pub fn new(
        inventory: Arc<dyn Inventory>,
        configuration: Arc<dyn Configuration>,
        monitor: &dyn Monitor,
        config: &ProcessorConfig,
    ) -> ManagerResult<(Self, EventProcessor)> {
        let (events, receiver) = event_queue(config.queue_capacity);
        let ctx = ManagerContext::new(inventory, Arc::clone(&configuration));
        let processor = EventProcessor::new(ctx, receiver);

        let sender = events.clone();
        monitor.register_callback(
            MonitorEventKind::Discovered,
            callback(move |node| {
                let sender = sender.clone();
                async move {
                    if let Err(e) = sender.enqueue(NodeDiscovered::new(node)).await {
                        error!(error = %e, "failed to enqueue discovery");
                    }
                }
            }),
        )?;

        let sender = events.clone();
        monitor.register_callback(
            MonitorEventKind::Disappeared,
            callback(move |node| {
                let sender = sender.clone();
                async move {
                    if let Err(e) = sender.enqueue(NodeDisappeared::new(node)).await {
                        error!(error = %e, "failed to enqueue disappearance");
                    }
                }
            }),
        )?;

        info!(
            queue_capacity = config.queue_capacity,
            "manager initialised"
        );

        let manager = Self {
            events,
            snapshots: processor.subscribe(),
            configuration,
        };
        Ok((manager, processor))
    }

    /// Start commissioning a discovered node.
    pub async fn commission_node(&self, name: &str, extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        self.submit(NodeCommissioned::new(name, extra_vars)).await
    }

    /// Commission nodes in order, stopping at the first failure.
    pub async fn commission_nodes(&self, names: &[String], extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        for name in names {
            self.submit(NodeCommissioned::new(name, extra_vars.clone()))
                .await?;
        }
        Ok(())
    }

    /// Start decommissioning a node.
    pub async fn decommission_node(&self, name: &str, extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        self.submit(NodeDecommissioned::new(name, extra_vars)).await
    }

    /// Decommission nodes in order, stopping at the first failure.
    pub async fn decommission_nodes(&self, names: &[String], extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        for name in names {
            self.submit(NodeDecommissioned::new(name, extra_vars.clone()))
                .await?;
        }
        Ok(())
    }

    /// Put a node into maintenance and start its upgrade.
    pub async fn maintain_node(&self, name: &str, extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        self.submit(NodeInMaintenance::new(name, extra_vars)).await
    }

    /// Put nodes into maintenance in order, stopping at the first failure.
    pub async fn maintain_nodes(&self, names: &[String], extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        for name in names {
            self.submit(NodeInMaintenance::new(name, extra_vars.clone()))
                .await?;
        }
        Ok(())
    }

    /// Bootstrap hosts by management address so monitoring can find them.
    pub async fn discover_nodes(&self, addrs: &[String], extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        for addr in addrs {
            self.submit(NodeDiscover::new(addr, extra_vars.clone()))
                .await?;
        }
        Ok(())
    }

    /// Replace the cluster-wide configuration variables.
    pub async fn set_globals(&self, extra_vars: &str) -> ManagerResult<()> {
        let extra_vars = ExtraVars::parse(EXTRA_VARS, extra_vars)?;
        self.submit(SetGlobals::new(extra_vars)).await
    }

    /// Current view of one node.
    pub fn node(&self, name: &str) -> ManagerResult<Node> {
        self.snapshots
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NodeNotFound(name.to_owned()))
    }

    /// Current view of every node.
    #[must_use]
    pub fn nodes(&self) -> ClusterSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified after every processed event.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClusterSnapshot> {
        self.snapshots.clone()
    }

    /// Current cluster-wide configuration variables.
    pub async fn globals(&self) -> ExtraVars {
        self.configuration.globals().await
    }

    /// Queue handle for producers outside the manager.
    #[must_use]
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    async fn submit(&self, event: impl Event + 'static) -> ManagerResult<()> {
        self.events.enqueue_and_wait(event).await
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}
