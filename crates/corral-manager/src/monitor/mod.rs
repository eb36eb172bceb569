//! Presence monitoring contract.
//!
//! A monitor reports nodes appearing on and disappearing from the cluster
//! network. The manager registers one callback per [`MonitorEventKind`]; the
//! callbacks only enqueue events, all processing happens on the processor task.

mod fixed;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ManagerResult;

pub use fixed::StaticMonitor;

/// A node as reported by presence monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorNode {
    /// Host label.
    pub label: String,
    /// Hardware serial number.
    #[serde(rename = "serial-number", alias = "serial")]
    pub serial: String,
    /// Address the node is managed over.
    #[serde(rename = "management-address", alias = "mgmt_address")]
    pub mgmt_address: String,
}

impl MonitorNode {
    /// Create a monitoring snapshot.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        serial: impl Into<String>,
        mgmt_address: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            serial: serial.into(),
            mgmt_address: mgmt_address.into(),
        }
    }

    /// Stable node identity, `<label>-<serial>`.
    #[must_use]
    pub fn node_name(&self) -> String {
        format!("{}-{}", self.label, self.serial)
    }
}

impl fmt::Display for MonitorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "label: {}, serial: {}, addr: {}",
            self.label, self.serial, self.mgmt_address
        )
    }
}

/// Kind of presence change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorEventKind {
    Discovered,
    Disappeared,
}

/// Callback invoked by a monitor for each presence change.
pub type MonitorCallback =
    Arc<dyn Fn(MonitorNode) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Wrap an async closure as a [`MonitorCallback`].
pub fn callback<F, Fut>(f: F) -> MonitorCallback
where
    F: Fn(MonitorNode) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |node: MonitorNode| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(f(node))
    })
}

/// Presence monitoring subsystem.
#[async_trait]
pub trait Monitor: Send + Sync {
    /// Register the callback for one kind of presence change.
    fn register_callback(&self, kind: MonitorEventKind, callback: MonitorCallback)
        -> ManagerResult<()>;

    /// Drive the monitor until `cancel` fires.
    async fn run(&self, cancel: CancellationToken) -> ManagerResult<()>;
}
