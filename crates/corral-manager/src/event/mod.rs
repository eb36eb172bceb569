//! Orchestration events.
//!
//! Every state change in the manager is an event applied by the processor
//! task. Events carry only what they need (a node, a name or an address and
//! the caller's extra variables) and may queue follow-up events through the
//! context:
//!
//! ```text
//! NodeCommissioned ──▶ NodeConfigure
//! NodeDecommissioned ──▶ NodeCleanup
//! NodeInMaintenance ──▶ NodeUpgrade
//! ```

mod bootstrap;
mod lifecycle;
mod monitor;

use std::fmt;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::context::ManagerContext;
use crate::error::{ManagerError, ManagerResult};

pub use bootstrap::{NodeDiscover, SetGlobals};
pub use lifecycle::{
    NodeCleanup, NodeCommissioned, NodeConfigure, NodeDecommissioned, NodeInMaintenance,
    NodeUpgrade,
};
pub use monitor::{NodeDiscovered, NodeDisappeared};

/// An orchestration action.
///
/// `Display` gives the description used in logs.
#[async_trait]
pub trait Event: fmt::Display + Send + Sync {
    /// Apply the event. Called exactly once, on the processor task.
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()>;
}

/// Wraps an event so a caller can wait for its result.
///
/// Follow-up events queued by the wrapped event are not waited for.
pub struct WaitableEvent {
    inner: Box<dyn Event>,
    done: Option<oneshot::Sender<ManagerResult<()>>>,
}

/// Receiving half of a [`WaitableEvent`].
#[derive(Debug)]
pub struct Completion(oneshot::Receiver<ManagerResult<()>>);

impl WaitableEvent {
    #[must_use]
    pub fn new(inner: impl Event + 'static) -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        let event = Self {
            inner: Box::new(inner),
            done: Some(tx),
        };
        (event, Completion(rx))
    }
}

impl fmt::Display for WaitableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waitable event: {}", self.inner)
    }
}

#[async_trait]
impl Event for WaitableEvent {
    async fn apply(&mut self, ctx: &mut ManagerContext) -> ManagerResult<()> {
        let result = self.inner.apply(ctx).await;
        // the caller may read the cluster as soon as it is woken
        ctx.publish();
        if let Some(done) = self.done.take() {
            let _ = done.send(result.clone());
        }
        result
    }
}

impl Completion {
    /// Wait for the event to be applied and return its result.
    ///
    /// Fails with [`ManagerError::EventDropped`] if the event is discarded unapplied.
    pub async fn wait(self) -> ManagerResult<()> {
        self.0.await.unwrap_or(Err(ManagerError::EventDropped))
    }
}
