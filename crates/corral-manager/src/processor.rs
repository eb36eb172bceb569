//! Event queue and the sequential processor that drains it.
//!
//! Producers hold an [`EventSender`]. A single [`EventProcessor`] task owns
//! the [`ManagerContext`] and applies events one at a time, so nothing else
//! ever mutates the registry. Follow-up events queued while an event is
//! applied run before the next event is taken from the queue.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::context::ManagerContext;
use crate::error::{ManagerError, ManagerResult};
use crate::event::{Event, WaitableEvent};
use crate::registry::ClusterSnapshot;

/// Create a bounded event queue.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn event_queue(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer side of the event queue.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<Box<dyn Event>>,
}

impl EventSender {
    /// Enqueue an event, waiting while the queue is full.
    pub async fn enqueue(&self, event: impl Event + 'static) -> ManagerResult<()> {
        debug!(event = %event, "enqueue event");
        self.tx
            .send(Box::new(event))
            .await
            .map_err(|_| ManagerError::QueueClosed)
    }

    /// Enqueue from outside the async runtime, blocking the thread while the
    /// queue is full.
    ///
    /// Panics if called from within an async context.
    pub fn enqueue_blocking(&self, event: impl Event + 'static) -> ManagerResult<()> {
        self.tx
            .blocking_send(Box::new(event))
            .map_err(|_| ManagerError::QueueClosed)
    }

    /// Enqueue an event and wait until the processor has applied it.
    pub async fn enqueue_and_wait(&self, event: impl Event + 'static) -> ManagerResult<()> {
        let (event, completion) = WaitableEvent::new(event);
        self.enqueue(event).await?;
        completion.wait().await
    }

    /// Free slots left in the queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl std::fmt::Debug for EventSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSender")
            .field("capacity", &self.tx.capacity())
            .finish()
    }
}

/// Consumer side of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<Box<dyn Event>>,
}

/// Applies events to the manager context, one at a time.
#[derive(Debug)]
pub struct EventProcessor {
    ctx: ManagerContext,
    events: EventReceiver,
}

impl EventProcessor {
    #[must_use]
    pub const fn new(ctx: ManagerContext, events: EventReceiver) -> Self {
        Self { ctx, events }
    }

    /// Receiver for the snapshot published after every processed event.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClusterSnapshot> {
        self.ctx.subscribe()
    }

    /// Process events until `cancel` fires or every sender is dropped.
    ///
    /// Events still queued at that point are dropped unapplied; waiting
    /// callers observe [`ManagerError::EventDropped`].
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("event processor started");

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = self.events.rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.process(event).await;
        }

        info!("event processor stopped");
    }

    /// Apply one event and then every follow-up it caused.
    async fn process(&mut self, event: Box<dyn Event>) {
        self.apply(event).await;
        while let Some(next) = self.ctx.next_follow_up() {
            self.apply(next).await;
        }
    }

    async fn apply(&mut self, mut event: Box<dyn Event>) {
        debug!(event = %event, "dequeued event");
        if let Err(e) = event.apply(&mut self.ctx).await {
            error!(event = %event, error = %e, "failed to process event");
        }
        self.ctx.publish();
    }

    /// Run the processor on a background task.
    #[must_use]
    pub fn spawn(self) -> ProcessorHandle {
        let cancel = CancellationToken::new();
        let join_handle = tokio::spawn(self.run(cancel.clone()));
        ProcessorHandle {
            cancel,
            join_handle,
        }
    }
}

/// Handle to a spawned processor task.
#[derive(Debug)]
pub struct ProcessorHandle {
    cancel: CancellationToken,
    join_handle: JoinHandle<()>,
}

impl ProcessorHandle {
    /// Stop after the event in flight and wait for the task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.join_handle.await {
            error!(error = %e, "event processor task failed");
        }
    }
}
