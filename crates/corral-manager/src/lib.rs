//! Corral Manager
//!
//! Control plane for the node lifecycle of a corral cluster. It discovers
//! nodes, drives them through commission, decommission and maintenance, and
//! keeps three subsystems in step for every node:
//!
//! - **Monitoring** reports which nodes are reachable
//! - **Inventory** records each node's asset status and state
//! - **Configuration** provisions, cleans up and upgrades hosts
//!
//! # Architecture
//!
//! Every change is an [`Event`](event::Event). Producers (monitoring
//! callbacks and API handlers) enqueue events; a single
//! [`EventProcessor`](processor::EventProcessor) applies them one at a time
//! against the [`NodeRegistry`](registry::NodeRegistry). Some events queue a
//! follow-up that runs before the next event is taken from the queue:
//!
//! ```text
//! discovered ──▶ commissioned ──▶ configure ──▶ commissioned asset
//!                                     │
//!                                     ▼ (failure)
//!                                 unallocated
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use corral_inventory::{AssetInventory, MemoryInventoryClient};
//! use corral_manager::{Manager, MockConfiguration, ProcessorConfig, StaticMonitor};
//!
//! let inventory = Arc::new(AssetInventory::new(Arc::new(MemoryInventoryClient::new())));
//! let monitor = StaticMonitor::default();
//! let (manager, processor) = Manager::new(
//!     inventory,
//!     Arc::new(MockConfiguration::new()),
//!     &monitor,
//!     &ProcessorConfig::default(),
//! )?;
//! let _handle = processor.spawn();
//!
//! manager.commission_node("node-1234", "{}").await?;
//! ```

pub mod api;
pub mod config;
pub mod configuration;
pub mod context;
pub mod error;
pub mod event;
pub mod extra_vars;
pub mod manager;
pub mod monitor;
pub mod processor;
pub mod registry;
pub mod service;

pub use config::{ManagerConfig, ProcessorConfig};
pub use configuration::{Configuration, HostConfig, MockConfiguration, PlaybookRunner};
pub use error::{ErrorKind, ManagerError, ManagerResult};
pub use event::{Event, WaitableEvent};
pub use extra_vars::ExtraVars;
pub use manager::Manager;
pub use monitor::{Monitor, MonitorEventKind, MonitorNode, StaticMonitor};
pub use processor::{event_queue, EventProcessor, EventSender, ProcessorHandle};
pub use registry::{ClusterSnapshot, Node, NodeRegistry};
pub use service::ManagerService;
