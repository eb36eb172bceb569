//! Corral asset inventory.
//!
//! Every cluster node has an inventory record (an [`Asset`]) that tracks two
//! things: its lifecycle **status** and its presence **state**. This crate
//! owns the rules for moving between them and the contract the manager uses
//! to drive those moves.
//!
//! - [`asset`]: the status/state machine and its persistence rollback
//! - [`client`]: the persistence backend contract and an in-memory backend
//! - [`inventory`]: the asset collection consumed by the manager
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use corral_inventory::{AssetInventory, AssetStatus, Inventory, MemoryInventoryClient};
//!
//! let inventory = AssetInventory::new(Arc::new(MemoryInventoryClient::new()));
//! inventory.add_asset("node-1").await?;
//! let asset = inventory.set_asset_provisioning("node-1").await?;
//! assert_eq!(asset.status(), AssetStatus::Provisioning);
//! ```

pub mod asset;
pub mod client;
pub mod error;
pub mod inventory;

pub use asset::{Asset, AssetState, AssetStatus};
pub use client::{AssetRecord, InventoryClient, MemoryInventoryClient};
pub use error::{InventoryError, InventoryResult};
pub use inventory::{AssetInventory, Inventory, Transition};
