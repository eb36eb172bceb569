//! Inventory subsystem: the asset collection used by the manager.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::asset::{Asset, AssetState, AssetStatus};
use crate::client::InventoryClient;
use crate::error::{InventoryError, InventoryResult};

/// A named lifecycle step requested by the manager.
///
/// Status steps keep the asset's current state; presence steps keep its
/// current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Discovered,
    Disappeared,
    Provisioning,
    Commissioned,
    Cancelled,
    Decommissioned,
    InMaintenance,
    Unallocated,
}

impl Transition {
    /// Target status and state for an asset currently at `asset`.
    #[must_use]
    pub fn target(self, asset: &Asset) -> (AssetStatus, AssetState) {
        match self {
            Self::Discovered => (asset.status(), AssetState::Discovered),
            Self::Disappeared => (asset.status(), AssetState::Disappeared),
            Self::Provisioning => (AssetStatus::Provisioning, asset.state()),
            Self::Commissioned => (AssetStatus::Commissioned, asset.state()),
            Self::Cancelled => (AssetStatus::Cancelled, asset.state()),
            Self::Decommissioned => (AssetStatus::Decommissioned, asset.state()),
            Self::InMaintenance => (AssetStatus::InMaintenance, asset.state()),
            Self::Unallocated => (AssetStatus::Unallocated, asset.state()),
        }
    }
}

/// Asset bookkeeping as seen by the manager.
///
/// Mutators return the updated asset so callers can cache it.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Add an asset discovered for the first time.
    async fn add_asset(&self, name: &str) -> InventoryResult<Asset>;

    /// Apply a lifecycle step to an existing asset.
    async fn transition(&self, name: &str, transition: Transition) -> InventoryResult<Asset>;

    /// Find an asset by name.
    async fn get_asset(&self, name: &str) -> Option<Asset>;

    /// All assets, ordered by name.
    async fn get_all_assets(&self) -> Vec<Asset>;

    async fn set_asset_discovered(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Discovered).await
    }

    async fn set_asset_disappeared(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Disappeared).await
    }

    async fn set_asset_provisioning(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Provisioning).await
    }

    /// Mark the asset commissioned (allocated).
    async fn set_asset_commissioned(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Commissioned).await
    }

    async fn set_asset_cancelled(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Cancelled).await
    }

    async fn set_asset_decommissioned(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Decommissioned).await
    }

    async fn set_asset_in_maintenance(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::InMaintenance).await
    }

    async fn set_asset_unallocated(&self, name: &str) -> InventoryResult<Asset> {
        self.transition(name, Transition::Unallocated).await
    }
}

/// [`Inventory`] backed by an [`InventoryClient`], caching assets in memory.
pub struct AssetInventory {
    client: Arc<dyn InventoryClient>,
    assets: RwLock<HashMap<String, Asset>>,
}

impl AssetInventory {
    /// Create an empty inventory persisting through `client`.
    #[must_use]
    pub fn new(client: Arc<dyn InventoryClient>) -> Self {
        Self {
            client,
            assets: RwLock::new(HashMap::new()),
        }
    }
}

impl std::fmt::Debug for AssetInventory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetInventory").finish_non_exhaustive()
    }
}

#[async_trait]
impl Inventory for AssetInventory {
    async fn add_asset(&self, name: &str) -> InventoryResult<Asset> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(name) {
            return Err(InventoryError::AssetExists(name.to_owned()));
        }

        let asset = Asset::create(self.client.as_ref(), name).await?;
        debug!(asset = %name, status = %asset.status(), "asset added");
        assets.insert(name.to_owned(), asset.clone());
        Ok(asset)
    }

    async fn transition(&self, name: &str, transition: Transition) -> InventoryResult<Asset> {
        let mut assets = self.assets.write().await;
        let asset = assets
            .get_mut(name)
            .ok_or_else(|| InventoryError::AssetNotFound(name.to_owned()))?;

        let (status, state) = transition.target(asset);
        asset.set_status(self.client.as_ref(), status, state).await?;
        debug!(asset = %name, %status, %state, "asset updated");
        Ok(asset.clone())
    }

    async fn get_asset(&self, name: &str) -> Option<Asset> {
        self.assets.read().await.get(name).cloned()
    }

    async fn get_all_assets(&self) -> Vec<Asset> {
        let mut assets: Vec<_> = self.assets.read().await.values().cloned().collect();
        assets.sort_by(|a, b| a.name().cmp(b.name()));
        assets
    }
}
