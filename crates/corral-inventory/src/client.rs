//! Persistence backend for asset records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::asset::{AssetState, AssetStatus};
use crate::error::{InventoryError, InventoryResult};

/// Backend that durably stores asset records.
///
/// Implementations are called only after the in-memory state machine has
/// accepted a change.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Create a new asset record with the given tag and initial status.
    async fn create_asset(&self, tag: &str, status: AssetStatus) -> InventoryResult<()>;

    /// Persist a status/state change together with a human-readable reason.
    async fn set_asset_status(
        &self,
        tag: &str,
        status: AssetStatus,
        state: AssetState,
        reason: &str,
    ) -> InventoryResult<()>;
}

/// Last persisted value of an asset in [`MemoryInventoryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    /// Persisted status.
    pub status: AssetStatus,
    /// Persisted state.
    pub state: AssetState,
    /// Reason sent with the last update.
    pub reason: String,
}

/// In-memory inventory client.
///
/// Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryInventoryClient {
    records: RwLock<HashMap<String, AssetRecord>>,
    status_updates: AtomicUsize,
}

impl MemoryInventoryClient {
    /// Create a new empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last persisted record for an asset.
    #[must_use]
    pub fn record(&self, tag: &str) -> Option<AssetRecord> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(tag).cloned())
    }

    /// Number of `set_asset_status` calls that reached the backend.
    #[must_use]
    pub fn status_updates(&self) -> usize {
        self.status_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryClient for MemoryInventoryClient {
    async fn create_asset(&self, tag: &str, status: AssetStatus) -> InventoryResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| InventoryError::client("lock poisoned"))?;

        if records.contains_key(tag) {
            return Err(InventoryError::AssetExists(tag.to_owned()));
        }

        records.insert(
            tag.to_owned(),
            AssetRecord {
                status,
                state: AssetState::Unknown,
                reason: String::new(),
            },
        );
        Ok(())
    }

    async fn set_asset_status(
        &self,
        tag: &str,
        status: AssetStatus,
        state: AssetState,
        reason: &str,
    ) -> InventoryResult<()> {
        self.status_updates.fetch_add(1, Ordering::SeqCst);

        let mut records = self
            .records
            .write()
            .map_err(|_| InventoryError::client("lock poisoned"))?;

        let record = records
            .get_mut(tag)
            .ok_or_else(|| InventoryError::AssetNotFound(tag.to_owned()))?;

        record.status = status;
        record.state = state;
        reason.clone_into(&mut record.reason);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_update() {
        let client = MemoryInventoryClient::new();
        client
            .create_asset("node-1", AssetStatus::Unallocated)
            .await
            .unwrap();

        let record = client.record("node-1").unwrap();
        assert_eq!(record.status, AssetStatus::Unallocated);
        assert_eq!(record.state, AssetState::Unknown);

        client
            .set_asset_status(
                "node-1",
                AssetStatus::Provisioning,
                AssetState::Discovered,
                "node has been discovered",
            )
            .await
            .unwrap();

        let record = client.record("node-1").unwrap();
        assert_eq!(record.status, AssetStatus::Provisioning);
        assert_eq!(record.reason, "node has been discovered");
        assert_eq!(client.status_updates(), 1);
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let client = MemoryInventoryClient::new();
        client
            .create_asset("node-1", AssetStatus::Unallocated)
            .await
            .unwrap();

        let result = client.create_asset("node-1", AssetStatus::Unallocated).await;
        assert_eq!(result, Err(InventoryError::AssetExists("node-1".to_owned())));
    }

    #[tokio::test]
    async fn update_unknown_asset_fails() {
        let client = MemoryInventoryClient::new();
        let result = client
            .set_asset_status("ghost", AssetStatus::Unallocated, AssetState::Discovered, "")
            .await;
        assert_eq!(result, Err(InventoryError::AssetNotFound("ghost".to_owned())));
    }
}
