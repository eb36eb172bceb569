//! Asset lifecycle state machine.
//!
//! An asset carries two independent dimensions:
//!
//! - **status**: where the node is in its lifecycle (commissioned, in
//!   maintenance, ...)
//! - **state**: whether the node is currently visible to presence monitoring
//!
//! Status changes follow a fixed directed graph:
//!
//! ```text
//! Incomplete ──▶ Unallocated ◀──▶ Provisioning ──▶ Commissioned ──▶ Cancelled ──▶ Decommissioned
//!      ▲                ▲               │               ▲  │
//!      └────────────────┼───────────────┘               │  ▼
//!                       └────────────────────────── InMaintenance
//! ```
//!
//! Every applied change is persisted through an [`InventoryClient`]; if the
//! client fails the asset is rolled back so the in-memory copy never diverges
//! from the last persisted value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::InventoryClient;
use crate::error::{InventoryError, InventoryResult};

/// Lifecycle status of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetStatus {
    /// Asset record exists but is not yet usable.
    Incomplete,
    /// Asset is known and free to be commissioned.
    Unallocated,
    /// Asset is being configured.
    Provisioning,
    /// Asset is configured and part of the cluster.
    Commissioned,
    /// Asset is being torn down.
    Cancelled,
    /// Asset has been removed from the cluster.
    Decommissioned,
    /// Asset is being upgraded.
    InMaintenance,
}

impl AssetStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Incomplete,
        Self::Unallocated,
        Self::Provisioning,
        Self::Commissioned,
        Self::Cancelled,
        Self::Decommissioned,
        Self::InMaintenance,
    ];

    /// Get the status name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Incomplete => "Incomplete",
            Self::Unallocated => "Unallocated",
            Self::Provisioning => "Provisioning",
            Self::Commissioned => "Commissioned",
            Self::Cancelled => "Cancelled",
            Self::Decommissioned => "Decommissioned",
            Self::InMaintenance => "InMaintenance",
        }
    }

    /// Statuses reachable in one step from this one.
    #[must_use]
    pub const fn next(self) -> &'static [Self] {
        match self {
            Self::Incomplete => &[Self::Unallocated, Self::Provisioning],
            Self::Unallocated => &[Self::Provisioning],
            Self::Provisioning => &[Self::Incomplete, Self::Unallocated, Self::Commissioned],
            Self::Commissioned => &[Self::Cancelled, Self::InMaintenance],
            Self::Cancelled => &[Self::Decommissioned],
            Self::InMaintenance => &[Self::Commissioned, Self::Unallocated],
            Self::Decommissioned => &[],
        }
    }

    /// Returns true if an asset in this status may move to `to`.
    ///
    /// Staying in the same status is always allowed; only the state changes then.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        self == to || self.next().contains(&to)
    }

    /// States an asset may report while in this status.
    #[must_use]
    pub const fn allowed_states(self) -> &'static [AssetState] {
        match self {
            Self::Incomplete => &[AssetState::Unknown, AssetState::Discovered],
            _ => &[AssetState::Discovered, AssetState::Disappeared],
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presence state of an asset, as last reported by monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetState {
    /// No presence information yet.
    Unknown,
    /// Node is reachable.
    Discovered,
    /// Node stopped reporting.
    Disappeared,
}

impl AssetState {
    /// Get the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Discovered => "Discovered",
            Self::Disappeared => "Disappeared",
        }
    }

    /// Human-readable reason recorded with the state in the inventory.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Unknown => "node's state is unknown",
            Self::Discovered => "node has been discovered",
            Self::Disappeared => "node has disappeared",
        }
    }
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inventory record for a single node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Asset {
    name: String,
    status: AssetStatus,
    prev_status: AssetStatus,
    state: AssetState,
    prev_state: AssetState,
}

impl Asset {
    /// Create an asset in the initial `Incomplete`/`Unknown` position without persisting it.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: AssetStatus::Incomplete,
            prev_status: AssetStatus::Incomplete,
            state: AssetState::Unknown,
            prev_state: AssetState::Unknown,
        }
    }

    /// Create an asset for a freshly discovered node and persist it.
    ///
    /// The record is created as `Unallocated` and then moved to
    /// `Unallocated`/`Discovered`. A record the backend already holds is
    /// reused, so a create whose status update failed can be retried.
    pub async fn create(
        client: &dyn InventoryClient,
        name: impl Into<String>,
    ) -> InventoryResult<Self> {
        let mut asset = Self::new(name);
        match client
            .create_asset(&asset.name, AssetStatus::Unallocated)
            .await
        {
            Ok(()) | Err(InventoryError::AssetExists(_)) => {}
            Err(e) => return Err(e),
        }
        asset
            .set_status(client, AssetStatus::Unallocated, AssetState::Discovered)
            .await?;
        Ok(asset)
    }

    /// Inventory tag of the asset.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> AssetStatus {
        self.status
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> AssetState {
        self.state
    }

    /// Status before the last applied transition.
    #[must_use]
    pub const fn prev_status(&self) -> AssetStatus {
        self.prev_status
    }

    /// State before the last applied transition.
    #[must_use]
    pub const fn prev_state(&self) -> AssetState {
        self.prev_state
    }

    /// Move the asset to a new status and state.
    ///
    /// A request matching the current position is a no-op and does not reach
    /// the client. Rejected transitions leave the asset untouched.
    pub async fn set_status(
        &mut self,
        client: &dyn InventoryClient,
        status: AssetStatus,
        state: AssetState,
    ) -> InventoryResult<()> {
        if status == self.status && state == self.state {
            return Ok(());
        }

        if !self.status.can_transition_to(status) {
            return Err(InventoryError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }

        if !status.allowed_states().contains(&state) {
            return Err(InventoryError::InvalidState { state, status });
        }

        let saved = (self.status, self.prev_status, self.state, self.prev_state);
        self.prev_status = self.status;
        self.prev_state = self.state;
        self.status = status;
        self.state = state;

        if let Err(e) = client
            .set_asset_status(&self.name, status, state, state.description())
            .await
        {
            (self.status, self.prev_status, self.state, self.prev_state) = saved;
            return Err(e);
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::client::MemoryInventoryClient;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Client that rejects every update.
    #[derive(Debug, Default)]
    struct FailingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InventoryClient for FailingClient {
        async fn create_asset(&self, _tag: &str, _status: AssetStatus) -> InventoryResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(InventoryError::client("test error"))
        }

        async fn set_asset_status(
            &self,
            _tag: &str,
            _status: AssetStatus,
            _state: AssetState,
            _reason: &str,
        ) -> InventoryResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(InventoryError::client("test failure"))
        }
    }

    fn asset(status: AssetStatus, state: AssetState) -> Asset {
        Asset {
            name: "foo".to_owned(),
            status,
            prev_status: AssetStatus::Incomplete,
            state,
            prev_state: AssetState::Unknown,
        }
    }

    #[tokio::test]
    async fn create_persists_unallocated_discovered() {
        let client = MemoryInventoryClient::new();

        let asset = Asset::create(&client, "foo").await.unwrap();

        assert_eq!(asset.status(), AssetStatus::Unallocated);
        assert_eq!(asset.state(), AssetState::Discovered);
        assert_eq!(asset.prev_status(), AssetStatus::Incomplete);
        assert_eq!(asset.prev_state(), AssetState::Unknown);

        let record = client.record("foo").unwrap();
        assert_eq!(record.status, AssetStatus::Unallocated);
        assert_eq!(record.state, AssetState::Discovered);
        assert_eq!(record.reason, "node has been discovered");
    }

    #[tokio::test]
    async fn create_reuses_existing_record() {
        let client = MemoryInventoryClient::new();
        client
            .create_asset("foo", AssetStatus::Unallocated)
            .await
            .unwrap();

        let asset = Asset::create(&client, "foo").await.unwrap();

        assert_eq!(asset.status(), AssetStatus::Unallocated);
        assert_eq!(asset.state(), AssetState::Discovered);
        assert_eq!(client.record("foo").unwrap().state, AssetState::Discovered);
        assert_eq!(client.status_updates(), 1);
    }

    #[tokio::test]
    async fn create_surfaces_client_failure() {
        let client = FailingClient::default();
        let result = Asset::create(&client, "foo").await;
        assert_eq!(result, Err(InventoryError::client("test error")));
    }

    #[tokio::test]
    async fn set_status_shifts_previous_values() {
        let client = MemoryInventoryClient::new();
        client
            .create_asset("foo", AssetStatus::Unallocated)
            .await
            .unwrap();
        let mut asset = asset(AssetStatus::Unallocated, AssetState::Discovered);

        asset
            .set_status(&client, AssetStatus::Provisioning, AssetState::Disappeared)
            .await
            .unwrap();

        assert_eq!(asset.status(), AssetStatus::Provisioning);
        assert_eq!(asset.prev_status(), AssetStatus::Unallocated);
        assert_eq!(asset.state(), AssetState::Disappeared);
        assert_eq!(asset.prev_state(), AssetState::Discovered);
        assert_eq!(client.status_updates(), 1);
    }

    #[tokio::test]
    async fn same_status_and_state_is_a_noop() {
        let client = FailingClient::default();
        let mut asset = asset(AssetStatus::Unallocated, AssetState::Discovered);
        let before = asset.clone();

        asset
            .set_status(&client, AssetStatus::Unallocated, AssetState::Discovered)
            .await
            .unwrap();

        assert_eq!(asset, before);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[rstest]
    #[case(AssetStatus::Incomplete, AssetStatus::Unallocated)]
    #[case(AssetStatus::Incomplete, AssetStatus::Provisioning)]
    #[case(AssetStatus::Unallocated, AssetStatus::Provisioning)]
    #[case(AssetStatus::Provisioning, AssetStatus::Unallocated)]
    #[case(AssetStatus::Provisioning, AssetStatus::Commissioned)]
    #[case(AssetStatus::Provisioning, AssetStatus::Incomplete)]
    #[case(AssetStatus::Commissioned, AssetStatus::Cancelled)]
    #[case(AssetStatus::Commissioned, AssetStatus::InMaintenance)]
    #[case(AssetStatus::Cancelled, AssetStatus::Decommissioned)]
    #[case(AssetStatus::InMaintenance, AssetStatus::Commissioned)]
    #[case(AssetStatus::InMaintenance, AssetStatus::Unallocated)]
    #[tokio::test]
    async fn adjacent_transitions_are_applied(
        #[case] from: AssetStatus,
        #[case] to: AssetStatus,
    ) {
        let client = MemoryInventoryClient::new();
        client.create_asset("foo", from).await.unwrap();
        for state in to.allowed_states() {
            let mut asset = asset(from, AssetState::Discovered);

            asset.set_status(&client, to, *state).await.unwrap();

            assert_eq!(asset.status(), to);
            assert_eq!(asset.state(), *state);
            assert_eq!(asset.prev_status(), from);
            assert_eq!(asset.prev_state(), AssetState::Discovered);
        }
    }

    #[rstest]
    #[case(AssetStatus::Unallocated, AssetStatus::Decommissioned)]
    #[case(AssetStatus::Unallocated, AssetStatus::Cancelled)]
    #[case(AssetStatus::Unallocated, AssetStatus::Commissioned)]
    #[case(AssetStatus::Commissioned, AssetStatus::Provisioning)]
    #[case(AssetStatus::Cancelled, AssetStatus::Commissioned)]
    #[case(AssetStatus::Decommissioned, AssetStatus::Unallocated)]
    #[case(AssetStatus::Decommissioned, AssetStatus::Provisioning)]
    #[tokio::test]
    async fn non_adjacent_transitions_are_rejected(
        #[case] from: AssetStatus,
        #[case] to: AssetStatus,
    ) {
        let client = FailingClient::default();
        let mut asset = asset(from, AssetState::Discovered);
        let before = asset.clone();

        let result = asset.set_status(&client, to, AssetState::Discovered).await;

        assert_eq!(result, Err(InventoryError::InvalidTransition { from, to }));
        assert_eq!(asset, before);
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_transition_message() {
        let client = FailingClient::default();
        let mut asset = asset(AssetStatus::Unallocated, AssetState::Discovered);

        let err = asset
            .set_status(&client, AssetStatus::Cancelled, AssetState::Disappeared)
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "transition from Unallocated to Cancelled is not allowed"
        );
    }

    #[rstest]
    #[case(AssetStatus::Incomplete, AssetState::Disappeared)]
    #[case(AssetStatus::Provisioning, AssetState::Unknown)]
    #[case(AssetStatus::Decommissioned, AssetState::Unknown)]
    #[tokio::test]
    async fn disallowed_state_is_rejected(
        #[case] status: AssetStatus,
        #[case] state: AssetState,
    ) {
        let client = FailingClient::default();
        let from = if status == AssetStatus::Decommissioned {
            AssetStatus::Cancelled
        } else {
            AssetStatus::Incomplete
        };
        let mut asset = asset(from, AssetState::Discovered);
        let before = asset.clone();

        let result = asset.set_status(&client, status, state).await;

        assert_eq!(result, Err(InventoryError::InvalidState { state, status }));
        assert_eq!(asset, before);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("is not a valid state when asset is in"));
    }

    #[tokio::test]
    async fn client_failure_rolls_back() {
        let client = FailingClient::default();
        let mut asset = asset(AssetStatus::Unallocated, AssetState::Discovered);
        let before = asset.clone();

        let result = asset
            .set_status(&client, AssetStatus::Provisioning, AssetState::Discovered)
            .await;

        assert_eq!(result, Err(InventoryError::client("test failure")));
        assert_eq!(asset, before);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn decommissioned_is_terminal() {
        for status in AssetStatus::ALL {
            let expected = status == AssetStatus::Decommissioned;
            assert_eq!(
                AssetStatus::Decommissioned.can_transition_to(status),
                expected,
                "{status}"
            );
        }
    }

    #[test]
    fn serialises_with_kebab_case_fields() {
        let asset = asset(AssetStatus::Commissioned, AssetState::Discovered);
        let json = serde_json::to_value(&asset).unwrap();

        assert_eq!(json["name"], "foo");
        assert_eq!(json["status"], "Commissioned");
        assert_eq!(json["prev-status"], "Incomplete");
        assert_eq!(json["state"], "Discovered");
        assert_eq!(json["prev-state"], "Unknown");
    }
}
