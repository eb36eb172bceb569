//! Error types for the inventory subsystem.

use crate::asset::{AssetState, AssetStatus};

/// Result type alias using [`InventoryError`].
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Errors raised by the asset state machine and the inventory backends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    /// Asset is not known to the inventory.
    #[error("asset {0:?} doesn't exist")]
    AssetNotFound(String),

    /// Asset was already added.
    #[error("asset {0:?} already exists")]
    AssetExists(String),

    /// The status change is not on the lifecycle graph.
    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        /// Current status.
        from: AssetStatus,
        /// Requested status.
        to: AssetStatus,
    },

    /// The state is not valid for the requested status.
    #[error("{state} is not a valid state when asset is in {status} status")]
    InvalidState {
        /// Requested state.
        state: AssetState,
        /// Status the asset would end up in.
        status: AssetStatus,
    },

    /// The persistence backend rejected the update.
    #[error("inventory client error: {0}")]
    Client(String),
}

impl InventoryError {
    /// Create a client error.
    #[must_use]
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Returns true if the error comes from the state machine rather than a backend.
    #[must_use]
    pub const fn is_transition_error(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. } | Self::InvalidState { .. })
    }
}
