//! Error types for corral-manager.

use corral_inventory::InventoryError;

/// Result type alias using [`ManagerError`].
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors raised while processing events or serving requests.
///
/// Cloneable so an event result can be both signalled to a waiting caller
/// and returned to the processor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagerError {
    /// Node is not in the registry.
    #[error("node with name {0:?} doesn't exist")]
    NodeNotFound(String),

    /// Node has no management address matching the lookup.
    #[error("node with management address {0:?} doesn't exist")]
    AddressNotFound(String),

    /// Node exists but one of its views has not been populated yet.
    #[error("node {node:?} has no {view} state")]
    MissingView {
        /// Node name.
        node: String,
        /// Missing view name.
        view: &'static str,
    },

    /// Inventory rejected or failed the request.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Request rejected because a precondition does not hold.
    #[error("{0}")]
    Precondition(String),

    /// Configuration automation failed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Presence monitoring failed.
    #[error("monitoring error: {0}")]
    Monitoring(String),

    /// The event queue has been closed.
    #[error("event queue is closed")]
    QueueClosed,

    /// The processor dropped an event without applying it.
    #[error("event was dropped before it was processed")]
    EventDropped,

    /// Service configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`ManagerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidTransition,
    Precondition,
    Collaborator,
    Internal,
}

impl ManagerError {
    /// Create a precondition error.
    #[must_use]
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a monitoring error.
    #[must_use]
    pub fn monitoring(msg: impl Into<String>) -> Self {
        Self::Monitoring(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a missing view error.
    #[must_use]
    pub fn missing_view(node: impl Into<String>, view: &'static str) -> Self {
        Self::MissingView {
            node: node.into(),
            view,
        }
    }

    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NodeNotFound(_) | Self::AddressNotFound(_) | Self::MissingView { .. } => {
                ErrorKind::NotFound
            }
            Self::Inventory(e) => match e {
                InventoryError::AssetNotFound(_) => ErrorKind::NotFound,
                InventoryError::InvalidTransition { .. } | InventoryError::InvalidState { .. } => {
                    ErrorKind::InvalidTransition
                }
                InventoryError::AssetExists(_) | InventoryError::Client(_) => {
                    ErrorKind::Collaborator
                }
            },
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Configuration(_) | Self::Monitoring(_) => ErrorKind::Collaborator,
            Self::QueueClosed | Self::EventDropped | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}
