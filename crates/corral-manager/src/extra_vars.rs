//! Opaque configuration variables passed through to the automation tool.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};

/// JSON text forwarded verbatim to the configuration subsystem.
///
/// Only validated to be well-formed JSON; the content is never interpreted by
/// the manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtraVars(String);

impl ExtraVars {
    /// Validate raw user input.
    ///
    /// Empty (or whitespace-only) input becomes `{}`. `name` identifies the
    /// input in the error message.
    pub fn parse(name: &str, raw: &str) -> ManagerResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_json::from_str::<serde_json::Value>(raw).map_err(|e| {
            ManagerError::precondition(format!("{name:?} should be a valid json. Error: {e}"))
        })?;

        Ok(Self(raw.to_owned()))
    }

    /// Raw JSON text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parsed JSON value.
    ///
    /// Falls back to an empty object for text that bypassed [`ExtraVars::parse`].
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.0)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl Default for ExtraVars {
    fn default() -> Self {
        Self("{}".to_owned())
    }
}

impl fmt::Display for ExtraVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
