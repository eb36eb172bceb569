//! Mock configuration for testing.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{ConfigRun, Configuration, HostConfig};
use crate::error::{ManagerError, ManagerResult};
use crate::extra_vars::ExtraVars;

/// Operation recorded by [`MockConfiguration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigOp {
    Configure,
    Cleanup,
    Upgrade,
}

impl ConfigOp {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Cleanup => "cleanup",
            Self::Upgrade => "upgrade",
        }
    }
}

/// A call made against [`MockConfiguration`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCall {
    pub op: ConfigOp,
    pub hosts: Vec<HostConfig>,
    pub extra_vars: ExtraVars,
}

/// Mock configuration for testing.
///
/// Every run succeeds with a short scripted output unless a failure has been
/// injected for its operation with [`MockConfiguration::fail`].
#[derive(Debug, Default)]
pub struct MockConfiguration {
    calls: Mutex<Vec<ConfigCall>>,
    failures: Mutex<HashMap<ConfigOp, String>>,
    globals: Mutex<ExtraVars>,
}

impl MockConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with initial global variables.
    #[must_use]
    pub fn with_globals(globals: ExtraVars) -> Self {
        Self {
            globals: Mutex::new(globals),
            ..Self::default()
        }
    }

    /// Make every subsequent `op` run fail with `message`.
    pub fn fail(&self, op: ConfigOp, message: impl Into<String>) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op, message.into());
    }

    /// Let `op` runs succeed again.
    pub fn succeed(&self, op: ConfigOp) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    /// All calls made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ConfigCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made for one operation.
    #[must_use]
    pub fn calls_for(&self, op: ConfigOp) -> Vec<ConfigCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op == op)
            .collect()
    }

    fn run(&self, op: ConfigOp, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ConfigCall {
                op,
                hosts: hosts.to_vec(),
                extra_vars: extra_vars.clone(),
            });

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&op)
            .cloned();

        let mut output = format!("PLAY [{}] ********\n", op.as_str());
        for host in hosts {
            output.push_str(&format!("ok: [{}]\n", host.tag()));
        }

        let (run, tx) = ConfigRun::new(Some(Box::new(Cursor::new(output.into_bytes()))));
        let result = match failure {
            Some(message) => Err(ManagerError::configuration(message)),
            None => Ok(()),
        };
        let _ = tx.send(result);
        run
    }
}

#[async_trait]
impl Configuration for MockConfiguration {
    async fn configure(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run(ConfigOp::Configure, hosts, extra_vars)
    }

    async fn cleanup(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run(ConfigOp::Cleanup, hosts, extra_vars)
    }

    async fn upgrade(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run(ConfigOp::Upgrade, hosts, extra_vars)
    }

    async fn set_globals(&self, extra_vars: &ExtraVars) -> ManagerResult<()> {
        *self.globals.lock().unwrap_or_else(PoisonError::into_inner) = extra_vars.clone();
        Ok(())
    }

    async fn globals(&self) -> ExtraVars {
        self.globals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
