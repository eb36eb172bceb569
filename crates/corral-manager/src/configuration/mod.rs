//! Configuration automation contract.
//!
//! The manager hands a set of hosts and opaque extra variables to a
//! [`Configuration`] implementation and gets back a [`ConfigRun`]: an optional
//! output stream plus a one-shot completion slot. [`drain_output`] logs the
//! stream while waiting for completion.

mod mock;
mod playbook;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::{ConfigurationConfig, ConfigurationType};
use crate::error::{ManagerError, ManagerResult};
use crate::extra_vars::ExtraVars;

pub use mock::{ConfigCall, ConfigOp, MockConfiguration};
pub use playbook::PlaybookRunner;

/// Host group for nodes running the cluster's master services.
pub const MASTER_GROUP: &str = "service-master";
/// Host group for every other commissioned node.
pub const WORKER_GROUP: &str = "service-worker";
/// Host group used to bootstrap nodes onto the cluster network.
pub const DISCOVER_GROUP: &str = "cluster-node";

/// Host var carrying the node name.
pub const NODE_NAME_VAR: &str = "node_name";
/// Host var carrying the node's management address.
pub const NODE_ADDR_VAR: &str = "node_addr";
/// Host var carrying the master's management address.
pub const MASTER_ADDR_VAR: &str = "service_master_addr";
/// Host var carrying the master's name.
pub const MASTER_NAME_VAR: &str = "service_master_name";

/// A host as seen by configuration automation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(rename = "inventory-name")]
    tag: String,
    #[serde(rename = "ssh-address")]
    ssh_address: String,
    #[serde(rename = "host-group")]
    group: String,
    #[serde(rename = "host-vars")]
    vars: BTreeMap<String, String>,
}

impl HostConfig {
    #[must_use]
    pub fn new(
        tag: impl Into<String>,
        ssh_address: impl Into<String>,
        group: impl Into<String>,
        vars: BTreeMap<String, String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            ssh_address: ssh_address.into(),
            group: group.into(),
            vars,
        }
    }

    /// Host config for a node, carrying its name and address as vars.
    #[must_use]
    pub fn for_node(name: &str, addr: &str, group: &str) -> Self {
        let vars = BTreeMap::from([
            (NODE_NAME_VAR.to_owned(), name.to_owned()),
            (NODE_ADDR_VAR.to_owned(), addr.to_owned()),
        ]);
        Self::new(name, addr, group, vars)
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn ssh_address(&self) -> &str {
        &self.ssh_address
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn set_group(&mut self, group: impl Into<String>) {
        self.group = group.into();
    }

    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    #[must_use]
    pub const fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }
}

/// Output stream of a configuration run.
pub type ConfigOutput = Box<dyn AsyncRead + Send + Unpin>;

/// An in-flight configuration run.
pub struct ConfigRun {
    /// Tool output, absent when the run failed before producing any.
    pub output: Option<ConfigOutput>,
    /// Completion slot; receives exactly one result.
    pub status: oneshot::Receiver<ManagerResult<()>>,
}

impl ConfigRun {
    /// Create a run and the sender that completes it.
    #[must_use]
    pub fn new(output: Option<ConfigOutput>) -> (Self, oneshot::Sender<ManagerResult<()>>) {
        let (tx, status) = oneshot::channel();
        (Self { output, status }, tx)
    }

    /// A run that failed before the tool could start.
    #[must_use]
    pub fn failed(error: ManagerError) -> Self {
        let (run, tx) = Self::new(None);
        let _ = tx.send(Err(error));
        run
    }
}

impl std::fmt::Debug for ConfigRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigRun")
            .field("output", &self.output.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration automation subsystem.
#[async_trait]
pub trait Configuration: Send + Sync {
    /// Provision `hosts`.
    async fn configure(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun;

    /// Tear down what `configure` set up on `hosts`.
    async fn cleanup(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun;

    /// Upgrade the services running on `hosts`.
    async fn upgrade(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun;

    /// Replace the cluster-wide variables applied to every run.
    async fn set_globals(&self, extra_vars: &ExtraVars) -> ManagerResult<()>;

    /// Current cluster-wide variables.
    async fn globals(&self) -> ExtraVars;
}

/// Create the configuration subsystem selected in `config`.
pub fn create_configuration(config: &ConfigurationConfig) -> ManagerResult<Arc<dyn Configuration>> {
    let globals = ExtraVars::parse("configuration.extra_variables", &config.extra_variables)?;

    match config.configuration_type {
        ConfigurationType::Ansible => Ok(Arc::new(PlaybookRunner::new(
            config.ansible.clone(),
            globals,
        ))),
        ConfigurationType::Mock => Ok(Arc::new(MockConfiguration::with_globals(globals))),
    }
}

/// Log a run's output while waiting for it to complete.
///
/// Once the completion slot fires, output still buffered in the stream is
/// logged before the result is returned.
pub async fn drain_output(run: ConfigRun) -> ManagerResult<()> {
    let ConfigRun { output, mut status } = run;

    let Some(output) = output else {
        return completion(status.await);
    };

    let mut lines = BufReader::new(output).lines();
    let mut open = true;

    let result = loop {
        tokio::select! {
            result = &mut status => break completion(result),
            line = lines.next_line(), if open => match line {
                Ok(Some(line)) => info!("{line}"),
                Ok(None) => open = false,
                Err(e) => {
                    warn!(error = %e, "failed to read configuration output");
                    open = false;
                }
            },
        }
    };

    while open {
        match lines.next_line().await {
            Ok(Some(line)) => info!("{line}"),
            Ok(None) => open = false,
            Err(e) => {
                warn!(error = %e, "failed to read configuration output");
                open = false;
            }
        }
    }

    result
}

fn completion(
    result: Result<ManagerResult<()>, oneshot::error::RecvError>,
) -> ManagerResult<()> {
    result.unwrap_or_else(|_| {
        Err(ManagerError::configuration(
            "configuration run ended without reporting a result",
        ))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn output(text: &str) -> Option<ConfigOutput> {
        Some(Box::new(Cursor::new(text.as_bytes().to_vec())))
    }

    #[tokio::test]
    async fn no_output_returns_completion() {
        let run = ConfigRun::failed(ManagerError::configuration("boom"));
        assert_eq!(
            drain_output(run).await,
            Err(ManagerError::configuration("boom"))
        );
    }

    #[tokio::test]
    async fn output_is_drained_before_returning() {
        let (run, tx) = ConfigRun::new(output("line one\nline two\n"));
        tx.send(Ok(())).unwrap();
        assert_eq!(drain_output(run).await, Ok(()));
    }

    #[tokio::test]
    async fn waits_for_completion_after_output_ends() {
        let (run, tx) = ConfigRun::new(output("done\n"));
        let handle = tokio::spawn(drain_output(run));

        tokio::task::yield_now().await;
        tx.send(Err(ManagerError::configuration("exit status 2")))
            .unwrap();

        assert_eq!(
            handle.await.unwrap(),
            Err(ManagerError::configuration("exit status 2"))
        );
    }

    #[tokio::test]
    async fn dropped_sender_is_a_failure() {
        let (run, tx) = ConfigRun::new(output(""));
        drop(tx);
        let err = drain_output(run).await.unwrap_err();
        assert!(matches!(err, ManagerError::Configuration(_)));
    }

    #[test]
    fn host_config_for_node() {
        let mut host = HostConfig::for_node("host1-s1", "10.0.0.1", MASTER_GROUP);
        assert_eq!(host.var(NODE_NAME_VAR), Some("host1-s1"));
        assert_eq!(host.var(NODE_ADDR_VAR), Some("10.0.0.1"));

        host.set_group(WORKER_GROUP);
        host.set_var(MASTER_ADDR_VAR, "10.0.0.2");

        let json = serde_json::to_value(&host).unwrap();
        assert_eq!(json["inventory-name"], "host1-s1");
        assert_eq!(json["ssh-address"], "10.0.0.1");
        assert_eq!(json["host-group"], WORKER_GROUP);
        assert_eq!(json["host-vars"][MASTER_ADDR_VAR], "10.0.0.2");
    }
}
