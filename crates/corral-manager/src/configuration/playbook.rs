//! Configuration through `ansible-playbook`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{ConfigRun, Configuration, HostConfig};
use crate::config::AnsibleConfig;
use crate::error::{ManagerError, ManagerResult};
use crate::extra_vars::ExtraVars;

/// Runs playbooks against a generated inventory.
///
/// Each run writes the hosts to a temporary INI inventory, passes the global
/// variables merged with the call's variables as `--extra-vars`, and streams
/// the tool's stdout back as the run output.
#[derive(Debug)]
pub struct PlaybookRunner {
    config: AnsibleConfig,
    globals: RwLock<ExtraVars>,
}

impl PlaybookRunner {
    #[must_use]
    pub fn new(config: AnsibleConfig, globals: ExtraVars) -> Self {
        Self {
            config,
            globals: RwLock::new(globals),
        }
    }

    fn run_playbook(
        &self,
        playbook: &str,
        hosts: &[HostConfig],
        extra_vars: &ExtraVars,
    ) -> ConfigRun {
        match self.spawn_playbook(playbook, hosts, extra_vars) {
            Ok(run) => run,
            Err(e) => ConfigRun::failed(e),
        }
    }

    fn spawn_playbook(
        &self,
        playbook: &str,
        hosts: &[HostConfig],
        extra_vars: &ExtraVars,
    ) -> ManagerResult<ConfigRun> {
        let mut inventory = tempfile::Builder::new()
            .prefix("corral-hosts-")
            .suffix(".ini")
            .tempfile()
            .map_err(|e| {
                ManagerError::configuration(format!("failed to create inventory: {e}"))
            })?;
        inventory
            .write_all(render_inventory(hosts).as_bytes())
            .and_then(|()| inventory.flush())
            .map_err(|e| {
                ManagerError::configuration(format!("failed to write inventory: {e}"))
            })?;

        let vars = merge_vars(&self.current_globals()?, extra_vars);
        let playbook_path = Path::new(&self.config.playbook_location).join(playbook);

        let mut cmd = Command::new(&self.config.program);
        cmd.arg("-i").arg(inventory.path());
        if !self.config.user.is_empty() {
            cmd.arg("--user").arg(&self.config.user);
        }
        if let Some(key) = &self.config.private_key_file {
            cmd.arg("--private-key").arg(key);
        }
        cmd.arg("--extra-vars")
            .arg(vars.to_string())
            .arg(&playbook_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        debug!(playbook = %playbook_path.display(), hosts = hosts.len(), "spawning playbook");
        let mut child = cmd.spawn().map_err(|e| {
            ManagerError::configuration(format!(
                "failed to spawn {}: {e}",
                self.config.program
            ))
        })?;

        let output = child
            .stdout
            .take()
            .map(|stdout| Box::new(stdout) as super::ConfigOutput);
        let (run, tx) = ConfigRun::new(output);

        let program = self.config.program.clone();
        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(ManagerError::configuration(format!(
                    "{program} exited with {status}"
                ))),
                Err(e) => Err(ManagerError::configuration(format!(
                    "failed to wait for {program}: {e}"
                ))),
            };
            // inventory file lives until the tool has exited
            drop(inventory);
            let _ = tx.send(result);
        });

        Ok(run)
    }

    fn current_globals(&self) -> ManagerResult<ExtraVars> {
        self.globals
            .read()
            .map(|g| g.clone())
            .map_err(|_| ManagerError::internal("lock poisoned"))
    }
}

#[async_trait]
impl Configuration for PlaybookRunner {
    async fn configure(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run_playbook(&self.config.configure_playbook, hosts, extra_vars)
    }

    async fn cleanup(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run_playbook(&self.config.cleanup_playbook, hosts, extra_vars)
    }

    async fn upgrade(&self, hosts: &[HostConfig], extra_vars: &ExtraVars) -> ConfigRun {
        self.run_playbook(&self.config.upgrade_playbook, hosts, extra_vars)
    }

    async fn set_globals(&self, extra_vars: &ExtraVars) -> ManagerResult<()> {
        let mut globals = self
            .globals
            .write()
            .map_err(|_| ManagerError::internal("lock poisoned"))?;
        *globals = extra_vars.clone();
        info!("global configuration variables updated");
        Ok(())
    }

    async fn globals(&self) -> ExtraVars {
        self.globals
            .read()
            .map(|g| g.clone())
            .unwrap_or_default()
    }
}

/// Render hosts as an INI inventory, one section per host group.
fn render_inventory(hosts: &[HostConfig]) -> String {
    let mut groups: BTreeMap<&str, Vec<&HostConfig>> = BTreeMap::new();
    for host in hosts {
        groups.entry(host.group()).or_default().push(host);
    }

    let mut out = String::new();
    for (group, hosts) in groups {
        let _ = writeln!(out, "[{group}]");
        for host in hosts {
            let _ = write!(out, "{} ansible_ssh_host={}", host.tag(), host.ssh_address());
            for (name, value) in host.vars() {
                let _ = write!(out, " {name}={value:?}");
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

/// Merge the call's variables over the globals. Top-level keys of the call win.
fn merge_vars(globals: &ExtraVars, extra_vars: &ExtraVars) -> serde_json::Value {
    let serde_json::Value::Object(overrides) = extra_vars.to_value() else {
        return extra_vars.to_value();
    };

    let mut merged = globals.to_value();
    if let Some(base) = merged.as_object_mut() {
        base.extend(overrides);
        return merged;
    }

    if overrides.is_empty() {
        merged
    } else {
        serde_json::Value::Object(overrides)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::configuration::{drain_output, MASTER_GROUP, WORKER_GROUP};

    fn runner(program: &str) -> PlaybookRunner {
        let config = AnsibleConfig {
            program: program.to_owned(),
            ..AnsibleConfig::default()
        };
        PlaybookRunner::new(config, ExtraVars::default())
    }

    #[test]
    fn inventory_groups_hosts() {
        let hosts = [
            HostConfig::for_node("host2-s2", "10.0.0.2", WORKER_GROUP),
            HostConfig::for_node("host1-s1", "10.0.0.1", MASTER_GROUP),
        ];

        let ini = render_inventory(&hosts);

        assert_eq!(
            ini,
            "[service-master]\n\
             host1-s1 ansible_ssh_host=10.0.0.1 node_addr=\"10.0.0.1\" node_name=\"host1-s1\"\n\
             \n\
             [service-worker]\n\
             host2-s2 ansible_ssh_host=10.0.0.2 node_addr=\"10.0.0.2\" node_name=\"host2-s2\"\n\
             \n"
        );
    }

    #[test]
    fn call_vars_override_globals() {
        let globals = ExtraVars::parse("globals", r#"{"env": "prod", "proxy": "p"}"#).unwrap();
        let call = ExtraVars::parse("call", r#"{"env": "dev"}"#).unwrap();

        let merged = merge_vars(&globals, &call);

        assert_eq!(merged["env"], "dev");
        assert_eq!(merged["proxy"], "p");
    }

    #[tokio::test]
    async fn globals_round_trip() {
        let runner = runner("ansible-playbook");
        let vars = ExtraVars::parse("globals", r#"{"a": 1}"#).unwrap();

        runner.set_globals(&vars).await.unwrap();

        assert_eq!(runner.globals().await, vars);
    }

    #[tokio::test]
    async fn missing_program_fails_the_run() {
        let runner = runner("corral-test-no-such-program");

        let run = runner.configure(&[], &ExtraVars::default()).await;
        let err = drain_output(run).await.unwrap_err();

        assert!(err.to_string().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exit_status_feeds_completion() {
        let ok = runner("true");
        assert_eq!(
            drain_output(ok.configure(&[], &ExtraVars::default()).await).await,
            Ok(())
        );

        let failing = runner("false");
        let err = drain_output(failing.cleanup(&[], &ExtraVars::default()).await)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }
}
