//! Configuration for corral-manager.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{ManagerError, ManagerResult};
use crate::monitor::MonitorNode;

/// Top-level configuration for the manager service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ManagerConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Event processing configuration.
    #[serde(default)]
    pub manager: ProcessorConfig,

    /// Presence monitoring configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Configuration automation settings.
    #[serde(default)]
    pub configuration: ConfigurationConfig,
}

impl ManagerConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default values
    /// 2. `corral.toml` in the current directory (if present)
    /// 3. Environment variables with `CORRAL_` prefix
    pub fn load() -> ManagerResult<Self> {
        Self::from_file("corral.toml")
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> ManagerResult<Self> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("CORRAL_").split("__"))
            .extract()
            .map_err(|e| ManagerError::Config(e.to_string()))
    }

    /// Load configuration from a file that must exist, such as one named on
    /// the command line.
    pub fn from_required_file(path: impl AsRef<std::path::Path>) -> ManagerResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ManagerError::Config(format!(
                "config file {} not found",
                path.display()
            )));
        }
        Self::from_file(path)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the API listens on.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9876)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Event processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Capacity of the event queue. Producers wait while it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_queue_capacity() -> usize {
    100
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Presence monitoring configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorConfig {
    /// Nodes announced as discovered when the monitor starts.
    #[serde(default)]
    pub nodes: Vec<MonitorNode>,
}

/// Configuration automation settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigurationConfig {
    /// Which implementation to use.
    #[serde(default)]
    pub configuration_type: ConfigurationType,

    /// Default cluster-wide variables, as JSON text.
    #[serde(default)]
    pub extra_variables: String,

    /// Playbook runner settings.
    #[serde(default)]
    pub ansible: AnsibleConfig,
}

/// Type of configuration subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationType {
    /// Runs `ansible-playbook`.
    #[default]
    Ansible,

    /// Mock configuration for testing.
    Mock,
}

/// Playbook runner settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnsibleConfig {
    /// Directory holding the playbooks.
    #[serde(default = "default_playbook_location")]
    pub playbook_location: String,

    #[serde(default = "default_configure_playbook")]
    pub configure_playbook: String,

    #[serde(default = "default_cleanup_playbook")]
    pub cleanup_playbook: String,

    #[serde(default = "default_upgrade_playbook")]
    pub upgrade_playbook: String,

    /// Remote user. Empty leaves the tool's default.
    #[serde(default)]
    pub user: String,

    /// SSH private key used to reach the hosts.
    pub private_key_file: Option<String>,

    /// Executable to run.
    #[serde(default = "default_program")]
    pub program: String,
}

fn default_playbook_location() -> String {
    "/etc/corral/ansible".to_owned()
}

fn default_configure_playbook() -> String {
    "site.yml".to_owned()
}

fn default_cleanup_playbook() -> String {
    "cleanup.yml".to_owned()
}

fn default_upgrade_playbook() -> String {
    "rolling-upgrade.yml".to_owned()
}

fn default_program() -> String {
    "ansible-playbook".to_owned()
}

impl Default for AnsibleConfig {
    fn default() -> Self {
        Self {
            playbook_location: default_playbook_location(),
            configure_playbook: default_configure_playbook(),
            cleanup_playbook: default_cleanup_playbook(),
            upgrade_playbook: default_upgrade_playbook(),
            user: String::new(),
            private_key_file: None,
            program: default_program(),
        }
    }
}
