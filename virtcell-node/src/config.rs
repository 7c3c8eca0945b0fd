//! Configuration management for the node CLI.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use virtcell_hypervisor::ConnectionUri;

use crate::cli::Args;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hypervisor connection configuration
    pub hypervisor: HypervisorConfig,
    /// Tenant resource ceilings
    pub quota: QuotaConfig,
    /// Node identity and interfaces
    pub node: NodeConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config =
            serde_yaml::from_str(&content).with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if args.dev {
            self.hypervisor.dev = true;
        }
        self
    }
}

/// Hypervisor connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HypervisorConfig {
    /// Connection scheme (e.g. "qemu", "xen"); also steers MAC vendor prefixes
    pub scheme: String,
    /// Hypervisor username
    pub username: Option<String>,
    /// Hypervisor password
    pub password: Option<String>,
    /// Connect through SSH to a remote node
    pub use_ssh: bool,
    /// SSH user for remote connections
    pub ssh_user: String,
    /// Remote host for SSH connections
    pub remote_host: String,
    /// Daemon mode segment of the URI ("system" or "session")
    pub daemon_mode: String,
    /// Use the mock transport (no hypervisor required)
    pub dev: bool,
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            scheme: "qemu".to_string(),
            username: None,
            password: None,
            use_ssh: false,
            ssh_user: "root".to_string(),
            remote_host: String::new(),
            daemon_mode: "system".to_string(),
            dev: false,
        }
    }
}

impl HypervisorConfig {
    /// Build the connection URI from this configuration.
    pub fn connection_uri(&self) -> ConnectionUri {
        if self.use_ssh {
            ConnectionUri::over_ssh(
                &self.scheme,
                &self.ssh_user,
                &self.remote_host,
                &self.daemon_mode,
            )
        } else {
            ConnectionUri::local(&self.scheme, &self.daemon_mode)
        }
    }
}

/// Tenant resource ceilings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Aggregate memory quota in MiB
    pub memory_mib: i64,
    /// Aggregate storage quota in GiB
    pub storage_gib: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            memory_mib: 8192,
            storage_gib: 500,
        }
    }
}

/// Node identity and interface layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Unique node ID (auto-generated if not set)
    pub id: Option<String>,
    /// Hostname (auto-detected if not set)
    pub hostname: Option<String>,
    /// Public address DNAT rules are generated for
    pub public_ip: String,
    /// Gateway-facing interface (network forward binds here)
    pub gateway_interface: String,
    /// Bridge interface the guests sit behind
    pub bridge_interface: String,
    /// Bridge MAC address
    pub bridge_mac: String,
    /// Bridge IP address
    pub bridge_ip: String,
    /// Bridge netmask
    pub netmask: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: None,
            hostname: None,
            public_ip: "10.0.0.1".to_string(),
            gateway_interface: "eth0".to_string(),
            bridge_interface: "br0".to_string(),
            bridge_mac: "52:54:00:00:00:aa".to_string(),
            bridge_ip: "192.168.100.1".to_string(),
            netmask: "255.255.255.0".to_string(),
        }
    }
}

impl NodeConfig {
    /// Get the node ID, generating one if not set.
    pub fn get_id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }

    /// Get the hostname, detecting it if not set.
    pub fn get_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(|| {
            hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string())
        })
    }
}
