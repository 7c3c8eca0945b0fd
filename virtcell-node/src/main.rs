//! # virtcell Node CLI
//!
//! Orchestrates VM lifecycle operations against the node's hypervisor:
//! machine and volume creation under tenant quotas, and virtual network
//! definition with collision-free MAC/IP leases behind the shared gateway.
//!
//! ## Usage
//! ```bash
//! virtcell-node --config /etc/virtcell/node.yaml status
//! virtcell-node --dev create-machine web-1 --memory-mib 2048
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;

use cli::{Args, CliCommand};
use config::Config;
use virtcell_common::LogFormat;
use virtcell_hypervisor::{
    CommandOutput, MachineSpec, MemoryInventory, MockTransport, NetworkDescriptor, Orchestrator,
    OrchestratorConfig, Transport, VolumeFormat, VolumeSpec,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    virtcell_common::init_logging(&args.log_level, LogFormat::parse(&args.log_format))?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => {
            // Explicit config file provided
            match Config::load(config_path) {
                Ok(cfg) => {
                    info!(config_path = %config_path, "Configuration loaded");
                    cfg.with_cli_overrides(&args)
                }
                Err(e) => {
                    error!(error = %e, path = %config_path, "Failed to load configuration");
                    return Err(e);
                }
            }
        }
        None => {
            // Try default location, fall back to CLI-only config
            let default_path = "/etc/virtcell/node.yaml";
            match Config::load(default_path) {
                Ok(cfg) => {
                    info!(config_path = %default_path, "Configuration loaded from default location");
                    cfg.with_cli_overrides(&args)
                }
                Err(_) => {
                    info!("No config file found, using CLI arguments and defaults");
                    Config::default().with_cli_overrides(&args)
                }
            }
        }
    };

    let uri = config.hypervisor.connection_uri();
    info!(uri = %uri, dev = config.hypervisor.dev, "Node CLI configured");

    let transport: Arc<dyn Transport> = if config.hypervisor.dev {
        Arc::new(MockTransport::new())
    } else {
        connect_libvirt(&uri.to_string())?
    };

    let orchestrator = Orchestrator::connect(
        OrchestratorConfig {
            memory_quota_mib: config.quota.memory_mib,
            storage_quota_gib: config.quota.storage_gib,
            hypervisor_hint: config.hypervisor.scheme.clone(),
        },
        uri,
        transport,
        Arc::new(MemoryInventory::new()),
    )
    .await?;

    run_command(&args.command, &config, &orchestrator).await
}

#[cfg(feature = "libvirt")]
fn connect_libvirt(uri: &str) -> Result<Arc<dyn Transport>> {
    let transport = virtcell_hypervisor::LibvirtTransport::connect(uri)?;
    Ok(Arc::new(transport))
}

#[cfg(not(feature = "libvirt"))]
fn connect_libvirt(_uri: &str) -> Result<Arc<dyn Transport>> {
    anyhow::bail!("built without libvirt support; use --dev for the mock transport")
}

async fn run_command(
    command: &CliCommand,
    config: &Config,
    orchestrator: &Orchestrator,
) -> Result<()> {
    match command {
        CliCommand::Status => {
            println!("remaining memory:  {} MiB", orchestrator.remaining_memory().await);
            println!("remaining storage: {} GiB", orchestrator.remaining_storage().await);
            println!("machine types:     {}", orchestrator.machine_types().join(", "));

            if let CommandOutput::ActiveNetworks(networks) = orchestrator.active_networks().await? {
                println!("active networks:   {}", networks.join(", "));
            }
        }

        CliCommand::CreateMachine {
            name,
            memory_mib,
            vcpus,
            arch,
            machine_type,
            network,
            disk_gib,
        } => {
            let volumes = match disk_gib {
                Some(gib) => vec![VolumeSpec {
                    name: format!("{name}-disk"),
                    format: VolumeFormat::Qcow2,
                    capacity_gib: *gib,
                }],
                None => Vec::new(),
            };

            let output = orchestrator
                .create_machine(MachineSpec {
                    name: name.clone(),
                    machine_type: machine_type.clone(),
                    arch: arch.clone(),
                    memory_mib: *memory_mib,
                    vcpus: *vcpus,
                    volumes,
                    network: network.clone(),
                })
                .await?;

            if let CommandOutput::Domain(uuid) = output {
                println!("machine defined: {uuid}");
            }
        }

        CliCommand::CreateStorage {
            name,
            capacity_gib,
            format,
        } => {
            let format = VolumeFormat::parse(format)
                .ok_or_else(|| anyhow::anyhow!("unsupported image format: {format}"))?;

            let output = orchestrator
                .create_storage(VolumeSpec {
                    name: name.clone(),
                    format,
                    capacity_gib: *capacity_gib,
                })
                .await?;

            if let CommandOutput::Volume(key) = output {
                println!("volume created: {key}");
            }
        }

        CliCommand::CreateNetwork {
            hosts,
            base_ip,
            http_port_base,
            tusd_port_base,
        } => {
            let node_id = config.node.get_id();
            let hostname = config.node.get_hostname();

            let mut leases = Vec::new();
            for i in 0..*hosts {
                let lease = orchestrator
                    .allocate_lease(
                        &node_id,
                        &format!("{hostname}-guest-{i}"),
                        *base_ip,
                        http_port_base + i,
                        tusd_port_base + i,
                    )
                    .await?;
                leases.push(lease);
            }

            let output = orchestrator
                .create_network(NetworkDescriptor {
                    forward_dev: config.node.gateway_interface.clone(),
                    bridge_name: config.node.bridge_interface.clone(),
                    bridge_mac: config.node.bridge_mac.clone(),
                    bridge_ip: config.node.bridge_ip.clone(),
                    netmask: config.node.netmask.clone(),
                    hosts: leases.clone(),
                })
                .await?;

            if let CommandOutput::Network(name) = output {
                println!("network defined: {name}");
            }

            for rule in virtcell_hypervisor::network::dnat_rules(
                &config.node.public_ip,
                &config.node.gateway_interface,
                &leases,
            ) {
                println!("{rule}");
            }
        }
    }

    Ok(())
}
