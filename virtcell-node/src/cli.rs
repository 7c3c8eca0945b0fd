//! Command-line argument parsing.

use std::net::Ipv4Addr;

use clap::{Parser, Subcommand};

/// virtcell Node CLI - VM orchestration against a hypervisor
#[derive(Parser, Debug)]
#[command(name = "virtcell-node")]
#[command(about = "virtcell Node CLI - VM orchestration against a hypervisor")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    /// Log format (pretty, json)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Use the mock transport instead of libvirt
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Show remaining quotas, supported machine types and active networks
    Status,

    /// Create a virtual machine
    CreateMachine {
        /// Machine name
        name: String,

        /// Memory in MiB
        #[arg(long, default_value = "2048")]
        memory_mib: i64,

        /// Number of virtual CPUs
        #[arg(long, default_value = "2")]
        vcpus: u32,

        /// Architecture (validated against the hypervisor's supported set)
        #[arg(long, default_value = "x86_64")]
        arch: String,

        /// Hypervisor machine type
        #[arg(long, default_value = "pc")]
        machine_type: String,

        /// Network to attach to
        #[arg(long, default_value = "default")]
        network: String,

        /// Also create one backing disk of this many GiB
        #[arg(long)]
        disk_gib: Option<i64>,
    },

    /// Create a storage volume
    CreateStorage {
        /// Volume name
        name: String,

        /// Capacity in GiB
        #[arg(long, default_value = "20")]
        capacity_gib: i64,

        /// Image format (raw, qcow, qcow2)
        #[arg(long, default_value = "qcow2")]
        format: String,
    },

    /// Allocate leases, define the node network and print its DNAT rules
    CreateNetwork {
        /// Number of MAC/IP leases to reserve behind the gateway
        #[arg(long, default_value = "0")]
        hosts: u16,

        /// Address the lease walk starts after
        #[arg(long, default_value = "192.168.100.1")]
        base_ip: Ipv4Addr,

        /// First public HTTP port to map
        #[arg(long, default_value = "30080")]
        http_port_base: u16,

        /// First public upload-service port to map
        #[arg(long, default_value = "31080")]
        tusd_port_base: u16,
    },
}
