//! Orchestrator facade.
//!
//! Ties the session together: validates a request against quota and the
//! connection's capability set, then builds and runs the matching command.
//! Rejected requests never reach the hypervisor, so no partial state is
//! created for them.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::command::{Command, CommandOutput, CommandRequest};
use crate::connection::{Connection, ConnectionUri};
use crate::error::{HypervisorError, Result};
use crate::inventory::{DhcpLease, InventoryStore};
use crate::network;
use crate::network::xml::NetworkDescriptor;
use crate::quota;
use crate::transport::Transport;
use crate::types::{MachineSpec, VolumeSpec};

/// Ceilings applied across all live resources of the session's tenant.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Aggregate memory quota in MiB
    pub memory_quota_mib: i64,
    /// Aggregate storage quota in GiB
    pub storage_quota_gib: i64,
    /// Hypervisor hint steering MAC vendor prefixes (e.g. "qemu", "xen")
    pub hypervisor_hint: String,
}

/// One orchestration session: a connection, the tenant's quotas, and the
/// inventory store the session reads its snapshots from.
///
/// The connection is serialized; commands run one at a time from the
/// caller's point of view. The supported machine-type set is captured once
/// at session start.
pub struct Orchestrator {
    config: OrchestratorConfig,
    connection: Connection,
    machine_types: Vec<String>,
    store: Arc<dyn InventoryStore>,
}

impl Orchestrator {
    /// Open a session and capture the hypervisor's machine-type set.
    pub async fn connect(
        config: OrchestratorConfig,
        uri: ConnectionUri,
        transport: Arc<dyn Transport>,
        store: Arc<dyn InventoryStore>,
    ) -> Result<Self> {
        let connection = Connection::open(uri, transport).await?;

        let machine_types = connection
            .transport()
            .machine_types()
            .await
            .map_err(|cause| HypervisorError::OperationFailed {
                operation: "MachineTypes",
                cause,
            })?;

        info!(
            machine_types = machine_types.len(),
            memory_quota_mib = config.memory_quota_mib,
            storage_quota_gib = config.storage_quota_gib,
            "Orchestrator session ready"
        );

        Ok(Self {
            config,
            connection,
            machine_types,
            store,
        })
    }

    /// The machine types the connected hypervisor reports as supported.
    pub fn machine_types(&self) -> &[String] {
        &self.machine_types
    }

    /// Memory available for new machines, in MiB.
    pub async fn remaining_memory(&self) -> i64 {
        let used = self.store.machine_memory_mib().await;
        quota::remaining_memory(self.config.memory_quota_mib, used)
    }

    /// Storage available for new volumes, in GiB.
    pub async fn remaining_storage(&self) -> i64 {
        let used = self.store.storage_size_gib().await;
        quota::remaining_storage(self.config.storage_quota_gib, used)
    }

    /// Validate and create a machine.
    ///
    /// Memory quota first, then architecture; a command is only built once
    /// both pass.
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    pub async fn create_machine(&self, spec: MachineSpec) -> Result<CommandOutput> {
        let remaining = self.remaining_memory().await;
        quota::validate_memory_request(spec.memory_mib, self.config.memory_quota_mib, remaining)?;
        quota::validate_architecture(&spec.arch, &self.machine_types)?;

        Command::new(CommandRequest::CreateMachine(spec), &self.connection)
            .run()
            .await
    }

    /// Validate and create a storage volume.
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    pub async fn create_storage(&self, spec: VolumeSpec) -> Result<CommandOutput> {
        let remaining = self.remaining_storage().await;
        quota::validate_storage_request(
            spec.capacity_gib,
            self.config.storage_quota_gib,
            remaining,
        )?;

        Command::new(CommandRequest::CreateStorage(spec), &self.connection)
            .run()
            .await
    }

    /// Define a virtual network from a descriptor.
    #[instrument(skip(self, descriptor), fields(bridge = %descriptor.bridge_name))]
    pub async fn create_network(&self, descriptor: NetworkDescriptor) -> Result<CommandOutput> {
        Command::new(CommandRequest::CreateNetwork(descriptor), &self.connection)
            .run()
            .await
    }

    /// Names of the networks currently active on the node.
    pub async fn active_networks(&self) -> Result<CommandOutput> {
        Command::new(CommandRequest::ActiveNetworks, &self.connection)
            .run()
            .await
    }

    /// Draw the oldest pre-provisioned lease for a node.
    pub async fn free_lease(&self, node_id: &str) -> Option<DhcpLease> {
        network::free_lease_for_node(node_id, self.store.as_ref()).await
    }

    /// Generate and reserve a fresh MAC/IP lease for a node.
    #[instrument(skip(self))]
    pub async fn allocate_lease(
        &self,
        node_id: &str,
        name: &str,
        after_ip: Ipv4Addr,
        http_port: u16,
        tusd_port: u16,
    ) -> Result<DhcpLease> {
        network::allocate_lease(
            &self.config.hypervisor_hint,
            node_id,
            name,
            after_ip,
            http_port,
            tusd_port,
            self.store.as_ref(),
        )
        .await
    }
}
