//! Uniform command protocol for hypervisor operations.
//!
//! Every operation the orchestrator dispatches is the same shape: a named
//! request bound to an open connection, executed with `run`. Callers handle
//! every resource kind identically instead of branching per resource.

use tracing::{debug, instrument};

use crate::connection::Connection;
use crate::error::{HypervisorError, Result};
use crate::network::xml::{NetworkDescriptor, NetworkXmlBuilder};
use crate::types::{MachineSpec, VolumeSpec};

/// The operation a command performs, with its bound arguments.
#[derive(Debug, Clone)]
pub enum CommandRequest {
    /// Define a new machine on the node.
    CreateMachine(MachineSpec),
    /// Create a storage volume.
    CreateStorage(VolumeSpec),
    /// Define a virtual network from a descriptor.
    CreateNetwork(NetworkDescriptor),
    /// Query the names of the node's active networks.
    ActiveNetworks,
}

impl CommandRequest {
    /// The operation name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            CommandRequest::CreateMachine(_) => "CreateMachine",
            CommandRequest::CreateStorage(_) => "CreateStorage",
            CommandRequest::CreateNetwork(_) => "CreateNetwork",
            CommandRequest::ActiveNetworks => "NodeNetworkGetActive",
        }
    }
}

/// Raw hypervisor response, opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// UUID of a defined machine
    Domain(String),
    /// Key of a created volume
    Volume(String),
    /// Name of a defined network
    Network(String),
    /// Names of the active networks
    ActiveNetworks(Vec<String>),
}

/// A request bound to an open connection.
///
/// Immutable after construction. `run` performs exactly one hypervisor call;
/// side effects live entirely inside that call. Commands never retry —
/// creation calls are not idempotent, so retry policy belongs to the caller.
pub struct Command<'c> {
    request: CommandRequest,
    connection: &'c Connection,
}

impl<'c> Command<'c> {
    /// Bind a request to a connection.
    pub fn new(request: CommandRequest, connection: &'c Connection) -> Self {
        Self {
            request,
            connection,
        }
    }

    /// The operation name.
    pub fn name(&self) -> &'static str {
        self.request.name()
    }

    /// Execute the command.
    ///
    /// Transport failures are wrapped as
    /// [`HypervisorError::OperationFailed`] with the operation name attached.
    #[instrument(skip(self), fields(operation = self.name()))]
    pub async fn run(&self) -> Result<CommandOutput> {
        debug!("Dispatching command");

        let transport = self.connection.transport();
        let operation = self.name();

        let output = match &self.request {
            CommandRequest::CreateMachine(spec) => transport
                .define_domain(spec)
                .await
                .map(CommandOutput::Domain),
            CommandRequest::CreateStorage(spec) => transport
                .create_volume(spec)
                .await
                .map(CommandOutput::Volume),
            CommandRequest::CreateNetwork(descriptor) => {
                let xml = NetworkXmlBuilder::new(descriptor).build();
                transport
                    .define_network(&xml)
                    .await
                    .map(CommandOutput::Network)
            }
            CommandRequest::ActiveNetworks => transport
                .active_networks()
                .await
                .map(CommandOutput::ActiveNetworks),
        };

        output.map_err(|cause| HypervisorError::OperationFailed { operation, cause })
    }
}
