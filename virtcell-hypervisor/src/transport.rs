//! Transport boundary to the hypervisor.
//!
//! The hypervisor client itself is an external collaborator: the core only
//! sees this trait. Implementations own the wire protocol, timeouts and
//! cancellation; the core propagates whatever they report.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{MachineSpec, VolumeSpec};

/// Failure reported by a transport call.
///
/// The core never interprets the message; it wraps the error with the
/// originating operation name and hands it to the caller.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result type for transport calls.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// One authenticated session to a hypervisor.
///
/// Each method maps to exactly one hypervisor call. Creation calls are not
/// idempotent; callers must not retry them blindly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Define a new machine. Returns the hypervisor-assigned UUID.
    async fn define_domain(&self, spec: &MachineSpec) -> TransportResult<String>;

    /// Create a storage volume. Returns the hypervisor's volume key.
    async fn create_volume(&self, spec: &VolumeSpec) -> TransportResult<String>;

    /// Define a virtual network from a serialized descriptor document.
    /// Returns the network name.
    async fn define_network(&self, xml: &str) -> TransportResult<String>;

    /// Names of the networks currently active on the node.
    async fn active_networks(&self) -> TransportResult<Vec<String>>;

    /// The machine-type/architecture set this hypervisor supports.
    ///
    /// Implementations strip any trailing NUL bytes the C API leaves on
    /// each entry.
    async fn machine_types(&self) -> TransportResult<Vec<String>>;

    /// Whether the underlying session is still usable.
    async fn is_alive(&self) -> bool;
}
