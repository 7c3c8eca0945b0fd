//! Error types for the orchestration core.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised by the orchestration core.
///
/// Every variant carries the context a caller needs to render a precise
/// message or branch programmatically. Validation variants are raised before
/// any command touches the hypervisor; `OperationFailed` is the only variant
/// produced after a command runs.
#[derive(Error, Debug)]
pub enum HypervisorError {
    /// No active hypervisor connection.
    #[error("no active hypervisor connection")]
    NoConnection,

    /// Requested memory cannot be satisfied under the configured quota.
    #[error("cannot allocate {requested} MiB of memory (quota {quota} MiB, {remaining} MiB free)")]
    ImpossibleMemoryAllocation {
        requested: i64,
        quota: i64,
        remaining: i64,
    },

    /// Requested storage cannot be satisfied under the configured quota.
    #[error("cannot allocate {requested} GiB of storage (quota {quota} GiB, {remaining} GiB free)")]
    ImpossibleStorageAllocation {
        requested: i64,
        quota: i64,
        remaining: i64,
    },

    /// The requested architecture is not in the hypervisor's supported set.
    #[error("architecture {requested:?} is not supported (supported: {supported:?})")]
    InvalidArchitecture {
        requested: String,
        supported: Vec<String>,
    },

    /// Address generation hit the retry bound without finding a free value.
    #[error("address space exhausted after {attempts} attempts")]
    AddressSpaceExhausted { attempts: u32 },

    /// A proposed MAC/IP pair collided with an existing reservation.
    #[error("address conflict: mac {mac} / ip {ip} already reserved")]
    AddressConflict { mac: String, ip: String },

    /// A hypervisor operation failed after dispatch.
    #[error("hypervisor operation {operation} failed")]
    OperationFailed {
        operation: &'static str,
        #[source]
        cause: TransportError,
    },
}

/// Result type alias for orchestration operations.
pub type Result<T> = std::result::Result<T, HypervisorError>;
