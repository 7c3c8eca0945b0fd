//! # virtcell Hypervisor
//!
//! Orchestration core for VM lifecycle operations against a hypervisor:
//! quota enforcement, a uniform command protocol, and collision-free
//! MAC/IP allocation for machines behind a shared gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Orchestrator                   │
//! │  validate (quota, arch) → Command → run      │
//! └──────┬───────────────┬────────────────┬──────┘
//!        │               │                │
//!        ▼               ▼                ▼
//! ┌────────────┐  ┌─────────────┐  ┌─────────────┐
//! │   Quota    │  │   Network   │  │  Transport  │
//! │ (pure fns) │  │  allocator  │  │ mock/libvirt│
//! └────────────┘  └──────┬──────┘  └─────────────┘
//!                        │
//!                        ▼
//!                ┌───────────────┐
//!                │ InventoryStore│
//!                └───────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use virtcell_hypervisor::{
//!     ConnectionUri, MemoryInventory, MockTransport, Orchestrator, OrchestratorConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = OrchestratorConfig {
//!         memory_quota_mib: 8192,
//!         storage_quota_gib: 500,
//!         hypervisor_hint: "qemu".to_string(),
//!     };
//!
//!     let orchestrator = Orchestrator::connect(
//!         config,
//!         ConnectionUri::local("qemu", "system"),
//!         Arc::new(MockTransport::new()),
//!         Arc::new(MemoryInventory::new()),
//!     )
//!     .await
//!     .unwrap();
//!
//!     println!("{} MiB free", orchestrator.remaining_memory().await);
//! }
//! ```

pub mod command;
pub mod connection;
pub mod error;
pub mod inventory;
pub mod libvirt;
pub mod mock;
pub mod network;
pub mod orchestrator;
pub mod quota;
pub mod transport;
pub mod types;

pub use command::{Command, CommandOutput, CommandRequest};
pub use connection::{Connection, ConnectionUri, SshTarget};
pub use error::{HypervisorError, Result};
pub use inventory::{
    DhcpLease, InventoryStore, MachineRecord, MemoryInventory, NetworkRecord, StorageRecord,
};
pub use mock::MockTransport;
pub use network::xml::{NetworkDescriptor, NetworkXmlBuilder};
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use transport::{Transport, TransportError, TransportResult};
pub use types::{MachineSpec, VolumeFormat, VolumeSpec};

// Re-export libvirt transport when available
#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtTransport;
