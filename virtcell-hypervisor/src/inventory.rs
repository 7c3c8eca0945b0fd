//! Inventory boundary.
//!
//! The live Machine/Storage/Network/lease records belong to an external
//! store; the core only queries snapshots of it and proposes values for the
//! orchestrator to persist. [`InventoryStore`] is that boundary.
//!
//! Address uniqueness cannot be guaranteed by a read followed by a write:
//! two concurrent allocations can both observe the same "free" address. The
//! store therefore exposes a single atomic [`reserve_lease`] primitive that
//! checks and inserts under one critical section per network scope, and
//! callers retry on [`HypervisorError::AddressConflict`].
//!
//! [`reserve_lease`]: InventoryStore::reserve_lease

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{HypervisorError, Result};

/// A live machine record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineRecord {
    pub id: String,
    pub name: String,
    /// Allocated memory in MiB
    pub size_mib: i64,
}

/// A live storage volume record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRecord {
    pub id: String,
    pub name: String,
    /// Allocated capacity in GiB
    pub size_gib: i64,
}

/// A live virtual network record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    /// Bridge MAC address
    pub mac: String,
    /// Bridge IP address
    pub ip: String,
}

/// One reserved MAC/IP (+ service ports) binding for a node.
///
/// Within a network scope no two leases share a mac or an ip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DhcpLease {
    pub id: String,
    pub mac: String,
    pub ip: String,
    /// Guest name the reservation belongs to
    pub name: String,
    /// Public port forwarded to the guest's HTTP service
    pub http_port: u16,
    /// Public port forwarded to the guest's upload service
    pub tusd_port: u16,
    /// Node the lease is scoped to
    pub node_id: String,
    /// Whether the lease is currently bound to a machine
    pub assigned: bool,
    pub created_at: DateTime<Utc>,
}

impl DhcpLease {
    /// Build an unassigned lease for a node.
    pub fn new(
        node_id: impl Into<String>,
        name: impl Into<String>,
        mac: impl Into<String>,
        ip: impl Into<String>,
        http_port: u16,
        tusd_port: u16,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            mac: mac.into(),
            ip: ip.into(),
            name: name.into(),
            http_port,
            tusd_port,
            node_id: node_id.into(),
            assigned: false,
            created_at: Utc::now(),
        }
    }
}

/// Query/reservation surface the core expects from the external store.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Sum of `size_mib` over all live machine records.
    async fn machine_memory_mib(&self) -> i64;

    /// Sum of `size_gib` over all live storage records.
    async fn storage_size_gib(&self) -> i64;

    /// Whether a MAC appears on any network record or lease.
    async fn mac_in_use(&self, mac: &str) -> bool;

    /// Whether an IP appears on any network record or lease.
    async fn ip_in_use(&self, ip: &str) -> bool;

    /// The oldest unassigned lease for a node (creation order, ascending),
    /// or `None` when the node's pool is empty.
    async fn oldest_free_lease(&self, node_id: &str) -> Option<DhcpLease>;

    /// Atomically check mac/ip uniqueness and insert the lease.
    ///
    /// Returns [`HypervisorError::AddressConflict`] when either value is
    /// already reserved; the check and the insert happen under one lock so
    /// concurrent callers cannot both win the same address.
    async fn reserve_lease(&self, lease: DhcpLease) -> Result<DhcpLease>;
}

/// In-memory inventory, the reference store implementation.
///
/// Backs tests and dev mode; a production deployment supplies a database
/// store enforcing the same uniqueness with column constraints.
#[derive(Default)]
pub struct MemoryInventory {
    inner: RwLock<Records>,
}

#[derive(Default)]
struct Records {
    machines: Vec<MachineRecord>,
    storages: Vec<StorageRecord>,
    networks: Vec<NetworkRecord>,
    leases: Vec<DhcpLease>,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_machine(&self, record: MachineRecord) {
        self.inner.write().await.machines.push(record);
    }

    pub async fn add_storage(&self, record: StorageRecord) {
        self.inner.write().await.storages.push(record);
    }

    pub async fn add_network(&self, record: NetworkRecord) {
        self.inner.write().await.networks.push(record);
    }

    /// Number of leases currently held. Test/diagnostic helper.
    pub async fn lease_count(&self) -> usize {
        self.inner.read().await.leases.len()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn machine_memory_mib(&self) -> i64 {
        let records = self.inner.read().await;
        records.machines.iter().map(|m| m.size_mib).sum()
    }

    async fn storage_size_gib(&self) -> i64 {
        let records = self.inner.read().await;
        records.storages.iter().map(|s| s.size_gib).sum()
    }

    async fn mac_in_use(&self, mac: &str) -> bool {
        let records = self.inner.read().await;
        records.networks.iter().any(|n| n.mac == mac)
            || records.leases.iter().any(|l| l.mac == mac)
    }

    async fn ip_in_use(&self, ip: &str) -> bool {
        let records = self.inner.read().await;
        records.networks.iter().any(|n| n.ip == ip) || records.leases.iter().any(|l| l.ip == ip)
    }

    async fn oldest_free_lease(&self, node_id: &str) -> Option<DhcpLease> {
        let records = self.inner.read().await;
        records
            .leases
            .iter()
            .filter(|l| l.node_id == node_id && !l.assigned)
            .min_by_key(|l| l.created_at)
            .cloned()
    }

    async fn reserve_lease(&self, lease: DhcpLease) -> Result<DhcpLease> {
        // Single write lock covers the uniqueness check and the insert.
        let mut records = self.inner.write().await;

        let mac_taken = records.networks.iter().any(|n| n.mac == lease.mac)
            || records.leases.iter().any(|l| l.mac == lease.mac);
        let ip_taken = records.networks.iter().any(|n| n.ip == lease.ip)
            || records.leases.iter().any(|l| l.ip == lease.ip);

        if mac_taken || ip_taken {
            return Err(HypervisorError::AddressConflict {
                mac: lease.mac,
                ip: lease.ip,
            });
        }

        debug!(mac = %lease.mac, ip = %lease.ip, node = %lease.node_id, "Lease reserved");
        records.leases.push(lease.clone());
        Ok(lease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn lease(node: &str, name: &str, mac: &str, ip: &str) -> DhcpLease {
        DhcpLease::new(node, name, mac, ip, 8080, 8081)
    }

    #[tokio::test]
    async fn sums_cover_all_records() {
        let store = MemoryInventory::new();
        store
            .add_machine(MachineRecord {
                id: "m1".into(),
                name: "web".into(),
                size_mib: 2048,
            })
            .await;
        store
            .add_machine(MachineRecord {
                id: "m2".into(),
                name: "db".into(),
                size_mib: 4096,
            })
            .await;
        store
            .add_storage(StorageRecord {
                id: "s1".into(),
                name: "web-disk".into(),
                size_gib: 40,
            })
            .await;

        assert_eq!(store.machine_memory_mib().await, 6144);
        assert_eq!(store.storage_size_gib().await, 40);
    }

    #[tokio::test]
    async fn mac_lookup_spans_networks_and_leases() {
        let store = MemoryInventory::new();
        store
            .add_network(NetworkRecord {
                id: "n1".into(),
                name: "default".into(),
                mac: "52:54:00:aa:bb:cc".into(),
                ip: "192.168.100.1".into(),
            })
            .await;
        store
            .reserve_lease(lease("node-1", "guest", "52:54:00:11:22:33", "192.168.100.2"))
            .await
            .unwrap();

        assert!(store.mac_in_use("52:54:00:aa:bb:cc").await);
        assert!(store.mac_in_use("52:54:00:11:22:33").await);
        assert!(!store.mac_in_use("52:54:00:00:00:01").await);
        assert!(store.ip_in_use("192.168.100.1").await);
        assert!(!store.ip_in_use("192.168.100.9").await);
    }

    #[tokio::test]
    async fn reserve_rejects_duplicate_mac_or_ip() {
        let store = MemoryInventory::new();
        store
            .reserve_lease(lease("node-1", "a", "52:54:00:11:22:33", "192.168.100.2"))
            .await
            .unwrap();

        let dup_mac = store
            .reserve_lease(lease("node-1", "b", "52:54:00:11:22:33", "192.168.100.3"))
            .await;
        assert!(matches!(
            dup_mac,
            Err(HypervisorError::AddressConflict { .. })
        ));

        let dup_ip = store
            .reserve_lease(lease("node-1", "c", "52:54:00:44:55:66", "192.168.100.2"))
            .await;
        assert!(matches!(
            dup_ip,
            Err(HypervisorError::AddressConflict { .. })
        ));

        assert_eq!(store.lease_count().await, 1);
    }

    #[tokio::test]
    async fn oldest_free_lease_draws_in_creation_order() {
        let store = MemoryInventory::new();

        let mut first = lease("node-1", "a", "52:54:00:00:00:01", "192.168.100.2");
        first.created_at = Utc::now() - Duration::minutes(10);
        let mut second = lease("node-1", "b", "52:54:00:00:00:02", "192.168.100.3");
        second.created_at = Utc::now() - Duration::minutes(5);
        let mut assigned = lease("node-1", "c", "52:54:00:00:00:03", "192.168.100.4");
        assigned.created_at = Utc::now() - Duration::minutes(20);
        assigned.assigned = true;

        store.reserve_lease(second).await.unwrap();
        store.reserve_lease(first).await.unwrap();
        store.reserve_lease(assigned).await.unwrap();

        // Oldest unassigned wins, even though it was inserted second
        let drawn = store.oldest_free_lease("node-1").await.unwrap();
        assert_eq!(drawn.name, "a");

        // Other nodes see nothing
        assert!(store.oldest_free_lease("node-2").await.is_none());
    }
}
