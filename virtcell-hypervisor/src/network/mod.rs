//! Network identity allocation.
//!
//! Generates collision-free MAC/IP pairs for machines placed behind a shared
//! gateway, draws pre-provisioned leases from the node pool, and produces the
//! DNAT forwarding rules for port-mapped guest services. The allocator keeps
//! no state of its own: every call is a function of the inventory snapshot
//! and its arguments, plus bounded pseudo-random draws.

pub mod xml;

use std::collections::HashSet;
use std::net::Ipv4Addr;

use rand::Rng;
use tracing::{debug, instrument};

use crate::error::{HypervisorError, Result};
use crate::inventory::{DhcpLease, InventoryStore};

/// Retry bound for MAC/IP generation. Hitting it surfaces
/// [`HypervisorError::AddressSpaceExhausted`] instead of looping forever.
pub const MAX_ADDRESS_ATTEMPTS: u32 = 32;

/// Vendor OUI prefix for a hypervisor hint.
///
/// Known hints get their conventional prefix; anything else gets three
/// pseudo-random bytes.
fn mac_prefix(hypervisor: &str, rng: &mut impl Rng) -> String {
    match hypervisor {
        "qemu" => "52:54:00".to_string(),
        "xen" => "00:16:3e".to_string(),
        _ => format!(
            "{:02x}:{:02x}:{:02x}",
            rng.gen::<u8>(),
            rng.gen::<u8>(),
            rng.gen::<u8>()
        ),
    }
}

/// Generate a random MAC address for the given hypervisor hint.
///
/// Six two-digit lowercase hex groups: the vendor prefix plus three
/// pseudo-random bytes.
pub fn random_mac(hypervisor: &str) -> String {
    let mut rng = rand::thread_rng();
    let prefix = mac_prefix(hypervisor, &mut rng);
    format!(
        "{}:{:02x}:{:02x}:{:02x}",
        prefix,
        rng.gen::<u8>(),
        rng.gen::<u8>(),
        rng.gen::<u8>()
    )
}

/// Generate a MAC address absent from every network record and lease.
///
/// Bounded: after [`MAX_ADDRESS_ATTEMPTS`] colliding draws the address space
/// is reported exhausted.
#[instrument(skip(store))]
pub async fn generate_unused_mac(hypervisor: &str, store: &dyn InventoryStore) -> Result<String> {
    for attempt in 0..MAX_ADDRESS_ATTEMPTS {
        let candidate = random_mac(hypervisor);
        if !store.mac_in_use(&candidate).await {
            debug!(mac = %candidate, attempt, "Generated unused MAC");
            return Ok(candidate);
        }
    }
    Err(HypervisorError::AddressSpaceExhausted {
        attempts: MAX_ADDRESS_ATTEMPTS,
    })
}

/// Generate an unused MAC that is also absent from a caller-supplied set.
///
/// The extra exclusion covers addresses picked earlier in the same batch but
/// not yet written back to the store.
#[instrument(skip(used, store))]
pub async fn free_mac_avoiding(
    hypervisor: &str,
    used: &HashSet<String>,
    store: &dyn InventoryStore,
) -> Result<String> {
    for _ in 0..MAX_ADDRESS_ATTEMPTS {
        let candidate = random_mac(hypervisor);
        if used.contains(&candidate) {
            continue;
        }
        if !store.mac_in_use(&candidate).await {
            return Ok(candidate);
        }
    }
    Err(HypervisorError::AddressSpaceExhausted {
        attempts: MAX_ADDRESS_ATTEMPTS,
    })
}

/// Whether an address is usable as a host address.
///
/// The last octet must lie strictly between 0 and 255: network and broadcast
/// addresses of /24-style blocks are excluded. Other prefix lengths are
/// deliberately not considered.
pub fn is_usable(ip: Ipv4Addr) -> bool {
    let last = ip.octets()[3];
    last > 0 && last < 255
}

/// The next usable address after `ip`.
///
/// Increments the address as a 32-bit integer, skipping values whose last
/// octet is 0 or 255.
pub fn next_ip_after(ip: Ipv4Addr) -> Ipv4Addr {
    let mut value = u32::from(ip);
    loop {
        value = value.wrapping_add(1);
        let candidate = Ipv4Addr::from(value);
        if is_usable(candidate) {
            return candidate;
        }
    }
}

/// The next usable address after `ip` that the inventory does not know.
///
/// Walks [`next_ip_after`] with the same attempt bound as MAC generation.
pub async fn next_free_ip(ip: Ipv4Addr, store: &dyn InventoryStore) -> Result<Ipv4Addr> {
    let mut candidate = ip;
    for _ in 0..MAX_ADDRESS_ATTEMPTS {
        candidate = next_ip_after(candidate);
        if !store.ip_in_use(&candidate.to_string()).await {
            return Ok(candidate);
        }
    }
    Err(HypervisorError::AddressSpaceExhausted {
        attempts: MAX_ADDRESS_ATTEMPTS,
    })
}

/// The next available MAC/IP pair for a node.
///
/// This is a pool draw, not generation: the node's pre-provisioned,
/// unassigned leases are consumed oldest-first.
pub async fn free_lease_for_node(
    node_id: &str,
    store: &dyn InventoryStore,
) -> Option<DhcpLease> {
    store.oldest_free_lease(node_id).await
}

/// Generate and reserve a fresh lease in one critical section.
///
/// Generation alone cannot guarantee uniqueness under concurrent callers:
/// between the free-check and the write a second allocation could observe
/// the same address. The store's atomic reserve is the arbiter; on
/// [`HypervisorError::AddressConflict`] a fresh candidate is drawn, up to
/// the attempt bound.
#[instrument(skip(store))]
pub async fn allocate_lease(
    hypervisor: &str,
    node_id: &str,
    name: &str,
    after_ip: Ipv4Addr,
    http_port: u16,
    tusd_port: u16,
    store: &dyn InventoryStore,
) -> Result<DhcpLease> {
    for attempt in 0..MAX_ADDRESS_ATTEMPTS {
        let mac = generate_unused_mac(hypervisor, store).await?;
        let ip = next_free_ip(after_ip, store).await?;

        let lease = DhcpLease::new(node_id, name, mac, ip.to_string(), http_port, tusd_port);
        match store.reserve_lease(lease).await {
            Ok(reserved) => return Ok(reserved),
            Err(HypervisorError::AddressConflict { mac, ip }) => {
                debug!(mac = %mac, ip = %ip, attempt, "Reservation lost the race, retrying");
                continue;
            }
            Err(other) => return Err(other),
        }
    }
    Err(HypervisorError::AddressSpaceExhausted {
        attempts: MAX_ADDRESS_ATTEMPTS,
    })
}

/// DNAT rules forwarding gateway ports to the reserved guest addresses.
///
/// Two fixed groups, never interleaved: a comment header and one HTTP rule
/// per lease (public port to guest :80), then a comment header and one
/// upload-service rule per lease (public port to guest :1080). Always
/// `2 + 2 * leases.len()` lines.
pub fn dnat_rules(node_ip: &str, gw_interface: &str, leases: &[DhcpLease]) -> Vec<String> {
    let mut http_records = Vec::with_capacity(leases.len() + 1);
    let mut tusd_records = Vec::with_capacity(leases.len() + 1);

    http_records.push(format!("# node - {} HTTP ", node_ip));
    tusd_records.push(format!("# node - {} TUSD ", node_ip));

    for lease in leases {
        http_records.push(format!(
            "/sbin/iptables -t nat -A PREROUTING -i {} -p tcp --dport {} -j DNAT --to-destination {}:80",
            gw_interface, lease.http_port, lease.ip
        ));
        tusd_records.push(format!(
            "/sbin/iptables -t nat -A PREROUTING -i {} -p tcp --dport {} -j DNAT --to-destination {}:1080",
            gw_interface, lease.tusd_port, lease.ip
        ));
    }

    http_records.extend(tusd_records);
    http_records
}
