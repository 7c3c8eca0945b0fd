//! Integration tests for the orchestration core.
//!
//! These exercise the full validate → command → transport path against the
//! mock transport and the in-memory inventory.

use std::sync::Arc;

use virtcell_hypervisor::{
    CommandOutput, ConnectionUri, DhcpLease, HypervisorError, MachineRecord, MachineSpec,
    MemoryInventory, MockTransport, NetworkDescriptor, NetworkXmlBuilder, Orchestrator,
    OrchestratorConfig, StorageRecord, VolumeFormat, VolumeSpec,
};

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        memory_quota_mib: 8192,
        storage_quota_gib: 500,
        hypervisor_hint: "qemu".to_string(),
    }
}

fn machine(name: &str, memory_mib: i64, arch: &str) -> MachineSpec {
    MachineSpec {
        name: name.to_string(),
        machine_type: "pc".to_string(),
        arch: arch.to_string(),
        memory_mib,
        vcpus: 2,
        volumes: Vec::new(),
        network: "default".to_string(),
    }
}

async fn orchestrator_with(store: Arc<MemoryInventory>) -> Orchestrator {
    Orchestrator::connect(
        config(),
        ConnectionUri::local("qemu", "system"),
        Arc::new(MockTransport::new().with_machine_types(vec![
            "x86_64".to_string(),
            "arm64".to_string(),
        ])),
        store,
    )
    .await
    .expect("session should open")
}

/// Quota scenario from the top: 8192 MiB quota, 6000 MiB used. A 3000 MiB
/// request exceeds the 2192 MiB remainder and is rejected before any
/// command runs; a 2000 MiB request goes through.
#[tokio::test]
async fn memory_quota_gates_machine_creation() {
    let store = Arc::new(MemoryInventory::new());
    store
        .add_machine(MachineRecord {
            id: "m1".into(),
            name: "existing-a".into(),
            size_mib: 4000,
        })
        .await;
    store
        .add_machine(MachineRecord {
            id: "m2".into(),
            name: "existing-b".into(),
            size_mib: 2000,
        })
        .await;

    let orchestrator = orchestrator_with(store).await;
    assert_eq!(orchestrator.remaining_memory().await, 2192);

    let rejected = orchestrator
        .create_machine(machine("too-big", 3000, "x86_64"))
        .await;
    match rejected {
        Err(HypervisorError::ImpossibleMemoryAllocation {
            requested,
            remaining,
            ..
        }) => {
            assert_eq!(requested, 3000);
            assert_eq!(remaining, 2192);
        }
        other => panic!("expected memory rejection, got {other:?}"),
    }

    let accepted = orchestrator
        .create_machine(machine("fits", 2000, "x86_64"))
        .await
        .expect("2000 MiB fits the remainder");
    assert!(matches!(accepted, CommandOutput::Domain(_)));
}

#[tokio::test]
async fn unsupported_architecture_is_rejected_before_dispatch() {
    let orchestrator = orchestrator_with(Arc::new(MemoryInventory::new())).await;

    let err = orchestrator
        .create_machine(machine("mips-box", 1024, "mips"))
        .await
        .unwrap_err();

    match err {
        HypervisorError::InvalidArchitecture { requested, supported } => {
            assert_eq!(requested, "mips");
            assert!(supported.contains(&"x86_64".to_string()));
        }
        other => panic!("expected architecture rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn storage_quota_gates_volume_creation() {
    let store = Arc::new(MemoryInventory::new());
    store
        .add_storage(StorageRecord {
            id: "s1".into(),
            name: "existing".into(),
            size_gib: 450,
        })
        .await;

    let orchestrator = orchestrator_with(store).await;
    assert_eq!(orchestrator.remaining_storage().await, 50);

    let rejected = orchestrator
        .create_storage(VolumeSpec {
            name: "big".into(),
            format: VolumeFormat::Qcow2,
            capacity_gib: 60,
        })
        .await;
    assert!(matches!(
        rejected,
        Err(HypervisorError::ImpossibleStorageAllocation { .. })
    ));

    let accepted = orchestrator
        .create_storage(VolumeSpec {
            name: "small".into(),
            format: VolumeFormat::Qcow2,
            capacity_gib: 40,
        })
        .await
        .expect("40 GiB fits");
    assert!(matches!(accepted, CommandOutput::Volume(_)));
}

/// Network scenario from the top: eth0/br0 node, two reserved hosts. The
/// serialized descriptor carries both host lines in order plus the bridge
/// line, and the defined network shows up in the active set.
#[tokio::test]
async fn network_descriptor_round_trips_through_the_session() {
    let orchestrator = orchestrator_with(Arc::new(MemoryInventory::new())).await;

    let descriptor = NetworkDescriptor {
        forward_dev: "eth0".to_string(),
        bridge_name: "br0".to_string(),
        bridge_mac: "52:54:00:aa:bb:cc".to_string(),
        bridge_ip: "192.168.100.1".to_string(),
        netmask: "255.255.255.0".to_string(),
        hosts: vec![
            DhcpLease::new("node-1", "guest-a", "52:54:00:00:00:01", "192.168.100.2", 1, 2),
            DhcpLease::new("node-1", "guest-b", "52:54:00:00:00:02", "192.168.100.3", 3, 4),
        ],
    };

    let xml = NetworkXmlBuilder::new(&descriptor).build();
    assert_eq!(xml.matches("<host ").count(), 2);
    assert!(xml.contains("<bridge name=\"br0\" stp=\"on\" delay=\"0\"/>"));
    assert!(xml.find("guest-a").unwrap() < xml.find("guest-b").unwrap());

    let output = orchestrator
        .create_network(descriptor)
        .await
        .expect("network definition should succeed");
    assert_eq!(output, CommandOutput::Network("default".to_string()));

    let active = orchestrator.active_networks().await.unwrap();
    assert_eq!(
        active,
        CommandOutput::ActiveNetworks(vec!["default".to_string()])
    );
}

#[tokio::test]
async fn transport_failures_carry_the_operation_name() {
    let orchestrator = orchestrator_with(Arc::new(MemoryInventory::new())).await;

    orchestrator
        .create_machine(machine("dup", 512, "x86_64"))
        .await
        .unwrap();

    // Same name again: the mock rejects it, and the command wraps the cause
    let err = orchestrator
        .create_machine(machine("dup", 512, "x86_64"))
        .await
        .unwrap_err();

    match err {
        HypervisorError::OperationFailed { operation, cause } => {
            assert_eq!(operation, "CreateMachine");
            assert!(cause.message.contains("already exists"));
        }
        other => panic!("expected wrapped transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn dead_transport_refuses_to_open_a_session() {
    let result = Orchestrator::connect(
        config(),
        ConnectionUri::local("qemu", "system"),
        Arc::new(MockTransport::new().disconnected()),
        Arc::new(MemoryInventory::new()),
    )
    .await;

    assert!(matches!(result, Err(HypervisorError::NoConnection)));
}

#[tokio::test]
async fn allocated_leases_are_unique_and_feed_dnat_generation() {
    let store = Arc::new(MemoryInventory::new());
    let orchestrator = orchestrator_with(store.clone()).await;

    let mut leases = Vec::new();
    for i in 0..3u16 {
        let lease = orchestrator
            .allocate_lease(
                "node-1",
                &format!("guest-{i}"),
                "192.168.100.1".parse().unwrap(),
                30080 + i,
                31080 + i,
            )
            .await
            .expect("allocation should succeed");
        leases.push(lease);
    }

    // All three pairs distinct
    for a in 0..leases.len() {
        for b in (a + 1)..leases.len() {
            assert_ne!(leases[a].mac, leases[b].mac);
            assert_ne!(leases[a].ip, leases[b].ip);
        }
    }

    let rules = virtcell_hypervisor::network::dnat_rules("10.0.0.5", "eth0", &leases);
    assert_eq!(rules.len(), 2 + 2 * leases.len());
    assert!(rules[0].starts_with("# node - 10.0.0.5 HTTP"));
    assert!(rules[4].starts_with("# node - 10.0.0.5 TUSD"));
}
