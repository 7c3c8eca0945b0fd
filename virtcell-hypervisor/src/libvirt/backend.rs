//! Libvirt transport implementation.

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use virt::connect::Connect;
use virt::domain::Domain;
use virt::network::Network;
use virt::storage_pool::StoragePool;
use virt::storage_vol::StorageVol;

use crate::transport::{Transport, TransportError, TransportResult};
use crate::types::{MachineSpec, VolumeSpec};

/// Pool that backs volumes created through this transport.
const STORAGE_POOL: &str = "default";

/// Libvirt/QEMU transport.
///
/// One authenticated session per instance; every trait method performs a
/// single libvirt call against it.
pub struct LibvirtTransport {
    connection: Connect,
}

impl LibvirtTransport {
    /// Open a libvirt session against the given URI.
    ///
    /// Common URIs:
    /// - `qemu:///system` - System-wide QEMU/KVM
    /// - `qemu+ssh:///admin@host1/system` - Remote via SSH
    pub fn connect(uri: &str) -> TransportResult<Self> {
        info!(uri = %uri, "Connecting to libvirt");

        let connection = Connect::open(Some(uri))
            .map_err(|e| TransportError::new(e.to_string()))?;

        info!("Connected to libvirt");

        Ok(Self { connection })
    }

    fn domain_xml(spec: &MachineSpec) -> String {
        let disks: String = spec
            .volumes
            .iter()
            .enumerate()
            .map(|(i, vol)| {
                let dev = format!("vd{}", (b'a' + i as u8) as char);
                format!(
                    r#"    <disk type='file' device='disk'>
      <driver name='qemu' type='{}'/>
      <source file='/var/lib/virtcell/volumes/{}.{}'/>
      <target dev='{}' bus='virtio'/>
    </disk>
"#,
                    vol.format.as_str(),
                    vol.name,
                    vol.format.as_str(),
                    dev
                )
            })
            .collect();

        format!(
            r#"<domain type='kvm'>
  <name>{}</name>
  <memory unit='MiB'>{}</memory>
  <vcpu placement='static'>{}</vcpu>
  <os>
    <type arch='{}' machine='{}'>hvm</type>
    <boot dev='hd'/>
  </os>
  <devices>
{}    <interface type='network'>
      <source network='{}'/>
      <model type='virtio'/>
    </interface>
    <console type='pty'/>
  </devices>
</domain>
"#,
            spec.name,
            spec.memory_mib,
            spec.vcpus,
            spec.arch,
            spec.machine_type,
            disks,
            spec.network
        )
    }

    fn volume_xml(spec: &VolumeSpec) -> String {
        format!(
            r#"<volume>
  <name>{}.{}</name>
  <capacity unit='GiB'>{}</capacity>
  <target>
    <format type='{}'/>
  </target>
</volume>
"#,
            spec.name,
            spec.format.as_str(),
            spec.capacity_gib,
            spec.format.as_str()
        )
    }
}

#[async_trait]
impl Transport for LibvirtTransport {
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn define_domain(&self, spec: &MachineSpec) -> TransportResult<String> {
        let xml = Self::domain_xml(spec);
        debug!(xml = %xml, "Generated domain XML");

        let domain = Domain::define_xml(&self.connection, &xml)
            .map_err(|e| TransportError::new(e.to_string()))?;

        let uuid = domain
            .get_uuid_string()
            .map_err(|e| TransportError::new(e.to_string()))?;

        info!(domain = %uuid, "Domain defined");
        Ok(uuid)
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn create_volume(&self, spec: &VolumeSpec) -> TransportResult<String> {
        let pool = StoragePool::lookup_by_name(&self.connection, STORAGE_POOL)
            .map_err(|e| TransportError::new(e.to_string()))?;

        let xml = Self::volume_xml(spec);
        let volume = StorageVol::create_xml(&pool, &xml, 0)
            .map_err(|e| TransportError::new(e.to_string()))?;

        let key = volume
            .get_key()
            .map_err(|e| TransportError::new(e.to_string()))?;

        info!(volume = %key, "Volume created");
        Ok(key)
    }

    #[instrument(skip(self, xml))]
    async fn define_network(&self, xml: &str) -> TransportResult<String> {
        let network = Network::define_xml(&self.connection, xml)
            .map_err(|e| TransportError::new(e.to_string()))?;

        let name = network
            .get_name()
            .map_err(|e| TransportError::new(e.to_string()))?;

        info!(network = %name, "Network defined");
        Ok(name)
    }

    async fn active_networks(&self) -> TransportResult<Vec<String>> {
        self.connection
            .list_networks()
            .map_err(|e| TransportError::new(e.to_string()))
    }

    async fn machine_types(&self) -> TransportResult<Vec<String>> {
        let capabilities = self
            .connection
            .get_capabilities()
            .map_err(|e| TransportError::new(e.to_string()))?;

        // Collect the guest arch names out of the capabilities document,
        // stripping the trailing NUL the C API leaves on each entry.
        let mut types = Vec::new();
        for chunk in capabilities.split("<arch name='").skip(1) {
            if let Some(name) = chunk.split('\'').next() {
                let name = name.trim_end_matches('\0').to_string();
                if !types.contains(&name) {
                    types.push(name);
                }
            }
        }
        Ok(types)
    }

    async fn is_alive(&self) -> bool {
        self.connection.is_alive().unwrap_or(false)
    }
}
