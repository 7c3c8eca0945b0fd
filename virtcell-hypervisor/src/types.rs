//! Type definitions shared across the orchestration core.

use serde::{Deserialize, Serialize};

/// On-disk format of a storage volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolumeFormat {
    Raw,
    Qcow,
    #[default]
    Qcow2,
}

impl VolumeFormat {
    /// The format name as the hypervisor expects it.
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeFormat::Raw => "raw",
            VolumeFormat::Qcow => "qcow",
            VolumeFormat::Qcow2 => "qcow2",
        }
    }

    /// Parse a format name, accepting only the supported image types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(VolumeFormat::Raw),
            "qcow" => Some(VolumeFormat::Qcow),
            "qcow2" => Some(VolumeFormat::Qcow2),
            _ => None,
        }
    }
}

/// A storage volume to create or attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Volume name, unique within the pool
    pub name: String,
    /// Image format
    pub format: VolumeFormat,
    /// Capacity in GiB
    pub capacity_gib: i64,
}

/// Everything the transport needs to define a new machine.
///
/// The core validates quota and architecture before one of these is built;
/// the transport turns it into whatever definition document its hypervisor
/// wants. It is opaque data from the core's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineSpec {
    /// Machine name
    pub name: String,
    /// Hypervisor machine type (e.g. "pc", "q35")
    pub machine_type: String,
    /// Architecture, validated against the connection's supported set
    pub arch: String,
    /// Memory in MiB
    pub memory_mib: i64,
    /// Number of virtual CPUs
    pub vcpus: u32,
    /// Volumes backing the machine's disks
    pub volumes: Vec<VolumeSpec>,
    /// Name of the virtual network to attach to
    pub network: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_format_roundtrip() {
        assert_eq!(VolumeFormat::parse("qcow2"), Some(VolumeFormat::Qcow2));
        assert_eq!(VolumeFormat::parse("raw"), Some(VolumeFormat::Raw));
        assert_eq!(VolumeFormat::parse("vmdk"), None);
        assert_eq!(VolumeFormat::Qcow.as_str(), "qcow");
    }
}
