//! Mock transport for testing and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::transport::{Transport, TransportError, TransportResult};
use crate::types::{MachineSpec, VolumeSpec};

/// Mock transport simulating a hypervisor session in memory.
///
/// No hypervisor is required. Useful for:
/// - Unit and integration testing
/// - Development without libvirt installed
pub struct MockTransport {
    machine_types: Vec<String>,
    domains: RwLock<HashMap<String, MachineSpec>>,
    volumes: RwLock<HashMap<String, VolumeSpec>>,
    networks: RwLock<Vec<String>>,
    alive: bool,
}

impl MockTransport {
    /// Create a mock session supporting the default architecture set.
    pub fn new() -> Self {
        info!("Creating mock hypervisor transport");
        Self {
            machine_types: vec!["x86_64".to_string(), "aarch64".to_string()],
            domains: RwLock::new(HashMap::new()),
            volumes: RwLock::new(HashMap::new()),
            networks: RwLock::new(Vec::new()),
            alive: true,
        }
    }

    /// Override the supported machine-type set.
    pub fn with_machine_types(mut self, types: Vec<String>) -> Self {
        self.machine_types = types;
        self
    }

    /// Simulate a dead session: every `is_alive` probe fails.
    pub fn disconnected(mut self) -> Self {
        self.alive = false;
        self
    }

    /// Number of defined domains. Test helper.
    pub fn domain_count(&self) -> usize {
        self.domains.read().map(|d| d.len()).unwrap_or(0)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn define_domain(&self, spec: &MachineSpec) -> TransportResult<String> {
        let mut domains = self
            .domains
            .write()
            .map_err(|_| TransportError::new("lock poisoned"))?;

        if domains.values().any(|d| d.name == spec.name) {
            return Err(TransportError::new(format!(
                "domain {} already exists",
                spec.name
            )));
        }

        let uuid = Uuid::new_v4().to_string();
        domains.insert(uuid.clone(), spec.clone());

        info!(domain = %uuid, "Mock domain defined");
        Ok(uuid)
    }

    #[instrument(skip(self, spec), fields(name = %spec.name))]
    async fn create_volume(&self, spec: &VolumeSpec) -> TransportResult<String> {
        let mut volumes = self
            .volumes
            .write()
            .map_err(|_| TransportError::new("lock poisoned"))?;

        if volumes.contains_key(&spec.name) {
            return Err(TransportError::new(format!(
                "volume {} already exists",
                spec.name
            )));
        }

        let key = format!("/var/lib/virtcell/volumes/{}.{}", spec.name, spec.format.as_str());
        volumes.insert(spec.name.clone(), spec.clone());

        info!(volume = %key, "Mock volume created");
        Ok(key)
    }

    #[instrument(skip(self, xml))]
    async fn define_network(&self, xml: &str) -> TransportResult<String> {
        // Pull the name out of the document the same way the callers put it in
        let name = xml
            .split("<name>")
            .nth(1)
            .and_then(|rest| rest.split("</name>").next())
            .unwrap_or("default")
            .to_string();

        let mut networks = self
            .networks
            .write()
            .map_err(|_| TransportError::new("lock poisoned"))?;
        networks.push(name.clone());

        debug!(network = %name, "Mock network defined");
        Ok(name)
    }

    async fn active_networks(&self) -> TransportResult<Vec<String>> {
        let networks = self
            .networks
            .read()
            .map_err(|_| TransportError::new("lock poisoned"))?;
        Ok(networks.clone())
    }

    async fn machine_types(&self) -> TransportResult<Vec<String>> {
        Ok(self.machine_types.clone())
    }

    async fn is_alive(&self) -> bool {
        self.alive
    }
}
