//! Network definition XML for the hypervisor's network-create call.

use serde::{Deserialize, Serialize};

use crate::inventory::DhcpLease;

/// Everything needed to define the node's routed bridge network.
///
/// `hosts` order is document order: the generated DHCP host list is
/// positional markup, not a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Gateway-facing interface the forward is bound to
    pub forward_dev: String,
    /// Bridge interface name
    pub bridge_name: String,
    /// Bridge MAC address
    pub bridge_mac: String,
    /// Bridge IP address
    pub bridge_ip: String,
    /// Bridge netmask
    pub netmask: String,
    /// Static DHCP reservations, in insertion order
    pub hosts: Vec<DhcpLease>,
}

/// Builder for the network definition document.
///
/// The uuid element is left empty so the hypervisor assigns one. No address
/// range is emitted; the network carries static host reservations only.
pub struct NetworkXmlBuilder<'a> {
    descriptor: &'a NetworkDescriptor,
}

impl<'a> NetworkXmlBuilder<'a> {
    pub fn new(descriptor: &'a NetworkDescriptor) -> Self {
        Self { descriptor }
    }

    /// Build the network XML string.
    pub fn build(&self) -> String {
        let d = self.descriptor;
        let mut xml = String::new();

        xml.push_str("<network>\n");
        xml.push_str("    <name>default</name>\n");
        xml.push_str("    <uuid></uuid>\n");

        xml.push_str(&format!(
            "    <forward mode=\"route\" dev=\"{}\">\n",
            d.forward_dev
        ));
        xml.push_str(&format!(
            "        <interface dev=\"{}\" />\n",
            d.forward_dev
        ));
        xml.push_str("    </forward>\n");

        xml.push_str(&format!(
            "    <bridge name=\"{}\" stp=\"on\" delay=\"0\"/>\n",
            d.bridge_name
        ));
        xml.push_str(&format!("    <mac address=\"{}\"/>\n", d.bridge_mac));
        xml.push_str(&format!(
            "    <ip address=\"{}\" netmask=\"{}\" localPtr=\"yes\">\n",
            d.bridge_ip, d.netmask
        ));
        xml.push_str("        <dhcp>\n");

        for host in &d.hosts {
            xml.push_str(&format!(
                "            <host mac=\"{}\" name=\"{}\" ip=\"{}\"/>\n",
                host.mac, host.name, host.ip
            ));
        }

        xml.push_str("        </dhcp>\n");
        xml.push_str("    </ip>\n");
        xml.push_str("</network>\n");

        xml
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(hosts: Vec<DhcpLease>) -> NetworkDescriptor {
        NetworkDescriptor {
            forward_dev: "eth0".to_string(),
            bridge_name: "br0".to_string(),
            bridge_mac: "52:54:00:aa:bb:cc".to_string(),
            bridge_ip: "192.168.100.1".to_string(),
            netmask: "255.255.255.0".to_string(),
            hosts,
        }
    }

    #[test]
    fn document_shape_matches_the_network_create_format() {
        let hosts = vec![
            DhcpLease::new("n", "guest-a", "52:54:00:00:00:01", "192.168.100.2", 1, 2),
            DhcpLease::new("n", "guest-b", "52:54:00:00:00:02", "192.168.100.3", 3, 4),
        ];
        let xml = NetworkXmlBuilder::new(&descriptor(hosts)).build();

        assert!(xml.contains("<name>default</name>"));
        assert!(xml.contains("<uuid></uuid>"));
        assert!(xml.contains("<forward mode=\"route\" dev=\"eth0\">"));
        assert!(xml.contains("<interface dev=\"eth0\" />"));
        assert!(xml.contains("<bridge name=\"br0\" stp=\"on\" delay=\"0\"/>"));
        assert!(xml.contains("<mac address=\"52:54:00:aa:bb:cc\"/>"));
        assert!(xml.contains(
            "<ip address=\"192.168.100.1\" netmask=\"255.255.255.0\" localPtr=\"yes\">"
        ));
        // No dynamic range, static reservations only
        assert!(!xml.contains("<range"));
    }

    #[test]
    fn host_elements_preserve_count_and_order() {
        let hosts = vec![
            DhcpLease::new("n", "guest-a", "52:54:00:00:00:01", "192.168.100.2", 1, 2),
            DhcpLease::new("n", "guest-b", "52:54:00:00:00:02", "192.168.100.3", 3, 4),
        ];
        let xml = NetworkXmlBuilder::new(&descriptor(hosts)).build();

        assert_eq!(xml.matches("<host ").count(), 2);
        let a = xml.find("guest-a").unwrap();
        let b = xml.find("guest-b").unwrap();
        assert!(a < b);
        assert!(xml.contains(
            "<host mac=\"52:54:00:00:00:01\" name=\"guest-a\" ip=\"192.168.100.2\"/>"
        ));
    }

    #[test]
    fn empty_pool_renders_empty_dhcp_block() {
        let xml = NetworkXmlBuilder::new(&descriptor(Vec::new())).build();
        assert_eq!(xml.matches("<host ").count(), 0);
        assert!(xml.contains("<dhcp>\n        </dhcp>"));
    }
}
