//! Nmap XML output deserialization.
//!
//! Only the parts needed to list open ports are modelled. Unknown elements
//! and attributes are ignored by `quick-xml`'s serde support.

use serde::Deserialize;

use crate::error::{Result, ScanError};

/// Root element: `<nmaprun>`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename = "nmaprun")]
pub struct NmapRun {
    #[serde(rename = "@args")]
    pub args: Option<String>,
    #[serde(rename = "host", default)]
    pub hosts: Vec<NmapHost>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapHost {
    pub status: Option<HostStatus>,
    #[serde(rename = "address", default)]
    pub addresses: Vec<Address>,
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostStatus {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Address {
    #[serde(rename = "@addr")]
    pub addr: String,
    #[serde(rename = "@addrtype")]
    pub addr_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ports {
    #[serde(rename = "port", default)]
    pub ports: Vec<NmapPort>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapPort {
    #[serde(rename = "@protocol")]
    pub protocol: String,
    #[serde(rename = "@portid")]
    pub port_id: u16,
    pub state: PortState,
    pub service: Option<NmapService>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortState {
    #[serde(rename = "@state")]
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NmapService {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@product")]
    pub product: Option<String>,
}

/// An open port reported by nmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPort {
    pub port: u16,
    pub protocol: String,
    pub service: Option<String>,
}

impl NmapHost {
    pub fn ipv4(&self) -> Option<&str> {
        self.addresses
            .iter()
            .find(|a| a.addr_type == "ipv4")
            .map(|a| a.addr.as_str())
    }

    pub fn is_up(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.state == "up")
    }

    pub fn open_ports(&self) -> Vec<OpenPort> {
        self.ports
            .iter()
            .flat_map(|p| &p.ports)
            .filter(|p| p.state.state == "open")
            .map(|p| OpenPort {
                port: p.port_id,
                protocol: p.protocol.clone(),
                service: p.service.as_ref().map(|s| match &s.product {
                    Some(product) => format!("{} ({product})", s.name),
                    None => s.name.clone(),
                }),
            })
            .collect()
    }
}

/// Parse nmap XML bytes into a structured `NmapRun`.
pub fn parse_nmap_xml(xml: &[u8]) -> Result<NmapRun> {
    quick_xml::de::from_reader(xml).map_err(|e| ScanError::XmlParse(format!("{e}")))
}
