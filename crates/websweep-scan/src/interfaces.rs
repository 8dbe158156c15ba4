//! Local prefix discovery.
//!
//! Reads IPv4 interface addresses from `ip` (or `ifconfig` where `ip` is
//! unavailable) and turns each into the prefix to sweep.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tokio::process::Command;

use websweep_core::NetworkPrefix;

use crate::config::SweepSettings;
use crate::error::{Result, ScanError};

/// An IPv4 network configured on a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceNetwork {
    pub interface: String,
    pub network: Ipv4Net,
}

impl InterfaceNetwork {
    pub fn prefix(&self) -> NetworkPrefix {
        NetworkPrefix::containing(self.network.addr(), self.network.prefix_len())
    }
}

/// Discover the prefixes of every usable local interface, in first-seen
/// order without duplicates.
pub async fn discover_prefixes(settings: &SweepSettings) -> Result<Vec<NetworkPrefix>> {
    let output = interface_listing().await?;
    let networks = parse_interface_listing(&output);

    let mut prefixes = Vec::new();
    for net in networks {
        if settings.skips_interface(&net.interface) {
            tracing::debug!(interface = %net.interface, network = %net.network, "Interface skipped");
            continue;
        }
        let prefix = net.prefix();
        tracing::debug!(interface = %net.interface, network = %net.network, %prefix, "Interface network found");
        if !prefixes.contains(&prefix) {
            prefixes.push(prefix);
        }
    }

    if prefixes.is_empty() {
        return Err(ScanError::InterfaceDiscovery(
            "no non-loopback IPv4 interface found".to_string(),
        ));
    }
    Ok(prefixes)
}

async fn interface_listing() -> Result<String> {
    let attempts: [(&str, &[&str]); 2] = [("ip", &["-o", "-4", "addr", "show"]), ("ifconfig", &[])];

    let mut last_error = String::new();
    for (program, args) in attempts {
        match Command::new(program).args(args).output().await {
            Ok(output) if output.status.success() => {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            Ok(output) => {
                last_error = format!(
                    "{program} exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => last_error = format!("{program}: {e}"),
        }
        tracing::debug!(error = %last_error, "Interface listing failed, trying next tool");
    }

    Err(ScanError::InterfaceDiscovery(last_error))
}

/// Parse `ip -o -4 addr`, `ip addr` or `ifconfig` output.
///
/// Loopback addresses are dropped. Addresses without a netmask are taken
/// as /16.
pub fn parse_interface_listing(output: &str) -> Vec<InterfaceNetwork> {
    let mut networks = Vec::new();
    let mut current = String::new();

    for line in output.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            current = interface_name(&fields);
        }

        let Some(pos) = fields.iter().position(|f| *f == "inet") else {
            continue;
        };
        let Some(network) = parse_inet(&fields[pos + 1..]) else {
            continue;
        };
        if network.addr().is_loopback() {
            continue;
        }

        networks.push(InterfaceNetwork {
            interface: current.clone(),
            network,
        });
    }

    networks
}

/// `2: eth0 ...` (ip) or `eth0: flags=...` / `eth0  Link encap` (ifconfig).
fn interface_name(fields: &[&str]) -> String {
    let first = fields[0].trim_end_matches(':');
    let raw = if first.chars().all(|c| c.is_ascii_digit()) {
        fields.get(1).copied().unwrap_or_default()
    } else {
        first
    };
    let name = raw.trim_end_matches(':');
    name.split('@').next().unwrap_or(name).to_string()
}

/// Fields following `inet`: `a.b.c.d/len`, `a.b.c.d netmask <mask>` or
/// `addr:a.b.c.d ... Mask:<mask>`.
fn parse_inet(rest: &[&str]) -> Option<Ipv4Net> {
    let first = rest.first()?;
    if let Ok(net) = first.parse::<Ipv4Net>() {
        return Some(net);
    }

    let addr: Ipv4Addr = first.trim_start_matches("addr:").parse().ok()?;
    let mask = rest.iter().enumerate().find_map(|(i, field)| {
        if *field == "netmask" {
            rest.get(i + 1).copied()
        } else {
            field.strip_prefix("Mask:")
        }
    });

    let prefix_len = mask.and_then(parse_mask).unwrap_or(16);
    Ipv4Net::new(addr, prefix_len).ok()
}

/// Dotted (`255.255.255.0`) or hex (`0xffffff00`) netmask to prefix length.
fn parse_mask(mask: &str) -> Option<u8> {
    let addr = match mask.strip_prefix("0x") {
        Some(hex) => Ipv4Addr::from(u32::from_str_radix(hex, 16).ok()?),
        None => mask.parse().ok()?,
    };
    ipnet::ipv4_mask_to_prefix(addr).ok()
}
