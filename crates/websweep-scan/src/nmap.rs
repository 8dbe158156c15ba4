//! Nmap process wrapper for the localhost port scan.
//!
//! Executes nmap as a child process via `tokio::process::Command` and
//! parses the XML output into the list of open ports.

use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::error::{Result, ScanError};
use crate::nmap_xml::{self, NmapRun, OpenPort};

/// Result of scanning localhost.
#[derive(Debug, Clone)]
pub struct LocalhostReport {
    pub open_ports: Vec<OpenPort>,
    pub duration: Duration,
}

/// Wrapper around the nmap binary.
pub struct NmapScanner {
    nmap_path: String,
}

impl NmapScanner {
    pub fn new(nmap_path: &str) -> Self {
        Self {
            nmap_path: nmap_path.to_string(),
        }
    }

    /// Verify nmap is installed and accessible.
    pub async fn verify_installation(&self) -> Result<String> {
        let output = Command::new(&self.nmap_path)
            .arg("--version")
            .output()
            .await
            .map_err(|_| ScanError::NmapNotFound {
                path: self.nmap_path.clone(),
            })?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Port-scan localhost with nmap's default TCP port set.
    pub async fn scan_localhost(&self) -> Result<LocalhostReport> {
        let start = Instant::now();
        tracing::info!(nmap = %self.nmap_path, "Starting nmap scan of localhost");

        let output = Command::new(&self.nmap_path)
            .arg("-oX")
            .arg("-")
            .arg("--noninteractive")
            .arg("localhost")
            .output()
            .await
            .map_err(|e| ScanError::NmapNotFound {
                path: format!("{}: {e}", self.nmap_path),
            })?;

        let duration = start.elapsed();

        if !output.status.success() {
            return Err(ScanError::NmapFailed {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let run = nmap_xml::parse_nmap_xml(&output.stdout)?;
        tracing::debug!(args = run.args.as_deref().unwrap_or_default(), "Parsed nmap output");
        let open_ports = open_ports(&run);

        tracing::info!(
            open_ports = open_ports.len(),
            duration_ms = duration.as_millis(),
            "Nmap scan complete"
        );

        Ok(LocalhostReport {
            open_ports,
            duration,
        })
    }
}

fn open_ports(run: &NmapRun) -> Vec<OpenPort> {
    run.hosts
        .iter()
        .filter(|h| h.is_up())
        .flat_map(|h| {
            let ports = h.open_ports();
            tracing::debug!(
                host = h.ipv4().unwrap_or("unknown"),
                open_ports = ports.len(),
                "Nmap host up"
            );
            ports
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ports_skip_hosts_that_are_down() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<nmaprun scanner="nmap" args="nmap -oX - localhost">
  <host>
    <status state="down" reason="no-response"/>
    <address addr="::1" addrtype="ipv6"/>
    <ports>
      <port protocol="tcp" portid="80"><state state="open" reason="syn-ack"/></port>
    </ports>
  </host>
  <host>
    <status state="up" reason="localhost-response"/>
    <address addr="127.0.0.1" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="8443"><state state="open" reason="syn-ack"/></port>
    </ports>
  </host>
</nmaprun>"#;
        let run = nmap_xml::parse_nmap_xml(xml.as_bytes()).unwrap();
        let ports = open_ports(&run);
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 8443);
    }

    #[tokio::test]
    async fn missing_binary_reported_as_not_found() {
        let scanner = NmapScanner::new("/nonexistent/websweep-test/nmap");
        assert!(matches!(
            scanner.verify_installation().await,
            Err(ScanError::NmapNotFound { .. })
        ));
        assert!(matches!(
            scanner.scan_localhost().await,
            Err(ScanError::NmapNotFound { .. })
        ));
    }
}
