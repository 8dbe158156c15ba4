//! Per-host reachability probing.
//!
//! A [`Probe`] performs one attempt against one target over one protocol.
//! [`probe_host`] drives a target through the configured protocol order,
//! stopping at the first success. Nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;

use websweep_core::{ProbeOutcome, Protocol, ScanConfig, ScanTarget};

use crate::error::Result;

/// Why a single protocol attempt did not count as reachable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("status {0} outside 200..400")]
    Status(u16),

    #[error("timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// One reachability attempt against one target.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn attempt(
        &self,
        target: ScanTarget,
        protocol: Protocol,
    ) -> std::result::Result<(), ProbeFailure>;
}

// ── HTTP ──────────────────────────────────────────────────────────

/// Reachability over HTTP and HTTPS using a shared `reqwest` client.
///
/// Redirects are not followed, so a 3xx answer counts as reachable.
/// Certificates are not validated: the question is whether something
/// answers, not whether it can be trusted.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    http_port: u16,
    https_port: u16,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            http_port: Protocol::Http.default_port(),
            https_port: Protocol::Https.default_port(),
        })
    }

    /// Probe `protocol` on a non-standard port.
    pub fn with_port(mut self, protocol: Protocol, port: u16) -> Self {
        match protocol {
            Protocol::Http => self.http_port = port,
            Protocol::Https => self.https_port = port,
        }
        self
    }

    fn url(&self, target: ScanTarget, protocol: Protocol) -> String {
        let port = match protocol {
            Protocol::Http => self.http_port,
            Protocol::Https => self.https_port,
        };
        if port == protocol.default_port() {
            format!("{}://{}/", protocol.scheme(), target)
        } else {
            format!("{}://{}:{}/", protocol.scheme(), target, port)
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn attempt(
        &self,
        target: ScanTarget,
        protocol: Protocol,
    ) -> std::result::Result<(), ProbeFailure> {
        let url = self.url(target, protocol);
        let response = self.client.get(&url).send().await.map_err(classify)?;
        let status = response.status().as_u16();

        if (200..400).contains(&status) {
            Ok(())
        } else {
            Err(ProbeFailure::Status(status))
        }
    }
}

fn classify(err: reqwest::Error) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else if err.is_connect() {
        ProbeFailure::Connect(root_cause(&err))
    } else {
        ProbeFailure::Request(root_cause(&err))
    }
}

/// reqwest's own message only names the URL; the useful part is at the
/// bottom of the source chain.
fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause.to_string()
}

// ── Fallback ──────────────────────────────────────────────────────

enum ProbeState {
    Trying(usize),
    Succeeded(Protocol),
    Exhausted { protocol: Protocol, detail: String },
}

/// Try each configured protocol in order and report the first success, or
/// the last failure once every protocol has been tried.
pub async fn probe_host(probe: &dyn Probe, target: ScanTarget, config: &ScanConfig) -> ProbeOutcome {
    let mut state = ProbeState::Trying(0);

    loop {
        state = match state {
            ProbeState::Trying(index) => {
                let Some(&protocol) = config.protocols.get(index) else {
                    return ProbeOutcome::unreachable(
                        target,
                        Protocol::Http,
                        "no protocols configured",
                    );
                };

                match probe.attempt(target, protocol).await {
                    Ok(()) => ProbeState::Succeeded(protocol),
                    Err(failure) => {
                        tracing::trace!(%target, %protocol, error = %failure, "Probe attempt failed");
                        if index + 1 < config.protocols.len() {
                            ProbeState::Trying(index + 1)
                        } else {
                            ProbeState::Exhausted {
                                protocol,
                                detail: failure.to_string(),
                            }
                        }
                    }
                }
            }
            ProbeState::Succeeded(protocol) => {
                return ProbeOutcome::reachable(target, protocol);
            }
            ProbeState::Exhausted { protocol, detail } => {
                return ProbeOutcome::unreachable(target, protocol, detail);
            }
        };
    }
}
