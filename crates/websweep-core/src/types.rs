//! Core domain types for a web sweep.
//!
//! A sweep expands each [`NetworkPrefix`] into [`ScanTarget`]s, probes each
//! target over one or more [`Protocol`]s, and records a [`ProbeOutcome`].

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SweepError;

// ── Prefix ────────────────────────────────────────────────────────

/// The fixed leading octets of the address space being swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NetworkPrefix {
    /// `a.b.0.0/16`: the third and fourth octets vary.
    Sixteen([u8; 2]),
    /// `a.b.c.0/24`: only the fourth octet varies.
    TwentyFour([u8; 3]),
}

impl NetworkPrefix {
    /// The prefix of the network `addr` belongs to.
    ///
    /// Networks of /24 or narrower are swept as a /24; anything wider is
    /// swept as the enclosing /16.
    pub fn containing(addr: Ipv4Addr, prefix_len: u8) -> Self {
        let [a, b, c, _] = addr.octets();
        if prefix_len >= 24 {
            Self::TwentyFour([a, b, c])
        } else {
            Self::Sixteen([a, b])
        }
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sixteen([a, b]) => write!(f, "{a}.{b}.0.0/16"),
            Self::TwentyFour([a, b, c]) => write!(f, "{a}.{b}.{c}.0/24"),
        }
    }
}

impl FromStr for NetworkPrefix {
    type Err = SweepError;

    /// Accepts `a.b`, `a.b/16`, `a.b.0.0/16`, `a.b/24` (scans `a.b.0.x`),
    /// `a.b.c`, `a.b.c/24` and `a.b.c.0/24`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SweepError::InvalidPrefix {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (body, bits) = match s.trim().split_once('/') {
            Some((body, bits)) => {
                let bits: u8 = bits.parse().map_err(|_| invalid("bad prefix length"))?;
                (body, Some(bits))
            }
            None => (s.trim(), None),
        };

        let octets = body
            .split('.')
            .map(|part| part.parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| invalid("octets must be integers in 0..=255"))?;

        match (bits, octets.as_slice()) {
            (None | Some(16), [a, b]) => Ok(Self::Sixteen([*a, *b])),
            (Some(16), [a, b, 0, 0]) => Ok(Self::Sixteen([*a, *b])),
            (Some(24), [a, b]) => Ok(Self::TwentyFour([*a, *b, 0])),
            (None | Some(24), [a, b, c]) => Ok(Self::TwentyFour([*a, *b, *c])),
            (Some(24), [a, b, c, 0]) => Ok(Self::TwentyFour([*a, *b, *c])),
            (Some(16 | 24), _) => Err(invalid("host bits must be zero")),
            (Some(_), _) => Err(invalid("only /16 and /24 prefixes can be swept")),
            (None, _) => Err(invalid("expected two or three octets")),
        }
    }
}

impl TryFrom<String> for NetworkPrefix {
    type Error = SweepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkPrefix> for String {
    fn from(prefix: NetworkPrefix) -> Self {
        prefix.to_string()
    }
}

// ── Target ────────────────────────────────────────────────────────

/// A single IPv4 address to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanTarget(pub Ipv4Addr);

impl ScanTarget {
    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl From<Ipv4Addr> for ScanTarget {
    fn from(addr: Ipv4Addr) -> Self {
        Self(addr)
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ── Protocol ──────────────────────────────────────────────────────

/// Application protocol used for a reachability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    /// The conventional port for this protocol.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

impl FromStr for Protocol {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(SweepError::UnknownProtocol(other.to_string())),
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────

/// The recorded result of probing one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    pub target: ScanTarget,
    /// The protocol that succeeded, or the last one attempted.
    pub protocol: Protocol,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn reachable(target: ScanTarget, protocol: Protocol) -> Self {
        Self {
            target,
            protocol,
            success: true,
            detail: None,
        }
    }

    pub fn unreachable(target: ScanTarget, protocol: Protocol, detail: impl Into<String>) -> Self {
        Self {
            target,
            protocol,
            success: false,
            detail: Some(detail.into()),
        }
    }
}
