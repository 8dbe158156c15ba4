//! Runtime configuration for a sweep.
//!
//! `ScanConfig` is the validated, read-only form shared by every probe task.
//! Loading it from files and environment variables is the binary's concern.

use std::time::Duration;

use crate::error::{Result, SweepError};
use crate::types::Protocol;

/// Per-request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Probes allowed in flight when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on probes in flight at any instant.
    pub max_concurrency: usize,
    /// Surface failed targets as well as reachable ones.
    pub debug: bool,
    /// Bound on each individual protocol attempt.
    pub request_timeout: Duration,
    /// Protocols tried in order until one succeeds.
    pub protocols: Vec<Protocol>,
}

impl ScanConfig {
    /// Reject configurations that would make a sweep meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(SweepError::ZeroConcurrency);
        }
        if self.protocols.is_empty() {
            return Err(SweepError::NoProtocols);
        }
        if self.request_timeout.is_zero() {
            return Err(SweepError::Config(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether failed targets should be sent to the result stream at all.
    pub fn emit_failures(&self) -> bool {
        self.debug
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            debug: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            protocols: vec![Protocol::Http, Protocol::Https],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScanConfig::default();
        assert_eq!(config.max_concurrency, 100);
        assert!(!config.debug);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.protocols, vec![Protocol::Http, Protocol::Https]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = ScanConfig {
            max_concurrency: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SweepError::ZeroConcurrency));
    }

    #[test]
    fn test_empty_protocols_rejected() {
        let config = ScanConfig {
            protocols: Vec::new(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(SweepError::NoProtocols));
    }
}
