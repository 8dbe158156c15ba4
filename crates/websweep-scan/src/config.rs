//! Configuration for the websweep scanner.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{de, Deserialize, Deserializer};

use websweep_core::{NetworkPrefix, Protocol, ScanConfig};

use crate::error::Result;

/// Top-level sweep configuration.
///
/// Loaded from the `[scan]` section of `websweep.toml` (or `.yaml`/`.json`)
/// and `WEBSWEEP_SCAN__` environment variables. Command-line flags are
/// applied on top by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepSettings {
    /// Maximum probes in flight.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Show failed hosts and their errors.
    #[serde(default)]
    pub debug: bool,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Protocols tried in order for every host.
    #[serde(default = "default_protocols", deserialize_with = "list_or_csv")]
    pub protocols: Vec<Protocol>,

    /// Prefixes to sweep. Empty means discover them from local interfaces.
    #[serde(default, deserialize_with = "list_or_csv")]
    pub prefixes: Vec<NetworkPrefix>,

    /// Interface names ignored during discovery. A trailing `*` matches any suffix.
    #[serde(default = "default_skip_interfaces", deserialize_with = "list_or_csv")]
    pub skip_interfaces: Vec<String>,

    /// Path to the nmap binary used for the localhost port scan.
    #[serde(default = "default_nmap_path")]
    pub nmap_path: String,

    #[serde(default)]
    pub output: OutputFormat,
}

/// How displayed outcomes are written to stdout.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl SweepSettings {
    /// The validated runtime configuration shared by probe tasks.
    pub fn scan_config(&self) -> Result<ScanConfig> {
        let config = ScanConfig {
            max_concurrency: self.max_concurrency,
            debug: self.debug,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            protocols: self.protocols.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Whether discovery should ignore the named interface.
    pub fn skips_interface(&self, name: &str) -> bool {
        self.skip_interfaces.iter().any(|pattern| match pattern.strip_suffix('*') {
            Some(prefix) => name.starts_with(prefix),
            None => name == pattern,
        })
    }
}

fn default_max_concurrency() -> usize {
    websweep_core::config::DEFAULT_MAX_CONCURRENCY
}

fn default_timeout_secs() -> u64 {
    websweep_core::config::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_protocols() -> Vec<Protocol> {
    vec![Protocol::Http, Protocol::Https]
}

fn default_skip_interfaces() -> Vec<String> {
    ["lo", "tun0", "docker0", "virbr*", "veth*"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_nmap_path() -> String {
    "nmap".to_string()
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            debug: false,
            request_timeout_secs: default_timeout_secs(),
            protocols: default_protocols(),
            prefixes: Vec::new(),
            skip_interfaces: default_skip_interfaces(),
            nmap_path: default_nmap_path(),
            output: OutputFormat::default(),
        }
    }
}

/// Lists come from files as sequences and from the environment as a
/// single comma-separated string.
fn list_or_csv<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: fmt::Display,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv<T> {
        List(Vec<T>),
        Csv(String),
    }

    match ListOrCsv::<T>::deserialize(deserializer)? {
        ListOrCsv::List(items) => Ok(items),
        ListOrCsv::Csv(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| item.parse().map_err(de::Error::custom))
            .collect(),
    }
}

/// `WEBSWEEP_SCAN__MAX_CONCURRENCY=50` sets `scan.max_concurrency`.
///
/// Values stay strings here and are converted during deserialization, so
/// a prefix such as `192.168` is never mistaken for a float.
fn environment() -> config::Environment {
    config::Environment::with_prefix("WEBSWEEP")
        .prefix_separator("_")
        .separator("__")
}

/// Load settings from `<file_prefix>.{toml,yaml,json}` and the environment.
///
/// A missing file or missing `[scan]` section yields the defaults; a
/// malformed one is an error.
pub fn load(file_prefix: &str) -> Result<SweepSettings> {
    load_with_env(file_prefix, environment())
}

fn load_with_env(file_prefix: &str, env: config::Environment) -> Result<SweepSettings> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(env)
        .build()?;

    match cfg.get::<Option<SweepSettings>>("scan") {
        Ok(Some(settings)) => Ok(settings),
        Ok(None) | Err(config::ConfigError::NotFound(_)) => Ok(SweepSettings::default()),
        Err(e) => Err(e.into()),
    }
}
