//! Error types for the websweep-scan crate.

use thiserror::Error;

use websweep_core::SweepError;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("Nmap not found at path: {path}")]
    NmapNotFound { path: String },

    #[error("Nmap exited with code {code}: {stderr}")]
    NmapFailed { code: i32, stderr: String },

    #[error("Failed to parse nmap XML output: {0}")]
    XmlParse(String),

    #[error("Could not determine any local IP ranges: {0}")]
    InterfaceDiscovery(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
