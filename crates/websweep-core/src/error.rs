use thiserror::Error;

/// Structural errors that abort a sweep before any probing starts.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SweepError {
    #[error("Invalid network prefix '{input}': {reason}")]
    InvalidPrefix { input: String, reason: String },

    #[error("Invalid octet range {start}..={end}: {reason}")]
    InvalidRange { start: u8, end: u8, reason: String },

    #[error("Unknown protocol: {0}")]
    UnknownProtocol(String),

    #[error("No network prefixes to scan")]
    NoPrefixes,

    #[error("Maximum concurrency must be greater than zero")]
    ZeroConcurrency,

    #[error("Protocol list is empty")]
    NoProtocols,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SweepError>;
