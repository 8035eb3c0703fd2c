use std::path::PathBuf;
use thiserror::Error;

use crate::dns::ParseError;
use crate::zone::ZoneError;

/// Errors raised by the listener shell
#[derive(Error, Debug)]
pub enum DnsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid DNS packet: {0}")]
    InvalidPacket(#[from] ParseError),

    #[error(transparent)]
    Zone(#[from] ZoneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Handler task failed: {0}")]
    Task(String),

    #[error("Response of {0} bytes exceeds the TCP length prefix")]
    MessageTooLarge(usize),
}

impl DnsError {
    /// Whether the process must stop rather than keep serving
    pub fn is_fatal(&self) -> bool {
        matches!(self, DnsError::Zone(e) if e.is_fatal())
    }
}

/// Configuration loading and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Cannot read configuration file {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Configuration parse error: {0}")]
    Parse(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("No listen addresses configured")]
    NoAddresses,

    #[error("Invalid zone entry: {0}")]
    InvalidZone(String),

    #[error("Invalid UDP payload size: {0}")]
    InvalidPayloadSize(String),
}

pub type Result<T> = std::result::Result<T, DnsError>;
