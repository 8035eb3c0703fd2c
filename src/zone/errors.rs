use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Zone-related errors
#[derive(Debug, Clone, Error)]
pub enum ZoneError {
    /// The configured zone file could not be opened
    #[error("Cannot open zone file {}: {source}", path.display())]
    ZoneFileOpen {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    /// The zone file was opened but could not be read as text
    #[error("Cannot read zone file {}: {source}", path.display())]
    ZoneFileRead {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },
    /// Zone file entry parsing error
    #[error("Zone parse error: {0}")]
    ParseError(String),
    /// Invalid record data for the declared type
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    /// Relative owner name with no $ORIGIN in effect
    #[error("Relative name {0} without $ORIGIN")]
    RelativeName(String),
    /// Invalid TTL value
    #[error("Invalid TTL value: {0}")]
    InvalidTTL(String),
    /// Record type that the responder does not serve
    #[error("Unsupported resource record type: {0}")]
    UnsupportedType(String),
}

impl ZoneError {
    /// Errors that must stop the process: a configured zone path that
    /// cannot be read is an operator error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ZoneError::ZoneFileOpen { .. } | ZoneError::ZoneFileRead { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ZoneError>;
