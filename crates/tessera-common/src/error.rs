//! Error types for tessera

use thiserror::Error;

/// Result type alias for tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Unified error type for all tessera operations
#[derive(Error, Debug, Clone)]
pub enum TesseraError {
    #[error("MongoDB error: {0}")]
    MongoDB(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity model problems: unmapped types, unknown property paths
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// A value could not be converted by a registered codec
    #[error("Codec error: {0}")]
    Codec(String),

    /// Optimistic locking failed: the stored version moved on
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection timeout - retryable
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TesseraError {
    /// Returns true if this error is potentially retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TesseraError::Connection(_) | TesseraError::Timeout(_)
        )
    }

    /// Returns true if the error comes from entity mapping or value conversion
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, TesseraError::Mapping(_) | TesseraError::Codec(_))
    }
}

impl From<serde_json::Error> for TesseraError {
    fn from(err: serde_json::Error) -> Self {
        TesseraError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for TesseraError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;
        match err.kind.as_ref() {
            ErrorKind::ServerSelection { .. } => TesseraError::Timeout(err.to_string()),
            ErrorKind::Io(_) | ErrorKind::ConnectionPoolCleared { .. } => {
                TesseraError::Connection(err.to_string())
            }
            ErrorKind::InvalidArgument { .. } => TesseraError::Query(err.to_string()),
            _ => TesseraError::MongoDB(err.to_string()),
        }
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for TesseraError {
    fn from(err: bson::ser::Error) -> Self {
        TesseraError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for TesseraError {
    fn from(err: bson::de::Error) -> Self {
        TesseraError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(feature = "config-errors")]
impl From<toml::de::Error> for TesseraError {
    fn from(err: toml::de::Error) -> Self {
        TesseraError::Config(err.to_string())
    }
}
