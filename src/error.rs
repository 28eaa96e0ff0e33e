/// Centralized error types for the price analytics core
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PriceError {
    // Ingestion Errors
    #[error("Invalid sample: {0}")]
    InvalidSample(String),

    // Query Errors
    #[error("No price history available: {0}")]
    NoDataAvailable(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Statistics Errors
    #[error("Empty input: {0}")]
    EmptyInput(String),

    // Storage Errors
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("File I/O error: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    // Configuration Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, PriceError>;

impl PriceError {
    /// Check if a caller may retry the operation unchanged
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PriceError::StorageFailure(_) | PriceError::FileError(_)
        )
    }

    /// Check if the error is a precondition violation by the caller
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PriceError::InvalidSample(_)
                | PriceError::NoDataAvailable(_)
                | PriceError::UnsupportedOperation(_)
                | PriceError::InvalidParameter(_)
                | PriceError::EmptyInput(_)
        )
    }

    /// Get error code for logging/monitoring
    pub fn error_code(&self) -> &str {
        match self {
            PriceError::InvalidSample(_) => "INGEST_001",
            PriceError::NoDataAvailable(_) => "QUERY_001",
            PriceError::UnsupportedOperation(_) => "QUERY_002",
            PriceError::InvalidParameter(_) => "QUERY_003",
            PriceError::EmptyInput(_) => "STATS_001",
            PriceError::StorageFailure(_) => "STORE_001",
            PriceError::FileError(_) => "STORE_002",
            PriceError::SerializationError(_) => "STORE_003",
            PriceError::ConfigError(_) => "CFG_001",
        }
    }
}
