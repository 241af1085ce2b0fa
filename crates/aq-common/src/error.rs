//! Error types for valle-aire services.

use thiserror::Error;

/// Result type alias using AqError.
pub type AqResult<T> = Result<T, AqError>;

/// Primary error type for forecast and query operations.
#[derive(Debug, Error)]
pub enum AqError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Fatal Pipeline Errors ===
    #[error("Weather feed error: {0}")]
    WeatherFeed(String),

    #[error("Grid definition error: {0}")]
    GridDefinition(String),

    #[error("Feature schema mismatch for model '{model}': expected {expected:?}, found {found:?}")]
    SchemaMismatch {
        model: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    // === Data Errors ===
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Model artifact error for '{pollutant}': {message}")]
    ModelArtifact { pollutant: String, message: String },

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    // === Infrastructure Errors ===
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AqError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            AqError::MissingParameter(_) | AqError::InvalidParameter { .. } => 400,
            AqError::SnapshotNotFound(_) => 404,
            AqError::ServiceUnavailable(_) | AqError::WeatherFeed(_) => 503,
            _ => 500,
        }
    }

    /// True for errors that must abort the run rather than degrade it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AqError::WeatherFeed(_) | AqError::GridDefinition(_) | AqError::SchemaMismatch { .. }
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for AqError {
    fn from(err: std::io::Error) -> Self {
        AqError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for AqError {
    fn from(err: serde_json::Error) -> Self {
        AqError::InternalError(format!("JSON error: {}", err))
    }
}
