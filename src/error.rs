//! Error types for factory-access
//!
//! The authorization core never fails; these errors only surface while loading
//! configuration or when a caller asks for strict key parsing.

use std::path::PathBuf;

/// The main error type for factory-access operations
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid {kind} identifier '{id}': must be a lowercase snake_case token")]
    InvalidIdentifier { kind: &'static str, id: String },

    #[error("duplicate {kind} identifier '{id}'")]
    DuplicateIdentifier { kind: &'static str, id: String },

    #[error("malformed permission key '{0}': expected factory.department.service")]
    MalformedKey(String),
}

/// Result type alias for factory-access operations
pub type Result<T> = std::result::Result<T, AccessError>;
