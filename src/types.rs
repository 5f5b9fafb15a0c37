//! Error types shared across the crate.

use thiserror::Error;

/// Exact message surfaced when organization or user context is missing.
///
/// Callers branch on this string in the response envelope, so it must not
/// drift between the service layer and the context layer.
pub const AUTH_CONTEXT_ERROR: &str =
    "Authentication required: missing organization or user context";

/// Error type for HERA core operations
#[derive(Debug, Error)]
pub enum HeraError {
    /// Organization or actor context missing before any I/O was attempted
    #[error("Authentication required: missing organization or user context")]
    AuthContext,

    /// The remote CRUD gateway failed at the transport level
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Batch exceeds the configured ceiling; rejected before any dispatch
    #[error("Batch of {requested} operations exceeds limit of {limit}")]
    BatchLimit { requested: usize, limit: usize },

    /// Smart code does not match HERA.<DOMAIN>.<MODULE>.<TYPE>.<SUBTYPE>.v<N>
    #[error("Invalid smart code: {0}")]
    SmartCode(String),

    /// A dynamic data row violated the one-populated-slot invariant
    #[error("Invalid dynamic data row: {0}")]
    DynamicData(String),

    /// JSON encode/decode failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration rejected by validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record lookup returned nothing
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, HeraError>;
