//! Error types shared by every Wicket layer.
//!
//! Framework-level errors (permission resolution, response protocol,
//! dispatch) are defined in wicket-framework.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error returned by the platform-facing collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The requested entity does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Entity kind, e.g. `"guild"`.
        resource: &'static str,
        /// The missing id.
        id: u64,
    },

    /// The bot lacks access to the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The platform rate limited the call.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested backoff.
        retry_after_ms: u64,
    },

    /// The platform answered with an unexpected status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The call timed out.
    #[error("API call timed out")]
    Timeout,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other collaborator failure.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    pub fn not_found(resource: &'static str, id: u64) -> Self {
        Self::NotFound { resource, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for collaborator calls.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Wire Errors
// =============================================================================

/// Failure decoding an interaction payload.
#[derive(Debug, Error)]
pub enum WireError {
    /// The payload is not valid JSON for the expected shape.
    #[error("malformed interaction payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The interaction type is not routed by the core (ping, autocomplete).
    #[error("unsupported interaction type {0}")]
    UnsupportedType(u8),

    /// The component type is neither a button nor a select menu.
    #[error("unsupported component type {0}")]
    UnsupportedComponent(u8),

    /// A field required for this interaction type is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A snowflake id is not a decimal `u64`.
    #[error("invalid snowflake in `{field}`: {value:?}")]
    InvalidSnowflake {
        /// The offending field.
        field: &'static str,
        /// The raw value.
        value: String,
    },

    /// A command option carries a value of the wrong shape.
    #[error("invalid command option `{name}`: {reason}")]
    InvalidOption {
        /// Option name.
        name: String,
        /// What was wrong.
        reason: String,
    },
}

/// Result type for wire decoding.
pub type WireResult<T> = Result<T, WireError>;
