//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use wicket_core::WireError;
use wicket_framework::DispatchError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An interaction could not be dispatched.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A raw interaction payload could not be decoded.
    #[error("Failed to decode interaction: {0}")]
    Wire(#[from] WireError),

    /// The builder was not given a required collaborator.
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
