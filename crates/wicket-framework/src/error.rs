//! Error types for the Wicket framework.

use thiserror::Error;

use wicket_core::{ApiError, GuildId, UserId};

/// Failure of the permission cache backend.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("permission cache unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("permission cache error: {0}")]
    Other(String),
}

/// Errors that can occur while resolving or changing a permission tier.
#[derive(Debug, Clone, Error)]
pub enum PermissionError {
    /// The member record could not be fetched.
    #[error("failed to fetch member {user_id} of guild {guild_id}: {source}")]
    Member {
        guild_id: GuildId,
        user_id: UserId,
        #[source]
        source: ApiError,
    },

    /// Role or channel data needed for the effective permissions could not be fetched.
    #[error("failed to compute effective permissions: {0}")]
    Effective(#[from] ApiError),

    /// The grant store rejected a write.
    #[error("failed to persist grant in guild {guild_id}: {source}")]
    Store {
        guild_id: GuildId,
        #[source]
        source: ApiError,
    },

    /// The cache could not be overwritten after a grant change.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Result type for permission operations.
pub type PermissionResult<T> = Result<T, PermissionError>;

/// Errors returned to handlers by the response protocol.
///
/// These are terminal for the reply attempt only; the handler keeps running.
#[derive(Debug, Clone, Error)]
pub enum ResponseError {
    /// The per-interaction reply cap was reached. No call was made.
    #[error("reply limit of {limit} reached")]
    ReplyLimitReached {
        /// The configured cap.
        limit: u32,
    },

    /// A message or deferral was attempted after a modal was opened.
    #[error("a modal has already been opened for this interaction")]
    ModalAlreadyOpened,

    /// A modal was attempted after the interaction was acknowledged.
    #[error("interaction has already been acknowledged")]
    AlreadyAcknowledged,

    /// Modal submissions cannot open another modal.
    #[error("cannot open a modal in response to a modal submission")]
    ModalNotAllowed,

    /// The initial-response window closed before the response was delivered,
    /// and the response has no follow-up equivalent.
    #[error("initial response window has closed")]
    WindowClosed,

    /// The platform call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result type for response operations.
pub type ResponseResult<T> = Result<T, ResponseError>;

/// Errors that abort a dispatch before any handler runs.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// The premium tier of the guild could not be looked up.
    #[error("failed to look up premium tier of guild {guild_id}: {source}")]
    Premium {
        guild_id: GuildId,
        #[source]
        source: ApiError,
    },
}
