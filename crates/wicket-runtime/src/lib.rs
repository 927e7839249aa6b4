//! Wicket Runtime - orchestration layer for the Wicket interaction core.
//!
//! This crate provides:
//! - Layered configuration ([`config`]): defaults, profile and main files,
//!   `WICKET_*` environment variables, programmatic overrides
//! - Logging setup ([`logging`]) on `tracing-subscriber`
//! - The acknowledgment owner ([`AckOwner`]), which holds the synchronous
//!   response window of each interaction
//! - Runtime orchestration ([`WicketRuntime`]) with graceful shutdown
//!
//! ```ignore
//! use wicket_runtime::WicketRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WicketRuntime::builder()
//!         .interaction_api(api)
//!         .guild_data(guilds)
//!         .grant_store(grants)
//!         .premium_lookup(premium)
//!         .button(CloseButton)
//!         .build()?;
//!
//!     let (tx, rx) = tokio::sync::mpsc::channel(64);
//!     gateway.forward_to(tx);
//!
//!     // Run until Ctrl+C
//!     runtime.run(rx).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod owner;
pub mod runtime;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, WicketConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use owner::{AckOutcome, AckOwner, AckTarget};
pub use runtime::{RuntimeBuilder, WicketRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros and `Level`.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
