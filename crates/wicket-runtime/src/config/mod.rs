//! Configuration for the Wicket runtime.
//!
//! Layered loading through figment (defaults, profile file, main file,
//! `WICKET_*` environment, programmatic overrides) plus a validation pass.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, InteractionsConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig,
    PermissionsConfig, SpanEventConfig, WicketConfig,
};
pub use validation::validate_config;
