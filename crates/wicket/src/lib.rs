//! # Wicket
//!
//! The interaction core of a ticket bot: it turns platform interaction
//! events (slash commands, button clicks, select menus, modal submissions)
//! into handler invocations, decides who may trigger them and keeps every
//! reply inside the platform's response protocol.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌───────────────────────────────┐
//! │   Runtime   │────▶│ Dispatcher │────▶│ handler task (own context)    │──▶ follow-ups
//! │ (ingestion) │     │            │     └──────────────┬────────────────┘
//! └──────┬──────┘     └────────────┘                    │ initial response
//!        │                                              ▼
//!        └──────────────────────────────────────▶ AckOwner ──▶ platform
//! ```
//!
//! - **Core** ([`core`]): platform model, wire decoding, collaborator traits
//! - **Framework** ([`framework`]): matchers, registries, permission
//!   resolution, the context state machine and the dispatcher
//! - **Runtime** ([`runtime`]): configuration, logging, the acknowledgment
//!   owner and the ingestion loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wicket::prelude::*;
//!
//! struct CloseButton;
//!
//! #[async_trait]
//! impl Handler<ButtonContext> for CloseButton {
//!     fn matcher(&self) -> Matcher {
//!         Matcher::exact("close")
//!     }
//!
//!     fn properties(&self) -> Properties {
//!         Properties::new().permission_level(PermissionTier::Support)
//!     }
//!
//!     async fn execute(&self, ctx: ButtonContext) {
//!         let _ = ctx.reply("Closing ticket...").await;
//!     }
//! }
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
//!     runtime.run(interactions).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `wicket.toml` (default)
//! - `yaml-config`: load `wicket.yaml`
//! - `json-log`: JSON log output

pub use wicket_core as core;
pub use wicket_framework as framework;
pub use wicket_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use wicket::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use wicket_runtime::{RuntimeError, WicketConfig, WicketRuntime};

    // Handlers and routing
    pub use async_trait::async_trait;
    pub use wicket_framework::{Handler, Matcher, Properties, handler_fn};

    // Contexts
    pub use wicket_framework::{
        ButtonContext, CommandContext, InteractionContext, ModalContext, ResponseError,
        SelectMenuContext,
    };

    // Permissions
    pub use wicket_framework::{MemoryPermissionCache, PermissionCache, PermissionResolver};

    // Platform model and collaborators
    pub use wicket_core::prelude::*;
    pub use wicket_core::{ModalSubmitData, SelectMenu, SelectOption};
}
