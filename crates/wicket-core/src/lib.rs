//! # Wicket Core
//!
//! Platform model and collaborator contracts for the Wicket interaction
//! core.
//!
//! This crate has no behaviour of its own beyond decoding. It defines:
//!
//! - **Model**: the immutable [`Interaction`] snapshot, guild entities
//!   ([`Member`], [`Guild`], [`Role`], [`Channel`], [`PermissionOverwrite`]),
//!   the [`Permissions`] bitmask and the [`PermissionTier`] / [`PremiumTier`]
//!   orderings.
//! - **Responses**: outbound payloads ([`MessageResponse`], [`Embed`],
//!   components, [`ModalResponse`]) and the [`InitialResponse`] sent as the
//!   one acknowledgment of an interaction.
//! - **Wire**: [`Interaction::from_json`], decoding the platform's JSON
//!   interaction events.
//! - **Collaborators**: the async traits the framework consumes
//!   ([`InteractionApi`], [`GuildData`], [`GrantStore`], [`PremiumLookup`]).
//!
//! ```text
//! ┌──────────┐   from_json   ┌─────────────┐   dispatch   ┌──────────┐
//! │ platform │──────────────▶│ Interaction │─────────────▶│ handlers │
//! └──────────┘               └─────────────┘              └────┬─────┘
//!      ▲                                                      │
//!      └──────────────── InteractionApi ◀─────────────────────┘
//! ```

pub mod api;
pub mod error;
pub mod model;
pub mod wire;

pub use api::{GrantStore, GrantSubject, GuildData, InteractionApi, PremiumLookup};
pub use error::{ApiError, ApiResult, WireError, WireResult};
pub use model::*;

/// Prelude for common imports.
pub mod prelude {
    pub use super::api::{GrantStore, GrantSubject, GuildData, InteractionApi, PremiumLookup};
    pub use super::error::{ApiError, ApiResult};
    pub use super::model::{
        ActionRow, Button, ButtonStyle, Embed, Interaction, InteractionData, InteractionKind,
        Member, MessageResponse, ModalResponse, PermissionTier, Permissions, PremiumTier,
        TextInput, TextInputStyle, User,
    };
}
