//! Platform data model.
//!
//! Snowflake ids are plain `u64` aliases. The guild's implicit "everyone"
//! role shares the guild id.

pub mod guild;
pub mod interaction;
pub mod permissions;
pub mod response;
pub mod tier;

pub type GuildId = u64;
pub type UserId = u64;
pub type RoleId = u64;
pub type ChannelId = u64;
pub type MessageId = u64;
pub type ApplicationId = u64;
pub type InteractionId = u64;

pub use guild::{Channel, Guild, Member, OverwriteKind, PermissionOverwrite, Role, User};
pub use interaction::{
    ButtonData, CommandData, CommandOption, Interaction, InteractionData, InteractionKind,
    ModalField, ModalSubmitData, OptionValue, SelectMenuData, SelectMenuKind,
};
pub use permissions::Permissions;
pub use response::{
    ActionRow, Button, ButtonStyle, Component, Embed, EmbedField, InitialResponse,
    MessageResponse, ModalResponse, SelectMenu, SelectOption, TextInput, TextInputStyle, colour,
};
pub use tier::{BotIdentity, PermissionTier, PremiumTier};
