//! Consumed collaborator interfaces.
//!
//! The core never talks to the network or a database directly. Everything
//! it needs from the outside world goes through one of these traits, which
//! the embedding application implements (REST client, database layer,
//! billing service) and tests replace with in-memory fakes.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::model::{
    ApplicationId, Channel, ChannelId, Guild, GuildId, InitialResponse, InteractionId, Member,
    MessageId, MessageResponse, PremiumTier, Role, RoleId, UserId,
};

/// Outbound interaction-response calls.
///
/// Every call needs the interaction token and must happen inside the
/// platform's validity window.
#[async_trait]
pub trait InteractionApi: Send + Sync {
    /// Sends the single initial acknowledgment.
    async fn create_response(
        &self,
        interaction_id: InteractionId,
        token: &str,
        response: &InitialResponse,
    ) -> ApiResult<()>;

    /// Sends a follow-up message after the acknowledgment.
    async fn create_followup(
        &self,
        application_id: ApplicationId,
        token: &str,
        message: &MessageResponse,
    ) -> ApiResult<MessageId>;

    /// Edits the message produced by the initial acknowledgment.
    async fn edit_original(
        &self,
        application_id: ApplicationId,
        token: &str,
        message: &MessageResponse,
    ) -> ApiResult<()>;
}

/// Read access to guild state, cached or remote.
#[async_trait]
pub trait GuildData: Send + Sync {
    async fn get_guild(&self, guild_id: GuildId) -> ApiResult<Guild>;

    async fn get_guild_member(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<Member>;

    async fn get_guild_roles(&self, guild_id: GuildId) -> ApiResult<Vec<Role>>;

    async fn get_channel(&self, channel_id: ChannelId) -> ApiResult<Channel>;
}

/// Subject of an explicit tier grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantSubject {
    User(UserId),
    Role(RoleId),
}

impl GrantSubject {
    pub fn id(&self) -> u64 {
        match self {
            Self::User(id) | Self::Role(id) => *id,
        }
    }

    pub fn is_role(&self) -> bool {
        matches!(self, Self::Role(_))
    }
}

/// Persisted explicit Admin/Support grants.
#[async_trait]
pub trait GrantStore: Send + Sync {
    async fn is_admin(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<bool>;

    async fn is_support(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<bool>;

    async fn get_admin_roles(&self, guild_id: GuildId) -> ApiResult<Vec<RoleId>>;

    async fn get_support_roles(&self, guild_id: GuildId) -> ApiResult<Vec<RoleId>>;

    async fn add_admin(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()>;

    async fn remove_admin(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()>;

    async fn add_support(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()>;

    async fn remove_support(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()>;
}

/// Billing tier lookup.
#[async_trait]
pub trait PremiumLookup: Send + Sync {
    async fn get_tier_by_guild(&self, guild_id: GuildId) -> ApiResult<PremiumTier>;
}
