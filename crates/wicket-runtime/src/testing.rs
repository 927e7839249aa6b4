//! In-memory collaborators for runtime tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use wicket_core::{
    ApiError, ApiResult, ApplicationId, Channel, ChannelId, GrantStore, GrantSubject, Guild,
    GuildData, GuildId, InitialResponse, InteractionApi, InteractionId, Member, MessageId,
    MessageResponse, Permissions, PremiumLookup, PremiumTier, Role, RoleId, User, UserId,
};

/// Records every response call by name.
#[derive(Default)]
pub struct RecordingApi {
    calls: Mutex<Vec<String>>,
    followups: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl InteractionApi for RecordingApi {
    async fn create_response(
        &self,
        _interaction_id: InteractionId,
        _token: &str,
        response: &InitialResponse,
    ) -> ApiResult<()> {
        self.calls.lock().push(response.name().to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Http {
                status: 404,
                message: "Unknown interaction".into(),
            });
        }
        Ok(())
    }

    async fn create_followup(
        &self,
        _application_id: ApplicationId,
        _token: &str,
        _message: &MessageResponse,
    ) -> ApiResult<MessageId> {
        self.calls.lock().push("followup".into());
        Ok(self.followups.fetch_add(1, Ordering::SeqCst) as u64 + 1)
    }

    async fn edit_original(
        &self,
        _application_id: ApplicationId,
        _token: &str,
        _message: &MessageResponse,
    ) -> ApiResult<()> {
        self.calls.lock().push("edit_original".into());
        Ok(())
    }
}

/// One guild whose members hold no roles beyond `@everyone`.
pub struct StaticGuild {
    guild: Guild,
}

impl StaticGuild {
    pub fn new(id: GuildId, owner_id: UserId) -> Self {
        Self {
            guild: Guild {
                id,
                name: "Support".into(),
                owner_id,
            },
        }
    }
}

#[async_trait]
impl GuildData for StaticGuild {
    async fn get_guild(&self, guild_id: GuildId) -> ApiResult<Guild> {
        if guild_id != self.guild.id {
            return Err(ApiError::not_found("guild", guild_id));
        }
        Ok(self.guild.clone())
    }

    async fn get_guild_member(&self, _guild_id: GuildId, user_id: UserId) -> ApiResult<Member> {
        Ok(Member::new(User::new(user_id, "member"), vec![]))
    }

    async fn get_guild_roles(&self, guild_id: GuildId) -> ApiResult<Vec<Role>> {
        Ok(vec![Role {
            id: guild_id,
            name: "@everyone".into(),
            permissions: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
            position: 0,
        }])
    }

    async fn get_channel(&self, channel_id: ChannelId) -> ApiResult<Channel> {
        Err(ApiError::not_found("channel", channel_id))
    }
}

/// A grant store without grants that accepts every write.
pub struct NoGrants;

#[async_trait]
impl GrantStore for NoGrants {
    async fn is_admin(&self, _guild_id: GuildId, _user_id: UserId) -> ApiResult<bool> {
        Ok(false)
    }

    async fn is_support(&self, _guild_id: GuildId, _user_id: UserId) -> ApiResult<bool> {
        Ok(false)
    }

    async fn get_admin_roles(&self, _guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        Ok(Vec::new())
    }

    async fn get_support_roles(&self, _guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        Ok(Vec::new())
    }

    async fn add_admin(&self, _guild_id: GuildId, _subject: GrantSubject) -> ApiResult<()> {
        Ok(())
    }

    async fn remove_admin(&self, _guild_id: GuildId, _subject: GrantSubject) -> ApiResult<()> {
        Ok(())
    }

    async fn add_support(&self, _guild_id: GuildId, _subject: GrantSubject) -> ApiResult<()> {
        Ok(())
    }

    async fn remove_support(&self, _guild_id: GuildId, _subject: GrantSubject) -> ApiResult<()> {
        Ok(())
    }
}

pub struct NoPremium;

#[async_trait]
impl PremiumLookup for NoPremium {
    async fn get_tier_by_guild(&self, _guild_id: GuildId) -> ApiResult<PremiumTier> {
        Ok(PremiumTier::None)
    }
}
