//! In-memory collaborators shared by the unit tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use wicket_core::{
    ApiError, ApiResult, ApplicationId, Channel, ChannelId, GrantStore, GrantSubject, Guild,
    GuildData, GuildId, InitialResponse, Interaction, InteractionApi, InteractionData,
    InteractionId, Member, MessageId, MessageResponse, PermissionTier, PremiumLookup,
    PremiumTier, Role, RoleId, User, UserId,
};

use crate::error::CacheError;
use crate::handoff::ResponseReceiver;
use crate::permission::PermissionCache;

pub const TEST_GUILD: GuildId = 100;
pub const TEST_USER: UserId = 10;

/// A guild interaction from member [`TEST_USER`] of [`TEST_GUILD`].
pub fn guild_interaction(data: InteractionData) -> Interaction {
    Interaction::new(1, 2, "token", data)
        .in_guild(TEST_GUILD, Member::new(User::new(TEST_USER, "alice"), vec![]))
        .with_channel(500)
}

/// A DM interaction from [`TEST_USER`].
pub fn dm_interaction(data: InteractionData) -> Interaction {
    Interaction::new(1, 2, "token", data).in_dm(User::new(TEST_USER, "alice"))
}

/// Minimal acknowledgment owner: performs whatever arrives in the initial
/// slot, or nothing if the slot is dropped, then serves the edit slot.
pub fn spawn_owner(api: Arc<MockApi>, mut receiver: ResponseReceiver) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(handoff) = receiver.initial.recv().await {
            let result = api.create_response(1, "token", handoff.payload()).await;
            receiver.mark_acknowledged();
            handoff.complete(result);
        } else {
            receiver.mark_acknowledged();
        }

        if let Some(handoff) = receiver.edit.recv().await {
            let result = api.edit_original(2, "token", handoff.payload()).await;
            handoff.complete(result);
        }
    })
}

// =============================================================================
// InteractionApi
// =============================================================================

#[derive(Default)]
pub struct MockApi {
    responses: Mutex<Vec<&'static str>>,
    pub followups: AtomicUsize,
    pub edits: AtomicUsize,
    pub fail_responses: AtomicBool,
    next_message: AtomicU64,
}

impl MockApi {
    /// Names of the initial responses sent, in order.
    pub fn responses(&self) -> Vec<&'static str> {
        self.responses.lock().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.responses.lock().len()
            + self.followups.load(Ordering::SeqCst)
            + self.edits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InteractionApi for MockApi {
    async fn create_response(
        &self,
        _interaction_id: InteractionId,
        _token: &str,
        response: &InitialResponse,
    ) -> ApiResult<()> {
        self.responses.lock().push(response.name());
        if self.fail_responses.load(Ordering::SeqCst) {
            return Err(ApiError::Http {
                status: 400,
                message: "unknown interaction".into(),
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
        self.followups.fetch_add(1, Ordering::SeqCst);
        Ok(1000 + self.next_message.fetch_add(1, Ordering::SeqCst))
    }

    async fn edit_original(
        &self,
        _application_id: ApplicationId,
        _token: &str,
        _message: &MessageResponse,
    ) -> ApiResult<()> {
        self.edits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// =============================================================================
// GuildData
// =============================================================================

pub struct MockGuildData {
    guild: Guild,
    members: Mutex<HashMap<UserId, Member>>,
    roles: Mutex<Vec<Role>>,
    channels: Mutex<HashMap<ChannelId, Channel>>,
    guild_fails: AtomicBool,
    roles_fail: AtomicBool,
    pub guild_calls: AtomicUsize,
    pub member_calls: AtomicUsize,
    pub role_calls: AtomicUsize,
    pub channel_calls: AtomicUsize,
}

impl MockGuildData {
    pub fn new(guild_id: GuildId, owner_id: UserId) -> Self {
        Self {
            guild: Guild {
                id: guild_id,
                name: "Test guild".into(),
                owner_id,
            },
            members: Mutex::new(HashMap::new()),
            roles: Mutex::new(Vec::new()),
            channels: Mutex::new(HashMap::new()),
            guild_fails: AtomicBool::new(false),
            roles_fail: AtomicBool::new(false),
            guild_calls: AtomicUsize::new(0),
            member_calls: AtomicUsize::new(0),
            role_calls: AtomicUsize::new(0),
            channel_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_member(&self, member: Member) {
        self.members.lock().insert(member.id(), member);
    }

    pub fn set_roles(&self, roles: Vec<Role>) {
        *self.roles.lock() = roles;
    }

    pub fn add_channel(&self, channel: Channel) {
        self.channels.lock().insert(channel.id, channel);
    }

    pub fn fail_guild(&self) {
        self.guild_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_roles(&self) {
        self.roles_fail.store(true, Ordering::SeqCst);
    }

    pub fn total_calls(&self) -> usize {
        self.guild_calls.load(Ordering::SeqCst)
            + self.member_calls.load(Ordering::SeqCst)
            + self.role_calls.load(Ordering::SeqCst)
            + self.channel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GuildData for MockGuildData {
    async fn get_guild(&self, guild_id: GuildId) -> ApiResult<Guild> {
        self.guild_calls.fetch_add(1, Ordering::SeqCst);
        if self.guild_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("connection reset".into()));
        }
        if guild_id != self.guild.id {
            return Err(ApiError::not_found("guild", guild_id));
        }
        Ok(self.guild.clone())
    }

    async fn get_guild_member(&self, _guild_id: GuildId, user_id: UserId) -> ApiResult<Member> {
        self.member_calls.fetch_add(1, Ordering::SeqCst);
        self.members
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or(ApiError::not_found("member", user_id))
    }

    async fn get_guild_roles(&self, _guild_id: GuildId) -> ApiResult<Vec<Role>> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        if self.roles_fail.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout);
        }
        Ok(self.roles.lock().clone())
    }

    async fn get_channel(&self, channel_id: ChannelId) -> ApiResult<Channel> {
        self.channel_calls.fetch_add(1, Ordering::SeqCst);
        self.channels
            .lock()
            .get(&channel_id)
            .cloned()
            .ok_or(ApiError::not_found("channel", channel_id))
    }
}

// =============================================================================
// GrantStore
// =============================================================================

#[derive(Default)]
pub struct MockGrants {
    pub admin_users: Mutex<Vec<UserId>>,
    pub admin_roles: Mutex<Vec<RoleId>>,
    pub support_users: Mutex<Vec<UserId>>,
    pub support_roles: Mutex<Vec<RoleId>>,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
    pub is_admin_calls: AtomicUsize,
    pub admin_roles_calls: AtomicUsize,
    pub is_support_calls: AtomicUsize,
    pub support_roles_calls: AtomicUsize,
}

impl MockGrants {
    pub fn total_calls(&self) -> usize {
        self.is_admin_calls.load(Ordering::SeqCst)
            + self.admin_roles_calls.load(Ordering::SeqCst)
            + self.is_support_calls.load(Ordering::SeqCst)
            + self.support_roles_calls.load(Ordering::SeqCst)
    }

    fn read<T>(&self, counter: &AtomicUsize, value: impl FnOnce() -> T) -> ApiResult<T> {
        counter.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ApiError::Other("database unavailable".into()));
        }
        Ok(value())
    }

    fn write(
        &self,
        subject: GrantSubject,
        users: &Mutex<Vec<u64>>,
        roles: &Mutex<Vec<u64>>,
        add: bool,
    ) -> ApiResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ApiError::Other("database unavailable".into()));
        }
        let list = if subject.is_role() { roles } else { users };
        let mut list = list.lock();
        list.retain(|id| *id != subject.id());
        if add {
            list.push(subject.id());
        }
        Ok(())
    }
}

#[async_trait]
impl GrantStore for MockGrants {
    async fn is_admin(&self, _guild_id: GuildId, user_id: UserId) -> ApiResult<bool> {
        self.read(&self.is_admin_calls, || {
            self.admin_users.lock().contains(&user_id)
        })
    }

    async fn is_support(&self, _guild_id: GuildId, user_id: UserId) -> ApiResult<bool> {
        self.read(&self.is_support_calls, || {
            self.support_users.lock().contains(&user_id)
        })
    }

    async fn get_admin_roles(&self, _guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        self.read(&self.admin_roles_calls, || self.admin_roles.lock().clone())
    }

    async fn get_support_roles(&self, _guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        self.read(&self.support_roles_calls, || {
            self.support_roles.lock().clone()
        })
    }

    async fn add_admin(&self, _guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(subject, &self.admin_users, &self.admin_roles, true)
    }

    async fn remove_admin(&self, _guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(subject, &self.admin_users, &self.admin_roles, false)
    }

    async fn add_support(&self, _guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(subject, &self.support_users, &self.support_roles, true)
    }

    async fn remove_support(&self, _guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(subject, &self.support_users, &self.support_roles, false)
    }
}

// =============================================================================
// PremiumLookup
// =============================================================================

#[derive(Default)]
pub struct MockPremium {
    pub tiers: Mutex<HashMap<GuildId, PremiumTier>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl PremiumLookup for MockPremium {
    async fn get_tier_by_guild(&self, guild_id: GuildId) -> ApiResult<PremiumTier> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ApiError::Timeout);
        }
        Ok(self
            .tiers
            .lock()
            .get(&guild_id)
            .copied()
            .unwrap_or(PremiumTier::None))
    }
}

// =============================================================================
// PermissionCache
// =============================================================================

/// A cache backend that is always down.
#[derive(Default)]
pub struct FailingCache {
    pub get_calls: AtomicUsize,
    pub set_calls: AtomicUsize,
    pub clear_calls: AtomicUsize,
}

impl FailingCache {
    fn unavailable() -> CacheError {
        CacheError::Unavailable("connection refused".into())
    }
}

#[async_trait]
impl PermissionCache for FailingCache {
    async fn get(
        &self,
        _guild_id: GuildId,
        _subject_id: u64,
    ) -> Result<Option<PermissionTier>, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn set(
        &self,
        _guild_id: GuildId,
        _subject_id: u64,
        _tier: PermissionTier,
    ) -> Result<(), CacheError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    async fn clear_guild(&self, _guild_id: GuildId) -> Result<(), CacheError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }
}
