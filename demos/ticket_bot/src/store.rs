//! In-memory collaborators standing in for the REST client, the guild
//! cache, the grant database and the billing service.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use wicket::core::{
    ApiError, ApiResult, ApplicationId, Channel, ChannelId, GrantStore, GrantSubject, Guild,
    GuildData, GuildId, InitialResponse, InteractionApi, InteractionId, Member, MessageId,
    MessageResponse, PermissionOverwrite, Permissions, PremiumLookup, PremiumTier, Role, RoleId,
    User, UserId,
};

pub const GUILD_ID: GuildId = 500;
pub const TICKET_CHANNEL_ID: ChannelId = 600;
pub const STAFF_ROLE_ID: RoleId = 501;
pub const MANAGER_ROLE_ID: RoleId = 502;

// =============================================================================
// Interaction API
// =============================================================================

/// Prints every response call instead of sending it.
#[derive(Default)]
pub struct ConsoleApi {
    next_message: AtomicU64,
}

fn summary(message: &MessageResponse) -> String {
    let mut parts = Vec::new();
    if let Some(content) = &message.content {
        parts.push(content.clone());
    }
    for embed in &message.embeds {
        parts.push(format!(
            "[{}] {}",
            embed.title.as_deref().unwrap_or("embed"),
            embed.description.as_deref().unwrap_or_default()
        ));
    }
    if !message.components.is_empty() {
        parts.push(format!("({} component rows)", message.components.len()));
    }
    parts.join(" ")
}

#[async_trait]
impl InteractionApi for ConsoleApi {
    async fn create_response(
        &self,
        interaction_id: InteractionId,
        _token: &str,
        response: &InitialResponse,
    ) -> ApiResult<()> {
        let body = match response {
            InitialResponse::Message(m) | InitialResponse::UpdateMessage(m) => summary(m),
            InitialResponse::Modal(modal) => format!("modal \"{}\"", modal.title),
            InitialResponse::DeferredMessage { .. } | InitialResponse::DeferredUpdate => {
                String::new()
            }
        };
        info!(interaction_id, response = response.name(), %body, "-> create_response");
        Ok(())
    }

    async fn create_followup(
        &self,
        _application_id: ApplicationId,
        _token: &str,
        message: &MessageResponse,
    ) -> ApiResult<MessageId> {
        let id = 10_000 + self.next_message.fetch_add(1, Ordering::Relaxed);
        info!(message_id = id, body = %summary(message), "-> create_followup");
        Ok(id)
    }

    async fn edit_original(
        &self,
        _application_id: ApplicationId,
        _token: &str,
        message: &MessageResponse,
    ) -> ApiResult<()> {
        info!(body = %summary(message), "-> edit_original");
        Ok(())
    }
}

// =============================================================================
// Guild data
// =============================================================================

/// A single seeded guild.
pub struct MemoryGuilds {
    guild: Guild,
    roles: Vec<Role>,
    members: HashMap<UserId, Member>,
    channels: HashMap<ChannelId, Channel>,
}

impl MemoryGuilds {
    /// The support server: alice owns it, bob is staff, dave is a manager
    /// and carol is a regular member.
    pub fn seeded() -> Self {
        let role = |id, name: &str, permissions, position| Role {
            id,
            name: name.to_string(),
            permissions,
            position,
        };
        let roles = vec![
            role(
                GUILD_ID,
                "@everyone",
                Permissions::VIEW_CHANNEL
                    | Permissions::SEND_MESSAGES
                    | Permissions::READ_MESSAGE_HISTORY,
                0,
            ),
            role(STAFF_ROLE_ID, "Staff", Permissions::MANAGE_MESSAGES, 1),
            role(MANAGER_ROLE_ID, "Managers", Permissions::ADMINISTRATOR, 2),
        ];

        let member = |id, name: &str, roles: Vec<RoleId>| {
            (id, Member::new(User::new(id, name), roles))
        };
        let members = HashMap::from([
            member(7, "alice", vec![]),
            member(8, "bob", vec![STAFF_ROLE_ID]),
            member(9, "carol", vec![]),
            member(11, "dave", vec![MANAGER_ROLE_ID]),
        ]);

        // Only staff may read the ticket channel history.
        let channel = Channel {
            id: TICKET_CHANNEL_ID,
            guild_id: Some(GUILD_ID),
            name: Some("ticket-0001".into()),
            permission_overwrites: vec![
                PermissionOverwrite::role(
                    GUILD_ID,
                    Permissions::NONE,
                    Permissions::READ_MESSAGE_HISTORY,
                ),
                PermissionOverwrite::role(
                    STAFF_ROLE_ID,
                    Permissions::READ_MESSAGE_HISTORY,
                    Permissions::NONE,
                ),
            ],
        };

        Self {
            guild: Guild {
                id: GUILD_ID,
                name: "Support HQ".into(),
                owner_id: 7,
            },
            roles,
            members,
            channels: HashMap::from([(TICKET_CHANNEL_ID, channel)]),
        }
    }
}

#[async_trait]
impl GuildData for MemoryGuilds {
    async fn get_guild(&self, guild_id: GuildId) -> ApiResult<Guild> {
        if guild_id == self.guild.id {
            Ok(self.guild.clone())
        } else {
            Err(ApiError::not_found("guild", guild_id))
        }
    }

    async fn get_guild_member(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<Member> {
        if guild_id != self.guild.id {
            return Err(ApiError::not_found("guild", guild_id));
        }
        self.members
            .get(&user_id)
            .cloned()
            .ok_or(ApiError::not_found("member", user_id))
    }

    async fn get_guild_roles(&self, guild_id: GuildId) -> ApiResult<Vec<Role>> {
        if guild_id == self.guild.id {
            Ok(self.roles.clone())
        } else {
            Err(ApiError::not_found("guild", guild_id))
        }
    }

    async fn get_channel(&self, channel_id: ChannelId) -> ApiResult<Channel> {
        self.channels
            .get(&channel_id)
            .cloned()
            .ok_or(ApiError::not_found("channel", channel_id))
    }
}

// =============================================================================
// Grants
// =============================================================================

#[derive(Default)]
struct GuildGrants {
    admins: HashSet<GrantSubject>,
    support: HashSet<GrantSubject>,
}

impl GuildGrants {
    fn roles(set: &HashSet<GrantSubject>) -> Vec<RoleId> {
        set.iter()
            .filter_map(|s| match s {
                GrantSubject::Role(id) => Some(*id),
                GrantSubject::User(_) => None,
            })
            .collect()
    }
}

/// Explicit Admin/Support grants, per guild.
#[derive(Default)]
pub struct MemoryGrants {
    guilds: RwLock<HashMap<GuildId, GuildGrants>>,
}

impl MemoryGrants {
    /// Staff hold Support through their role.
    pub fn seeded() -> Self {
        let grants = Self::default();
        grants
            .guilds
            .write()
            .entry(GUILD_ID)
            .or_default()
            .support
            .insert(GrantSubject::Role(STAFF_ROLE_ID));
        grants
    }

    fn read<T>(&self, guild_id: GuildId, f: impl FnOnce(&GuildGrants) -> T) -> Option<T> {
        self.guilds.read().get(&guild_id).map(f)
    }

    fn write(&self, guild_id: GuildId, f: impl FnOnce(&mut GuildGrants)) {
        f(self.guilds.write().entry(guild_id).or_default());
    }
}

#[async_trait]
impl GrantStore for MemoryGrants {
    async fn is_admin(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<bool> {
        Ok(self
            .read(guild_id, |g| g.admins.contains(&GrantSubject::User(user_id)))
            .unwrap_or(false))
    }

    async fn is_support(&self, guild_id: GuildId, user_id: UserId) -> ApiResult<bool> {
        Ok(self
            .read(guild_id, |g| g.support.contains(&GrantSubject::User(user_id)))
            .unwrap_or(false))
    }

    async fn get_admin_roles(&self, guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        Ok(self
            .read(guild_id, |g| GuildGrants::roles(&g.admins))
            .unwrap_or_default())
    }

    async fn get_support_roles(&self, guild_id: GuildId) -> ApiResult<Vec<RoleId>> {
        Ok(self
            .read(guild_id, |g| GuildGrants::roles(&g.support))
            .unwrap_or_default())
    }

    async fn add_admin(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(guild_id, |g| {
            g.admins.insert(subject);
        });
        Ok(())
    }

    async fn remove_admin(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(guild_id, |g| {
            g.admins.remove(&subject);
        });
        Ok(())
    }

    async fn add_support(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(guild_id, |g| {
            g.support.insert(subject);
        });
        Ok(())
    }

    async fn remove_support(&self, guild_id: GuildId, subject: GrantSubject) -> ApiResult<()> {
        self.write(guild_id, |g| {
            g.support.remove(&subject);
        });
        Ok(())
    }
}

// =============================================================================
// Premium
// =============================================================================

/// Every guild on the same plan.
pub struct FixedPremium(pub PremiumTier);

#[async_trait]
impl PremiumLookup for FixedPremium {
    async fn get_tier_by_guild(&self, _guild_id: GuildId) -> ApiResult<PremiumTier> {
        Ok(self.0)
    }
}
