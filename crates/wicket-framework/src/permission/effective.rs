use std::sync::Arc;

use tracing::trace;

use wicket_core::{
    ApiResult, ChannelId, GuildData, GuildId, Member, OverwriteKind, PermissionOverwrite,
    Permissions, Role, UserId,
};

/// Composes a member's permission bitmask.
///
/// Layers, in order:
/// 1. the guild's "everyone" role (its id equals `guild_id`);
/// 2. the union of every role the member holds;
/// 3. with `overwrites`: the channel overwrite for "everyone";
/// 4. the union of the overwrites of held roles, deny bits cleared before
///    allow bits are set;
/// 5. the overwrite targeting the member.
///
/// A mask holding `ADMINISTRATOR` at any stage yields [`Permissions::ALL`].
pub fn compute_permissions(
    guild_id: GuildId,
    member: &Member,
    roles: &[Role],
    overwrites: Option<&[PermissionOverwrite]>,
) -> Permissions {
    let everyone = roles
        .iter()
        .find(|r| r.id == guild_id)
        .map(|r| r.permissions)
        .unwrap_or_default();

    let held: Permissions = roles
        .iter()
        .filter(|r| r.id != guild_id && member.has_role(r.id))
        .map(|r| r.permissions)
        .collect();

    let mut perms = everyone | held;
    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::ALL;
    }

    let Some(overwrites) = overwrites else {
        return perms;
    };

    if let Some(base) = overwrites
        .iter()
        .find(|o| o.kind == OverwriteKind::Role && o.id == guild_id)
    {
        perms = perms.apply_overwrite(base.allow, base.deny);
        if perms.contains(Permissions::ADMINISTRATOR) {
            return Permissions::ALL;
        }
    }

    let (allow, deny) = overwrites
        .iter()
        .filter(|o| o.kind == OverwriteKind::Role && o.id != guild_id && member.has_role(o.id))
        .fold((Permissions::NONE, Permissions::NONE), |(allow, deny), o| {
            (allow | o.allow, deny | o.deny)
        });
    perms = perms.apply_overwrite(allow, deny);
    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::ALL;
    }

    if let Some(own) = overwrites
        .iter()
        .find(|o| o.kind == OverwriteKind::Member && o.id == member.id())
    {
        perms = perms.apply_overwrite(own.allow, own.deny);
    }

    if perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::ALL;
    }
    perms
}

/// Fetches guild data and computes effective permissions.
///
/// Fetch failures are returned, never read as "no permission".
#[derive(Clone)]
pub struct EffectivePermissionCalculator {
    guild_data: Arc<dyn GuildData>,
}

impl EffectivePermissionCalculator {
    pub fn new(guild_data: Arc<dyn GuildData>) -> Self {
        Self { guild_data }
    }

    /// Guild-wide permissions of a user.
    pub async fn guild_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> ApiResult<Permissions> {
        let member = self.guild_data.get_guild_member(guild_id, user_id).await?;
        self.member_permissions(guild_id, &member, None).await
    }

    /// Channel-scoped permissions of a user.
    pub async fn channel_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> ApiResult<Permissions> {
        let member = self.guild_data.get_guild_member(guild_id, user_id).await?;
        self.member_permissions(guild_id, &member, Some(channel_id))
            .await
    }

    /// Permissions of an already-fetched member.
    pub async fn member_permissions(
        &self,
        guild_id: GuildId,
        member: &Member,
        channel_id: Option<ChannelId>,
    ) -> ApiResult<Permissions> {
        let roles = self.guild_data.get_guild_roles(guild_id).await?;
        let channel = match channel_id {
            Some(id) => Some(self.guild_data.get_channel(id).await?),
            None => None,
        };

        let perms = compute_permissions(
            guild_id,
            member,
            &roles,
            channel.as_ref().map(|c| c.permission_overwrites.as_slice()),
        );
        trace!(
            guild_id,
            user_id = member.id(),
            channel_id = ?channel_id,
            %perms,
            "Computed permissions"
        );
        Ok(perms)
    }

    /// Returns `true` if the user holds every bit of `required`.
    pub async fn has_permissions(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: Option<ChannelId>,
        required: Permissions,
    ) -> ApiResult<bool> {
        let perms = match channel_id {
            Some(channel_id) => {
                self.channel_permissions(guild_id, user_id, channel_id)
                    .await?
            }
            None => self.guild_permissions(guild_id, user_id).await?,
        };
        Ok(perms.has_all(required))
    }
}
