use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use wicket_core::{
    GrantStore, GrantSubject, GuildData, GuildId, Member, PermissionTier, Permissions, UserId,
};

use super::cache::PermissionCache;
use super::effective::EffectivePermissionCalculator;
use crate::error::{PermissionError, PermissionResult};

/// Resolves the [`PermissionTier`] of guild members.
///
/// The cascade, first match wins:
///
/// 1. cached tier;
/// 2. bot operator → Admin;
/// 3. guild owner → Admin;
/// 4. explicit user Admin grant → Admin;
/// 5. explicit role Admin grant on a held role → Admin;
/// 6. effective `ADMINISTRATOR` permission → Admin;
/// 7. explicit user Support grant → Support;
/// 8. explicit role Support grant on a held role → Support;
/// 9. Everyone.
///
/// Admin and Support results are written back to the cache on a detached
/// task. Lookup failures in steps 3–5, 7 and 8 are logged and skipped;
/// failing to fetch the role data for step 6 aborts with an error.
pub struct PermissionResolver {
    operators: HashSet<UserId>,
    guild_data: Arc<dyn GuildData>,
    grants: Arc<dyn GrantStore>,
    cache: Arc<dyn PermissionCache>,
    calculator: EffectivePermissionCalculator,
}

impl PermissionResolver {
    pub fn new(
        guild_data: Arc<dyn GuildData>,
        grants: Arc<dyn GrantStore>,
        cache: Arc<dyn PermissionCache>,
    ) -> Self {
        Self {
            operators: HashSet::new(),
            calculator: EffectivePermissionCalculator::new(guild_data.clone()),
            guild_data,
            grants,
            cache,
        }
    }

    /// Sets the static bot-operator allow-list.
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = UserId>) -> Self {
        self.operators = operators.into_iter().collect();
        self
    }

    pub fn calculator(&self) -> &EffectivePermissionCalculator {
        &self.calculator
    }

    /// Fetches the member, then resolves its tier.
    pub async fn resolve_user(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> PermissionResult<PermissionTier> {
        let member = self
            .guild_data
            .get_guild_member(guild_id, user_id)
            .await
            .map_err(|source| PermissionError::Member {
                guild_id,
                user_id,
                source,
            })?;
        self.resolve(guild_id, &member).await
    }

    /// Resolves the tier of `member` in `guild_id`.
    pub async fn resolve(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> PermissionResult<PermissionTier> {
        let user_id = member.id();

        match self.cache.get(guild_id, user_id).await {
            Ok(Some(tier)) => {
                debug!(guild_id, user_id, %tier, "Permission tier cache hit");
                return Ok(tier);
            }
            Ok(None) => {}
            Err(e) => warn!(guild_id, user_id, error = %e, "Permission cache read failed"),
        }

        let tier = self.resolve_uncached(guild_id, member).await?;
        debug!(guild_id, user_id, %tier, "Resolved permission tier");
        if tier > PermissionTier::Everyone {
            self.cache_detached(guild_id, user_id, tier);
        }
        Ok(tier)
    }

    async fn resolve_uncached(
        &self,
        guild_id: GuildId,
        member: &Member,
    ) -> PermissionResult<PermissionTier> {
        let user_id = member.id();

        if self.operators.contains(&user_id) {
            return Ok(PermissionTier::Admin);
        }

        match self.guild_data.get_guild(guild_id).await {
            Ok(guild) if guild.owner_id == user_id => return Ok(PermissionTier::Admin),
            Ok(_) => {}
            Err(e) => warn!(guild_id, user_id, error = %e, "Failed to fetch guild owner"),
        }

        let admin_grant = self.grants.is_admin(guild_id, user_id).await;
        if self.check(guild_id, user_id, "admin grant", admin_grant) {
            return Ok(PermissionTier::Admin);
        }

        match self.grants.get_admin_roles(guild_id).await {
            Ok(roles) if member.has_any_role(&roles) => return Ok(PermissionTier::Admin),
            Ok(_) => {}
            Err(e) => warn!(guild_id, user_id, error = %e, "Failed to fetch admin roles"),
        }

        let perms = self
            .calculator
            .member_permissions(guild_id, member, None)
            .await?;
        if perms.contains(Permissions::ADMINISTRATOR) {
            return Ok(PermissionTier::Admin);
        }

        let support_grant = self.grants.is_support(guild_id, user_id).await;
        if self.check(guild_id, user_id, "support grant", support_grant) {
            return Ok(PermissionTier::Support);
        }

        match self.grants.get_support_roles(guild_id).await {
            Ok(roles) if member.has_any_role(&roles) => return Ok(PermissionTier::Support),
            Ok(_) => {}
            Err(e) => warn!(guild_id, user_id, error = %e, "Failed to fetch support roles"),
        }

        Ok(PermissionTier::Everyone)
    }

    /// Reads a boolean lookup, treating failure as "no match".
    fn check(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        what: &'static str,
        result: wicket_core::ApiResult<bool>,
    ) -> bool {
        result.unwrap_or_else(|e| {
            warn!(guild_id, user_id, lookup = what, error = %e, "Grant lookup failed");
            false
        })
    }

    /// Best-effort cache write on a detached task.
    fn cache_detached(&self, guild_id: GuildId, user_id: UserId, tier: PermissionTier) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.set(guild_id, user_id, tier).await {
                warn!(guild_id, user_id, error = %e, "Failed to cache permission tier");
            }
        });
    }

    // =========================================================================
    // Grants
    // =========================================================================

    /// Grants `tier` to a user or role and overwrites the cache before
    /// returning. Granting `Everyone` is a revocation.
    pub async fn grant(
        &self,
        guild_id: GuildId,
        subject: GrantSubject,
        tier: PermissionTier,
    ) -> PermissionResult<()> {
        let stored = match tier {
            PermissionTier::Admin => self.grants.add_admin(guild_id, subject).await,
            PermissionTier::Support => self.grants.add_support(guild_id, subject).await,
            PermissionTier::Everyone => return self.revoke(guild_id, subject).await,
        };
        stored.map_err(|source| PermissionError::Store { guild_id, source })?;

        self.overwrite_cache(guild_id, subject, tier).await?;
        debug!(guild_id, subject = ?subject, %tier, "Granted permission tier");
        Ok(())
    }

    /// Removes every explicit grant of a user or role and overwrites the
    /// cache before returning.
    pub async fn revoke(&self, guild_id: GuildId, subject: GrantSubject) -> PermissionResult<()> {
        self.grants
            .remove_admin(guild_id, subject)
            .await
            .map_err(|source| PermissionError::Store { guild_id, source })?;
        self.grants
            .remove_support(guild_id, subject)
            .await
            .map_err(|source| PermissionError::Store { guild_id, source })?;

        self.overwrite_cache(guild_id, subject, PermissionTier::Everyone)
            .await?;
        debug!(guild_id, subject = ?subject, "Revoked permission tier");
        Ok(())
    }

    async fn overwrite_cache(
        &self,
        guild_id: GuildId,
        subject: GrantSubject,
        tier: PermissionTier,
    ) -> PermissionResult<()> {
        // Holders of a role are unknown, so every entry of the guild goes.
        if subject.is_role() {
            self.cache.clear_guild(guild_id).await?;
        }
        self.cache.set(guild_id, subject.id(), tier).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use wicket_core::{ApiError, Role, User};

    use super::*;
    use crate::permission::MemoryPermissionCache;
    use crate::testing::{FailingCache, MockGrants, MockGuildData};

    const GUILD: GuildId = 100;
    const OWNER: UserId = 1;
    const USER: UserId = 10;
    const STAFF_ROLE: u64 = 300;

    struct Fixture {
        data: Arc<MockGuildData>,
        grants: Arc<MockGrants>,
        cache: Arc<MemoryPermissionCache>,
        resolver: PermissionResolver,
    }

    fn fixture() -> Fixture {
        let data = Arc::new(MockGuildData::new(GUILD, OWNER));
        data.set_roles(vec![Role {
            id: GUILD,
            name: "@everyone".into(),
            permissions: Permissions::VIEW_CHANNEL,
            position: 0,
        }]);
        let grants = Arc::new(MockGrants::default());
        let cache = Arc::new(MemoryPermissionCache::default());
        let resolver = PermissionResolver::new(data.clone(), grants.clone(), cache.clone())
            .with_operators([42]);
        Fixture {
            data,
            grants,
            cache,
            resolver,
        }
    }

    fn member(id: UserId, roles: Vec<u64>) -> Member {
        Member::new(User::new(id, "member"), roles)
    }

    /// Lets detached cache writes run.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_operator_short_circuits_everything() {
        let f = fixture();
        let tier = f.resolver.resolve(GUILD, &member(42, vec![])).await.unwrap();

        assert_eq!(tier, PermissionTier::Admin);
        assert_eq!(f.data.guild_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.grants.total_calls(), 0);
        assert_eq!(f.data.role_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_owner_stops_before_grant_lookups() {
        let f = fixture();
        let tier = f.resolver.resolve(GUILD, &member(OWNER, vec![])).await.unwrap();

        assert_eq!(tier, PermissionTier::Admin);
        assert_eq!(f.data.guild_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.grants.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_role_admin_grant_stops_before_effective_permissions() {
        let f = fixture();
        f.grants.admin_roles.lock().push(STAFF_ROLE);

        let tier = f
            .resolver
            .resolve(GUILD, &member(USER, vec![STAFF_ROLE]))
            .await
            .unwrap();

        assert_eq!(tier, PermissionTier::Admin);
        assert_eq!(f.grants.is_admin_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.grants.admin_roles_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.data.role_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.grants.is_support_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.grants.support_roles_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_administrator_bit_is_admin() {
        let f = fixture();
        f.data.set_roles(vec![Role {
            id: STAFF_ROLE,
            name: "Mods".into(),
            permissions: Permissions::ADMINISTRATOR,
            position: 1,
        }]);

        let tier = f
            .resolver
            .resolve(GUILD, &member(USER, vec![STAFF_ROLE]))
            .await
            .unwrap();
        assert_eq!(tier, PermissionTier::Admin);
        assert_eq!(f.grants.is_support_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_support_role_and_everyone() {
        let f = fixture();
        f.grants.support_roles.lock().push(STAFF_ROLE);

        let support = f
            .resolver
            .resolve(GUILD, &member(USER, vec![STAFF_ROLE]))
            .await
            .unwrap();
        assert_eq!(support, PermissionTier::Support);

        let everyone = f.resolver.resolve(GUILD, &member(11, vec![])).await.unwrap();
        assert_eq!(everyone, PermissionTier::Everyone);
        assert_eq!(f.grants.support_roles_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_resolve_is_cache_hit() {
        let f = fixture();
        f.grants.support_users.lock().push(USER);
        let m = member(USER, vec![]);

        let first = f.resolver.resolve(GUILD, &m).await.unwrap();
        settle().await;
        let calls = (f.data.total_calls(), f.grants.total_calls());

        let second = f.resolver.resolve(GUILD, &m).await.unwrap();
        assert_eq!(first, PermissionTier::Support);
        assert_eq!(second, first);
        assert_eq!((f.data.total_calls(), f.grants.total_calls()), calls);
    }

    #[tokio::test]
    async fn test_lookup_failures_continue_role_failure_aborts() {
        let f = fixture();
        f.data.fail_guild();
        f.grants.fail_reads.store(true, Ordering::SeqCst);

        // Owner and grant lookups fail but the cascade reaches Everyone.
        let tier = f.resolver.resolve(GUILD, &member(OWNER, vec![])).await.unwrap();
        assert_eq!(tier, PermissionTier::Everyone);

        f.data.fail_roles();
        let err = f.resolver.resolve(GUILD, &member(USER, vec![])).await;
        assert!(matches!(err, Err(PermissionError::Effective(_))));
    }

    #[tokio::test]
    async fn test_resolve_user_member_fetch_failure_aborts() {
        let f = fixture();
        let err = f.resolver.resolve_user(GUILD, 999).await;
        assert!(matches!(
            err,
            Err(PermissionError::Member {
                source: ApiError::NotFound { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_grant_and_revoke_overwrite_cache_synchronously() {
        let f = fixture();
        let m = member(USER, vec![]);

        f.resolver
            .grant(GUILD, GrantSubject::User(USER), PermissionTier::Admin)
            .await
            .unwrap();
        assert_eq!(
            f.cache.get(GUILD, USER).await.unwrap(),
            Some(PermissionTier::Admin)
        );
        assert_eq!(f.resolver.resolve(GUILD, &m).await.unwrap(), PermissionTier::Admin);

        f.resolver
            .revoke(GUILD, GrantSubject::User(USER))
            .await
            .unwrap();
        assert_eq!(
            f.resolver.resolve(GUILD, &m).await.unwrap(),
            PermissionTier::Everyone
        );
        assert!(f.grants.admin_users.lock().is_empty());
    }

    #[tokio::test]
    async fn test_role_grant_clears_guild_entries() {
        let f = fixture();
        f.cache.set(GUILD, USER, PermissionTier::Support).await.unwrap();
        f.cache.set(GUILD + 1, USER, PermissionTier::Support).await.unwrap();

        f.resolver
            .grant(GUILD, GrantSubject::Role(STAFF_ROLE), PermissionTier::Admin)
            .await
            .unwrap();

        assert_eq!(f.cache.get(GUILD, USER).await.unwrap(), None);
        assert_eq!(
            f.cache.get(GUILD, STAFF_ROLE).await.unwrap(),
            Some(PermissionTier::Admin)
        );
        assert_eq!(
            f.cache.get(GUILD + 1, USER).await.unwrap(),
            Some(PermissionTier::Support)
        );
        assert_eq!(
            f.resolver
                .resolve(GUILD, &member(USER, vec![STAFF_ROLE]))
                .await
                .unwrap(),
            PermissionTier::Admin
        );
    }

    #[tokio::test]
    async fn test_grant_store_failure_is_returned() {
        let f = fixture();
        f.grants.fail_writes.store(true, Ordering::SeqCst);

        let err = f
            .resolver
            .grant(GUILD, GrantSubject::User(USER), PermissionTier::Support)
            .await;
        assert!(matches!(err, Err(PermissionError::Store { .. })));
        assert!(f.cache.is_empty());
    }

    fn with_failing_cache(f: &Fixture) -> (Arc<FailingCache>, PermissionResolver) {
        let cache = Arc::new(FailingCache::default());
        let resolver = PermissionResolver::new(f.data.clone(), f.grants.clone(), cache.clone());
        (cache, resolver)
    }

    #[tokio::test]
    async fn test_cache_failures_fall_through_to_lookups() {
        let f = fixture();
        f.grants.support_users.lock().push(USER);
        let (cache, resolver) = with_failing_cache(&f);
        let m = member(USER, vec![]);

        let tier = resolver.resolve(GUILD, &m).await.unwrap();
        settle().await;
        assert_eq!(tier, PermissionTier::Support);
        assert_eq!(cache.get_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.set_calls.load(Ordering::SeqCst), 1);

        // Nothing was stored, so the second call runs the lookups again.
        let again = resolver.resolve(GUILD, &m).await.unwrap();
        assert_eq!(again, PermissionTier::Support);
        assert_eq!(f.grants.is_support_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_grant_and_revoke_report_cache_failures() {
        let f = fixture();
        let (cache, resolver) = with_failing_cache(&f);

        let granted = resolver
            .grant(GUILD, GrantSubject::User(USER), PermissionTier::Admin)
            .await;
        assert!(matches!(granted, Err(PermissionError::Cache(_))));
        assert_eq!(cache.set_calls.load(Ordering::SeqCst), 1);

        let revoked = resolver.revoke(GUILD, GrantSubject::User(USER)).await;
        assert!(matches!(revoked, Err(PermissionError::Cache(_))));

        // Role changes fail on the guild-wide clear before any write.
        let role = resolver
            .grant(GUILD, GrantSubject::Role(STAFF_ROLE), PermissionTier::Support)
            .await;
        assert!(matches!(role, Err(PermissionError::Cache(_))));
        assert_eq!(cache.clear_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.set_calls.load(Ordering::SeqCst), 2);
    }
}
