use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use wicket_core::{GuildId, PermissionTier};

use crate::error::CacheError;

/// Default lifetime of a cached tier.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// Store of resolved tiers keyed by `(guild, subject)`.
///
/// The subject is a user id, or a role id for entries written by role
/// grants. Entries are authoritative snapshots; writes are last-write-wins.
#[async_trait]
pub trait PermissionCache: Send + Sync {
    async fn get(
        &self,
        guild_id: GuildId,
        subject_id: u64,
    ) -> Result<Option<PermissionTier>, CacheError>;

    async fn set(
        &self,
        guild_id: GuildId,
        subject_id: u64,
        tier: PermissionTier,
    ) -> Result<(), CacheError>;

    /// Drops every entry of the guild.
    async fn clear_guild(&self, guild_id: GuildId) -> Result<(), CacheError>;
}

/// In-process [`PermissionCache`] with a per-entry TTL.
#[derive(Debug)]
pub struct MemoryPermissionCache {
    ttl: Duration,
    entries: RwLock<HashMap<(GuildId, u64), (PermissionTier, Instant)>>,
}

impl Default for MemoryPermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl MemoryPermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl PermissionCache for MemoryPermissionCache {
    async fn get(
        &self,
        guild_id: GuildId,
        subject_id: u64,
    ) -> Result<Option<PermissionTier>, CacheError> {
        let entries = self.entries.read();
        Ok(entries
            .get(&(guild_id, subject_id))
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(tier, _)| *tier))
    }

    async fn set(
        &self,
        guild_id: GuildId,
        subject_id: u64,
        tier: PermissionTier,
    ) -> Result<(), CacheError> {
        let expires = Instant::now() + self.ttl;
        let mut entries = self.entries.write();
        entries.retain(|_, (_, at)| *at > Instant::now());
        entries.insert((guild_id, subject_id), (tier, expires));
        Ok(())
    }

    async fn clear_guild(&self, guild_id: GuildId) -> Result<(), CacheError> {
        self.entries.write().retain(|(guild, _), _| *guild != guild_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_and_clear_guild() {
        let cache = MemoryPermissionCache::default();
        cache.set(1, 10, PermissionTier::Admin).await.unwrap();
        cache.set(1, 11, PermissionTier::Support).await.unwrap();
        cache.set(2, 10, PermissionTier::Support).await.unwrap();

        assert_eq!(cache.get(1, 10).await.unwrap(), Some(PermissionTier::Admin));
        assert_eq!(cache.get(1, 12).await.unwrap(), None);

        cache.clear_guild(1).await.unwrap();
        assert_eq!(cache.get(1, 10).await.unwrap(), None);
        assert_eq!(cache.get(2, 10).await.unwrap(), Some(PermissionTier::Support));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = MemoryPermissionCache::new(Duration::from_secs(30));
        cache.set(1, 10, PermissionTier::Admin).await.unwrap();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert_eq!(cache.get(1, 10).await.unwrap(), Some(PermissionTier::Admin));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get(1, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let cache = MemoryPermissionCache::default();
        cache.set(1, 10, PermissionTier::Admin).await.unwrap();
        cache.set(1, 10, PermissionTier::Everyone).await.unwrap();
        assert_eq!(cache.get(1, 10).await.unwrap(), Some(PermissionTier::Everyone));
        assert_eq!(cache.len(), 1);
    }
}
