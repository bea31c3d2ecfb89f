//! In-process TTL cache for decisions, memberships, and ancestor chains.
//!
//! Same shape as the blob/chunk tiers this crate's teacher ships: a
//! `DashMap` keyed by cache key, entries timestamped with `Instant` so TTL
//! expiry needs no background clock sync, atomic hit/miss counters, and a
//! background sweep task that evicts stale entries on an interval rather
//! than relying purely on lazy expiry-on-read.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::ResourceRef;

use super::{CachedDecision, Cache};

struct Entry<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Entry<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Cumulative hit/miss counters, surfaced for operational visibility.
#[derive(Debug, Default)]
pub struct TtlCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
}

impl TtlCacheStats {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed) as f64;
        let misses = self.misses.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }
}

pub struct TtlCache {
    decisions: DashMap<String, Entry<CachedDecision>>,
    user_groups: DashMap<String, Entry<Vec<String>>>,
    ancestors: DashMap<String, Entry<Vec<(ResourceRef, u32)>>>,
    stats: Arc<TtlCacheStats>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            decisions: DashMap::new(),
            user_groups: DashMap::new(),
            ancestors: DashMap::new(),
            stats: Arc::new(TtlCacheStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<TtlCacheStats> {
        self.stats.clone()
    }

    /// Sweep every tier for expired entries. Intended to run on an interval
    /// via [`spawn_cleanup_task`]; also safe to call directly from tests.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let before = self.decisions.len() + self.user_groups.len() + self.ancestors.len();

        self.decisions.retain(|_, e| e.is_live(now));
        self.user_groups.retain(|_, e| e.is_live(now));
        self.ancestors.retain(|_, e| e.is_live(now));

        let after = self.decisions.len() + self.user_groups.len() + self.ancestors.len();
        let evicted = before.saturating_sub(after);
        if evicted > 0 {
            self.stats.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, "cache sweep evicted expired entries");
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn a background task that periodically sweeps expired entries.
pub fn spawn_cleanup_task(cache: Arc<TtlCache>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            cache.cleanup_expired();
        }
    })
}

#[async_trait]
impl Cache for TtlCache {
    async fn get_decision(&self, key: &str) -> Option<CachedDecision> {
        let now = Instant::now();
        let hit = self.decisions.get(key).filter(|e| e.is_live(now)).map(|e| e.value.clone());
        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    async fn set_decision(&self, key: &str, value: CachedDecision, ttl: Duration) {
        self.decisions.insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
    }

    async fn get_user_groups(&self, user_id: &str) -> Option<Vec<String>> {
        let now = Instant::now();
        let key = super::CacheKeys::user_groups(user_id);
        let hit = self.user_groups.get(&key).filter(|e| e.is_live(now)).map(|e| e.value.clone());
        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    async fn set_user_groups(&self, user_id: &str, groups: Vec<String>, ttl: Duration) {
        let key = super::CacheKeys::user_groups(user_id);
        self.user_groups.insert(key, Entry { value: groups, expires_at: Instant::now() + ttl });
    }

    async fn get_ancestors(&self, resource: &ResourceRef) -> Option<Vec<(ResourceRef, u32)>> {
        let now = Instant::now();
        let key = super::CacheKeys::ancestors(resource);
        let hit = self.ancestors.get(&key).filter(|e| e.is_live(now)).map(|e| e.value.clone());
        if hit.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }
        hit
    }

    async fn set_ancestors(&self, resource: &ResourceRef, ancestors: Vec<(ResourceRef, u32)>, ttl: Duration) {
        let key = super::CacheKeys::ancestors(resource);
        self.ancestors.insert(key, Entry { value: ancestors, expires_at: Instant::now() + ttl });
    }

    async fn invalidate_user(&self, user_id: &str) {
        let prefix = super::CacheKeys::decision_user_prefix(user_id);
        self.decisions.retain(|k, _| !k.starts_with(&prefix));
        self.user_groups.remove(&super::CacheKeys::user_groups(user_id));
    }

    async fn invalidate_resource(&self, resource: &ResourceRef) {
        let fragment = super::CacheKeys::decision_resource_fragment(resource);
        self.decisions.retain(|k, _| !k.contains(&fragment));
    }

    async fn invalidate_ancestors(&self, resource: &ResourceRef) {
        self.ancestors.remove(&super::CacheKeys::ancestors(resource));
    }

    async fn invalidate_all_decisions(&self) {
        self.decisions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;
    use std::time::Duration;

    #[tokio::test]
    async fn decision_round_trips_until_expiry() {
        let cache = TtlCache::new();
        let r = ResourceRef::new(ResourceKind::Sensor, "s1");
        let key = super::super::CacheKeys::decision("alice", &r, crate::domain::Permission::Read);

        cache
            .set_decision(&key, CachedDecision { allowed: true, fields: None }, Duration::from_millis(50))
            .await;
        assert_eq!(
            cache.get_decision(&key).await,
            Some(CachedDecision { allowed: true, fields: None })
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get_decision(&key).await, None);
    }

    #[tokio::test]
    async fn invalidate_user_clears_only_that_users_decisions() {
        let cache = TtlCache::new();
        let r = ResourceRef::new(ResourceKind::Sensor, "s1");
        let alice_key = super::super::CacheKeys::decision("alice", &r, crate::domain::Permission::Read);
        let bob_key = super::super::CacheKeys::decision("bob", &r, crate::domain::Permission::Read);

        cache
            .set_decision(&alice_key, CachedDecision { allowed: true, fields: None }, Duration::from_secs(60))
            .await;
        cache
            .set_decision(&bob_key, CachedDecision { allowed: true, fields: None }, Duration::from_secs(60))
            .await;

        cache.invalidate_user("alice").await;

        assert_eq!(cache.get_decision(&alice_key).await, None);
        assert!(cache.get_decision(&bob_key).await.is_some());
    }

    #[tokio::test]
    async fn invalidate_all_decisions_clears_every_user() {
        let cache = TtlCache::new();
        let r = ResourceRef::new(ResourceKind::Sensor, "s1");
        let key = super::super::CacheKeys::decision("alice", &r, crate::domain::Permission::Read);

        cache
            .set_decision(&key, CachedDecision { allowed: true, fields: None }, Duration::from_secs(60))
            .await;
        cache.invalidate_all_decisions().await;
        assert_eq!(cache.get_decision(&key).await, None);
    }

    #[tokio::test]
    async fn cleanup_expired_evicts_stale_entries() {
        let cache = TtlCache::new();
        let r = ResourceRef::new(ResourceKind::Site, "site1");
        cache.set_ancestors(&r, vec![(r.clone(), 0)], Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        cache.cleanup_expired();
        assert_eq!(cache.stats().evictions.load(Ordering::Relaxed), 1);
    }
}
