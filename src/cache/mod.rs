//! The decision/membership/ancestor cache: a best-effort accelerator, never
//! authoritative. A miss or error falls through to the store; a write
//! failure is logged, not fatal (§5).

mod keys;
mod ttl;

pub use keys::CacheKeys;
pub use ttl::TtlCache;

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::ResourceRef;

/// A cached decision: whether the permission is allowed, and the field
/// restriction if any (`None` fields with `allowed = true` means
/// unrestricted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDecision {
    pub allowed: bool,
    pub fields: Option<Vec<String>>,
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get_decision(&self, key: &str) -> Option<CachedDecision>;
    async fn set_decision(&self, key: &str, value: CachedDecision, ttl: Duration);

    async fn get_user_groups(&self, user_id: &str) -> Option<Vec<String>>;
    async fn set_user_groups(&self, user_id: &str, groups: Vec<String>, ttl: Duration);

    async fn get_ancestors(&self, resource: &ResourceRef) -> Option<Vec<(ResourceRef, u32)>>;
    async fn set_ancestors(&self, resource: &ResourceRef, ancestors: Vec<(ResourceRef, u32)>, ttl: Duration);

    /// Per-user invalidation: every cached decision for `user_id`, plus its
    /// cached group membership.
    async fn invalidate_user(&self, user_id: &str);

    /// Per-resource invalidation: every cached decision on `resource`. Used
    /// by the grant lifecycle when a grant on that resource changes and the
    /// grantee is a user (narrow) as well as whenever ancestors change.
    async fn invalidate_resource(&self, resource: &ResourceRef);

    async fn invalidate_ancestors(&self, resource: &ResourceRef);

    /// Global decision flush. Used when a group grant changes: the source
    /// system resolves this globally rather than per-affected-user (see
    /// DESIGN.md open question decision), since narrowing would require
    /// tracking which users are in which groups at invalidation time.
    async fn invalidate_all_decisions(&self);
}

/// A [`Cache`] that never remembers anything — every `get_*` misses, every
/// `set_*`/`invalidate_*` is a no-op. Selected when `--cache-enabled=false`,
/// forcing every check to recompute against the grant store (§6a).
#[derive(Default)]
pub struct NullCache;

#[async_trait]
impl Cache for NullCache {
    async fn get_decision(&self, _key: &str) -> Option<CachedDecision> {
        None
    }
    async fn set_decision(&self, _key: &str, _value: CachedDecision, _ttl: Duration) {}

    async fn get_user_groups(&self, _user_id: &str) -> Option<Vec<String>> {
        None
    }
    async fn set_user_groups(&self, _user_id: &str, _groups: Vec<String>, _ttl: Duration) {}

    async fn get_ancestors(&self, _resource: &ResourceRef) -> Option<Vec<(ResourceRef, u32)>> {
        None
    }
    async fn set_ancestors(&self, _resource: &ResourceRef, _ancestors: Vec<(ResourceRef, u32)>, _ttl: Duration) {}

    async fn invalidate_user(&self, _user_id: &str) {}
    async fn invalidate_resource(&self, _resource: &ResourceRef) {}
    async fn invalidate_ancestors(&self, _resource: &ResourceRef) {}
    async fn invalidate_all_decisions(&self) {}
}
