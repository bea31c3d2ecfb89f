//! Cache key formats, matching the source system's exact conventions so
//! invalidation patterns line up: `perm:{user}:{kind}:{id}:{perm}`,
//! `user_groups:{user}`, `ancestors:{kind}:{id}`.

use crate::domain::{Permission, ResourceRef};

pub struct CacheKeys;

impl CacheKeys {
    pub fn decision(user_id: &str, resource: &ResourceRef, permission: Permission) -> String {
        format!("perm:{}:{}:{}:{}", user_id, resource.kind, resource.id, permission)
    }

    /// Prefix matching every cached decision for `user_id`, any resource, any permission.
    pub fn decision_user_prefix(user_id: &str) -> String {
        format!("perm:{}:", user_id)
    }

    /// Fragment matching every cached decision on `resource`, for any user/permission.
    /// `{user}` is the leading key segment so this isn't a prefix; callers scan for
    /// keys containing this fragment.
    pub fn decision_resource_fragment(resource: &ResourceRef) -> String {
        format!(":{}:{}:", resource.kind, resource.id)
    }

    pub fn user_groups(user_id: &str) -> String {
        format!("user_groups:{}", user_id)
    }

    pub fn ancestors(resource: &ResourceRef) -> String {
        format!("ancestors:{}:{}", resource.kind, resource.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;

    #[test]
    fn decision_key_matches_source_format() {
        let r = ResourceRef::new(ResourceKind::Sensor, "s1");
        assert_eq!(CacheKeys::decision("alice", &r, Permission::Read), "perm:alice:sensor:s1:read");
    }

    #[test]
    fn user_groups_key_matches_source_format() {
        assert_eq!(CacheKeys::user_groups("alice"), "user_groups:alice");
    }

    #[test]
    fn ancestors_key_matches_source_format() {
        let r = ResourceRef::new(ResourceKind::Plan, "p1");
        assert_eq!(CacheKeys::ancestors(&r), "ancestors:plan:p1");
    }
}
