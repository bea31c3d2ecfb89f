//! Membership resolver: `groups_of(user)` over the membership-as-grant model.
//!
//! Group membership is not a separate table — it is a live grant with
//! `grantee={user:u}`, `resource={group:g}`, `permission=member`,
//! `effect=allow`. This keeps membership queries going through the same
//! expiry and uniqueness rules as every other grant (§4.2), and per the
//! spec's resolved open question, `member` is subject to `expires_at` just
//! like any other permission.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::Cache;
use crate::domain::{Effect, GranteeRef, Permission, ResourceKind};
use crate::error::Result;
use crate::store::GrantStore;

pub struct MembershipResolver {
    store: Arc<dyn GrantStore>,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl MembershipResolver {
    pub fn new(store: Arc<dyn GrantStore>, cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { store, cache, ttl }
    }

    /// The set of group ids `user_id` is a live member of.
    pub async fn groups_of(&self, user_id: &str) -> Result<Vec<String>> {
        if let Some(cached) = self.cache.get_user_groups(user_id).await {
            return Ok(cached);
        }

        let grants = self.store.by_user_as_grantee(user_id).await?;
        let groups: Vec<String> = grants
            .into_iter()
            .filter(|g| {
                g.effect == Effect::Allow
                    && g.permission == Permission::Member
                    && g.resource.kind == ResourceKind::Group
            })
            .map(|g| g.resource.id)
            .collect();

        self.cache.set_user_groups(user_id, groups.clone(), self.ttl).await;
        Ok(groups)
    }

    /// Whether a grant touches membership and so should invalidate the
    /// cached `groups_of` result for its user grantee.
    pub fn touches_membership(grantee: &GranteeRef, resource_kind: ResourceKind, permission: Permission) -> bool {
        grantee.kind == crate::domain::GranteeKind::User
            && resource_kind == ResourceKind::Group
            && permission == Permission::Member
    }
}
