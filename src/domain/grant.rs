//! The grant: the single ACL atom everything else composes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Effect, GranteeRef, Permission, ResourceRef};

/// A single ACL grant.
///
/// Group membership is itself represented as a grant: `grantee={user:u}`,
/// `resource={group:g}`, `permission=member`. There is no separate
/// membership table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grant {
    pub id: String,
    pub grantee: GranteeRef,
    pub resource: ResourceRef,
    pub permission: Permission,
    pub effect: Effect,
    /// Whether this grant applies to descendants of `resource`, not just the
    /// exact resource. Ignored (the grant is invisible) for ancestors at
    /// depth > 0 when `false`.
    pub inherit: bool,
    /// Field-level restriction. `None` means unrestricted. Only meaningful
    /// for permissions where [`Permission::accepts_fields`] is true.
    pub fields: Option<Vec<String>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
}

impl Grant {
    /// A grant is live if it has no expiry or its expiry is still in the future.
    /// An expired grant is non-existent everywhere, even before the worker
    /// harvests it (§3 invariants).
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp > now,
            None => true,
        }
    }

    /// Whether this grant is visible to a lookup at the given depth from the
    /// resource actually being checked (depth 0 = the resource itself).
    pub fn visible_at_depth(&self, depth: u32) -> bool {
        depth == 0 || self.inherit
    }

    /// The uniqueness key: at most one live grant may exist per
    /// (grantee, resource, permission).
    pub fn uniqueness_key(&self) -> (GranteeRef, ResourceRef, Permission) {
        (self.grantee.clone(), self.resource.clone(), self.permission)
    }
}
