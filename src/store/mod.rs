//! Grant persistence: the single source of truth for ACL state.
//!
//! `GrantStore` is the trait the rest of the engine depends on; `mongo`
//! provides the production implementation and `memory` an in-process
//! double used by tests and the in-memory demo path. All reads filter
//! `expires_at` against "now" — an expired grant is invisible everywhere,
//! independent of the worker (§3, §4.3).

pub mod memory;
pub mod mongo;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Grant, GranteeRef, Permission, ResourceRef};
use crate::error::Result;

pub use memory::InMemoryGrantStore;
pub use mongo::MongoGrantStore;

/// A set of grantees to fetch grants for, paired with the resources (the
/// ancestor chain) they might hold grants on.
pub struct GranteeResourceQuery<'a> {
    pub grantees: &'a [GranteeRef],
    pub resources: &'a [ResourceRef],
    pub permissions: &'a [Permission],
}

#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert a grant. Rejects a duplicate on the (grantee, resource,
    /// permission) uniqueness key with [`crate::error::WardenError::Conflict`].
    async fn put(&self, grant: Grant) -> Result<Grant>;

    /// Delete a grant by id. `Ok(None)` if it did not exist.
    async fn delete(&self, id: &str) -> Result<Option<Grant>>;

    async fn get(&self, id: &str) -> Result<Option<Grant>>;

    /// All live grants on exactly this resource (no ancestor walk).
    async fn by_resource(&self, resource: &ResourceRef) -> Result<Vec<Grant>>;

    /// Batched fetch: live grants whose grantee is in `grantees`, whose
    /// resource is in `resources`, and whose permission is in `permissions`.
    /// This is the query the decision engine's gather step runs.
    async fn by_grantee_set_and_resources(
        &self,
        query: GranteeResourceQuery<'_>,
    ) -> Result<Vec<Grant>>;

    /// All live grants where `user_id` is the grantee (directly, not via
    /// group membership).
    async fn by_user_as_grantee(&self, user_id: &str) -> Result<Vec<Grant>>;

    /// Grants expiring within `[now, now + within]`, ordered by `expires_at`.
    async fn expiring(&self, now: DateTime<Utc>, within: chrono::Duration) -> Result<Vec<Grant>>;

    /// Grants whose `expires_at` is at or before `now` — the worker's harvest set.
    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Grant>>;
}
