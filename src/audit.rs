//! Append-only audit log of grant activity. Every issue, revoke, denial, and
//! worker-driven expiry is recorded; entries are never mutated or deleted
//! after insertion. Listing is superuser-only (§4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{AuditEvent, AuditEventKind, Permission, ResourceRef, User};
use crate::error::{Result, WardenError};

/// Optional filters for listing audit events (§4.6). All fields are `AND`ed.
#[derive(Debug, Default, Clone)]
pub struct AuditFilter {
    pub actor: Option<String>,
    pub target_user: Option<String>,
    pub target_group: Option<String>,
    pub resource: Option<ResourceRef>,
    pub kind: Option<AuditEventKind>,
}

impl AuditFilter {
    fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(actor) = &self.actor {
            if event.actor.as_deref() != Some(actor.as_str()) {
                return false;
            }
        }
        if let Some(target_user) = &self.target_user {
            if event.target_user.as_deref() != Some(target_user.as_str()) {
                return false;
            }
        }
        if let Some(target_group) = &self.target_group {
            if event.target_group.as_deref() != Some(target_group.as_str()) {
                return false;
            }
        }
        if let Some(resource) = &self.resource {
            if event.resource.as_ref() != Some(resource) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if event.kind != kind {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: AuditEvent) -> Result<()>;

    /// Most recent first, filtered, capped at `limit`.
    async fn list(&self, filter: &AuditFilter, limit: usize) -> Result<Vec<AuditEvent>>;
}

pub struct AuditLog {
    store: Arc<dyn AuditStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn log(
        &self,
        kind: AuditEventKind,
        actor: Option<String>,
        target_user: Option<String>,
        target_group: Option<String>,
        resource: Option<ResourceRef>,
        permission: Option<Permission>,
    ) -> Result<()> {
        let event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            kind,
            actor,
            target_user,
            target_group,
            resource,
            permission,
            details: HashMap::new(),
        };
        self.store.append(event).await
    }

    /// Listing is restricted to superusers; every other caller gets
    /// [`WardenError::Forbidden`] without ever touching the store.
    pub async fn list(&self, caller: &User, filter: AuditFilter, limit: usize) -> Result<Vec<AuditEvent>> {
        if !caller.is_admin {
            return Err(WardenError::Forbidden("audit log access requires superuser".to_string()));
        }
        self.store.list(&filter, limit).await
    }
}

/// In-process double for tests; append-only `Vec` behind a mutex.
#[derive(Default)]
pub struct InMemoryAuditStore {
    events: Mutex<Vec<AuditEvent>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter, limit: usize) -> Result<Vec<AuditEvent>> {
        let events = self.events.lock().unwrap();
        let mut matched: Vec<AuditEvent> = events.iter().rev().filter(|e| filter.matches(e)).cloned().collect();
        matched.truncate(limit);
        Ok(matched)
    }
}

/// MongoDB-backed store, appending to an append-only collection (no update,
/// no soft-delete path is ever exercised against it).
pub struct MongoAuditStore {
    collection: crate::db::mongo::MongoCollection<crate::db::schemas::AuditEventDoc>,
}

impl MongoAuditStore {
    pub async fn new(client: &crate::db::mongo::MongoClient) -> Result<Self> {
        let collection = client
            .collection::<crate::db::schemas::AuditEventDoc>(crate::db::schemas::AUDIT_EVENT_COLLECTION)
            .await?;
        Ok(Self { collection })
    }
}

#[async_trait]
impl AuditStore for MongoAuditStore {
    async fn append(&self, event: AuditEvent) -> Result<()> {
        let doc = crate::db::schemas::AuditEventDoc::from(&event);
        self.collection.insert_one(doc).await?;
        Ok(())
    }

    async fn list(&self, filter: &AuditFilter, limit: usize) -> Result<Vec<AuditEvent>> {
        let mut query = bson::Document::new();
        if let Some(actor) = &filter.actor {
            query.insert("actor", actor);
        }
        if let Some(target_user) = &filter.target_user {
            query.insert("target_user", target_user);
        }
        if let Some(target_group) = &filter.target_group {
            query.insert("target_group", target_group);
        }
        if let Some(resource) = &filter.resource {
            query.insert("resource_type", resource.kind.as_str());
            query.insert("resource_id", &resource.id);
        }
        if let Some(kind) = filter.kind {
            query.insert("kind", kind.as_str());
        }

        let mut docs = self.collection.find_many(query).await?;
        docs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        docs.truncate(limit);
        Ok(docs.into_iter().filter_map(crate::db::schemas::AuditEventDoc::into_event).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind;

    fn user(id: &str, is_admin: bool) -> User {
        User {
            id: id.to_string(),
            username: id.to_string(),
            display_name: None,
            email: Some(format!("{id}@example.com")),
            given_name: None,
            family_name: None,
            password_hash: String::new(),
            is_admin,
            disabled: false,
        }
    }

    #[tokio::test]
    async fn non_admin_cannot_list() {
        let log = AuditLog::new(Arc::new(InMemoryAuditStore::new()));
        let result = log.list(&user("bob", false), AuditFilter::default(), 10).await;
        assert!(matches!(result, Err(WardenError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admin_sees_most_recent_first() {
        let log = AuditLog::new(Arc::new(InMemoryAuditStore::new()));
        log.log(AuditEventKind::Granted, Some("root".into()), Some("alice".into()), None, None, None)
            .await
            .unwrap();
        log.log(AuditEventKind::Revoked, Some("root".into()), Some("alice".into()), None, None, None)
            .await
            .unwrap();

        let events = log.list(&user("root", true), AuditFilter::default(), 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, AuditEventKind::Revoked);
    }

    #[tokio::test]
    async fn filter_by_resource_narrows_results() {
        let log = AuditLog::new(Arc::new(InMemoryAuditStore::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        let site = ResourceRef::new(ResourceKind::Site, "site1");

        log.log(AuditEventKind::Granted, Some("root".into()), Some("alice".into()), None, Some(sensor.clone()), Some(Permission::Read))
            .await
            .unwrap();
        log.log(AuditEventKind::Granted, Some("root".into()), Some("bob".into()), None, Some(site), Some(Permission::Read))
            .await
            .unwrap();

        let filter = AuditFilter { resource: Some(sensor), ..Default::default() };
        let events = log.list(&user("root", true), filter, 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_user.as_deref(), Some("alice"));
    }
}
