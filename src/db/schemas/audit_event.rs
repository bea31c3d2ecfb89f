//! Audit event document schema — append-only, never mutated after insert.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::{AuditEvent, AuditEventKind};

pub const AUDIT_EVENT_COLLECTION: &str = "audit_events";

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct AuditEventDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub actor: Option<String>,
    pub target_user: Option<String>,
    pub target_group: Option<String>,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub permission: Option<String>,
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl From<&AuditEvent> for AuditEventDoc {
    fn from(e: &AuditEvent) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            event_id: e.id.clone(),
            timestamp: e.timestamp,
            kind: e.kind.as_str().to_string(),
            actor: e.actor.clone(),
            target_user: e.target_user.clone(),
            target_group: e.target_group.clone(),
            resource_type: e.resource.as_ref().map(|r| r.kind.as_str().to_string()),
            resource_id: e.resource.as_ref().map(|r| r.id.clone()),
            permission: e.permission.map(|p| p.as_str().to_string()),
            details: e.details.clone(),
        }
    }
}

impl AuditEventDoc {
    pub fn into_event(self) -> Option<AuditEvent> {
        let kind = match self.kind.as_str() {
            "granted" => AuditEventKind::Granted,
            "revoked" => AuditEventKind::Revoked,
            "denied" => AuditEventKind::Denied,
            "expired" => AuditEventKind::Expired,
            _ => return None,
        };
        let resource = match (self.resource_type.as_deref(), self.resource_id) {
            (Some(kind_str), Some(id)) => {
                crate::domain::ResourceKind::parse(kind_str).map(|k| crate::domain::ResourceRef::new(k, id))
            }
            _ => None,
        };
        let permission = self.permission.as_deref().and_then(|p| match p {
            "member" => Some(crate::domain::Permission::Member),
            "read" => Some(crate::domain::Permission::Read),
            "write" => Some(crate::domain::Permission::Write),
            "delete" => Some(crate::domain::Permission::Delete),
            "create" => Some(crate::domain::Permission::Create),
            "manage" => Some(crate::domain::Permission::Manage),
            _ => None,
        });

        Some(AuditEvent {
            id: self.event_id,
            timestamp: self.timestamp,
            kind,
            actor: self.actor,
            target_user: self.target_user,
            target_group: self.target_group,
            resource,
            permission,
            details: self.details,
        })
    }
}

impl IntoIndexes for AuditEventDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "event_id": 1 },
                Some(IndexOptions::builder().unique(true).name("event_id_unique".to_string()).build()),
            ),
            (
                doc! { "timestamp": -1 },
                Some(IndexOptions::builder().name("timestamp_desc".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for AuditEventDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
