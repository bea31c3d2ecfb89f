//! Grant document schema — the core ACL table.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::domain::{Effect, Grant, GranteeKind, GranteeRef, Permission, ResourceKind, ResourceRef};

pub const GRANT_COLLECTION: &str = "grants";

/// Wire/disk schema for a grant, per SPEC_FULL.md §6. Enums are stored as
/// the lowercase string tags used throughout the spec.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct GrantDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub grant_id: String,
    pub grantee_type: String,
    pub grantee_id: String,
    pub resource_type: String,
    pub resource_id: String,
    pub permission: String,
    pub effect: String,
    pub inherit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<String>,
    pub granted_at: DateTime<Utc>,
}

impl From<&Grant> for GrantDoc {
    fn from(g: &Grant) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            grant_id: g.id.clone(),
            grantee_type: g.grantee.kind.as_str().to_string(),
            grantee_id: g.grantee.id.clone(),
            resource_type: g.resource.kind.as_str().to_string(),
            resource_id: g.resource.id.clone(),
            permission: g.permission.as_str().to_string(),
            effect: match g.effect {
                Effect::Allow => "allow".to_string(),
                Effect::Deny => "deny".to_string(),
            },
            inherit: g.inherit,
            fields: g.fields.clone(),
            expires_at: g.expires_at,
            granted_by: g.granted_by.clone(),
            granted_at: g.granted_at,
        }
    }
}

impl GrantDoc {
    pub fn into_grant(self) -> Option<Grant> {
        let grantee_kind = match self.grantee_type.as_str() {
            "user" => GranteeKind::User,
            "group" => GranteeKind::Group,
            _ => return None,
        };
        let resource_kind = ResourceKind::parse(&self.resource_type)?;
        let permission = match self.permission.as_str() {
            "member" => Permission::Member,
            "read" => Permission::Read,
            "write" => Permission::Write,
            "delete" => Permission::Delete,
            "create" => Permission::Create,
            "manage" => Permission::Manage,
            _ => return None,
        };
        let effect = match self.effect.as_str() {
            "allow" => Effect::Allow,
            "deny" => Effect::Deny,
            _ => return None,
        };

        Some(Grant {
            id: self.grant_id,
            grantee: GranteeRef { kind: grantee_kind, id: self.grantee_id },
            resource: ResourceRef { kind: resource_kind, id: self.resource_id },
            permission,
            effect,
            inherit: self.inherit,
            fields: self.fields,
            expires_at: self.expires_at,
            granted_by: self.granted_by,
            granted_at: self.granted_at,
        })
    }
}

impl IntoIndexes for GrantDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "grant_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("grant_id_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "grantee_type": 1, "grantee_id": 1 },
                Some(IndexOptions::builder().name("grantee_index".to_string()).build()),
            ),
            (
                doc! { "resource_type": 1, "resource_id": 1 },
                Some(IndexOptions::builder().name("resource_index".to_string()).build()),
            ),
            (
                doc! { "expires_at": 1 },
                Some(IndexOptions::builder().name("expires_at_index".to_string()).build()),
            ),
        ]
    }
}

impl MutMetadata for GrantDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
