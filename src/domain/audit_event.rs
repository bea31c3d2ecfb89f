//! Audit events: immutable records of grant lifecycle and denial activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{GranteeKind, Permission, ResourceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditEventKind {
    Granted,
    Revoked,
    Denied,
    Expired,
}

impl AuditEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::Granted => "granted",
            AuditEventKind::Revoked => "revoked",
            AuditEventKind::Denied => "denied",
            AuditEventKind::Expired => "expired",
        }
    }
}

/// An immutable audit log entry. Never mutated after insertion; purged only
/// by retention policy (not implemented here — retention is an operational
/// concern external to the engine).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: AuditEventKind,
    pub actor: Option<String>,
    pub target_user: Option<String>,
    pub target_group: Option<String>,
    pub resource: Option<ResourceRef>,
    pub permission: Option<Permission>,
    pub details: HashMap<String, String>,
}

impl AuditEvent {
    pub fn target_grantee_kind(&self) -> Option<GranteeKind> {
        if self.target_user.is_some() {
            Some(GranteeKind::User)
        } else if self.target_group.is_some() {
            Some(GranteeKind::Group)
        } else {
            None
        }
    }
}
