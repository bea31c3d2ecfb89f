//! Core ACL types: grantees, resources, permissions, grants, and the
//! permission-strength lattice.

mod audit_event;
mod grant;
mod group;
mod lattice;
mod resource;
mod user;

pub use audit_event::{AuditEvent, AuditEventKind};
pub use grant::Grant;
pub use group::Group;
pub use lattice::{strength_closure, Lattice};
pub use resource::{GranteeKind, GranteeRef, ResourceKind, ResourceRef};
pub use user::{Principal, User};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five ordinary permissions plus `member`, which sits outside the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Member,
    Read,
    Write,
    Delete,
    Create,
    Manage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Member => "member",
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Delete => "delete",
            Permission::Create => "create",
            Permission::Manage => "manage",
        }
    }

    /// Permissions for which a field-restriction list is meaningful.
    /// `delete`, `create`, `manage`, and `member` ignore fields.
    pub fn accepts_fields(&self) -> bool {
        matches!(self, Permission::Read | Permission::Write)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a grant permits or blocks the permission it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}
