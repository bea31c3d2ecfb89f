//! User principal.

use serde::{Deserialize, Serialize};

/// A user account.
///
/// Self-service edits are restricted to `{email, password, given_name,
/// family_name}`; `{username, is_admin, disabled}` may be changed on
/// oneself only by a superuser. Business-rule enforcement for this lives in
/// [`crate::business_rules`], not here — this type is pure data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub disabled: bool,
}

impl User {
    pub fn as_principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            is_admin: self.is_admin && !self.disabled,
        }
    }
}

/// The minimal view of a caller the decision engine needs: an id and whether
/// it bypasses evaluation. Superusers short-circuit at fast path 1 (§4.4)
/// without the engine ever touching the grant store, so the engine is never
/// handed a full [`User`] — only this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, is_admin: bool) -> Self {
        Self { id: id.into(), is_admin }
    }
}
