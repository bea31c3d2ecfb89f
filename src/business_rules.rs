//! Self-service field restriction enforcement for user profile edits.
//!
//! A user may always edit their own `{email, password, given_name,
//! family_name}`. Changing `{username, is_admin, disabled}` — on anyone,
//! including oneself — requires superuser. This mirrors the field-list
//! shape the grant engine already uses for resource permissions, but it is
//! a fixed business rule rather than a configurable grant.

use std::collections::HashSet;

use crate::auth::hash_password;
use crate::domain::{Principal, User};
use crate::error::{Result, WardenError};

/// Fields a non-admin may change on their own account.
pub const SELF_SERVICE_FIELDS: &[&str] = &["email", "password", "given_name", "family_name"];

/// Fields that only a superuser may change, on any account.
pub const SUPERUSER_ONLY_FIELDS: &[&str] = &["username", "is_admin", "disabled"];

/// A requested profile update. `password` is the plaintext new password, if
/// any — hashed here rather than by the caller.
#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    pub is_admin: Option<bool>,
    pub disabled: Option<bool>,
}

impl ProfileUpdate {
    fn requested_fields(&self) -> HashSet<&'static str> {
        let mut fields = HashSet::new();
        if self.email.is_some() {
            fields.insert("email");
        }
        if self.given_name.is_some() {
            fields.insert("given_name");
        }
        if self.family_name.is_some() {
            fields.insert("family_name");
        }
        if self.password.is_some() {
            fields.insert("password");
        }
        if self.username.is_some() {
            fields.insert("username");
        }
        if self.is_admin.is_some() {
            fields.insert("is_admin");
        }
        if self.disabled.is_some() {
            fields.insert("disabled");
        }
        fields
    }
}

/// Apply `update` to `target`, enforcing that `caller` is authorized for
/// every field it touches: self-service fields on one's own account always
/// pass, superuser-only fields require `caller.is_admin`, and any edit to
/// someone else's account requires `caller.is_admin` even for self-service
/// fields.
pub fn apply_profile_update(caller: &Principal, target: &mut User, update: ProfileUpdate) -> Result<()> {
    let editing_self = caller.id == target.id;
    let requested = update.requested_fields();

    for field in &requested {
        let self_service = SELF_SERVICE_FIELDS.contains(field);
        let allowed = caller.is_admin || (editing_self && self_service);
        if !allowed {
            return Err(WardenError::Forbidden(format!(
                "field '{}' cannot be changed{}",
                field,
                if editing_self { " without superuser" } else { " on another account" }
            )));
        }
    }

    if let Some(email) = update.email {
        target.email = Some(email);
    }
    if let Some(given_name) = update.given_name {
        target.given_name = Some(given_name);
    }
    if let Some(family_name) = update.family_name {
        target.family_name = Some(family_name);
    }
    if let Some(password) = update.password {
        target.password_hash = hash_password(&password)?;
    }
    if let Some(username) = update.username {
        target.username = username;
    }
    if let Some(is_admin) = update.is_admin {
        target.is_admin = is_admin;
    }
    if let Some(disabled) = update.disabled {
        target.disabled = disabled;
    }

    Ok(())
}
