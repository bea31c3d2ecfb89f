//! Idempotent superuser seeding. On startup, creates the configured
//! bootstrap superuser if no superuser account exists yet; a no-op on every
//! subsequent start.

use tracing::info;

use crate::auth::hash_password;
use crate::domain::User;
use crate::error::Result;
use crate::store::users::UserStore;

/// Ensure at least one superuser exists, creating `username` with
/// `password` (Argon2-hashed) if the store has none. Never overwrites an
/// existing account, even if `username` already exists as a non-admin.
pub async fn ensure_superuser(users: &dyn UserStore, username: &str, password: &str) -> Result<()> {
    if users.any_admin_exists().await? {
        return Ok(());
    }

    if users.find_by_username(username).await?.is_some() {
        info!(username, "bootstrap superuser username already taken by a non-admin account, skipping seed");
        return Ok(());
    }

    let password_hash = hash_password(password)?;
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        display_name: Some("Superuser".to_string()),
        email: None,
        given_name: None,
        family_name: None,
        password_hash,
        is_admin: true,
        disabled: false,
    };
    users.create(user).await?;
    info!(username, "bootstrap superuser created");
    Ok(())
}
