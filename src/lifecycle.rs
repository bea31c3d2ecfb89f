//! Grant lifecycle: issue, revoke, and the two auto-grant conveniences,
//! each paired with the invalidation fan-out and audit append the spec
//! requires to happen atomically alongside the mutation (§4.5).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::audit::AuditLog;
use crate::cache::Cache;
use crate::domain::{
    AuditEventKind, Effect, Grant, GranteeKind, GranteeRef, Permission, ResourceRef,
};
use crate::error::{Result, WardenError};
use crate::membership::MembershipResolver;
use crate::store::GrantStore;

pub struct GrantLifecycle {
    store: Arc<dyn GrantStore>,
    cache: Arc<dyn Cache>,
    audit: Arc<AuditLog>,
}

impl GrantLifecycle {
    pub fn new(store: Arc<dyn GrantStore>, cache: Arc<dyn Cache>, audit: Arc<AuditLog>, _ancestor_ttl: Duration) -> Self {
        Self { store, cache, audit }
    }

    /// Validate, persist, invalidate, and audit-log a new grant.
    pub async fn issue(&self, mut grant: Grant, actor: &str) -> Result<Grant> {
        self.validate(&grant)?;
        if grant.id.is_empty() {
            grant.id = Uuid::new_v4().to_string();
        }

        let stored = self.store.put(grant).await?;
        self.invalidate_for(&stored).await;

        self.audit
            .log(
                AuditEventKind::Granted,
                Some(actor.to_string()),
                target_user(&stored),
                target_group(&stored),
                Some(stored.resource.clone()),
                Some(stored.permission),
            )
            .await?;

        Ok(stored)
    }

    /// Read, delete, invalidate, and audit-log the revocation of a grant.
    pub async fn revoke(&self, grant_id: &str, actor: &str) -> Result<()> {
        let grant = self
            .store
            .delete(grant_id)
            .await?
            .ok_or_else(|| WardenError::NotFound(format!("grant {} not found", grant_id)))?;

        self.invalidate_for(&grant).await;

        self.audit
            .log(
                AuditEventKind::Revoked,
                Some(actor.to_string()),
                target_user(&grant),
                target_group(&grant),
                Some(grant.resource.clone()),
                Some(grant.permission),
            )
            .await?;

        Ok(())
    }

    /// Atomic with resource creation: issue a `manage`/allow/`inherit=true`
    /// grant to the creator. Revocable like any other grant.
    pub async fn auto_grant_manage_on_create(&self, creator: &str, resource: ResourceRef) -> Result<Grant> {
        let grant = Grant {
            id: Uuid::new_v4().to_string(),
            grantee: GranteeRef::user(creator),
            resource,
            permission: Permission::Manage,
            effect: Effect::Allow,
            inherit: true,
            fields: None,
            expires_at: None,
            granted_by: Some(creator.to_string()),
            granted_at: Utc::now(),
        };
        self.issue(grant, creator).await
    }

    /// Convenience wrapper targeting `(user, group, member)`, `inherit=false`, `effect=allow`.
    pub async fn auto_grant_member(&self, user_id: &str, group_id: &str, actor: &str) -> Result<Grant> {
        let grant = Grant {
            id: Uuid::new_v4().to_string(),
            grantee: GranteeRef::user(user_id),
            resource: ResourceRef::new(crate::domain::ResourceKind::Group, group_id),
            permission: Permission::Member,
            effect: Effect::Allow,
            inherit: false,
            fields: None,
            expires_at: None,
            granted_by: Some(actor.to_string()),
            granted_at: Utc::now(),
        };
        self.issue(grant, actor).await
    }

    fn validate(&self, grant: &Grant) -> Result<()> {
        if grant.permission == Permission::Member && grant.resource.kind != crate::domain::ResourceKind::Group {
            return Err(WardenError::BadRequest(
                "member permission is only meaningful on group resources".to_string(),
            ));
        }
        if !grant.permission.accepts_fields() && grant.fields.is_some() {
            return Err(WardenError::BadRequest(format!(
                "{} does not accept a field restriction list",
                grant.permission
            )));
        }
        if let Some(expires_at) = grant.expires_at {
            if expires_at <= Utc::now() {
                return Err(WardenError::BadRequest("expires_at must be in the future".to_string()));
            }
        }
        Ok(())
    }

    async fn invalidate_for(&self, grant: &Grant) {
        match grant.grantee.kind {
            GranteeKind::User => {
                self.cache.invalidate_user(&grant.grantee.id).await;
                self.cache.invalidate_resource(&grant.resource).await;
            }
            GranteeKind::Group => {
                // Source system resolves group-grant invalidation globally
                // rather than tracing which users are currently members
                // (see DESIGN.md open question decision).
                self.cache.invalidate_all_decisions().await;
            }
        }

        if MembershipResolver::touches_membership(
            &grant.grantee,
            grant.resource.kind,
            grant.permission,
        ) {
            self.cache.invalidate_user(&grant.grantee.id).await;
        }

        if grant.resource.kind.is_hierarchical() && grant.resource.kind == crate::domain::ResourceKind::Site {
            self.cache.invalidate_ancestors(&grant.resource).await;
        }
    }
}

fn target_user(grant: &Grant) -> Option<String> {
    (grant.grantee.kind == GranteeKind::User).then(|| grant.grantee.id.clone())
}

fn target_group(grant: &Grant) -> Option<String> {
    (grant.grantee.kind == GranteeKind::Group).then(|| grant.grantee.id.clone())
}
