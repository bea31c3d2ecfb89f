//! The decision engine: `check(user, resource, permission) -> (allowed, fields?)`.
//!
//! Pure with respect to a store/cache snapshot — no mutexes or engine-owned
//! state here, only injected trait objects, the way `auth/permissions.rs` in
//! the teacher is a pure function module with no internal state of its own.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use crate::audit::AuditLog;
use crate::cache::{CachedDecision, Cache};
use crate::domain::{
    strength_closure, AuditEventKind, Effect, GranteeKind, GranteeRef, Permission, Principal,
    ResourceKind, ResourceRef,
};
use crate::error::Result;
use crate::hierarchy::{self, ResourceGraph};
use crate::membership::MembershipResolver;
use crate::store::{GranteeResourceQuery, GrantStore};

/// Name resolution for display purposes; the grant graph itself only ever
/// stores ids. Implemented by whatever owns the user/group tables.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn user_name(&self, user_id: &str) -> Option<String>;
    async fn group_name(&self, group_id: &str) -> Option<String>;
    /// Every (grantee, is_group) pair that might hold a grant, for the
    /// permission matrix's row set.
    async fn all_grantees(&self) -> Vec<(GranteeRef, String)>;
}

/// One permission the caller holds (or doesn't) on a resource, and where an
/// allow came from — `"me"` for a direct grant, the group's display name
/// otherwise. The payload behind a verbose denial (§4.6/§7).
#[derive(Debug, Clone)]
pub struct PermissionSource {
    pub permission: Permission,
    pub allowed: bool,
    pub via: String,
}

/// Result of [`DecisionEngine::check_verbose`]: the ordinary decision, plus
/// every permission the caller holds on the resource and its source, for a
/// caller that wants to explain a forbidden response in detail.
#[derive(Debug, Clone)]
pub struct VerboseDenial {
    pub decision: Decision,
    pub sources: Vec<PermissionSource>,
}

/// A decision: whether the permission is allowed, and the field restriction
/// if any. `fields = None` with `allowed = true` means unrestricted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub fields: Option<Vec<String>>,
}

impl Decision {
    pub fn allow_all() -> Self {
        Self { allowed: true, fields: None }
    }

    pub fn deny() -> Self {
        Self { allowed: false, fields: None }
    }
}

pub struct DecisionEngine {
    store: Arc<dyn GrantStore>,
    cache: Arc<dyn Cache>,
    graph: Arc<dyn ResourceGraph>,
    membership: Arc<MembershipResolver>,
    decision_ttl: Duration,
    ancestor_ttl: Duration,
}

impl DecisionEngine {
    pub fn new(
        store: Arc<dyn GrantStore>,
        cache: Arc<dyn Cache>,
        graph: Arc<dyn ResourceGraph>,
        membership: Arc<MembershipResolver>,
        decision_ttl: Duration,
        ancestor_ttl: Duration,
    ) -> Self {
        Self { store, cache, graph, membership, decision_ttl, ancestor_ttl }
    }

    /// `check(user, resource, permission)`.
    pub async fn check(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        permission: Permission,
    ) -> Result<Decision> {
        // Fast path 1: superuser bypass, no other state consulted.
        if principal.is_admin {
            return Ok(Decision::allow_all());
        }

        let cache_key = crate::cache::CacheKeys::decision(&principal.id, resource, permission);

        // Fast path 2: decision cache hit.
        if let Some(cached) = self.cache.get_decision(&cache_key).await {
            return Ok(Decision { allowed: cached.allowed, fields: cached.fields });
        }

        let decision = self.evaluate(principal, resource, permission).await?;

        self.cache
            .set_decision(
                &cache_key,
                CachedDecision { allowed: decision.allowed, fields: decision.fields.clone() },
                self.decision_ttl,
            )
            .await;

        Ok(decision)
    }

    /// Bulk check: one decision per input, in the same order.
    pub async fn check_many(
        &self,
        principal: &Principal,
        requests: &[(ResourceRef, Permission)],
    ) -> Result<Vec<Decision>> {
        let mut out = Vec::with_capacity(requests.len());
        for (resource, permission) in requests {
            out.push(self.check(principal, resource, *permission).await?);
        }
        Ok(out)
    }

    /// `check`, plus the "verbose deny" path of §4.6/§7: on denial, logs an
    /// [`AuditEventKind::Denied`] event and returns every permission the
    /// caller holds on the resource (with its source) alongside the ordinary
    /// decision. Routine `false` returns from [`Self::check`] are never
    /// logged — only a caller that explicitly asks for this form pays the
    /// audit-write cost.
    pub async fn check_verbose(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        permission: Permission,
        audit: &AuditLog,
        directory: &dyn Directory,
    ) -> Result<VerboseDenial> {
        let decision = self.check(principal, resource, permission).await?;
        let sources = self.permission_sources(principal, resource, directory).await?;

        if !decision.allowed {
            audit
                .log(
                    AuditEventKind::Denied,
                    Some(principal.id.clone()),
                    Some(principal.id.clone()),
                    None,
                    Some(resource.clone()),
                    Some(permission),
                )
                .await?;
        }

        Ok(VerboseDenial { decision, sources })
    }

    /// Every allow the caller holds on `resource`'s ancestor chain (direct or
    /// via group, inheritance-gated the same way [`Self::evaluate`] is),
    /// tagged with its source — grounded on the original system's
    /// `raise_permission_denied` permission-sources list.
    async fn permission_sources(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        directory: &dyn Directory,
    ) -> Result<Vec<PermissionSource>> {
        const ALL_PERMISSIONS: [Permission; 6] = [
            Permission::Member,
            Permission::Read,
            Permission::Write,
            Permission::Delete,
            Permission::Create,
            Permission::Manage,
        ];

        let groups = self.membership.groups_of(&principal.id).await?;
        let ancestors = self.ancestors_cached(resource).await?;

        let mut grantees: Vec<GranteeRef> = vec![GranteeRef::user(&principal.id)];
        grantees.extend(groups.into_iter().map(GranteeRef::group));

        let resources: Vec<ResourceRef> = ancestors.iter().map(|(r, _)| r.clone()).collect();
        let depth_of = |r: &ResourceRef| -> u32 {
            ancestors.iter().find(|(ar, _)| ar == r).map(|(_, d)| *d).unwrap_or(0)
        };

        let grants = self
            .store
            .by_grantee_set_and_resources(GranteeResourceQuery {
                grantees: &grantees,
                resources: &resources,
                permissions: &ALL_PERMISSIONS,
            })
            .await?;

        let now = Utc::now();
        let mut seen = BTreeSet::new();
        let mut sources = Vec::new();
        for grant in grants {
            if grant.effect != Effect::Allow || !grant.is_live(now) {
                continue;
            }
            let depth = depth_of(&grant.resource);
            if !grant.visible_at_depth(depth) {
                continue;
            }
            if !seen.insert(grant.permission) {
                continue;
            }
            let via = match grant.grantee.kind {
                GranteeKind::User => "me".to_string(),
                GranteeKind::Group => directory
                    .group_name(&grant.grantee.id)
                    .await
                    .unwrap_or_else(|| grant.grantee.id.clone()),
            };
            sources.push(PermissionSource { permission: grant.permission, allowed: true, via });
        }
        Ok(sources)
    }

    async fn ancestors_cached(&self, resource: &ResourceRef) -> Result<Vec<(ResourceRef, u32)>> {
        if let Some(cached) = self.cache.get_ancestors(resource).await {
            return Ok(cached);
        }
        let chain = hierarchy::ancestors(self.graph.as_ref(), resource).await?;
        self.cache.set_ancestors(resource, chain.clone(), self.ancestor_ttl).await;
        Ok(chain)
    }

    async fn evaluate(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        permission: Permission,
    ) -> Result<Decision> {
        let groups = self.membership.groups_of(&principal.id).await?;
        let ancestors = self.ancestors_cached(resource).await?;
        let permission_closure = strength_closure(permission);

        let mut grantees: Vec<GranteeRef> = vec![GranteeRef::user(&principal.id)];
        grantees.extend(groups.into_iter().map(GranteeRef::group));

        let resources: Vec<ResourceRef> = ancestors.iter().map(|(r, _)| r.clone()).collect();
        let depth_of = |r: &ResourceRef| -> u32 {
            ancestors.iter().find(|(ar, _)| ar == r).map(|(_, d)| *d).unwrap_or(0)
        };

        let grants = self
            .store
            .by_grantee_set_and_resources(GranteeResourceQuery {
                grantees: &grantees,
                resources: &resources,
                permissions: permission_closure,
            })
            .await?;

        // Deny-wins: process denies before allows, independent of original
        // fetch order, then apply inheritance gating to both.
        let now = Utc::now();
        let mut denies = Vec::new();
        let mut allows = Vec::new();
        for grant in grants {
            if !grant.is_live(now) {
                continue;
            }
            let depth = depth_of(&grant.resource);
            if !grant.visible_at_depth(depth) {
                continue;
            }
            match grant.effect {
                Effect::Deny => denies.push(grant),
                Effect::Allow => allows.push(grant),
            }
        }

        if !denies.is_empty() {
            debug!(user = %principal.id, resource = %resource, ?permission, "deny grant blocks access");
            return Ok(Decision::deny());
        }

        let mut unrestricted = false;
        let mut field_union: BTreeSet<String> = BTreeSet::new();
        for grant in &allows {
            match &grant.fields {
                None => {
                    unrestricted = true;
                }
                Some(fields) => {
                    field_union.extend(fields.iter().cloned());
                }
            }
        }

        if unrestricted {
            return Ok(Decision::allow_all());
        }
        if !field_union.is_empty() {
            return Ok(Decision { allowed: true, fields: Some(field_union.into_iter().collect()) });
        }
        if !allows.is_empty() {
            // Allows matched but none carried a field list and none was unrestricted —
            // only possible for permissions that ignore fields (accepts_fields() == false).
            return Ok(Decision::allow_all());
        }

        // Nothing matched: fall back to resource-kind defaults.
        if resource.kind.is_catalog() {
            return Ok(self.catalog_default(permission));
        }

        Ok(Decision::deny())
    }

    fn catalog_default(&self, permission: Permission) -> Decision {
        match permission {
            Permission::Read => Decision::allow_all(),
            _ => Decision::deny(),
        }
    }
}

/// Helper for the catalog default's "require superuser for mutating perms"
/// half of §4.4 Finalize: a caller checking a catalog kind for read gets the
/// default allow above; a caller checking a mutating permission only gets
/// through fast path 1 (the superuser bypass) or an explicit grant — the
/// default here is deliberately deny, not a second superuser check, since
/// `check` already ran that fast path before `evaluate` was ever called.
pub fn resource_kind_has_defaults(kind: ResourceKind) -> bool {
    kind.is_catalog()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlCache;
    use crate::domain::{Grant, ResourceKind};
    use crate::hierarchy::ResourceGraph;
    use crate::store::InMemoryGrantStore;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeGraph(HashMap<ResourceRef, ResourceRef>);

    #[async_trait]
    impl ResourceGraph for FakeGraph {
        async fn parent_of(&self, resource: &ResourceRef) -> Result<Option<ResourceRef>> {
            Ok(self.0.get(resource).cloned())
        }
    }

    struct FakeDirectory;

    #[async_trait]
    impl Directory for FakeDirectory {
        async fn user_name(&self, user_id: &str) -> Option<String> {
            Some(user_id.to_string())
        }
        async fn group_name(&self, group_id: &str) -> Option<String> {
            Some(format!("group:{group_id}"))
        }
        async fn all_grantees(&self) -> Vec<(GranteeRef, String)> {
            Vec::new()
        }
    }

    fn engine(graph: FakeGraph) -> (DecisionEngine, Arc<InMemoryGrantStore>) {
        let store = Arc::new(InMemoryGrantStore::new());
        let cache = Arc::new(TtlCache::new());
        let membership = Arc::new(MembershipResolver::new(store.clone(), cache.clone(), Duration::from_secs(60)));
        let engine = DecisionEngine::new(
            store.clone(),
            cache,
            Arc::new(graph),
            membership,
            Duration::from_secs(60),
            Duration::from_secs(3600),
        );
        (engine, store)
    }

    fn grant(
        grantee: GranteeRef,
        resource: ResourceRef,
        permission: Permission,
        effect: Effect,
        inherit: bool,
        fields: Option<Vec<String>>,
    ) -> Grant {
        Grant {
            id: uuid::Uuid::new_v4().to_string(),
            grantee,
            resource,
            permission,
            effect,
            inherit,
            fields,
            expires_at: None,
            granted_by: None,
            granted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn superuser_bypasses_everything() {
        let (engine, _store) = engine(FakeGraph(HashMap::new()));
        let admin = Principal::new("root", true);
        let d = engine
            .check(&admin, &ResourceRef::new(ResourceKind::Sensor, "s1"), Permission::Manage)
            .await
            .unwrap();
        assert_eq!(d, Decision::allow_all());
    }

    #[tokio::test]
    async fn direct_allow_grants_access() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Allow, true, None))
            .await
            .unwrap();

        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(d, Decision::allow_all());
    }

    #[tokio::test]
    async fn deny_wins_over_inherited_allow() {
        let mut parents = HashMap::new();
        let plan = ResourceRef::new(ResourceKind::Plan, "plan1");
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        parents.insert(sensor.clone(), plan.clone());
        let (engine, store) = engine(FakeGraph(parents));

        store
            .put(grant(GranteeRef::user("alice"), plan.clone(), Permission::Read, Effect::Allow, true, None))
            .await
            .unwrap();
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Deny, false, None))
            .await
            .unwrap();

        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(d, Decision::deny());
    }

    #[tokio::test]
    async fn non_inherited_deny_on_ancestor_does_not_block_descendant() {
        let mut parents = HashMap::new();
        let plan = ResourceRef::new(ResourceKind::Plan, "plan1");
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        parents.insert(sensor.clone(), plan.clone());
        let (engine, store) = engine(FakeGraph(parents));

        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Allow, true, None))
            .await
            .unwrap();
        // inherit=false deny on the plan is invisible to the sensor (depth 1).
        store
            .put(grant(GranteeRef::user("alice"), plan.clone(), Permission::Read, Effect::Deny, false, None))
            .await
            .unwrap();

        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(d, Decision::allow_all());
    }

    #[tokio::test]
    async fn field_restrictions_union_across_grants() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(
                GranteeRef::user("alice"),
                sensor.clone(),
                Permission::Read,
                Effect::Allow,
                true,
                Some(vec!["name".to_string()]),
            ))
            .await
            .unwrap();
        store
            .put(grant(
                GranteeRef::group("ops"),
                sensor.clone(),
                Permission::Read,
                Effect::Allow,
                true,
                Some(vec!["status".to_string()]),
            ))
            .await
            .unwrap();
        store
            .put(grant(GranteeRef::user("alice"), ResourceRef::new(ResourceKind::Group, "ops"), Permission::Member, Effect::Allow, false, None))
            .await
            .unwrap();

        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(d.allowed, true);
        assert_eq!(d.fields, Some(vec!["name".to_string(), "status".to_string()]));
    }

    #[tokio::test]
    async fn unrestricted_allow_collapses_field_union() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(
                GranteeRef::user("alice"),
                sensor.clone(),
                Permission::Read,
                Effect::Allow,
                true,
                Some(vec!["name".to_string()]),
            ))
            .await
            .unwrap();
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Write, Effect::Allow, true, None))
            .await
            .unwrap();

        // manage's closure includes write (lattice expansion means a write grant
        // does not satisfy a read request directly; instead check write itself).
        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Write).await.unwrap();
        assert_eq!(d, Decision::allow_all());
    }

    #[tokio::test]
    async fn lattice_monotonicity_manage_implies_read() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Manage, Effect::Allow, true, None))
            .await
            .unwrap();

        let read = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(read, Decision::allow_all());
    }

    #[tokio::test]
    async fn member_does_not_satisfy_read_and_manage_does_not_imply_member() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let group = ResourceRef::new(ResourceKind::Group, "g1");
        store
            .put(grant(GranteeRef::user("alice"), group.clone(), Permission::Manage, Effect::Allow, true, None))
            .await
            .unwrap();

        let member = engine.check(&Principal::new("alice", false), &group, Permission::Member).await.unwrap();
        assert_eq!(member, Decision::deny());
    }

    #[tokio::test]
    async fn catalog_kind_defaults_to_read_for_everyone() {
        let (engine, _store) = engine(FakeGraph(HashMap::new()));
        let hw = ResourceRef::new(ResourceKind::Hardware, "hw1");
        let d = engine.check(&Principal::new("alice", false), &hw, Permission::Read).await.unwrap();
        assert_eq!(d, Decision::allow_all());
    }

    #[tokio::test]
    async fn catalog_kind_mutation_requires_explicit_grant() {
        let (engine, _store) = engine(FakeGraph(HashMap::new()));
        let hw = ResourceRef::new(ResourceKind::Hardware, "hw1");
        let d = engine.check(&Principal::new("alice", false), &hw, Permission::Write).await.unwrap();
        assert_eq!(d, Decision::deny());
    }

    #[tokio::test]
    async fn expired_grant_never_influences_decision() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        let mut g = grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Allow, true, None);
        g.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        store.put(g).await.unwrap();

        let d = engine.check(&Principal::new("alice", false), &sensor, Permission::Read).await.unwrap();
        assert_eq!(d, Decision::deny());
    }

    #[tokio::test]
    async fn check_verbose_on_denial_logs_audit_event_and_lists_held_permissions() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Allow, true, None))
            .await
            .unwrap();

        let audit_store = Arc::new(crate::audit::InMemoryAuditStore::new());
        let audit = AuditLog::new(audit_store.clone());
        let directory = FakeDirectory;

        let result = engine
            .check_verbose(&Principal::new("alice", false), &sensor, Permission::Manage, &audit, &directory)
            .await
            .unwrap();

        assert!(!result.decision.allowed);
        assert_eq!(result.sources.len(), 1);
        assert_eq!(result.sources[0].permission, Permission::Read);
        assert_eq!(result.sources[0].via, "me");

        use crate::audit::{AuditFilter, AuditStore};
        let events = audit_store.list(&AuditFilter::default(), 10).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, AuditEventKind::Denied);
    }

    #[tokio::test]
    async fn check_verbose_on_allow_does_not_log_audit_event() {
        let (engine, store) = engine(FakeGraph(HashMap::new()));
        let sensor = ResourceRef::new(ResourceKind::Sensor, "s1");
        store
            .put(grant(GranteeRef::user("alice"), sensor.clone(), Permission::Read, Effect::Allow, true, None))
            .await
            .unwrap();

        let audit_store = Arc::new(crate::audit::InMemoryAuditStore::new());
        let audit = AuditLog::new(audit_store.clone());
        let directory = FakeDirectory;

        let result = engine
            .check_verbose(&Principal::new("alice", false), &sensor, Permission::Read, &audit, &directory)
            .await
            .unwrap();

        use crate::audit::{AuditFilter, AuditStore};
        assert!(result.decision.allowed);
        assert!(audit_store.list(&AuditFilter::default(), 10).await.unwrap().is_empty());
    }
}
