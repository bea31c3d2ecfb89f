//! End-to-end scenarios exercising the full stack (grant store, hierarchy,
//! membership, decision engine, lifecycle) together rather than each module
//! in isolation. Six scenarios, one fixed world: users alice/bob/carol/dave/
//! eve; groups F1-Admins/F1-Ops/F1-View/Global-Ops; sites Factory-1/
//! Factory-2; plans Floor-A/Floor-B (under Factory-1) and Floor-C (under
//! Factory-2); sensor Temp-1 (under Floor-A).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use warden::audit::{AuditLog, InMemoryAuditStore};
use warden::cache::TtlCache;
use warden::decision::{Decision, DecisionEngine};
use warden::domain::{Effect, Grant, GranteeRef, Permission, Principal, ResourceKind, ResourceRef};
use warden::error::Result;
use warden::hierarchy::ResourceGraph;
use warden::lifecycle::GrantLifecycle;
use warden::membership::MembershipResolver;
use warden::store::{GrantStore, InMemoryGrantStore};

struct FixedGraph(HashMap<ResourceRef, ResourceRef>);

#[async_trait]
impl ResourceGraph for FixedGraph {
    async fn parent_of(&self, resource: &ResourceRef) -> Result<Option<ResourceRef>> {
        Ok(self.0.get(resource).cloned())
    }
}

fn site(name: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Site, name)
}
fn plan(name: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Plan, name)
}
fn sensor(name: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Sensor, name)
}
fn group(name: &str) -> ResourceRef {
    ResourceRef::new(ResourceKind::Group, name)
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

struct World {
    engine: DecisionEngine,
    lifecycle: GrantLifecycle,
}

async fn build_world() -> World {
    let store = Arc::new(InMemoryGrantStore::new());
    let cache = Arc::new(TtlCache::new());

    let mut parents = HashMap::new();
    parents.insert(plan("Floor-A"), site("Factory-1"));
    parents.insert(plan("Floor-B"), site("Factory-1"));
    parents.insert(plan("Floor-C"), site("Factory-2"));
    parents.insert(sensor("Temp-1"), plan("Floor-A"));
    let graph: Arc<dyn ResourceGraph> = Arc::new(FixedGraph(parents));

    let membership = Arc::new(MembershipResolver::new(store.clone(), cache.clone(), Duration::from_secs(60)));
    let engine = DecisionEngine::new(
        store.clone(),
        cache.clone(),
        graph,
        membership,
        Duration::from_secs(60),
        Duration::from_secs(3600),
    );
    let audit = Arc::new(AuditLog::new(Arc::new(InMemoryAuditStore::new())));
    let lifecycle = GrantLifecycle::new(store.clone(), cache, audit, Duration::from_secs(3600));

    // Memberships: alice in F1-Admins; bob in F1-Ops; carol in F1-View;
    // dave in F1-Ops and Global-Ops.
    for (user, grp) in [
        ("alice", "F1-Admins"),
        ("bob", "F1-Ops"),
        ("carol", "F1-View"),
        ("dave", "F1-Ops"),
        ("dave", "Global-Ops"),
    ] {
        store.put(grant(GranteeRef::user(user), group(grp), Permission::Member, Effect::Allow, false, None)).await.unwrap();
    }

    // Group grants.
    store
        .put(grant(GranteeRef::group("F1-Admins"), site("Factory-1"), Permission::Manage, Effect::Allow, true, None))
        .await
        .unwrap();
    store
        .put(grant(
            GranteeRef::group("F1-Ops"),
            site("Factory-1"),
            Permission::Write,
            Effect::Allow,
            true,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
        ))
        .await
        .unwrap();
    store
        .put(grant(GranteeRef::group("F1-View"), site("Factory-1"), Permission::Read, Effect::Allow, true, None))
        .await
        .unwrap();
    store
        .put(grant(GranteeRef::group("Global-Ops"), site("Factory-1"), Permission::Write, Effect::Allow, true, None))
        .await
        .unwrap();
    store
        .put(grant(GranteeRef::group("Global-Ops"), site("Factory-2"), Permission::Write, Effect::Allow, true, None))
        .await
        .unwrap();

    // Direct user grants.
    store
        .put(grant(
            GranteeRef::user("dave"),
            plan("Floor-A"),
            Permission::Write,
            Effect::Allow,
            false,
            Some(vec!["d".to_string(), "e".to_string()]),
        ))
        .await
        .unwrap();
    store
        .put(grant(GranteeRef::user("bob"), plan("Floor-B"), Permission::Read, Effect::Deny, true, None))
        .await
        .unwrap();

    World { engine, lifecycle }
}

fn user(id: &str) -> Principal {
    Principal::new(id, false)
}

#[tokio::test]
async fn scenario_1_manage_inherits_down_to_read() {
    let world = build_world().await;
    let d = world.engine.check(&user("alice"), &sensor("Temp-1"), Permission::Read).await.unwrap();
    assert_eq!(d, Decision::allow_all());
}

#[tokio::test]
async fn scenario_2_field_restricted_write_inherits_to_sensor() {
    let world = build_world().await;
    let d = world.engine.check(&user("bob"), &sensor("Temp-1"), Permission::Write).await.unwrap();
    assert_eq!(d.allowed, true);
    assert_eq!(d.fields, Some(vec!["a".to_string(), "b".to_string(), "c".to_string()]));
}

#[tokio::test]
async fn scenario_3_direct_deny_wins_over_inherited_allow() {
    let world = build_world().await;
    let d = world.engine.check(&user("bob"), &plan("Floor-B"), Permission::Read).await.unwrap();
    assert_eq!(d, Decision::deny());
}

#[tokio::test]
async fn scenario_4_no_grant_on_unrelated_site_denies() {
    let world = build_world().await;
    let d = world.engine.check(&user("carol"), &site("Factory-2"), Permission::Read).await.unwrap();
    assert_eq!(d, Decision::deny());
}

#[tokio::test]
async fn scenario_5_unrestricted_allow_absorbs_field_restricted_grant_at_same_depth() {
    let world = build_world().await;

    // On Floor-A: dave's direct [d,e] (inherit=false, depth 0) unions with
    // Global-Ops' unrestricted write inherited from Factory-1 (depth 1) —
    // the unrestricted allow collapses the combination to unrestricted.
    let floor_a = world.engine.check(&user("dave"), &plan("Floor-A"), Permission::Write).await.unwrap();
    assert_eq!(floor_a, Decision::allow_all());

    // On Temp-1 (sensor, child of Floor-A): dave's direct grant has
    // inherit=false and stops at Floor-A, so only F1-Ops' [a,b,c] (via
    // Factory-1) and Global-Ops' unrestricted write (via Factory-1) reach
    // here — still collapsing to unrestricted.
    let temp_1 = world.engine.check(&user("dave"), &sensor("Temp-1"), Permission::Write).await.unwrap();
    assert_eq!(temp_1, Decision::allow_all());
}

#[tokio::test]
async fn scenario_6_issue_then_revoke_round_trips_through_cache() {
    let world = build_world().await;

    let before = world.engine.check(&user("eve"), &sensor("Temp-1"), Permission::Read).await.unwrap();
    assert_eq!(before, Decision::deny());

    let issued = world
        .lifecycle
        .issue(
            grant(GranteeRef::user("eve"), site("Factory-1"), Permission::Read, Effect::Allow, true, None),
            "root",
        )
        .await
        .unwrap();

    let after_issue = world.engine.check(&user("eve"), &sensor("Temp-1"), Permission::Read).await.unwrap();
    assert_eq!(after_issue, Decision::allow_all());

    world.lifecycle.revoke(&issued.id, "root").await.unwrap();

    let after_revoke = world.engine.check(&user("eve"), &sensor("Temp-1"), Permission::Read).await.unwrap();
    assert_eq!(after_revoke, Decision::deny());
}
