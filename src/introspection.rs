//! Read-only introspection over the grant graph: effective permissions,
//! inheritance chains and trees, the permission matrix, and expiring grants.
//! Grounded on the richer, later introspection surface of the original
//! system's permissions API (`compute_effective_permissions`,
//! `get_permission_matrix`, `get_user_inheritance_tree`) — none of these
//! operations mutate state, they only answer "why" for a decision already
//! reachable through [`crate::decision::DecisionEngine`].

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use crate::decision::Directory;
use crate::decision::DecisionEngine;
use crate::domain::{Effect, Grant, GranteeKind, GranteeRef, Permission, Principal, ResourceKind, ResourceRef};
use crate::error::Result;
use crate::hierarchy::{self, ResourceGraph};
use crate::membership::MembershipResolver;
use crate::store::{GranteeResourceQuery, GrantStore};

const ALL_PERMISSIONS: [Permission; 6] = [
    Permission::Member,
    Permission::Read,
    Permission::Write,
    Permission::Delete,
    Permission::Create,
    Permission::Manage,
];

/// One cell of [`permission_matrix`]: whether `grantee` holds `permission`
/// on the resource, and if so whether it came through inheritance and
/// whether it carries a field restriction.
#[derive(Debug, Clone)]
pub struct MatrixCell {
    pub allowed: bool,
    pub inherited: bool,
    pub fields: Option<Vec<String>>,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct MatrixRow {
    pub grantee: GranteeRef,
    pub display_name: String,
    pub cells: BTreeMap<Permission, MatrixCell>,
}

#[derive(Debug, Clone)]
pub struct InheritanceNode {
    pub group_id: String,
    pub group_name: String,
    pub direct_member: bool,
}

/// One live grant applicable to a (principal, resource) pair: the grant's
/// permission and effect, its field restriction if any, whether it is
/// inheritable, and its origin — `"me"` for a direct grant, the group's
/// display name otherwise — and depth (0 = directly on the resource, >0 =
/// inherited from an ancestor that many levels up). This is the grant-level
/// detail `effective` and the inheritance tree expose, as opposed to the
/// single collapsed allow/deny [`crate::decision::Decision`] `check` returns.
#[derive(Debug, Clone)]
pub struct EffectiveGrant {
    pub permission: Permission,
    pub effect: Effect,
    pub fields: Option<Vec<String>>,
    pub inherit: bool,
    pub origin: String,
    pub depth: u32,
}

/// One resource in a user's inheritance forest: the grants that apply to it
/// (own or inherited from an ancestor already walked), and its children in
/// the hierarchy. A node with no grants and no grant-bearing descendants is
/// pruned — the forest only shows resources the user can actually touch.
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub resource: ResourceRef,
    pub grants: Vec<EffectiveGrant>,
    pub children: Vec<ResourceNode>,
}

/// The full result of [`Introspection::user_inheritance_tree`]: the user's
/// group memberships, and the forest of resources (rooted at sites) they can
/// touch, each annotated with the grants that apply there.
#[derive(Debug, Clone)]
pub struct UserInheritanceTree {
    pub user_id: String,
    pub groups: Vec<InheritanceNode>,
    pub tree: Vec<ResourceNode>,
}

pub struct Introspection {
    store: Arc<dyn GrantStore>,
    graph: Arc<dyn ResourceGraph>,
    engine: Arc<DecisionEngine>,
    membership: Arc<MembershipResolver>,
}

impl Introspection {
    pub fn new(
        store: Arc<dyn GrantStore>,
        graph: Arc<dyn ResourceGraph>,
        engine: Arc<DecisionEngine>,
        membership: Arc<MembershipResolver>,
    ) -> Self {
        Self { store, graph, engine, membership }
    }

    /// `check` against every ordinary permission (not `member`, which is
    /// meaningless outside group resources), keyed by permission. Kept
    /// alongside [`Self::effective`] for callers that only want the
    /// collapsed allow/deny view without the grant-level detail.
    pub async fn check_all(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
    ) -> Result<BTreeMap<Permission, crate::decision::Decision>> {
        const ORDINARY: [Permission; 5] = [
            Permission::Read,
            Permission::Write,
            Permission::Delete,
            Permission::Create,
            Permission::Manage,
        ];
        let mut out = BTreeMap::new();
        for permission in ORDINARY {
            out.insert(permission, self.engine.check(principal, resource, permission).await?);
        }
        Ok(out)
    }

    /// Every live grant applicable to `principal` on `resource`'s ancestor
    /// chain, each tagged with its origin and depth — the grant list a
    /// decision was actually built from, not a second decision summary.
    pub async fn effective(
        &self,
        principal: &Principal,
        resource: &ResourceRef,
        directory: &dyn Directory,
    ) -> Result<Vec<EffectiveGrant>> {
        let groups = self.membership.groups_of(&principal.id).await?;
        let mut grantees = vec![GranteeRef::user(&principal.id)];
        grantees.extend(groups.into_iter().map(GranteeRef::group));
        self.gather_grants(&grantees, resource, directory).await
    }

    /// The ancestor chain with depth, the same walk the decision engine uses,
    /// exposed directly for UIs that want to explain "why" without running
    /// a full check.
    pub async fn inheritance_chain(&self, resource: &ResourceRef) -> Result<Vec<(ResourceRef, u32)>> {
        hierarchy::ancestors(self.graph.as_ref(), resource).await
    }

    /// Every live grant `grantees` hold on `resource`'s ancestor chain,
    /// inheritance-gated and tagged with origin/depth. Shared by
    /// [`Self::effective`] and the per-node lookups in
    /// [`Self::user_inheritance_tree`].
    async fn gather_grants(
        &self,
        grantees: &[GranteeRef],
        resource: &ResourceRef,
        directory: &dyn Directory,
    ) -> Result<Vec<EffectiveGrant>> {
        let ancestors = self.inheritance_chain(resource).await?;
        let depths: HashMap<ResourceRef, u32> = ancestors.iter().cloned().collect();
        let resources: Vec<ResourceRef> = ancestors.iter().map(|(r, _)| r.clone()).collect();

        let grants = self
            .store
            .by_grantee_set_and_resources(GranteeResourceQuery {
                grantees,
                resources: &resources,
                permissions: &ALL_PERMISSIONS,
            })
            .await?;

        let now = Utc::now();
        let mut out = Vec::new();
        for grant in grants {
            if !grant.is_live(now) {
                continue;
            }
            let depth = depths.get(&grant.resource).copied().unwrap_or(0);
            if !grant.visible_at_depth(depth) {
                continue;
            }
            let origin = match grant.grantee.kind {
                GranteeKind::User => "me".to_string(),
                GranteeKind::Group => {
                    directory.group_name(&grant.grantee.id).await.unwrap_or_else(|| grant.grantee.id.clone())
                }
            };
            out.push(EffectiveGrant {
                permission: grant.permission,
                effect: grant.effect,
                fields: grant.fields,
                inherit: grant.inherit,
                origin,
                depth,
            });
        }
        out.sort_by(|a, b| a.depth.cmp(&b.depth).then(a.permission.cmp(&b.permission)));
        Ok(out)
    }

    /// The user's group memberships plus the full forest of resources they
    /// can touch, rooted at every site the resource graph knows about, each
    /// node carrying the grants that apply there — grounded on the original
    /// system's `get_user_inheritance_tree`, which returns the same
    /// `{user, groups, tree}` shape built from `compute_effective_permissions`
    /// run at every node.
    pub async fn user_inheritance_tree(&self, user_id: &str, directory: &dyn Directory) -> Result<UserInheritanceTree> {
        let membership_grants = self.store.by_user_as_grantee(user_id).await?;
        let mut groups = Vec::new();
        for grant in membership_grants {
            if grant.effect == Effect::Allow && grant.permission == Permission::Member && grant.resource.kind == ResourceKind::Group
            {
                let group_name =
                    directory.group_name(&grant.resource.id).await.unwrap_or_else(|| grant.resource.id.clone());
                groups.push(InheritanceNode { group_id: grant.resource.id.clone(), group_name, direct_member: true });
            }
        }
        groups.sort_by(|a, b| a.group_name.to_lowercase().cmp(&b.group_name.to_lowercase()));

        let group_ids = self.membership.groups_of(user_id).await?;
        let mut grantees = vec![GranteeRef::user(user_id)];
        grantees.extend(group_ids.into_iter().map(GranteeRef::group));

        let roots = self.graph.roots().await?;
        let mut tree = Vec::new();
        for root in roots {
            if let Some(node) = self.build_tree(root, &grantees, directory).await? {
                tree.push(node);
            }
        }

        Ok(UserInheritanceTree { user_id: user_id.to_string(), groups, tree })
    }

    /// Recursive forest walker: gathers `resource`'s own grant set, then
    /// descends into its children via [`ResourceGraph::children_of`]. A
    /// plain `async fn` can't call itself, hence the manual `Box::pin`.
    fn build_tree<'a>(
        &'a self,
        resource: ResourceRef,
        grantees: &'a [GranteeRef],
        directory: &'a dyn Directory,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ResourceNode>>> + Send + 'a>> {
        Box::pin(async move {
            let grants = self.gather_grants(grantees, &resource, directory).await?;

            let child_refs = self.graph.children_of(&resource).await?;
            let mut children = Vec::new();
            for child in child_refs {
                if let Some(node) = self.build_tree(child, grantees, directory).await? {
                    children.push(node);
                }
            }

            if grants.is_empty() && children.is_empty() {
                Ok(None)
            } else {
                Ok(Some(ResourceNode { resource, grants, children }))
            }
        })
    }

    /// The full allowed/inherited/fields/source grid for `resource`, one row
    /// per grantee with any live grant on its ancestor chain. Groups sort
    /// before users, then alphabetically, matching the original tool's
    /// `(0 if group else 1, name.lower())` ordering.
    pub async fn permission_matrix(&self, resource: &ResourceRef, directory: &dyn Directory) -> Result<Vec<MatrixRow>> {
        let ancestors = self.inheritance_chain(resource).await?;
        let depths: HashMap<ResourceRef, u32> = ancestors.iter().cloned().map(|(r, d)| (r, d)).collect();
        let resources: Vec<ResourceRef> = ancestors.iter().map(|(r, _)| r.clone()).collect();

        let all_grantees = directory.all_grantees().await;
        let grantee_refs: Vec<GranteeRef> = all_grantees.iter().map(|(g, _)| g.clone()).collect();

        let grants = self
            .store
            .by_grantee_set_and_resources(GranteeResourceQuery {
                grantees: &grantee_refs,
                resources: &resources,
                permissions: &ALL_PERMISSIONS,
            })
            .await?;

        let now = Utc::now();
        let mut by_grantee: HashMap<GranteeRef, Vec<&Grant>> = HashMap::new();
        for grant in &grants {
            if !grant.is_live(now) {
                continue;
            }
            let depth = depths.get(&grant.resource).copied().unwrap_or(0);
            if !grant.visible_at_depth(depth) {
                continue;
            }
            by_grantee.entry(grant.grantee.clone()).or_default().push(grant);
        }

        let mut rows = Vec::new();
        for (grantee, display_name) in all_grantees {
            let Some(grants_for_grantee) = by_grantee.get(&grantee) else { continue };
            let mut cells = BTreeMap::new();
            for permission in ALL_PERMISSIONS {
                let matching: Vec<&&Grant> =
                    grants_for_grantee.iter().filter(|g| g.permission == permission).collect();
                if matching.is_empty() {
                    continue;
                }
                if matching.iter().any(|g| g.effect == Effect::Deny) {
                    cells.insert(
                        permission,
                        MatrixCell { allowed: false, inherited: false, fields: None, source: "deny".to_string() },
                    );
                    continue;
                }
                let allow = matching[0];
                let depth = depths.get(&allow.resource).copied().unwrap_or(0);
                cells.insert(
                    permission,
                    MatrixCell {
                        allowed: true,
                        inherited: depth > 0,
                        fields: allow.fields.clone(),
                        source: if depth == 0 {
                            "direct".to_string()
                        } else {
                            format!("via {}", allow.resource)
                        },
                    },
                );
            }
            if !cells.is_empty() {
                rows.push(MatrixRow { grantee, display_name, cells });
            }
        }

        rows.sort_by(|a, b| {
            let a_rank = if a.grantee.kind == GranteeKind::Group { 0 } else { 1 };
            let b_rank = if b.grantee.kind == GranteeKind::Group { 0 } else { 1 };
            a_rank.cmp(&b_rank).then_with(|| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()))
        });
        Ok(rows)
    }

    /// Grants expiring within `within` of `now`, ordered soonest-first — the
    /// read side of the expiration worker's notification job (§4.7).
    pub async fn expiring(&self, now: DateTime<Utc>, within: chrono::Duration) -> Result<Vec<Grant>> {
        self.store.expiring(now, within).await
    }
}
