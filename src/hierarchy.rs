//! Hierarchy resolver: walks a resource up to its root, truncating
//! gracefully on a missing or deleted intermediate.
//!
//! Ownership of the actual resource rows (site/plan/sensor/...) is an
//! external collaborator (the ORM layer, out of scope per SPEC_FULL.md §1);
//! this module only needs to know each resource's immediate parent, which it
//! gets through the injected [`ResourceGraph`].

use async_trait::async_trait;
use tracing::warn;

use crate::domain::{ResourceKind, ResourceRef};
use crate::error::Result;

/// Supplies the immediate parent of a hierarchical resource. Implemented by
/// whatever owns the actual resource tables; [`ancestors`] is agnostic to
/// the backing store.
#[async_trait]
pub trait ResourceGraph: Send + Sync {
    /// The direct parent of `resource`, or `None` if `resource` is a root,
    /// standalone, or its parent FK is missing/dangling.
    async fn parent_of(&self, resource: &ResourceRef) -> Result<Option<ResourceRef>>;

    /// Every resource whose immediate parent is `resource`, driving the
    /// per-user resource forest in `Introspection::user_inheritance_tree`.
    /// Default `Ok(vec![])` for implementations that cannot enumerate
    /// children (e.g. [`NullResourceGraph`]).
    async fn children_of(&self, _resource: &ResourceRef) -> Result<Vec<ResourceRef>> {
        Ok(Vec::new())
    }

    /// Every root (`Site`) resource known to the graph, the forest's roots.
    /// Default `Ok(vec![])`.
    async fn roots(&self) -> Result<Vec<ResourceRef>> {
        Ok(Vec::new())
    }
}

/// The fixed parent chain: alert → alarm → sensor → plan → site;
/// broker → plan → site. Anything else has no parent in this map.
pub fn expected_parent_kind(kind: ResourceKind) -> Option<ResourceKind> {
    match kind {
        ResourceKind::Alert => Some(ResourceKind::Alarm),
        ResourceKind::Alarm => Some(ResourceKind::Sensor),
        ResourceKind::Sensor => Some(ResourceKind::Plan),
        ResourceKind::Broker => Some(ResourceKind::Plan),
        ResourceKind::Plan => Some(ResourceKind::Site),
        _ => None,
    }
}

/// `ancestors(resource)` → `[(resource, depth)]`, depth 0 is `resource`
/// itself, increasing toward the root. Standalone kinds (including `Site`,
/// the hierarchy root) return just the input at depth 0.
///
/// A missing or deleted intermediate truncates the walk silently — this is
/// not an error, per §4.1.
pub async fn ancestors(
    graph: &dyn ResourceGraph,
    resource: &ResourceRef,
) -> Result<Vec<(ResourceRef, u32)>> {
    let mut chain = vec![(resource.clone(), 0u32)];

    if expected_parent_kind(resource.kind).is_none() {
        return Ok(chain);
    }

    let mut current = resource.clone();
    let mut depth = 0u32;

    loop {
        if expected_parent_kind(current.kind).is_none() {
            break;
        }
        match graph.parent_of(&current).await? {
            Some(parent) => {
                depth += 1;
                chain.push((parent.clone(), depth));
                current = parent;
            }
            None => {
                warn!(
                    resource = %current,
                    "hierarchy walk truncated: parent missing or deleted"
                );
                break;
            }
        }
    }

    Ok(chain)
}

/// Minimal [`ResourceGraph`] backed by a single `resource_parents` collection
/// of `{resource_type, resource_id, parent_type, parent_id}` documents. The
/// real site/plan/sensor/... tables are owned by an external ORM layer out
/// of scope here (see DESIGN.md); this lets the binary run standalone
/// against whatever minimal parent-pointer collection a deployment wants to
/// maintain alongside its own resource tables.
pub struct MongoResourceGraph {
    collection: mongodb::Collection<bson::Document>,
    timeout: std::time::Duration,
}

impl MongoResourceGraph {
    pub fn new(client: &crate::db::mongo::MongoClient) -> Self {
        let collection = client.inner().database(client.db_name()).collection::<bson::Document>("resource_parents");
        Self { collection, timeout: client.timeout() }
    }
}

#[async_trait]
impl ResourceGraph for MongoResourceGraph {
    async fn parent_of(&self, resource: &ResourceRef) -> Result<Option<ResourceRef>> {
        use bson::doc;
        let filter = doc! {
            "resource_type": resource.kind.as_str(),
            "resource_id": &resource.id,
        };
        let found = crate::db::mongo::with_timeout(self.timeout, self.collection.find_one(filter)).await?;

        Ok(found.and_then(|doc| {
            let parent_type = doc.get_str("parent_type").ok()?;
            let parent_id = doc.get_str("parent_id").ok()?;
            ResourceKind::parse(parent_type).map(|kind| ResourceRef::new(kind, parent_id))
        }))
    }

    async fn children_of(&self, resource: &ResourceRef) -> Result<Vec<ResourceRef>> {
        use bson::doc;
        use futures::StreamExt;

        let filter = doc! {
            "parent_type": resource.kind.as_str(),
            "parent_id": &resource.id,
        };
        let cursor = crate::db::mongo::with_timeout(self.timeout, self.collection.find(filter)).await?;
        let docs: Vec<bson::Document> = cursor.filter_map(|doc| async move { doc.ok() }).collect().await;

        Ok(docs
            .into_iter()
            .filter_map(|doc| {
                let resource_type = doc.get_str("resource_type").ok()?;
                let resource_id = doc.get_str("resource_id").ok()?;
                ResourceKind::parse(resource_type).map(|kind| ResourceRef::new(kind, resource_id))
            })
            .collect())
    }

    async fn roots(&self) -> Result<Vec<ResourceRef>> {
        use bson::doc;
        use futures::StreamExt;

        // `resource_parents` only records resources that have a parent, so
        // sites surface here as whatever distinct `parent_id`s appear with
        // `parent_type: site` — a site with no recorded children is invisible
        // to this minimal collection (see DESIGN.md).
        let filter = doc! { "parent_type": ResourceKind::Site.as_str() };
        let cursor = crate::db::mongo::with_timeout(self.timeout, self.collection.find(filter)).await?;
        let docs: Vec<bson::Document> = cursor.filter_map(|doc| async move { doc.ok() }).collect().await;

        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for doc in docs {
            if let Ok(parent_id) = doc.get_str("parent_id") {
                if seen.insert(parent_id.to_string()) {
                    out.push(ResourceRef::new(ResourceKind::Site, parent_id));
                }
            }
        }
        Ok(out)
    }
}

/// A [`ResourceGraph`] that treats every resource as parentless. Used when a
/// deployment runs without a real hierarchy backing store (dev mode without
/// Mongo) — every resource behaves as if it were standalone.
pub struct NullResourceGraph;

#[async_trait]
impl ResourceGraph for NullResourceGraph {
    async fn parent_of(&self, _resource: &ResourceRef) -> Result<Option<ResourceRef>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FakeGraph(HashMap<ResourceRef, ResourceRef>);

    #[async_trait]
    impl ResourceGraph for FakeGraph {
        async fn parent_of(&self, resource: &ResourceRef) -> Result<Option<ResourceRef>> {
            Ok(self.0.get(resource).cloned())
        }
    }

    fn r(kind: ResourceKind, id: &str) -> ResourceRef {
        ResourceRef::new(kind, id)
    }

    #[tokio::test]
    async fn standalone_resource_returns_only_itself() {
        let graph = FakeGraph(HashMap::new());
        let chain = ancestors(&graph, &r(ResourceKind::Dashboard, "d1")).await.unwrap();
        assert_eq!(chain, vec![(r(ResourceKind::Dashboard, "d1"), 0)]);
    }

    #[tokio::test]
    async fn full_alert_chain_walks_to_site() {
        let mut map = HashMap::new();
        map.insert(r(ResourceKind::Alert, "alert1"), r(ResourceKind::Alarm, "alarm1"));
        map.insert(r(ResourceKind::Alarm, "alarm1"), r(ResourceKind::Sensor, "sensor1"));
        map.insert(r(ResourceKind::Sensor, "sensor1"), r(ResourceKind::Plan, "plan1"));
        map.insert(r(ResourceKind::Plan, "plan1"), r(ResourceKind::Site, "site1"));
        let graph = FakeGraph(map);

        let chain = ancestors(&graph, &r(ResourceKind::Alert, "alert1")).await.unwrap();
        assert_eq!(
            chain,
            vec![
                (r(ResourceKind::Alert, "alert1"), 0),
                (r(ResourceKind::Alarm, "alarm1"), 1),
                (r(ResourceKind::Sensor, "sensor1"), 2),
                (r(ResourceKind::Plan, "plan1"), 3),
                (r(ResourceKind::Site, "site1"), 4),
            ]
        );
    }

    #[tokio::test]
    async fn broker_chains_through_plan_to_site() {
        let mut map = HashMap::new();
        map.insert(r(ResourceKind::Broker, "b1"), r(ResourceKind::Plan, "plan1"));
        map.insert(r(ResourceKind::Plan, "plan1"), r(ResourceKind::Site, "site1"));
        let graph = FakeGraph(map);

        let chain = ancestors(&graph, &r(ResourceKind::Broker, "b1")).await.unwrap();
        assert_eq!(
            chain,
            vec![
                (r(ResourceKind::Broker, "b1"), 0),
                (r(ResourceKind::Plan, "plan1"), 1),
                (r(ResourceKind::Site, "site1"), 2),
            ]
        );
    }

    #[tokio::test]
    async fn missing_intermediate_truncates_without_error() {
        let mut map = HashMap::new();
        map.insert(r(ResourceKind::Sensor, "orphan"), r(ResourceKind::Plan, "gone"));
        // "gone" has no entry: parent_of returns None, truncating the walk.
        let graph = FakeGraph(map);

        let chain = ancestors(&graph, &r(ResourceKind::Sensor, "orphan")).await.unwrap();
        assert_eq!(
            chain,
            vec![
                (r(ResourceKind::Sensor, "orphan"), 0),
                (r(ResourceKind::Plan, "gone"), 1),
            ]
        );
    }
}
