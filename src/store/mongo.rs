//! MongoDB-backed grant store, built on the generic [`crate::db::mongo::MongoCollection`]
//! wrapper (soft-delete-aware reads, automatic metadata timestamps).

use async_trait::async_trait;
use bson::{doc, Document};
use chrono::{DateTime, Utc};

use crate::db::mongo::MongoCollection;
use crate::db::schemas::{GrantDoc, GRANT_COLLECTION};
use crate::domain::{Grant, GranteeKind, ResourceRef};
use crate::error::{Result, WardenError};

use super::{GranteeResourceQuery, GrantStore};

pub struct MongoGrantStore {
    collection: MongoCollection<GrantDoc>,
}

impl MongoGrantStore {
    pub async fn new(client: &crate::db::mongo::MongoClient) -> Result<Self> {
        let collection = client.collection::<GrantDoc>(GRANT_COLLECTION).await?;
        Ok(Self { collection })
    }

    /// `expires_at` null or in the future, relative to `now`.
    fn live_filter(now: DateTime<Utc>) -> Document {
        doc! {
            "$or": [
                { "expires_at": { "$exists": false } },
                { "expires_at": null },
                { "expires_at": { "$gt": now } },
            ]
        }
    }
}

#[async_trait]
impl GrantStore for MongoGrantStore {
    async fn put(&self, grant: Grant) -> Result<Grant> {
        let now = Utc::now();
        let dup_filter = doc! {
            "grantee_type": grant.grantee.kind.as_str(),
            "grantee_id": &grant.grantee.id,
            "resource_type": grant.resource.kind.as_str(),
            "resource_id": &grant.resource.id,
            "permission": grant.permission.as_str(),
            "$and": [ Self::live_filter(now) ],
        };
        if self.collection.find_one(dup_filter).await?.is_some() {
            return Err(WardenError::Conflict(format!(
                "a live grant already exists for {}:{} on {} ({})",
                grant.grantee, grant.resource, grant.permission, grant.resource.kind
            )));
        }

        let doc = GrantDoc::from(&grant);
        self.collection.insert_one(doc).await?;
        Ok(grant)
    }

    async fn delete(&self, id: &str) -> Result<Option<Grant>> {
        let existing = self.get(id).await?;
        if existing.is_some() {
            self.collection.soft_delete(doc! { "grant_id": id }).await?;
        }
        Ok(existing)
    }

    async fn get(&self, id: &str) -> Result<Option<Grant>> {
        let now = Utc::now();
        let filter = doc! { "grant_id": id, "$and": [ Self::live_filter(now) ] };
        Ok(self.collection.find_one(filter).await?.and_then(GrantDoc::into_grant))
    }

    async fn by_resource(&self, resource: &ResourceRef) -> Result<Vec<Grant>> {
        let now = Utc::now();
        let filter = doc! {
            "resource_type": resource.kind.as_str(),
            "resource_id": &resource.id,
            "$and": [ Self::live_filter(now) ],
        };
        let docs = self.collection.find_many(filter).await?;
        Ok(docs.into_iter().filter_map(GrantDoc::into_grant).collect())
    }

    async fn by_grantee_set_and_resources(
        &self,
        query: GranteeResourceQuery<'_>,
    ) -> Result<Vec<Grant>> {
        if query.grantees.is_empty() || query.resources.is_empty() || query.permissions.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let grantee_or: Vec<Document> = query
            .grantees
            .iter()
            .map(|g| doc! { "grantee_type": g.kind.as_str(), "grantee_id": &g.id })
            .collect();
        let resource_or: Vec<Document> = query
            .resources
            .iter()
            .map(|r| doc! { "resource_type": r.kind.as_str(), "resource_id": &r.id })
            .collect();
        let permissions: Vec<&str> = query.permissions.iter().map(|p| p.as_str()).collect();

        let filter = doc! {
            "$and": [
                { "$or": grantee_or },
                { "$or": resource_or },
                { "permission": { "$in": permissions } },
                Self::live_filter(now),
            ]
        };

        let docs = self.collection.find_many(filter).await?;
        Ok(docs.into_iter().filter_map(GrantDoc::into_grant).collect())
    }

    async fn by_user_as_grantee(&self, user_id: &str) -> Result<Vec<Grant>> {
        let now = Utc::now();
        let filter = doc! {
            "grantee_type": GranteeKind::User.as_str(),
            "grantee_id": user_id,
            "$and": [ Self::live_filter(now) ],
        };
        let docs = self.collection.find_many(filter).await?;
        Ok(docs.into_iter().filter_map(GrantDoc::into_grant).collect())
    }

    async fn expiring(&self, now: DateTime<Utc>, within: chrono::Duration) -> Result<Vec<Grant>> {
        let horizon = now + within;
        let filter = doc! {
            "expires_at": { "$gt": now, "$lte": horizon },
        };
        let mut docs = self.collection.find_many(filter).await?;
        docs.sort_by_key(|d| d.expires_at);
        Ok(docs.into_iter().filter_map(GrantDoc::into_grant).collect())
    }

    async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Grant>> {
        let filter = doc! {
            "expires_at": { "$lte": now },
        };
        let docs = self.collection.find_many(filter).await?;
        Ok(docs.into_iter().filter_map(GrantDoc::into_grant).collect())
    }
}
