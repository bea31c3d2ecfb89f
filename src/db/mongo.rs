//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::time::Duration;
use tracing::{error, info};

use crate::db::schemas::Metadata;
use crate::error::WardenError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// Runs `fut` under `timeout`, mapping both a timed-out future and a driver
/// error to [`WardenError::Unavailable`] — every store call surfaces
/// connectivity and timeout failures the same way, per §5/§7.
pub(crate) async fn with_timeout<T, E, F>(timeout: Duration, fut: F) -> Result<T, WardenError>
where
    F: std::future::Future<Output = std::result::Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(WardenError::Unavailable(format!("store operation failed: {e}"))),
        Err(_) => Err(WardenError::Unavailable(format!("store operation timed out after {timeout:?}"))),
    }
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
    timeout: Duration,
}

impl MongoClient {
    /// Create a new MongoDB client. `timeout` bounds every subsequent store
    /// call made through a collection opened on this client (§6a
    /// `--store-timeout-seconds`), on top of the driver's own
    /// `serverSelectionTimeoutMS`/`connectTimeoutMS` bound on the initial
    /// connection below.
    pub async fn new(uri: &str, db_name: &str, timeout: Duration) -> Result<Self, WardenError> {
        info!("Connecting to MongoDB at {}", uri);

        // Use serverSelectionTimeoutMS to avoid hanging on unreachable MongoDB
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| WardenError::Unavailable(format!("failed to connect to MongoDB: {}", e)))?;

        // Verify connection with timeout
        with_timeout(timeout, client.database(db_name).run_command(doc! { "ping": 1 })).await?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
            timeout,
        })
    }

    /// Get a typed collection
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, WardenError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name, self.timeout).await
    }

    /// Get the raw MongoDB client
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// The per-call timeout every collection opened on this client inherits.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
    timeout: Duration,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + Default + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
        timeout: Duration,
    ) -> Result<Self, WardenError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection, timeout };

        // Apply indexes
        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), WardenError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| {
                IndexModel::builder()
                    .keys(keys)
                    .options(opts)
                    .build()
            })
            .collect();

        with_timeout(self.timeout, self.inner.create_indexes(indices)).await?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, WardenError> {
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at = Some(DateTime::now());
        metadata.updated_at = Some(DateTime::now());

        let result = with_timeout(self.timeout, self.inner.insert_one(item)).await?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| WardenError::Internal("insert succeeded but returned no object id".into()))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, WardenError> {
        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        with_timeout(self.timeout, self.inner.find_one(full_filter)).await
    }

    /// Find many documents by filter
    pub async fn find_many(&self, filter: Document) -> Result<Vec<T>, WardenError> {
        use futures::StreamExt;

        // Add is_deleted check
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = with_timeout(self.timeout, self.inner.find(full_filter)).await?;

        let results: Vec<T> = cursor
            .filter_map(|doc| async {
                match doc {
                    Ok(d) => Some(d),
                    Err(e) => {
                        error!("Error reading document: {}", e);
                        None
                    }
                }
            })
            .collect()
            .await;

        Ok(results)
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, WardenError> {
        // Add updated_at to the update
        let modifications = update.into();

        with_timeout(self.timeout, self.inner.update_one(filter, modifications)).await
    }

    /// Soft delete a document
    pub async fn soft_delete(&self, filter: Document) -> Result<UpdateResult, WardenError> {
        let update = doc! {
            "$set": {
                "metadata.is_deleted": true,
                "metadata.deleted_at": DateTime::now(),
                "metadata.updated_at": DateTime::now(),
            }
        };

        self.update_one(filter, update).await
    }

    /// Get the underlying collection for advanced operations
    pub fn inner(&self) -> &Collection<T> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running MongoDB instance
    // See docker-compose.dev.yml for local testing
}
