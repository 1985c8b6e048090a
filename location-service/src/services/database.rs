use crate::models::{Location, LocationChanges, LocationDocument, LocationId, NewLocation};
use crate::services::{LocationError, LocationStore, PageRequest};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::FindOptions,
    Client as MongoClient, Collection, Database,
};
use std::time::Duration;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
    collection: String,
    scan_timeout: Duration,
}

impl MongoDb {
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
        scan_timeout: Duration,
    ) -> Result<Self, LocationError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            LocationError::from(e)
        })?;
        let db = client.database(database);
        let store = Self {
            client,
            db,
            collection: collection.to_string(),
            scan_timeout,
        };
        store.health_check().await?;
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(store)
    }

    pub fn locations(&self) -> Collection<LocationDocument> {
        self.db.collection(&self.collection)
    }
}

/// `$set` body and the `$or` guard that only matches when a value differs.
fn conditional_update(changes: &LocationChanges) -> (Document, Vec<Document>) {
    let mut set = Document::new();
    let mut differs = Vec::new();

    let mut push = |field: &str, value: Bson| {
        differs.push(doc! { field: { "$ne": value.clone() } });
        set.insert(field, value);
    };

    if let Some(name) = &changes.name {
        push("name", Bson::String(name.clone()));
    }
    if let Some(latitude) = changes.latitude {
        push("latitude", Bson::Double(latitude));
    }
    if let Some(longitude) = changes.longitude {
        push("longitude", Bson::Double(longitude));
    }
    if let Some(marker_color) = &changes.marker_color {
        push("marker_color", Bson::String(marker_color.clone()));
    }

    (set, differs)
}

#[async_trait]
impl LocationStore for MongoDb {
    async fn insert(&self, location: NewLocation) -> Result<LocationId, LocationError> {
        let result = self
            .locations()
            .insert_one(LocationDocument::new(location), None)
            .await?;

        result
            .inserted_id
            .as_object_id()
            .map(LocationId::from)
            .ok_or_else(|| {
                LocationError::Internal(anyhow::anyhow!(
                    "insert returned a non-ObjectId key: {}",
                    result.inserted_id
                ))
            })
    }

    async fn find_by_id(&self, id: &LocationId) -> Result<Location, LocationError> {
        self.locations()
            .find_one(doc! { "_id": id.object_id() }, None)
            .await?
            .map(Location::from)
            .ok_or(LocationError::NotFound)
    }

    async fn find_page(&self, page: PageRequest) -> Result<Vec<Location>, LocationError> {
        let options = FindOptions::builder()
            .sort(doc! { "_id": 1 })
            .skip(page.skip())
            .limit(page.limit)
            .build();

        let cursor = self.locations().find(doc! {}, options).await?;
        let documents: Vec<LocationDocument> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(Location::from).collect())
    }

    async fn find_all(&self) -> Result<Vec<Location>, LocationError> {
        let scan = async {
            let cursor = self.locations().find(doc! {}, None).await?;
            let documents: Vec<LocationDocument> = cursor.try_collect().await?;
            Ok::<_, LocationError>(documents)
        };

        let documents = tokio::time::timeout(self.scan_timeout, scan)
            .await
            .map_err(|_| LocationError::Timeout(self.scan_timeout))??;

        Ok(documents.into_iter().map(Location::from).collect())
    }

    async fn update_if_changed(
        &self,
        id: &LocationId,
        changes: &LocationChanges,
    ) -> Result<u64, LocationError> {
        let (mut set, differs) = conditional_update(changes);
        if differs.is_empty() {
            return Ok(0);
        }
        set.insert("updated_at", bson::DateTime::now());

        let filter = doc! { "_id": id.object_id(), "$or": differs };
        let result = self
            .locations()
            .update_one(filter, doc! { "$set": set }, None)
            .await?;

        Ok(result.modified_count)
    }

    async fn health_check(&self) -> Result<(), LocationError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                LocationError::from(e)
            })?;
        Ok(())
    }
}
