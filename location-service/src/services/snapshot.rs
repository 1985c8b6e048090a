use crate::models::Location;
use crate::services::metrics::record_snapshot_lookup;
use crate::services::{KeyValueCache, LocationError, LocationStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Serialize, Deserialize)]
struct SnapshotPayload {
    locations: Vec<Location>,
}

/// Read-through cache in front of the full location set.
///
/// Cache failures never fail a call: a broken read falls back to the
/// store, and broken writes or deletes are logged and dropped.
#[derive(Clone)]
pub struct LocationSnapshot {
    store: Arc<dyn LocationStore>,
    cache: Arc<dyn KeyValueCache>,
    key: String,
    ttl: Duration,
}

impl LocationSnapshot {
    pub fn new(
        store: Arc<dyn LocationStore>,
        cache: Arc<dyn KeyValueCache>,
        key: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            key: key.into(),
            ttl,
        }
    }

    /// All locations, from the cache when a decodable snapshot is present.
    ///
    /// Fails with [`LocationError::NotFound`] when the store holds no
    /// locations.
    pub async fn load_all(&self) -> Result<Vec<Location>, LocationError> {
        if let Some(locations) = self.cached().await {
            return Ok(locations);
        }

        let locations = self.store.find_all().await?;
        if locations.is_empty() {
            tracing::warn!("No location documents found in store");
            return Err(LocationError::NotFound);
        }

        let payload = SnapshotPayload { locations };
        match serde_json::to_string(&payload) {
            Ok(raw) => match self.cache.set(&self.key, &raw, self.ttl).await {
                Ok(()) => tracing::info!(
                    key = %self.key,
                    ttl_secs = self.ttl.as_secs(),
                    count = payload.locations.len(),
                    "Location snapshot written to cache"
                ),
                Err(e) => tracing::error!(key = %self.key, error = %e, "Cache write failed"),
            },
            Err(e) => tracing::error!(error = %e, "Failed to encode location snapshot"),
        }

        Ok(payload.locations)
    }

    async fn cached(&self) -> Option<Vec<Location>> {
        match self.cache.get(&self.key).await {
            Ok(Some(raw)) => match serde_json::from_str::<SnapshotPayload>(&raw) {
                Ok(payload) => {
                    record_snapshot_lookup("hit");
                    tracing::debug!(key = %self.key, "Location snapshot served from cache");
                    Some(payload.locations)
                }
                Err(e) => {
                    record_snapshot_lookup("error");
                    tracing::error!(key = %self.key, error = %e, "Cached snapshot is undecodable");
                    None
                }
            },
            Ok(None) => {
                record_snapshot_lookup("miss");
                tracing::warn!(key = %self.key, "Cache empty, loading locations from store");
                None
            }
            Err(e) => {
                record_snapshot_lookup("error");
                tracing::error!(key = %self.key, error = %e, "Cache read failed");
                None
            }
        }
    }

    /// Drops the cached snapshot so the next read goes to the store.
    pub async fn invalidate(&self) {
        match self.cache.delete(&self.key).await {
            Ok(()) => tracing::info!(key = %self.key, "Location snapshot invalidated"),
            Err(e) => tracing::error!(key = %self.key, error = %e, "Cache delete failed"),
        }
    }

    pub async fn cache_health(&self) -> Result<(), anyhow::Error> {
        self.cache.health_check().await
    }
}
