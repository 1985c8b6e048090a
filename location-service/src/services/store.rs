use crate::models::{Location, LocationChanges, LocationId, NewLocation};
use crate::services::LocationError;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Page selection for listings. Values below 1 fall back to page 1 and a
/// limit of 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: if limit < 1 { Self::DEFAULT_LIMIT } else { limit },
        }
    }

    pub fn skip(&self) -> u64 {
        ((self.page - 1) as u64).saturating_mul(self.limit as u64)
    }
}

/// Capability set of the authoritative location store.
#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn insert(&self, location: NewLocation) -> Result<LocationId, LocationError>;

    async fn find_by_id(&self, id: &LocationId) -> Result<Location, LocationError>;

    async fn find_page(&self, page: PageRequest) -> Result<Vec<Location>, LocationError>;

    async fn find_all(&self) -> Result<Vec<Location>, LocationError>;

    /// Writes `changes` only if at least one of them differs from the stored
    /// value, as a single match-and-modify. Returns the modified count.
    async fn update_if_changed(
        &self,
        id: &LocationId,
        changes: &LocationChanges,
    ) -> Result<u64, LocationError>;

    async fn health_check(&self) -> Result<(), LocationError>;
}

/// Process-local store with call counters and failure injection.
pub struct InMemoryLocationStore {
    locations: Mutex<Vec<Location>>,
    unavailable: AtomicBool,
    find_all_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl Default for InMemoryLocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLocationStore {
    pub fn new() -> Self {
        Self {
            locations: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
            find_all_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_locations(locations: Vec<Location>) -> Self {
        let store = Self::new();
        if let Ok(mut guard) = store.locations.lock() {
            *guard = locations;
        }
        store
    }

    /// Makes every subsequent call fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn find_all_calls(&self) -> usize {
        self.find_all_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, Vec<Location>>, LocationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(LocationError::Internal(anyhow::anyhow!(
                "in-memory store unavailable"
            )));
        }
        self.locations
            .lock()
            .map_err(|e| LocationError::Internal(anyhow::anyhow!("Mock store mutex poisoned: {}", e)))
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn insert(&self, location: NewLocation) -> Result<LocationId, LocationError> {
        let id = LocationId::generate();
        self.guard()?.push(Location {
            id: id.to_string(),
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            marker_color: location.marker_color,
            created_at: Some(Utc::now()),
            updated_at: None,
        });
        Ok(id)
    }

    async fn find_by_id(&self, id: &LocationId) -> Result<Location, LocationError> {
        let key = id.to_string();
        self.guard()?
            .iter()
            .find(|l| l.id == key)
            .cloned()
            .ok_or(LocationError::NotFound)
    }

    async fn find_page(&self, page: PageRequest) -> Result<Vec<Location>, LocationError> {
        let mut locations = self.guard()?.clone();
        locations.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(locations
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Location>, LocationError> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.guard()?.clone())
    }

    async fn update_if_changed(
        &self,
        id: &LocationId,
        changes: &LocationChanges,
    ) -> Result<u64, LocationError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let key = id.to_string();
        let mut locations = self.guard()?;

        match locations.iter_mut().find(|l| l.id == key) {
            Some(location) if changes.differs_from(location) => {
                changes.apply_to(location);
                location.updated_at = Some(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn health_check(&self) -> Result<(), LocationError> {
        self.guard().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_location(name: &str) -> NewLocation {
        NewLocation {
            name: name.into(),
            latitude: 1.1,
            longitude: 1.1,
            marker_color: "FFFFFF".into(),
        }
    }

    #[test]
    fn page_request_clamps_like_the_listing_endpoint() {
        assert_eq!(PageRequest::new(0, 0), PageRequest::new(1, 10));
        assert_eq!(PageRequest::new(-3, 5).skip(), 0);
        assert_eq!(PageRequest::new(3, 5).skip(), 10);
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() {
        let store = InMemoryLocationStore::new();
        let id = store.insert(new_location("test")).await.unwrap();

        let found = store.find_by_id(&id).await.unwrap();
        assert_eq!(found.id, id.to_string());
        assert_eq!(found.name, "test");
        assert!(found.created_at.is_some());
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = InMemoryLocationStore::new();
        let err = store.find_by_id(&LocationId::generate()).await.unwrap_err();
        assert!(matches!(err, LocationError::NotFound));
    }

    #[tokio::test]
    async fn pages_are_stable_and_bounded() {
        let store = InMemoryLocationStore::new();
        for name in ["a", "b", "c"] {
            store.insert(new_location(name)).await.unwrap();
        }

        let first = store.find_page(PageRequest::new(1, 2)).await.unwrap();
        let second = store.find_page(PageRequest::new(2, 2)).await.unwrap();
        let beyond = store.find_page(PageRequest::new(3, 2)).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
        assert!(beyond.is_empty());
        assert!(first.iter().all(|l| l.id != second[0].id));
    }

    #[tokio::test]
    async fn conditional_update_skips_identical_values() {
        let store = InMemoryLocationStore::new();
        let id = store.insert(new_location("test")).await.unwrap();

        let same = LocationChanges {
            name: Some("test".into()),
            ..Default::default()
        };
        assert_eq!(store.update_if_changed(&id, &same).await.unwrap(), 0);

        let renamed = LocationChanges {
            name: Some("renamed".into()),
            ..Default::default()
        };
        assert_eq!(store.update_if_changed(&id, &renamed).await.unwrap(), 1);
        let stored = store.find_by_id(&id).await.unwrap();
        assert_eq!(stored.name, "renamed");
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = InMemoryLocationStore::new();
        store.set_unavailable(true);

        assert!(store.find_all().await.is_err());
        assert!(store.health_check().await.is_err());
    }
}
