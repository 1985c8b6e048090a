use crate::models::{
    Coordinate, Location, LocationId, NewLocation, RoutedLocation, UpdateInstruction,
    UpdateOutcome,
};
use crate::services::{
    BatchReconciler, LocationError, LocationSnapshot, LocationStore, PageRequest, RoutesAssembler,
};
use std::sync::Arc;

/// Entry point for every location operation the HTTP layer exposes.
#[derive(Clone)]
pub struct LocationService {
    store: Arc<dyn LocationStore>,
    snapshot: LocationSnapshot,
    reconciler: BatchReconciler,
    routes: RoutesAssembler,
}

impl LocationService {
    pub fn new(store: Arc<dyn LocationStore>, snapshot: LocationSnapshot) -> Self {
        Self {
            reconciler: BatchReconciler::new(store.clone(), snapshot.clone()),
            routes: RoutesAssembler::new(snapshot.clone()),
            store,
            snapshot,
        }
    }

    pub async fn create(&self, location: NewLocation) -> Result<LocationId, LocationError> {
        let id = self.store.insert(location).await?;
        tracing::info!(id = %id, "Location created");
        self.snapshot.invalidate().await;
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<Location, LocationError> {
        let id: LocationId = id.parse()?;
        self.store.find_by_id(&id).await
    }

    /// One page of locations in store order. An empty page is `NotFound`.
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Location>, LocationError> {
        let locations = self.store.find_page(page).await?;
        if locations.is_empty() {
            return Err(LocationError::NotFound);
        }
        Ok(locations)
    }

    pub async fn update(
        &self,
        batch: &[UpdateInstruction],
    ) -> Result<UpdateOutcome, LocationError> {
        self.reconciler.apply(batch).await
    }

    pub async fn routes(&self, origin: Coordinate) -> Result<Vec<RoutedLocation>, LocationError> {
        self.routes.rank(origin).await
    }

    /// Store and cache reachability.
    pub async fn readiness(&self) -> Result<(), LocationError> {
        self.store.health_check().await?;
        self.snapshot.cache_health().await?;
        Ok(())
    }
}
