use crate::models::{Coordinate, Location, RoutedLocation};
use crate::services::{haversine_km, LocationError, LocationSnapshot};

/// Pairs every location with its distance from `origin`, nearest first.
///
/// Equal distances keep their snapshot order.
pub fn rank_by_distance(origin: Coordinate, locations: Vec<Location>) -> Vec<RoutedLocation> {
    let mut routed: Vec<RoutedLocation> = locations
        .into_iter()
        .map(|location| {
            let distance = haversine_km(&origin, &location.coordinate());
            RoutedLocation {
                id: location.id,
                name: location.name,
                marker_color: location.marker_color,
                distance,
            }
        })
        .collect();

    routed.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    routed
}

#[derive(Clone)]
pub struct RoutesAssembler {
    snapshot: LocationSnapshot,
}

impl RoutesAssembler {
    pub fn new(snapshot: LocationSnapshot) -> Self {
        Self { snapshot }
    }

    pub async fn rank(&self, origin: Coordinate) -> Result<Vec<RoutedLocation>, LocationError> {
        let locations = match self.snapshot.load_all().await {
            Ok(locations) => locations,
            Err(LocationError::NotFound) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let routed = rank_by_distance(origin, locations);
        tracing::debug!(
            latitude = origin.latitude,
            longitude = origin.longitude,
            count = routed.len(),
            "Routes ranked"
        );
        Ok(routed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryCache, InMemoryLocationStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn location(id: &str, latitude: f64, longitude: f64) -> Location {
        Location {
            id: id.into(),
            name: format!("loc-{}", id),
            latitude,
            longitude,
            marker_color: "FFFFFF".into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn assembler(locations: Vec<Location>) -> (RoutesAssembler, Arc<InMemoryLocationStore>) {
        let store = Arc::new(InMemoryLocationStore::with_locations(locations));
        let snapshot = LocationSnapshot::new(
            store.clone(),
            Arc::new(InMemoryCache::new()),
            "cached_db_locations",
            Duration::from_secs(30),
        );
        (RoutesAssembler::new(snapshot), store)
    }

    #[test]
    fn ranks_nearest_first() {
        let origin = Coordinate::new(41.0082, 28.9784);
        let ranked = rank_by_distance(
            origin,
            vec![
                location("far", 34.0522, -118.2437),
                location("near", 39.9334, 32.8597),
                location("here", 41.0082, 28.9784),
            ],
        );

        let ids: Vec<_> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["here", "near", "far"]);
        assert_eq!(ranked[0].distance, 0.0);
        assert!(ranked.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn ties_keep_input_order() {
        let ranked = rank_by_distance(
            Coordinate::new(1.1, 1.1),
            vec![location("b", 2.0, 2.0), location("a", 2.0, 2.0)],
        );

        assert_eq!(ranked[0].id, "b");
        assert_eq!(ranked[1].id, "a");
    }

    #[test]
    fn no_locations_rank_to_nothing() {
        assert!(rank_by_distance(Coordinate::new(1.1, 1.1), Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn empty_store_is_an_empty_ranking() {
        let (assembler, _store) = assembler(Vec::new());
        let routed = assembler.rank(Coordinate::new(1.1, 1.1)).await.unwrap();
        assert!(routed.is_empty());
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let (assembler, store) = assembler(vec![location("a", 1.0, 1.0)]);
        store.set_unavailable(true);

        assert!(assembler.rank(Coordinate::new(1.1, 1.1)).await.is_err());
    }

    #[tokio::test]
    async fn ranking_carries_id_name_and_colour() {
        let (assembler, _store) = assembler(vec![location("a", 1.1, 1.1)]);

        let routed = assembler.rank(Coordinate::new(1.1, 1.1)).await.unwrap();

        assert_eq!(
            routed,
            vec![RoutedLocation {
                id: "a".into(),
                name: "loc-a".into(),
                marker_color: "FFFFFF".into(),
                distance: 0.0,
            }]
        );
    }
}
