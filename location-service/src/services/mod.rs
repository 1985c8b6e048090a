pub mod cache;
pub mod database;
pub mod distance;
pub mod error;
pub mod location;
pub mod metrics;
pub mod reconciler;
pub mod routes;
pub mod snapshot;
pub mod store;

pub use cache::{InMemoryCache, KeyValueCache, RedisCache};
pub use database::MongoDb;
pub use distance::haversine_km;
pub use error::LocationError;
pub use location::LocationService;
pub use metrics::{get_metrics, init_metrics};
pub use reconciler::BatchReconciler;
pub use routes::{rank_by_distance, RoutesAssembler};
pub use snapshot::LocationSnapshot;
pub use store::{InMemoryLocationStore, LocationStore, PageRequest};
