pub mod health;
pub mod locations;
pub mod metrics;
pub mod routes;

pub use health::{health_check, readiness_check};
pub use locations::{create_location, get_location, list_locations, update_locations};
pub use metrics::metrics_endpoint;
pub use routes::get_routes;
