use serde::{Deserialize, Serialize};

/// A point in degrees. Range is not checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A location ranked by distance (km) from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedLocation {
    pub id: String,
    pub name: String,
    pub marker_color: String,
    pub distance: f64,
}
