use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid location id: {0:?}")]
pub struct InvalidLocationId(pub String);

/// Store key of a location: a 24-hex-character object id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationId(ObjectId);

impl LocationId {
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for LocationId {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl FromStr for LocationId {
    type Err = InvalidLocationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
            .map(Self)
            .map_err(|_| InvalidLocationId(s.to_string()))
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

/// A location record as the API and the snapshot cache see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub marker_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Location {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub marker_color: String,
}

/// Persisted form in the `locations` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub marker_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<bson::DateTime>,
}

impl LocationDocument {
    pub fn new(location: NewLocation) -> Self {
        Self {
            id: None,
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            marker_color: location.marker_color,
            created_at: Some(bson::DateTime::now()),
            updated_at: None,
        }
    }
}

impl From<LocationDocument> for Location {
    fn from(doc: LocationDocument) -> Self {
        Self {
            id: doc.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: doc.name,
            latitude: doc.latitude,
            longitude: doc.longitude,
            marker_color: doc.marker_color,
            created_at: doc.created_at.map(|d| d.to_chrono()),
            updated_at: doc.updated_at.map(|d| d.to_chrono()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_24_hex_ids_and_rejects_the_rest() {
        let id: LocationId = "67d562e3d9f2d225ca4d9918".parse().unwrap();
        assert_eq!(id.to_string(), "67d562e3d9f2d225ca4d9918");

        assert!("test".parse::<LocationId>().is_err());
        assert!("67d562e3d9f2d225ca4d991".parse::<LocationId>().is_err());
        assert!("zzd562e3d9f2d225ca4d9918".parse::<LocationId>().is_err());
    }

    #[test]
    fn document_without_timestamps_converts() {
        let oid = ObjectId::new();
        let doc: LocationDocument = bson::from_document(bson::doc! {
            "_id": oid,
            "name": "test3",
            "latitude": 124.12,
            "longitude": 134.12,
            "marker_color": "FFFAFF",
        })
        .unwrap();

        let location = Location::from(doc);
        assert_eq!(location.id, oid.to_hex());
        assert_eq!(location.name, "test3");
        assert!(location.created_at.is_none());
    }

    #[test]
    fn new_document_stamps_created_at_and_leaves_id_to_the_store() {
        let doc = LocationDocument::new(NewLocation {
            name: "test".into(),
            latitude: 1.1,
            longitude: 1.1,
            marker_color: "FFFFFF".into(),
        });

        assert!(doc.id.is_none());
        assert!(doc.created_at.is_some());
        let raw = bson::to_document(&doc).unwrap();
        assert!(!raw.contains_key("_id"));
        assert!(!raw.contains_key("updated_at"));
    }
}
