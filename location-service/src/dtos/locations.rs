use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::{
    provided, Coordinate, Location, NewLocation, RoutedLocation, UpdateInstruction, ZeroIsUnset,
};

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_coordinates"))]
pub struct CreateLocationRequest {
    #[validate(length(min = 3, message = "Name must be at least 3 characters"))]
    pub name: String,

    pub latitude: f64,

    pub longitude: f64,

    #[validate(custom(function = "validate_hex_color"))]
    pub marker_color: String,
}

fn validate_coordinates(request: &CreateLocationRequest) -> Result<(), ValidationError> {
    for value in [request.latitude, request.longitude] {
        if value.provided().is_none() {
            return Err(coordinate_error("Latitude and longitude are required"));
        }
        if !value.is_finite() {
            return Err(coordinate_error("Latitude and longitude must be finite"));
        }
    }
    Ok(())
}

fn coordinate_error(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("coordinates");
    err.message = Some(message.into());
    err
}

fn validate_hex_color(value: &str) -> Result<(), ValidationError> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Ok(());
    }
    let mut err = ValidationError::new("hexcolor");
    err.message = Some("Marker color must be 6 hex digits".into());
    Err(err)
}

impl From<CreateLocationRequest> for NewLocation {
    fn from(request: CreateLocationRequest) -> Self {
        Self {
            name: request.name,
            latitude: request.latitude,
            longitude: request.longitude,
            marker_color: request.marker_color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLocationResponse {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetLocationParams {
    pub id: String,
}

/// Public record shape. Timestamps stay internal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub marker_color: String,
}

impl From<Location> for LocationResponse {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
            marker_color: location.marker_color,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LocationListResponse {
    pub locations: Vec<LocationResponse>,
}

#[derive(Debug, Deserialize)]
pub struct LocationListParams {
    pub page: i64,
    pub limit: i64,
}

/// Batch update body: either `{"locations": [...]}` or a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UpdateLocationsRequest {
    Wrapped { locations: Vec<UpdateInstruction> },
    Bare(Vec<UpdateInstruction>),
}

impl UpdateLocationsRequest {
    pub fn instructions(&self) -> &[UpdateInstruction] {
        match self {
            Self::Wrapped { locations } => locations,
            Self::Bare(locations) => locations,
        }
    }
}

impl Validate for UpdateLocationsRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        if self.instructions().is_empty() {
            let mut errors = ValidationErrors::new();
            let mut err = ValidationError::new("length");
            err.message = Some("At least one location update is required".into());
            errors.add("locations", err);
            return Err(errors);
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RoutesParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl RoutesParams {
    /// The query point, when both coordinates are provided.
    pub fn origin(&self) -> Option<Coordinate> {
        Some(Coordinate::new(
            provided(self.latitude)?,
            provided(self.longitude)?,
        ))
    }
}

impl Validate for RoutesParams {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [("latitude", self.latitude), ("longitude", self.longitude)] {
            match provided(value) {
                None => {
                    let mut err = ValidationError::new("required");
                    err.message = Some(format!("{} is required", field).into());
                    errors.add(field, err);
                }
                Some(v) if !v.is_finite() => {
                    let mut err = ValidationError::new("finite");
                    err.message = Some(format!("{} must be finite", field).into());
                    errors.add(field, err);
                }
                Some(_) => {}
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoutesResponse {
    pub routes: Vec<RoutedLocation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str, latitude: f64, longitude: f64, color: &str) -> CreateLocationRequest {
        CreateLocationRequest {
            name: name.into(),
            latitude,
            longitude,
            marker_color: color.into(),
        }
    }

    #[test]
    fn accepts_a_well_formed_location() {
        assert!(create("test", 1.1, 1.1, "FFFFFF").validate().is_ok());
        assert!(create("abc", -12.5, 170.0, "a0b1c2").validate().is_ok());
    }

    #[test]
    fn rejects_short_names_zero_coordinates_and_bad_colours() {
        assert!(create("ab", 1.1, 1.1, "FFFFFF").validate().is_err());
        assert!(create("test", 0.0, 1.1, "FFFFFF").validate().is_err());
        assert!(create("test", 1.1, 0.0, "FFFFFF").validate().is_err());
        assert!(create("test", 1.1, 1.1, "FFFFF").validate().is_err());
        assert!(create("test", 1.1, 1.1, "GGGGGG").validate().is_err());
        assert!(create("test", f64::NAN, 1.1, "FFFFFF").validate().is_err());
    }

    #[test]
    fn missing_fields_decode_as_zero_values_and_fail() {
        let request: CreateLocationRequest = serde_json::from_str(r#"{"name":"test"}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn batch_body_accepts_both_shapes() {
        let wrapped: UpdateLocationsRequest =
            serde_json::from_str(r#"{"locations":[{"id":"a","name":"x"}]}"#).unwrap();
        let bare: UpdateLocationsRequest =
            serde_json::from_str(r#"[{"id":"a","name":"x"}]"#).unwrap();

        assert_eq!(wrapped.instructions(), bare.instructions());
        assert_eq!(bare.instructions()[0].name.as_deref(), Some("x"));
    }

    #[test]
    fn empty_batch_fails_validation() {
        let request: UpdateLocationsRequest = serde_json::from_str("[]").unwrap();
        assert!(request.validate().is_err());

        let request: UpdateLocationsRequest =
            serde_json::from_str(r#"{"locations":[]}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn routes_need_both_non_zero_coordinates() {
        let ok = RoutesParams {
            latitude: Some(1.1),
            longitude: Some(1.1),
        };
        assert!(ok.validate().is_ok());
        assert_eq!(ok.origin(), Some(Coordinate::new(1.1, 1.1)));

        let zero = RoutesParams {
            latitude: Some(0.0),
            longitude: Some(1.1),
        };
        assert!(zero.validate().is_err());
        assert!(zero.origin().is_none());

        assert!(RoutesParams::default().validate().is_err());
    }

    #[test]
    fn public_record_drops_timestamps() {
        let json = serde_json::to_value(LocationResponse::from(Location {
            id: "a".into(),
            name: "test".into(),
            latitude: 1.1,
            longitude: 1.1,
            marker_color: "FFFFFF".into(),
            created_at: Some(chrono::Utc::now()),
            updated_at: None,
        }))
        .unwrap();

        assert!(json.get("created_at").is_none());
        assert_eq!(json["marker_color"], "FFFFFF");
    }
}
