use serde::{Deserialize, Serialize};

use super::Location;

/// Request values whose zero value stands for "not provided".
///
/// This is a known limitation carried over from the public API: an update
/// cannot set a name to `""` or a coordinate to exactly `0.0`, and a route
/// query at latitude or longitude `0.0` counts as missing. All of those
/// decisions go through this trait so the rule can be lifted in one place.
pub trait ZeroIsUnset: Sized {
    fn provided(self) -> Option<Self>;
}

impl ZeroIsUnset for f64 {
    fn provided(self) -> Option<Self> {
        (self != 0.0).then_some(self)
    }
}

impl ZeroIsUnset for String {
    fn provided(self) -> Option<Self> {
        (!self.is_empty()).then_some(self)
    }
}

/// `None`, or a zero value, both mean "not provided".
pub fn provided<T: ZeroIsUnset>(value: Option<T>) -> Option<T> {
    value.and_then(ZeroIsUnset::provided)
}

/// One element of a batch update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateInstruction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub marker_color: Option<String>,
}

impl UpdateInstruction {
    pub fn changes(&self) -> LocationChanges {
        LocationChanges {
            name: provided(self.name.clone()),
            latitude: provided(self.latitude),
            longitude: provided(self.longitude),
            marker_color: provided(self.marker_color.clone()),
        }
    }
}

/// The fields an update will write. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationChanges {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub marker_color: Option<String>,
}

impl LocationChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.marker_color.is_none()
    }

    /// True when at least one provided field differs from the stored value.
    pub fn differs_from(&self, current: &Location) -> bool {
        self.name.as_deref().is_some_and(|v| v != current.name)
            || self.latitude.is_some_and(|v| v != current.latitude)
            || self.longitude.is_some_and(|v| v != current.longitude)
            || self
                .marker_color
                .as_deref()
                .is_some_and(|v| v != current.marker_color)
    }

    pub fn apply_to(&self, location: &mut Location) {
        if let Some(name) = &self.name {
            location.name = name.clone();
        }
        if let Some(latitude) = self.latitude {
            location.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            location.longitude = longitude;
        }
        if let Some(marker_color) = &self.marker_color {
            location.marker_color = marker_color.clone();
        }
    }
}

/// Per-identifier result of a batch update.
///
/// Every input identifier lands in exactly one of the two lists, in input
/// order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub updated_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub updated_count: u64,
}

impl UpdateOutcome {
    pub fn record_updated(&mut self, id: impl Into<String>, modified: u64) {
        self.updated_ids.push(id.into());
        self.updated_count += modified;
    }

    pub fn record_failed(&mut self, id: impl Into<String>) {
        self.failed_ids.push(id.into());
    }

    pub fn is_empty(&self) -> bool {
        self.updated_ids.is_empty() && self.failed_ids.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.updated_ids.is_empty() && !self.failed_ids.is_empty()
    }
}
