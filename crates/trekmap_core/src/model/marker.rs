//! Map markers.
//!
//! Markers are created and edited by collaborators outside the core; the core
//! only carries them from the descriptor to the map entity without loss.

use crate::model::geo::{GeoPoint, ProjectedPoint};
use serde::{Deserialize, Serialize};

/// A named point of interest on a map.
///
/// `proj_x`/`proj_y` are kept as stored. A marker without a projected pair is
/// not the same as a marker projected to `(0, 0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proj_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Marker {
    pub fn new(name: impl Into<String>, position: GeoPoint) -> Self {
        Self {
            name: name.into(),
            lat: position.lat,
            lon: position.lon,
            proj_x: None,
            proj_y: None,
            comment: None,
        }
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Returns the projected pair only when both halves are present.
    pub fn projected(&self) -> Option<ProjectedPoint> {
        match (self.proj_x, self.proj_y) {
            (Some(x), Some(y)) => Some(ProjectedPoint::new(x, y)),
            _ => None,
        }
    }
}
