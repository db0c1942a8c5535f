//! Coordinate value types shared by the descriptor, calibration and map model.

use serde::{Deserialize, Serialize};

/// Position in raw map pixels. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Finite and inside [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Planar position in the units of a projection (meters for the built-in ones).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Raw pixel dimensions of the full-resolution map image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    #[serde(rename = "x", alias = "width")]
    pub width: u32,
    #[serde(rename = "y", alias = "height")]
    pub height: u32,
}

/// One pixel/geographic pair from a descriptor.
///
/// Stored flat (`x`, `y`, `lat`, `lon`) to match the descriptor layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPoint {
    pub x: f64,
    pub y: f64,
    pub lat: f64,
    pub lon: f64,
}

impl CalibrationPoint {
    pub fn new(pixel: PixelPoint, geo: GeoPoint) -> Self {
        Self {
            x: pixel.x,
            y: pixel.y,
            lat: geo.lat,
            lon: geo.lon,
        }
    }

    pub fn pixel(&self) -> PixelPoint {
        PixelPoint::new(self.x, self.y)
    }

    pub fn geo(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Geographic extent of a calibrated map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapBounds {
    /// Geographic position of pixel `(0, 0)`.
    pub top_left: GeoPoint,
    /// Geographic position of pixel `(width, height)`.
    pub bottom_right: GeoPoint,
}

impl MapBounds {
    pub fn contains(&self, point: GeoPoint) -> bool {
        let (lat_min, lat_max) = ordered(self.top_left.lat, self.bottom_right.lat);
        let (lon_min, lon_max) = ordered(self.top_left.lon, self.bottom_right.lon);
        (lat_min..=lat_max).contains(&point.lat) && (lon_min..=lon_max).contains(&point.lon)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
