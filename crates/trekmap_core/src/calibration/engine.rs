use crate::calibration::projection::{Projection, ProjectionError};
use crate::descriptor::{CalibrationSpec, ProjectionSpec};
use crate::model::geo::{CalibrationPoint, GeoPoint, MapBounds, MapSize, PixelPoint, ProjectedPoint};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Calibration state of a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalibrationStatus {
    /// A usable transform exists.
    Ok,
    /// Fewer than two calibration points; nothing was attempted.
    None,
    /// A transform was attempted but the geometry or projection is unusable.
    Error,
}

impl CalibrationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::None => "NONE",
            Self::Error => "ERROR",
        }
    }
}

/// Result of running the calibration engine on one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationOutcome {
    Calibrated(Calibration),
    Uncalibrated,
    Failed(CalibrationError),
}

impl CalibrationOutcome {
    pub fn status(&self) -> CalibrationStatus {
        match self {
            Self::Calibrated(_) => CalibrationStatus::Ok,
            Self::Uncalibrated => CalibrationStatus::None,
            Self::Failed(_) => CalibrationStatus::Error,
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        match self {
            Self::Calibrated(calibration) => Some(calibration),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CalibrationError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Maps one pixel axis onto one geographic axis.
///
/// Interpolates as `a * (1 - t) + b * t` so that both reference pixels map
/// back to their geographic values bit for bit.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearAxis {
    pixel_a: f64,
    pixel_b: f64,
    geo_a: f64,
    geo_b: f64,
}

impl LinearAxis {
    fn to_geo(self, pixel: f64) -> f64 {
        let t = (pixel - self.pixel_a) / (self.pixel_b - self.pixel_a);
        self.geo_a * (1.0 - t) + self.geo_b * t
    }

    fn to_pixel(self, geo: f64) -> f64 {
        let t = (geo - self.geo_a) / (self.geo_b - self.geo_a);
        self.pixel_a * (1.0 - t) + self.pixel_b * t
    }
}

/// Pixel to geographic transform, optionally followed by a projection.
///
/// Pixel `x` drives longitude and pixel `y` drives latitude; the axes are
/// independent, so rotated maps are not representable.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    lon_axis: LinearAxis,
    lat_axis: LinearAxis,
    projection: Option<Projection>,
}

impl Calibration {
    pub fn pixel_to_geo(&self, pixel: PixelPoint) -> GeoPoint {
        GeoPoint::new(self.lat_axis.to_geo(pixel.y), self.lon_axis.to_geo(pixel.x))
    }

    pub fn geo_to_pixel(&self, geo: GeoPoint) -> PixelPoint {
        PixelPoint::new(self.lon_axis.to_pixel(geo.lon), self.lat_axis.to_pixel(geo.lat))
    }

    pub fn projection(&self) -> Option<Projection> {
        self.projection
    }

    /// `None` when the map has no projection or the pixel falls outside the
    /// projection's domain.
    pub fn pixel_to_projected(&self, pixel: PixelPoint) -> Option<ProjectedPoint> {
        let projection = self.projection?;
        projection.project(self.pixel_to_geo(pixel)).ok()
    }

    /// Geographic extent of a map of `size` pixels.
    pub fn bounds(&self, size: MapSize) -> MapBounds {
        MapBounds {
            top_left: self.pixel_to_geo(PixelPoint::new(0.0, 0.0)),
            bottom_right: self.pixel_to_geo(PixelPoint::new(
                f64::from(size.width),
                f64::from(size.height),
            )),
        }
    }
}

/// Calibrates a descriptor's calibration section.
///
/// A point with a missing coordinate fails the calibration even when enough
/// complete points remain.
pub fn calibrate_spec(spec: &CalibrationSpec) -> CalibrationOutcome {
    if let Some(field) = spec.incomplete_point {
        return CalibrationOutcome::Failed(CalibrationError::IncompletePoint(field));
    }
    calibrate(&spec.calibration_points, spec.projection.as_ref())
}

/// Builds a calibration from descriptor points.
///
/// Only the first and last points are used when more than two are given.
/// Zero or one point is `Uncalibrated`, not a failure.
pub fn calibrate(
    points: &[CalibrationPoint],
    projection: Option<&ProjectionSpec>,
) -> CalibrationOutcome {
    let (first, last) = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => (*first, *last),
        _ => return CalibrationOutcome::Uncalibrated,
    };

    match build(first, last, projection) {
        Ok(calibration) => CalibrationOutcome::Calibrated(calibration),
        Err(err) => CalibrationOutcome::Failed(err),
    }
}

fn build(
    first: CalibrationPoint,
    last: CalibrationPoint,
    projection: Option<&ProjectionSpec>,
) -> Result<Calibration, CalibrationError> {
    for point in [first, last] {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(CalibrationError::NonFinitePixel(point.pixel()));
        }
        if !point.geo().is_valid() {
            return Err(CalibrationError::GeoOutOfRange(point.geo()));
        }
    }
    if first.x == last.x {
        return Err(CalibrationError::DegeneratePixelAxis("x"));
    }
    if first.y == last.y {
        return Err(CalibrationError::DegeneratePixelAxis("y"));
    }
    if first.lat == last.lat {
        return Err(CalibrationError::DegenerateGeoAxis("lat"));
    }
    if first.lon == last.lon {
        return Err(CalibrationError::DegenerateGeoAxis("lon"));
    }

    let projection = match projection {
        Some(spec) => {
            let projection = Projection::from_spec(spec)?;
            projection.project(first.geo())?;
            projection.project(last.geo())?;
            Some(projection)
        }
        None => None,
    };

    Ok(Calibration {
        lon_axis: LinearAxis {
            pixel_a: first.x,
            pixel_b: last.x,
            geo_a: first.lon,
            geo_b: last.lon,
        },
        lat_axis: LinearAxis {
            pixel_a: first.y,
            pixel_b: last.y,
            geo_a: first.lat,
            geo_b: last.lat,
        },
        projection,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// A calibration point lacks this coordinate.
    IncompletePoint(&'static str),
    NonFinitePixel(PixelPoint),
    GeoOutOfRange(GeoPoint),
    /// Both reference points share this pixel coordinate.
    DegeneratePixelAxis(&'static str),
    /// Both reference points share this geographic coordinate.
    DegenerateGeoAxis(&'static str),
    Projection(ProjectionError),
}

impl Display for CalibrationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncompletePoint(field) => {
                write!(f, "calibration point is missing `{field}`")
            }
            Self::NonFinitePixel(pixel) => {
                write!(f, "calibration pixel ({}, {}) is not finite", pixel.x, pixel.y)
            }
            Self::GeoOutOfRange(geo) => write!(
                f,
                "calibration coordinate ({}, {}) is out of range",
                geo.lat, geo.lon
            ),
            Self::DegeneratePixelAxis(axis) => {
                write!(f, "calibration points share the same pixel {axis}")
            }
            Self::DegenerateGeoAxis(axis) => {
                write!(f, "calibration points share the same {axis}")
            }
            Self::Projection(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CalibrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Projection(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectionError> for CalibrationError {
    fn from(value: ProjectionError) -> Self {
        Self::Projection(value)
    }
}
