//! Geographic to projected coordinate conversions.
//!
//! Both projections use the WGS84 ellipsoid parameters; Pseudo-Mercator
//! treats it as a sphere of the semi-major axis, as EPSG:3857 does.

use crate::descriptor::ProjectionSpec;
use crate::model::geo::{GeoPoint, ProjectedPoint};
use std::error::Error;
use std::f64::consts::{FRAC_PI_4, PI};
use std::fmt::{Display, Formatter};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
const UTM_MIN_LAT: f64 = -80.0;
const UTM_MAX_LAT: f64 = 84.0;
/// Latitude at which the Pseudo-Mercator square ends.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_6;

/// A validated projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// EPSG:3857.
    PseudoMercator,
    UniversalTransverseMercator { zone: u8, north: bool },
}

impl Projection {
    /// Resolves a descriptor projection spec.
    ///
    /// Names compare case-insensitively with punctuation and spaces ignored,
    /// so `Pseudo-Mercator`, `pseudo_mercator` and `EPSG:3857` are the same.
    pub fn from_spec(spec: &ProjectionSpec) -> Result<Self, ProjectionError> {
        match normalize_name(&spec.name).as_str() {
            "pseudomercator" | "webmercator" | "epsg3857" => Ok(Self::PseudoMercator),
            "universaltransversemercator" | "utm" => {
                let zone = spec
                    .params
                    .get("zone")
                    .ok_or(ProjectionError::MissingParameter("zone"))?;
                let zone = parse_zone(zone)?;
                let north = match spec.params.get("hemisphere") {
                    None => true,
                    Some(value) => parse_hemisphere(value)?,
                };
                Ok(Self::UniversalTransverseMercator { zone, north })
            }
            _ => Err(ProjectionError::UnknownProjection(spec.name.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::PseudoMercator => "Pseudo-Mercator",
            Self::UniversalTransverseMercator { .. } => "Universal Transverse Mercator",
        }
    }

    /// Projects a geographic point, failing outside the projection's domain.
    pub fn project(&self, geo: GeoPoint) -> Result<ProjectedPoint, ProjectionError> {
        if !geo.is_valid() {
            return Err(ProjectionError::OutOfDomain(geo));
        }
        match *self {
            Self::PseudoMercator => {
                if geo.lat.abs() > MERCATOR_MAX_LAT {
                    return Err(ProjectionError::OutOfDomain(geo));
                }
                let x = WGS84_A * geo.lon.to_radians();
                let y = WGS84_A * (FRAC_PI_4 + geo.lat.to_radians() / 2.0).tan().ln();
                Ok(ProjectedPoint::new(x, y))
            }
            Self::UniversalTransverseMercator { zone, north } => {
                if !(UTM_MIN_LAT..=UTM_MAX_LAT).contains(&geo.lat) {
                    return Err(ProjectionError::OutOfDomain(geo));
                }
                Ok(utm_forward(geo, zone, north))
            }
        }
    }
}

fn utm_forward(geo: GeoPoint, zone: u8, north: bool) -> ProjectedPoint {
    let e2 = WGS84_F * (2.0 - WGS84_F);
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);

    let central_meridian = (f64::from(zone) - 1.0) * 6.0 - 180.0 + 3.0;
    let phi = geo.lat.to_radians();
    let mut delta_lon = geo.lon - central_meridian;
    if delta_lon > 180.0 {
        delta_lon -= 360.0;
    } else if delta_lon < -180.0 {
        delta_lon += 360.0;
    }
    let lambda = delta_lon * PI / 180.0;

    let (sin_phi, cos_phi) = phi.sin_cos();
    let tan_phi = phi.tan();
    let n = WGS84_A / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * lambda;

    let m = WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin());

    let x = UTM_K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + UTM_FALSE_EASTING;

    let mut y = UTM_K0
        * (m + n
            * tan_phi
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    if !north {
        y += UTM_FALSE_NORTHING_SOUTH;
    }

    ProjectedPoint::new(x, y)
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn parse_zone(value: &serde_json::Value) -> Result<u8, ProjectionError> {
    let zone = match value {
        serde_json::Value::Number(number) => number.as_u64(),
        serde_json::Value::String(raw) => raw.trim().parse::<u64>().ok(),
        _ => None,
    };
    match zone {
        Some(zone @ 1..=60) => Ok(zone as u8),
        _ => Err(ProjectionError::InvalidParameter {
            parameter: "zone",
            value: value.to_string(),
        }),
    }
}

fn parse_hemisphere(value: &serde_json::Value) -> Result<bool, ProjectionError> {
    let raw = value.as_str().map(|raw| raw.trim().to_ascii_lowercase());
    match raw.as_deref() {
        Some("n" | "north") => Ok(true),
        Some("s" | "south") => Ok(false),
        _ => Err(ProjectionError::InvalidParameter {
            parameter: "hemisphere",
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    UnknownProjection(String),
    MissingParameter(&'static str),
    InvalidParameter {
        parameter: &'static str,
        value: String,
    },
    OutOfDomain(GeoPoint),
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProjection(name) => write!(f, "unknown projection: {name}"),
            Self::MissingParameter(name) => write!(f, "projection parameter missing: {name}"),
            Self::InvalidParameter { parameter, value } => {
                write!(f, "projection parameter {parameter} is invalid: {value}")
            }
            Self::OutOfDomain(geo) => write!(
                f,
                "point ({}, {}) is outside the projection domain",
                geo.lat, geo.lon
            ),
        }
    }
}

impl Error for ProjectionError {}

#[cfg(test)]
mod tests {
    use super::{Projection, ProjectionError, MERCATOR_MAX_LAT};
    use crate::descriptor::ProjectionSpec;
    use crate::model::geo::GeoPoint;
    use serde_json::json;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn resolves_names_loosely() {
        for name in ["Pseudo-Mercator", "pseudo_mercator", "EPSG:3857", "Web Mercator"] {
            assert_eq!(
                Projection::from_spec(&ProjectionSpec::new(name)),
                Ok(Projection::PseudoMercator)
            );
        }
        let utm = ProjectionSpec::new("UTM")
            .with_param("zone", json!("31"))
            .with_param("hemisphere", json!("south"));
        assert_eq!(
            Projection::from_spec(&utm),
            Ok(Projection::UniversalTransverseMercator {
                zone: 31,
                north: false
            })
        );
    }

    #[test]
    fn rejects_unknown_names_and_bad_parameters() {
        assert!(matches!(
            Projection::from_spec(&ProjectionSpec::new("Lambert 93")),
            Err(ProjectionError::UnknownProjection(_))
        ));
        assert_eq!(
            Projection::from_spec(&ProjectionSpec::new("UTM")),
            Err(ProjectionError::MissingParameter("zone"))
        );
        let zone_61 = ProjectionSpec::new("UTM").with_param("zone", json!(61));
        assert!(matches!(
            Projection::from_spec(&zone_61),
            Err(ProjectionError::InvalidParameter { parameter: "zone", .. })
        ));
        let bad_hemisphere = ProjectionSpec::new("UTM")
            .with_param("zone", json!(31))
            .with_param("hemisphere", json!("east"));
        assert!(matches!(
            Projection::from_spec(&bad_hemisphere),
            Err(ProjectionError::InvalidParameter {
                parameter: "hemisphere",
                ..
            })
        ));
    }

    #[test]
    fn pseudo_mercator_matches_reference_values() {
        let origin = Projection::PseudoMercator
            .project(GeoPoint::new(0.0, 0.0))
            .expect("origin projects");
        assert_close(origin.x, 0.0, 1e-9);
        assert_close(origin.y, 0.0, 1e-9);

        let antimeridian = Projection::PseudoMercator
            .project(GeoPoint::new(0.0, 180.0))
            .expect("antimeridian projects");
        assert_close(antimeridian.x, 20_037_508.342_789_244, 1e-6);

        let corner = Projection::PseudoMercator
            .project(GeoPoint::new(MERCATOR_MAX_LAT, 0.0))
            .expect("square corner projects");
        assert_close(corner.y, 20_037_508.342_789_244, 1e-2);
    }

    #[test]
    fn pseudo_mercator_rejects_polar_latitudes() {
        assert!(matches!(
            Projection::PseudoMercator.project(GeoPoint::new(89.0, 0.0)),
            Err(ProjectionError::OutOfDomain(_))
        ));
    }

    #[test]
    fn utm_central_meridian_on_equator_is_false_origin() {
        let projection = Projection::UniversalTransverseMercator {
            zone: 31,
            north: true,
        };
        let point = projection
            .project(GeoPoint::new(0.0, 3.0))
            .expect("equator projects");
        assert_close(point.x, 500_000.0, 1e-6);
        assert_close(point.y, 0.0, 1e-6);

        let south = Projection::UniversalTransverseMercator {
            zone: 31,
            north: false,
        };
        let point = south
            .project(GeoPoint::new(0.0, 3.0))
            .expect("equator projects");
        assert_close(point.y, 10_000_000.0, 1e-6);
    }

    #[test]
    fn utm_easting_grows_east_of_central_meridian() {
        let projection = Projection::UniversalTransverseMercator {
            zone: 32,
            north: true,
        };
        let west = projection.project(GeoPoint::new(45.8, 8.0)).expect("west");
        let east = projection.project(GeoPoint::new(45.8, 10.0)).expect("east");
        assert!(west.x < 500_000.0);
        assert!(east.x > 500_000.0);
        assert!(west.y > 5_000_000.0 && west.y < 5_100_000.0);
    }

    #[test]
    fn utm_rejects_latitudes_outside_grid() {
        let projection = Projection::UniversalTransverseMercator {
            zone: 31,
            north: true,
        };
        assert!(projection.project(GeoPoint::new(85.0, 3.0)).is_err());
    }
}
