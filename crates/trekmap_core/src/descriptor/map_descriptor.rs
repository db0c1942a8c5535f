use crate::model::geo::{CalibrationPoint, MapSize};
use crate::model::marker::Marker;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Typed content of one map descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// File name relative to the map directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<MapSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<TileSourceInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<Level>,
    #[serde(skip_serializing_if = "CalibrationSpec::is_empty")]
    pub calibration: CalibrationSpec,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<Marker>,
}

impl MapDescriptor {
    /// Minimal descriptor with only the mandatory name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            thumbnail: None,
            size: None,
            provider: None,
            levels: Vec::new(),
            calibration: CalibrationSpec::default(),
            markers: Vec::new(),
        }
    }

    /// Serializes back to the descriptor JSON layout.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Where the tiles came from and how they are stored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileSourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    /// Tile file extension including the dot, e.g. `.jpg`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_extension: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub x: u32,
    pub y: u32,
}

/// One zoom level of the tile pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub level: u32,
    pub tile_size: TileSize,
}

/// Calibration section of a descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CalibrationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionSpec>,
    /// Informational; every method is evaluated with the two-point policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration_method: Option<String>,
    /// Complete points only.
    pub calibration_points: Vec<CalibrationPoint>,
    /// First coordinate found missing on a calibration point, e.g.
    /// `"lon"`. Such a point cannot be used and fails the calibration.
    #[serde(skip)]
    pub incomplete_point: Option<&'static str>,
}

impl CalibrationSpec {
    pub fn is_empty(&self) -> bool {
        self.projection.is_none()
            && self.calibration_method.is_none()
            && self.calibration_points.is_empty()
            && self.incomplete_point.is_none()
    }
}

/// Projection identifier plus algorithm parameters.
///
/// Parameters are kept untyped here; `Projection::from_spec` validates them
/// during calibration so that a bad projection degrades the map instead of
/// hiding it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionSpec {
    #[serde(rename = "projection_name")]
    pub name: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ProjectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// Decodes descriptor bytes.
///
/// A leading UTF-8 byte order mark is ignored. Unknown keys are ignored and
/// `null` is accepted wherever a section is optional.
pub fn parse_descriptor(bytes: &[u8]) -> Result<MapDescriptor, DescriptorError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let raw: RawDescriptor = serde_json::from_slice(bytes).map_err(|err| match err.classify() {
        Category::Data => DescriptorError::InvalidValue(err),
        Category::Syntax | Category::Eof | Category::Io => DescriptorError::Malformed(err),
    })?;
    raw.into_descriptor()
}

/// Reads and decodes the descriptor at `path`.
pub fn load_descriptor(path: impl AsRef<Path>) -> Result<MapDescriptor, DescriptorError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|err| DescriptorError::Io {
        path: path.to_path_buf(),
        source: err,
    })?;
    parse_descriptor(&bytes)
}

#[derive(Debug)]
pub enum DescriptorError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Not parseable as JSON.
    Malformed(serde_json::Error),
    /// Valid JSON with a value of the wrong shape or type.
    InvalidValue(serde_json::Error),
    /// The map name is absent, `null` or blank.
    MissingField(&'static str),
}

impl Display for DescriptorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read descriptor `{}`: {source}", path.display())
            }
            Self::Malformed(err) => write!(f, "malformed descriptor: {err}"),
            Self::InvalidValue(err) => write!(f, "invalid descriptor value: {err}"),
            Self::MissingField(field) => write!(f, "descriptor missing required field: {field}"),
        }
    }
}

impl Error for DescriptorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Malformed(err) | Self::InvalidValue(err) => Some(err),
            Self::MissingField(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    description: Option<String>,
    thumbnail: Option<String>,
    size: Option<MapSize>,
    provider: Option<TileSourceInfo>,
    levels: Option<Vec<Level>>,
    calibration: Option<RawCalibration>,
    markers: Option<Vec<RawMarker>>,
}

#[derive(Deserialize)]
struct RawCalibration {
    projection: Option<RawProjection>,
    calibration_method: Option<String>,
    calibration_points: Option<Vec<RawCalibrationPoint>>,
}

#[derive(Deserialize)]
struct RawProjection {
    projection_name: Option<String>,
    #[serde(flatten)]
    params: BTreeMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawCalibrationPoint {
    x: Option<f64>,
    y: Option<f64>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude", alias = "lng")]
    lon: Option<f64>,
}

#[derive(Deserialize)]
struct RawMarker {
    name: Option<String>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
    #[serde(alias = "longitude", alias = "lng")]
    lon: Option<f64>,
    proj_x: Option<f64>,
    proj_y: Option<f64>,
    comment: Option<String>,
}

impl RawDescriptor {
    fn into_descriptor(self) -> Result<MapDescriptor, DescriptorError> {
        let name = non_blank(self.name).ok_or(DescriptorError::MissingField("name"))?;

        let calibration = match self.calibration {
            Some(raw) => raw.into_spec(),
            None => CalibrationSpec::default(),
        };

        let markers = self
            .markers
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| raw.into_marker(&name))
            .collect();

        Ok(MapDescriptor {
            name,
            description: non_blank(self.description),
            thumbnail: non_blank(self.thumbnail),
            size: self.size,
            provider: self.provider,
            levels: self.levels.unwrap_or_default(),
            calibration,
            markers,
        })
    }
}

impl RawCalibration {
    fn into_spec(self) -> CalibrationSpec {
        let projection = self.projection.map(|raw| ProjectionSpec {
            name: raw
                .projection_name
                .map(|name| name.trim().to_string())
                .unwrap_or_default(),
            params: raw.params,
        });

        let mut incomplete_point = None;
        let mut calibration_points = Vec::new();
        for raw in self.calibration_points.unwrap_or_default() {
            match raw.complete() {
                Ok(point) => calibration_points.push(point),
                Err(field) => {
                    incomplete_point.get_or_insert(field);
                }
            }
        }

        CalibrationSpec {
            projection,
            calibration_method: non_blank(self.calibration_method),
            calibration_points,
            incomplete_point,
        }
    }
}

impl RawCalibrationPoint {
    fn complete(self) -> Result<CalibrationPoint, &'static str> {
        Ok(CalibrationPoint {
            x: self.x.ok_or("x")?,
            y: self.y.ok_or("y")?,
            lat: self.lat.ok_or("lat")?,
            lon: self.lon.ok_or("lon")?,
        })
    }
}

impl RawMarker {
    /// `None` when the marker has no usable position.
    fn into_marker(self, map_name: &str) -> Option<Marker> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            warn!(
                "event=marker_skip module=descriptor status=skipped map={} marker={}",
                map_name,
                self.name.as_deref().unwrap_or("")
            );
            return None;
        };
        Some(Marker {
            name: self.name.unwrap_or_default(),
            lat,
            lon,
            proj_x: self.proj_x,
            proj_y: self.proj_y,
            comment: self.comment,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{parse_descriptor, DescriptorError, MapDescriptor, ProjectionSpec};
    use crate::model::geo::{CalibrationPoint, GeoPoint, MapSize, PixelPoint};
    use crate::model::marker::Marker;
    use serde_json::json;

    fn parse_value(value: serde_json::Value) -> Result<MapDescriptor, DescriptorError> {
        parse_descriptor(value.to_string().as_bytes())
    }

    #[test]
    fn name_only_descriptor_resolves_optional_sections_to_empty() {
        let descriptor = parse_value(json!({ "name": "Alps" })).expect("name-only parses");

        assert_eq!(descriptor, MapDescriptor::named("Alps"));
        assert!(descriptor.calibration.calibration_points.is_empty());
        assert!(descriptor.calibration.projection.is_none());
        assert!(descriptor.markers.is_empty());
        assert!(descriptor.thumbnail.is_none());
    }

    #[test]
    fn null_sections_are_treated_as_absent() {
        let descriptor = parse_value(json!({
            "name": "Alps",
            "thumbnail": null,
            "levels": null,
            "markers": null,
            "calibration": { "projection": null, "calibration_points": null }
        }))
        .expect("null optional sections parse");

        assert_eq!(descriptor, MapDescriptor::named("Alps"));
    }

    #[test]
    fn parses_full_descriptor() {
        let descriptor = parse_value(json!({
            "name": "Mont Blanc",
            "description": "IGN 1:25000",
            "thumbnail": "thumbnail.jpg",
            "size": { "x": 8192, "y": 6144 },
            "provider": { "generated_by": "IGN", "image_extension": ".jpg" },
            "levels": [ { "level": 0, "tile_size": { "x": 256, "y": 256 } } ],
            "calibration": {
                "projection": { "projection_name": "Universal Transverse Mercator", "zone": 32, "hemisphere": "N" },
                "calibration_method": "SIMPLE_2_POINTS",
                "calibration_points": [
                    { "x": 0.0, "y": 0.0, "lat": 46.0, "lon": 6.5 },
                    { "x": 8192.0, "y": 6144.0, "latitude": 45.5, "longitude": 7.2 }
                ]
            },
            "markers": [ { "name": "Refuge", "lat": 45.8, "lon": 6.9, "comment": "water" } ],
            "unknown_key": { "ignored": true }
        }))
        .expect("full descriptor parses");

        assert_eq!(descriptor.description.as_deref(), Some("IGN 1:25000"));
        assert_eq!(
            descriptor.size,
            Some(MapSize {
                width: 8192,
                height: 6144
            })
        );
        assert_eq!(descriptor.levels.len(), 1);
        assert_eq!(
            descriptor.calibration.calibration_points[1],
            CalibrationPoint::new(PixelPoint::new(8192.0, 6144.0), GeoPoint::new(45.5, 7.2))
        );
        let projection = descriptor.calibration.projection.expect("projection");
        assert_eq!(projection.name, "Universal Transverse Mercator");
        assert_eq!(projection.params["zone"], json!(32));
        assert_eq!(descriptor.markers[0].comment.as_deref(), Some("water"));
        assert_eq!(descriptor.markers[0].projected(), None);
    }

    #[test]
    fn syntax_errors_are_malformed() {
        let err = parse_descriptor(br#"{ "name": "Alps", "#).expect_err("truncated input");
        assert!(matches!(err, DescriptorError::Malformed(_)));

        let err = parse_descriptor(b"name = Alps").expect_err("not json");
        assert!(matches!(err, DescriptorError::Malformed(_)));
    }

    #[test]
    fn wrong_value_types_are_invalid_values() {
        let err = parse_value(json!({
            "name": "Alps",
            "calibration": { "calibration_points": [ { "x": "zero", "y": 0, "lat": 45, "lon": 6 } ] }
        }))
        .expect_err("string coordinate must fail");
        assert!(matches!(err, DescriptorError::InvalidValue(_)));
    }

    #[test]
    fn missing_or_blank_name_is_missing_field() {
        let err = parse_value(json!({ "description": "no name" })).expect_err("no name");
        assert!(matches!(err, DescriptorError::MissingField("name")));

        let err = parse_value(json!({ "name": "   " })).expect_err("blank name");
        assert!(matches!(err, DescriptorError::MissingField("name")));
    }

    #[test]
    fn incomplete_calibration_point_is_recorded_not_fatal() {
        let descriptor = parse_value(json!({
            "name": "Alps",
            "calibration": { "calibration_points": [
                { "x": 0, "y": 0, "lat": 45, "lon": 6 },
                { "x": 10, "y": 10, "lat": 46 }
            ] }
        }))
        .expect("point without lon keeps the descriptor");

        assert_eq!(descriptor.calibration.incomplete_point, Some("lon"));
        assert_eq!(descriptor.calibration.calibration_points.len(), 1);
        assert!(!descriptor.calibration.is_empty());
    }

    #[test]
    fn marker_without_position_is_dropped() {
        let descriptor = parse_value(json!({
            "name": "Vosges",
            "markers": [
                { "name": "Summit", "lon": 7.0 },
                { "name": "Lake", "lat": 48.0, "lon": 7.1 }
            ]
        }))
        .expect("marker without lat keeps the descriptor");

        assert_eq!(descriptor.markers.len(), 1);
        assert_eq!(descriptor.markers[0].name, "Lake");
    }

    #[test]
    fn projection_without_name_parses_with_blank_name() {
        let descriptor = parse_value(json!({
            "name": "Alps",
            "calibration": { "projection": { "zone": 32 } }
        }))
        .expect("nameless projection keeps the descriptor");

        let projection = descriptor.calibration.projection.expect("projection kept");
        assert!(projection.name.is_empty());
        assert_eq!(projection.params["zone"], json!(32));
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(br#"{ "name": "Alps" }"#);
        assert_eq!(
            parse_descriptor(&bytes).expect("bom input parses").name,
            "Alps"
        );
    }

    #[test]
    fn serialization_preserves_marker_projection_presence() {
        let mut descriptor = MapDescriptor::named("Alps");
        descriptor.calibration.projection =
            Some(ProjectionSpec::new("Pseudo-Mercator").with_param("datum", json!("WGS84")));
        let unprojected = Marker::new("Lake", GeoPoint::new(45.1, 6.1));
        let mut at_origin = Marker::new("Origin", GeoPoint::new(45.2, 6.2));
        at_origin.proj_x = Some(0.0);
        at_origin.proj_y = Some(0.0);
        descriptor.markers = vec![unprojected, at_origin];

        let json = descriptor.to_json_string().expect("serializes");
        let reparsed = parse_descriptor(json.as_bytes()).expect("reparses");

        assert_eq!(reparsed, descriptor);
        assert_eq!(reparsed.markers[0].projected(), None);
        assert!(reparsed.markers[1].projected().is_some());
    }
}
