//! Core map discovery, descriptor parsing and calibration for trekmap.
//! This crate owns every rule about what a map directory is and how its
//! pixels relate to the ground.

pub mod calibration;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod logging;
pub mod model;
pub mod registry;
pub mod tiles;

pub use calibration::{
    calibrate, calibrate_spec, Calibration, CalibrationError, CalibrationOutcome, CalibrationStatus,
    Projection, ProjectionError,
};
pub use config::{ConfigError, ScanConfig, DEFAULT_DESCRIPTOR_FILE_NAME, DEFAULT_MAX_DEPTH};
pub use descriptor::{
    load_descriptor, parse_descriptor, CalibrationSpec, DescriptorError, MapDescriptor,
    ProjectionSpec,
};
pub use discovery::{DiscoveryTask, ScanCancellation, ScanResult, SkippedDescriptor};
pub use logging::{default_log_level, init_logging};
pub use model::geo::{
    CalibrationPoint, GeoPoint, MapBounds, MapSize, PixelPoint, ProjectedPoint,
};
pub use model::map::MapEntity;
pub use model::marker::Marker;
pub use registry::{
    ListenerHandle, MapList, MapListUpdateListener, MapRegistry, ScanOutcome, ScanReport,
};
pub use tiles::{FileTileProvider, FileTileProviderFactory, TileProvider, TileProviderFactory};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
