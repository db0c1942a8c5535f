//! Map entity.
//!
//! # Responsibility
//! - Aggregate a parsed descriptor, its calibration result and the bound tile
//!   provider for one map directory.
//!
//! # Invariants
//! - `root_path` identifies the entity and never changes after construction.
//! - The descriptor is kept whole, so markers and calibration data are
//!   available to collaborators exactly as parsed.

use crate::calibration::{Calibration, CalibrationError, CalibrationOutcome, CalibrationStatus};
use crate::descriptor::{Level, MapDescriptor};
use crate::model::geo::{MapBounds, MapSize};
use crate::model::marker::Marker;
use crate::tiles::TileProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One discovered map.
#[derive(Debug, Clone)]
pub struct MapEntity {
    root_path: PathBuf,
    descriptor_path: PathBuf,
    descriptor: MapDescriptor,
    calibration: CalibrationOutcome,
    thumbnail_path: Option<PathBuf>,
    tile_provider: Option<Arc<dyn TileProvider>>,
}

impl MapEntity {
    /// Creates an entity for the map rooted at `root_path`.
    ///
    /// The thumbnail file name is resolved against `root_path`; its existence
    /// is not checked.
    pub fn new(
        root_path: impl Into<PathBuf>,
        descriptor_path: impl Into<PathBuf>,
        descriptor: MapDescriptor,
        calibration: CalibrationOutcome,
    ) -> Self {
        let root_path = root_path.into();
        let thumbnail_path = descriptor
            .thumbnail
            .as_deref()
            .map(|name| root_path.join(name));
        Self {
            root_path,
            descriptor_path: descriptor_path.into(),
            descriptor,
            calibration,
            thumbnail_path,
            tile_provider: None,
        }
    }

    pub fn bind_tile_provider(&mut self, provider: Arc<dyn TileProvider>) {
        self.tile_provider = Some(provider);
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    pub fn descriptor(&self) -> &MapDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn description(&self) -> Option<&str> {
        self.descriptor.description.as_deref()
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        self.calibration.status()
    }

    /// Present only when the status is `Ok`.
    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.calibration()
    }

    /// Present only when the status is `Error`.
    pub fn calibration_error(&self) -> Option<&CalibrationError> {
        self.calibration.error()
    }

    pub fn thumbnail_path(&self) -> Option<&Path> {
        self.thumbnail_path.as_deref()
    }

    pub fn size(&self) -> Option<MapSize> {
        self.descriptor.size
    }

    pub fn levels(&self) -> &[Level] {
        &self.descriptor.levels
    }

    pub fn markers(&self) -> &[Marker] {
        &self.descriptor.markers
    }

    pub fn image_extension(&self) -> Option<&str> {
        self.descriptor
            .provider
            .as_ref()
            .and_then(|provider| provider.image_extension.as_deref())
    }

    pub fn tile_provider(&self) -> Option<&Arc<dyn TileProvider>> {
        self.tile_provider.as_ref()
    }

    /// Geographic extent, when the map is calibrated and its size is known.
    pub fn bounds(&self) -> Option<MapBounds> {
        Some(self.calibration()?.bounds(self.size()?))
    }
}
