//! Tile provider binding.
//!
//! The core never decodes images. A `TileProvider` hands raw tile bytes to
//! whatever renderer the host application uses.

use crate::model::map::MapEntity;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Tile extension used when a descriptor does not declare one.
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

/// Source of tile images for one map.
pub trait TileProvider: Debug + Send + Sync {
    /// Location of the tile at `level`/`row`/`col`.
    fn tile_path(&self, level: u32, row: u32, col: u32) -> PathBuf;

    /// Raw encoded tile bytes.
    fn read_tile(&self, level: u32, row: u32, col: u32) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.tile_path(level, row, col))
    }
}

/// Builds the tile provider bound to each discovered map.
pub trait TileProviderFactory: Send + Sync {
    fn make_provider(&self, map: &MapEntity) -> Arc<dyn TileProvider>;
}

/// Tiles stored as `<root>/<level>/<row>/<col><extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTileProvider {
    root: PathBuf,
    image_extension: String,
}

impl FileTileProvider {
    pub fn new(root: impl Into<PathBuf>, image_extension: &str) -> Self {
        Self {
            root: root.into(),
            image_extension: normalize_extension(image_extension),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn image_extension(&self) -> &str {
        &self.image_extension
    }
}

impl TileProvider for FileTileProvider {
    fn tile_path(&self, level: u32, row: u32, col: u32) -> PathBuf {
        self.root
            .join(level.to_string())
            .join(row.to_string())
            .join(format!("{col}{}", self.image_extension))
    }
}

/// Default factory: a `FileTileProvider` rooted at the map directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTileProviderFactory;

impl TileProviderFactory for FileTileProviderFactory {
    fn make_provider(&self, map: &MapEntity) -> Arc<dyn TileProvider> {
        let extension = map
            .image_extension()
            .unwrap_or(DEFAULT_IMAGE_EXTENSION);
        Arc::new(FileTileProvider::new(map.root_path(), extension))
    }
}

fn normalize_extension(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_IMAGE_EXTENSION.to_string()
    } else if trimmed.starts_with('.') {
        trimmed.to_string()
    } else {
        format!(".{trimmed}")
    }
}
