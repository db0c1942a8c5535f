//! Scan configuration.
//!
//! # Responsibility
//! - Hold the roots, depth bound and descriptor file name used by scans.
//! - Load the same shape from a JSON file supplied by the host application.
//!
//! # Invariants
//! - `max_depth >= 1`; the scan root itself is level 1.
//! - `descriptor_file_name` is a bare file name, never a path.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Descriptor file name expected at the top of every map directory.
pub const DEFAULT_DESCRIPTOR_FILE_NAME: &str = "map.json";
/// Number of directory levels examined below (and including) each root.
pub const DEFAULT_MAX_DEPTH: usize = 6;

/// Settings for map discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories walked by `MapRegistry::trigger_scan`.
    pub roots: Vec<PathBuf>,
    pub max_depth: usize,
    pub descriptor_file_name: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            descriptor_file_name: DEFAULT_DESCRIPTOR_FILE_NAME.to_string(),
        }
    }
}

impl ScanConfig {
    /// Default settings scanning `roots`.
    pub fn with_roots<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Reads and validates a JSON config file. Absent keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            source: err,
        })?;
        let config: ScanConfig = serde_json::from_slice(&raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        let name = self.descriptor_file_name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidDescriptorName(
                self.descriptor_file_name.clone(),
            ));
        }
        if name != self.descriptor_file_name
            || name.contains('/')
            || name.contains('\\')
            || name == "."
            || name == ".."
        {
            return Err(ConfigError::InvalidDescriptorName(
                self.descriptor_file_name.clone(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
    ZeroDepth,
    InvalidDescriptorName(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read scan config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid scan config: {err}"),
            Self::ZeroDepth => write!(f, "max_depth must be at least 1"),
            Self::InvalidDescriptorName(value) => {
                write!(f, "descriptor_file_name must be a bare file name, got `{value}`")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::ZeroDepth | Self::InvalidDescriptorName(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, ScanConfig, DEFAULT_DESCRIPTOR_FILE_NAME, DEFAULT_MAX_DEPTH};
    use std::path::PathBuf;

    #[test]
    fn defaults_match_discovery_constants() {
        let config = ScanConfig::default();
        assert!(config.roots.is_empty());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(config.descriptor_file_name, DEFAULT_DESCRIPTOR_FILE_NAME);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("scan.json");
        std::fs::write(&path, r#"{ "roots": ["/sdcard/maps", "/data/maps"] }"#)
            .expect("write config");

        let config = ScanConfig::from_json_file(&path).expect("config should load");
        assert_eq!(
            config.roots,
            vec![PathBuf::from("/sdcard/maps"), PathBuf::from("/data/maps")]
        );
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn rejects_zero_depth_and_path_like_descriptor_names() {
        let mut config = ScanConfig::with_roots(["/maps"]);
        config.max_depth = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroDepth)));

        config.max_depth = 3;
        config.descriptor_file_name = "nested/map.json".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDescriptorName(_))
        ));

        config.descriptor_file_name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = ScanConfig::from_json_file(dir.path().join("absent.json"))
            .expect_err("missing file must fail");
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
