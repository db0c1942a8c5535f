use crate::calibration::{calibrate_spec, CalibrationStatus};
use crate::config::ScanConfig;
use crate::descriptor::{load_descriptor, DescriptorError};
use crate::discovery::walk::find_descriptor_files;
use crate::logging::{sanitize_message, MAX_ERROR_MESSAGE_CHARS};
use crate::model::map::MapEntity;
use crate::tiles::TileProviderFactory;
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Shared flag telling an in-flight scan to stop.
#[derive(Debug, Clone, Default)]
pub struct ScanCancellation {
    cancelled: Arc<AtomicBool>,
}

impl ScanCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A descriptor that was found but could not be turned into a map.
#[derive(Debug)]
pub struct SkippedDescriptor {
    pub path: PathBuf,
    pub error: DescriptorError,
}

/// Everything one completed scan produced.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Maps in traversal order.
    pub maps: Vec<MapEntity>,
    pub skipped: Vec<SkippedDescriptor>,
}

impl ScanResult {
    pub fn found(&self) -> bool {
        !self.maps.is_empty()
    }
}

/// One pass of map discovery over a set of roots.
pub struct DiscoveryTask {
    roots: Vec<PathBuf>,
    max_depth: usize,
    descriptor_file_name: String,
    tile_factory: Arc<dyn TileProviderFactory>,
    cancellation: ScanCancellation,
}

impl DiscoveryTask {
    /// Task over the roots, depth and descriptor name of `config`.
    pub fn new(config: &ScanConfig, tile_factory: Arc<dyn TileProviderFactory>) -> Self {
        Self {
            roots: config.roots.clone(),
            max_depth: config.max_depth,
            descriptor_file_name: config.descriptor_file_name.clone(),
            tile_factory,
            cancellation: ScanCancellation::new(),
        }
    }

    /// Replaces the roots taken from the config.
    pub fn with_roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.roots = roots;
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn cancellation(&self) -> ScanCancellation {
        self.cancellation.clone()
    }

    /// Runs the scan on a blocking worker of `runtime`.
    ///
    /// The handle resolves once, with `None` when the scan was cancelled.
    pub fn spawn(self, runtime: &Handle) -> JoinHandle<Option<ScanResult>> {
        runtime.spawn_blocking(move || self.run())
    }

    /// Walks, parses and calibrates on the calling thread.
    ///
    /// Returns `None` when cancelled; otherwise always completes, with an
    /// empty result if nothing usable was found.
    pub fn run(&self) -> Option<ScanResult> {
        let started_at = Instant::now();
        info!(
            "event=scan_start module=discovery status=start roots={} max_depth={}",
            self.roots.len(),
            self.max_depth
        );

        let descriptors = self.collect_descriptors();
        let mut result = ScanResult::default();

        for descriptor_path in descriptors {
            if self.cancellation.is_cancelled() {
                break;
            }
            match self.build_map(&descriptor_path) {
                Ok(map) => result.maps.push(map),
                Err(error) => {
                    warn!(
                        "event=descriptor_skip module=discovery status=skipped path={} error={}",
                        descriptor_path.display(),
                        sanitize_message(&error.to_string(), MAX_ERROR_MESSAGE_CHARS)
                    );
                    result.skipped.push(SkippedDescriptor {
                        path: descriptor_path,
                        error,
                    });
                }
            }
        }

        if self.cancellation.is_cancelled() {
            info!(
                "event=scan_cancelled module=discovery status=cancelled duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return None;
        }

        info!(
            "event=scan_complete module=discovery status=ok maps={} skipped={} duration_ms={}",
            result.maps.len(),
            result.skipped.len(),
            started_at.elapsed().as_millis()
        );
        Some(result)
    }

    /// Descriptor paths from every root, without duplicates or nested maps.
    ///
    /// Roots may overlap; a map reached from two roots is kept once, and a
    /// map lying inside another discovered map is dropped.
    fn collect_descriptors(&self) -> Vec<PathBuf> {
        let mut seen_roots = HashSet::new();
        let mut found = Vec::new();

        for root in &self.roots {
            for descriptor in find_descriptor_files(
                root,
                &self.descriptor_file_name,
                self.max_depth,
                &self.cancellation,
            ) {
                let descriptor = canonical(&descriptor);
                let Some(map_root) = descriptor.parent().map(Path::to_path_buf) else {
                    continue;
                };
                if seen_roots.insert(map_root) {
                    found.push(descriptor);
                }
            }
        }

        found
            .into_iter()
            .filter(|descriptor| {
                let nested = descriptor
                    .parent()
                    .map(|map_root| {
                        map_root
                            .ancestors()
                            .skip(1)
                            .any(|ancestor| seen_roots.contains(ancestor))
                    })
                    .unwrap_or(false);
                !nested
            })
            .collect()
    }

    fn build_map(&self, descriptor_path: &Path) -> Result<MapEntity, DescriptorError> {
        let descriptor = load_descriptor(descriptor_path)?;
        let root_path = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let outcome = calibrate_spec(&descriptor.calibration);
        if let Some(err) = outcome.error() {
            warn!(
                "event=calibration module=discovery status=error path={} error={}",
                root_path.display(),
                err
            );
        }

        let mut map = MapEntity::new(root_path, descriptor_path, descriptor, outcome);
        let provider = self.tile_factory.make_provider(&map);
        map.bind_tile_provider(provider);

        if map.calibration_status() == CalibrationStatus::None {
            info!(
                "event=calibration module=discovery status=none path={}",
                map.root_path().display()
            );
        }
        Ok(map)
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::{DiscoveryTask, ScanCancellation};
    use crate::calibration::CalibrationStatus;
    use crate::config::ScanConfig;
    use crate::descriptor::DescriptorError;
    use crate::tiles::FileTileProviderFactory;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    fn write_map(dir: &Path, body: &str) {
        fs::create_dir_all(dir).expect("map dir");
        fs::write(dir.join("map.json"), body).expect("descriptor");
    }

    fn task_for(roots: &[&Path]) -> DiscoveryTask {
        let config = ScanConfig::with_roots(roots.iter().map(|root| root.to_path_buf()));
        DiscoveryTask::new(&config, Arc::new(FileTileProviderFactory))
    }

    #[test]
    fn broken_descriptor_is_skipped_without_failing_siblings() {
        let root = tempfile::tempdir().expect("temp dir");
        write_map(&root.path().join("good"), r#"{ "name": "Good" }"#);
        write_map(&root.path().join("bad"), r#"{ "name": "#);
        write_map(&root.path().join("nameless"), r#"{ "description": "x" }"#);

        let result = task_for(&[root.path()]).run().expect("not cancelled");

        assert_eq!(result.maps.len(), 1);
        assert_eq!(result.maps[0].name(), "Good");
        assert_eq!(result.skipped.len(), 2);
        assert!(result
            .skipped
            .iter()
            .any(|skip| matches!(skip.error, DescriptorError::Malformed(_))));
        assert!(result
            .skipped
            .iter()
            .any(|skip| matches!(skip.error, DescriptorError::MissingField("name"))));
    }

    #[test]
    fn overlapping_roots_do_not_duplicate_maps() {
        let root = tempfile::tempdir().expect("temp dir");
        let alps = root.path().join("alps");
        write_map(&alps, r#"{ "name": "Alps" }"#);

        let result = task_for(&[root.path(), alps.as_path()]).run().expect("not cancelled");
        assert_eq!(result.maps.len(), 1);
    }

    #[test]
    fn root_inside_another_map_is_not_listed() {
        let root = tempfile::tempdir().expect("temp dir");
        let outer = root.path().join("outer");
        let inner = outer.join("inner");
        write_map(&outer, r#"{ "name": "Outer" }"#);
        write_map(&inner, r#"{ "name": "Inner" }"#);

        let result = task_for(&[inner.as_path(), outer.as_path()]).run().expect("not cancelled");
        assert_eq!(result.maps.len(), 1);
        assert_eq!(result.maps[0].name(), "Outer");
    }

    #[test]
    fn maps_get_tile_provider_even_when_calibration_fails() {
        let root = tempfile::tempdir().expect("temp dir");
        write_map(
            root.path(),
            r#"{
                "name": "Degenerate",
                "calibration": { "calibration_points": [
                    { "x": 5, "y": 5, "lat": 45, "lon": 6 },
                    { "x": 5, "y": 5, "lat": 46, "lon": 7 }
                ] }
            }"#,
        );

        let result = task_for(&[root.path()]).run().expect("not cancelled");
        let map = &result.maps[0];
        assert_eq!(map.calibration_status(), CalibrationStatus::Error);
        assert!(map.calibration_error().is_some());
        assert!(map.tile_provider().is_some());
    }

    #[test]
    fn cancelled_task_returns_none() {
        let root = tempfile::tempdir().expect("temp dir");
        write_map(root.path(), r#"{ "name": "Alps" }"#);
        let task = task_for(&[root.path()]);
        let cancellation: ScanCancellation = task.cancellation();
        cancellation.cancel();

        assert!(task.run().is_none());
    }

    #[test]
    fn empty_roots_complete_with_nothing_found() {
        let result = task_for(&[]).run().expect("not cancelled");
        assert!(!result.found());
        assert!(result.skipped.is_empty());
    }
}
