use crate::config::{ConfigError, ScanConfig};
use crate::discovery::{DiscoveryTask, ScanCancellation, ScanResult};
use crate::model::map::MapEntity;
use crate::tiles::{FileTileProviderFactory, TileProviderFactory};
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Published, read-only list of maps.
pub type MapList = Arc<Vec<MapEntity>>;

/// Receives one call per completed scan.
pub trait MapListUpdateListener: Send + Sync {
    /// `found` is `true` when the new list holds at least one map.
    fn on_map_list_update(&self, found: bool);
}

impl<F> MapListUpdateListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_map_list_update(&self, found: bool) {
        self(found)
    }
}

/// Registration token returned by `MapRegistry::add_listener`.
///
/// The consumer owns the listener's lifetime and must hand the token back to
/// `remove_listener` on teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerHandle(u64);

/// How a triggered scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan's list was installed and listeners were notified.
    Installed { maps: usize, skipped: usize },
    /// A newer scan was triggered first; nothing was installed.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    /// Sequence number of the scan, starting at 1.
    pub generation: u64,
    pub outcome: ScanOutcome,
}

/// Catalog of discovered maps shared by every consumer of the process.
///
/// Cloning yields another handle to the same catalog.
#[derive(Clone)]
pub struct MapRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    config: ScanConfig,
    runtime: Handle,
    tile_factory: Arc<dyn TileProviderFactory>,
    maps: RwLock<MapList>,
    listeners: Mutex<BTreeMap<ListenerHandle, Arc<dyn MapListUpdateListener>>>,
    next_listener_id: AtomicU64,
    active_scan: Mutex<ActiveScan>,
}

#[derive(Default)]
struct ActiveScan {
    generation: u64,
    cancellation: Option<ScanCancellation>,
}

impl MapRegistry {
    /// Empty registry using file-backed tile providers.
    ///
    /// Scans run on `runtime`'s blocking pool; listeners are called from
    /// tasks on `runtime`.
    pub fn new(config: ScanConfig, runtime: Handle) -> Result<Self, ConfigError> {
        Self::with_tile_factory(config, runtime, Arc::new(FileTileProviderFactory))
    }

    pub fn with_tile_factory(
        config: ScanConfig,
        runtime: Handle,
        tile_factory: Arc<dyn TileProviderFactory>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RegistryInner {
                config,
                runtime,
                tile_factory,
                maps: RwLock::new(Arc::new(Vec::new())),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(1),
                active_scan: Mutex::new(ActiveScan::default()),
            }),
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.inner.config
    }

    /// Scans the configured roots.
    pub fn trigger_scan(&self) -> JoinHandle<ScanReport> {
        self.trigger_scan_with_roots(self.inner.config.roots.clone())
    }

    /// Scans `roots`, cancelling any scan still in flight.
    ///
    /// The returned handle does not need to be awaited for the scan to take
    /// effect. Only the most recently triggered scan can install its list.
    pub fn trigger_scan_with_roots(&self, roots: Vec<PathBuf>) -> JoinHandle<ScanReport> {
        let task = DiscoveryTask::new(&self.inner.config, Arc::clone(&self.inner.tile_factory))
            .with_roots(roots);

        let generation = {
            let mut active = lock(&self.inner.active_scan);
            if let Some(previous) = active.cancellation.take() {
                debug!(
                    "event=scan_supersede module=registry status=ok generation={}",
                    active.generation
                );
                previous.cancel();
            }
            active.generation += 1;
            active.cancellation = Some(task.cancellation());
            active.generation
        };

        let worker = task.spawn(&self.inner.runtime);
        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(err) => {
                    error!(
                        "event=scan_worker module=registry status=error generation={} error={}",
                        generation, err
                    );
                    Some(ScanResult::default())
                }
            };
            inner.complete_scan(generation, result)
        })
    }

    /// Snapshot of the current list.
    pub fn maps(&self) -> MapList {
        Arc::clone(&read(&self.inner.maps))
    }

    /// Map rooted at `root_path`, if listed.
    pub fn get_map(&self, root_path: &Path) -> Option<MapEntity> {
        self.maps()
            .iter()
            .find(|map| map.root_path() == root_path)
            .cloned()
    }

    /// First listed map named `name`.
    pub fn find_by_name(&self, name: &str) -> Option<MapEntity> {
        self.maps().iter().find(|map| map.name() == name).cloned()
    }

    pub fn is_scanning(&self) -> bool {
        lock(&self.inner.active_scan).cancellation.is_some()
    }

    pub fn add_listener(&self, listener: Arc<dyn MapListUpdateListener>) -> ListenerHandle {
        let handle = ListenerHandle(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).insert(handle, listener);
        handle
    }

    /// Returns `false` when `handle` was not registered.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        lock(&self.inner.listeners).remove(&handle).is_some()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner.listeners).len()
    }
}

impl RegistryInner {
    fn complete_scan(&self, generation: u64, result: Option<ScanResult>) -> ScanReport {
        let superseded = ScanReport {
            generation,
            outcome: ScanOutcome::Superseded,
        };
        let Some(result) = result else {
            return superseded;
        };

        let maps = result.maps.len();
        let skipped = result.skipped.len();
        {
            let mut active = lock(&self.active_scan);
            if active.generation != generation {
                debug!(
                    "event=scan_install module=registry status=skipped generation={} current={}",
                    generation, active.generation
                );
                return superseded;
            }
            active.cancellation = None;
            *write(&self.maps) = Arc::new(result.maps);
        }

        info!(
            "event=scan_install module=registry status=ok generation={} maps={} skipped={}",
            generation, maps, skipped
        );

        let listeners: Vec<_> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener.on_map_list_update(maps > 0);
        }

        ScanReport {
            generation,
            outcome: ScanOutcome::Installed { maps, skipped },
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
