//! Map registry.
//!
//! # Responsibility
//! - Own the published list of maps and swap it when a scan completes.
//! - Start scans and notify registered listeners once per completed scan.
//!
//! # Invariants
//! - At most one scan is active; triggering a new one cancels the previous.
//! - A published list is never mutated or merged with another scan's list.
//! - Listeners are called from the coordination task, never from the
//!   blocking scan worker.

mod map_registry;

pub use map_registry::{
    ListenerHandle, MapList, MapListUpdateListener, MapRegistry, ScanOutcome, ScanReport,
};
