//! Map discovery.
//!
//! # Responsibility
//! - Walk scan roots for directories holding a descriptor file.
//! - Parse, calibrate and bind a tile provider for every descriptor found.
//!
//! # Invariants
//! - A directory with a descriptor is a leaf: nothing below it is examined.
//! - Directories deeper than the configured level are never read.
//! - Unreadable directories and broken descriptors are skipped; a scan
//!   always completes unless it is cancelled.

mod task;
mod walk;

pub use task::{DiscoveryTask, ScanCancellation, ScanResult, SkippedDescriptor};
