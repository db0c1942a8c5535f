//! Calibration engine.
//!
//! # Responsibility
//! - Turn descriptor calibration points into a pixel to geographic transform.
//! - Compose an optional geographic to projected conversion.
//!
//! # Invariants
//! - A point with a missing coordinate is `CalibrationStatus::Error`.
//! - Fewer than two points is `CalibrationStatus::None`, never an error.
//! - With two or more points only the first and the last are authoritative.
//! - Degenerate geometry or an unusable projection is
//!   `CalibrationStatus::Error`; the map is still listed.

mod engine;
pub mod projection;

pub use engine::{
    calibrate, calibrate_spec, Calibration, CalibrationError, CalibrationOutcome,
    CalibrationStatus,
};
pub use projection::{Projection, ProjectionError};
