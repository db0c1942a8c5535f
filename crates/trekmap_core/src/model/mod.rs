//! Domain model for discovered maps.
//!
//! # Responsibility
//! - Define the coordinate value types shared by parsing and calibration.
//! - Define the map entity handed to consumers.
//!
//! # Invariants
//! - A map entity is identified by its root directory.
//! - Entities are not mutated after they are published by the registry.

pub mod geo;
pub mod map;
pub mod marker;
