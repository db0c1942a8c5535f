//! Map descriptor parsing.
//!
//! # Responsibility
//! - Decode the JSON descriptor found at the top of a map directory.
//! - Resolve absent optional sections to empty values instead of failing.
//!
//! # Invariants
//! - Parsing is a pure function of the input bytes.
//! - Syntax errors, wrong value types and missing mandatory fields are
//!   reported as distinct `DescriptorError` variants.

mod map_descriptor;

pub use map_descriptor::{
    load_descriptor, parse_descriptor, CalibrationSpec, DescriptorError, Level, MapDescriptor,
    ProjectionSpec, TileSize, TileSourceInfo,
};
