//! # Toolview Core
//!
//! Movement stream data model and error types shared by the toolview crates.
//! A toolpath is an ordered list of layers, each an ordered list of
//! [`Movement`] records produced by an upstream G-code parser.

pub mod error;
pub mod movement;

pub use error::{ModelError, ModelResult, PickError};
pub use movement::{Layer, Movement, MovementFlags, MovementStream, Rgba};

/// Segments shorter than this are treated as zero-length.
pub const DEGENERATE_SEGMENT_EPSILON: f32 = 1e-6;

/// Largest number of movements that fit the 24-bit picking id space
/// (id 0 is reserved for the background).
pub const MAX_PICKABLE_MOVEMENTS: usize = 0x00FF_FFFF;
