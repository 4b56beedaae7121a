//! Error handling for toolview
//!
//! Geometry and index errors abort a whole mesh build; nothing is published
//! on failure. Picking misses are not errors and are reported as `None` by
//! the decoder, so [`PickError`] only covers encoding limits.

use thiserror::Error;

/// Mesh build error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// The stream holds no movement, so there is no starting point
    #[error("Movement stream is empty")]
    EmptyStream,

    /// A layer without movements was asked for its height
    #[error("Layer {layer} has no movements and therefore no height")]
    MissingLayerHeight {
        /// Index of the empty layer.
        layer: usize,
    },

    /// The progress callback asked the build to stop
    #[error("Mesh build cancelled after {completed_layers} of {total_layers} layers")]
    Cancelled {
        /// Number of layers processed before cancellation.
        completed_layers: usize,
        /// Number of layers in the stream.
        total_layers: usize,
    },
}

/// Picking encoder error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    /// Movement count overflows the 24-bit color id space
    #[error("Cannot encode {count} movements in 24-bit colors (max {max})")]
    TooManyMovements {
        /// Requested movement count.
        count: usize,
        /// Largest supported count.
        max: usize,
    },
}

/// Result type alias for mesh build operations.
pub type ModelResult<T> = Result<T, ModelError>;
