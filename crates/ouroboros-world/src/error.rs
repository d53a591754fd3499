//! Error types for the `ouroboros-world` crate.

/// Errors that can occur during grid operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The requested dimensions leave no playable interior.
    #[error("grid of {rows}x{cols} has no playable interior (minimum 3x3)")]
    InvalidDimensions {
        /// Requested row count, walls included.
        rows: usize,
        /// Requested column count, walls included.
        cols: usize,
    },

    /// The requested dimensions overflow the addressable cell count.
    #[error("grid of {rows}x{cols} is too large to allocate")]
    TooLarge {
        /// Requested row count, walls included.
        rows: usize,
        /// Requested column count, walls included.
        cols: usize,
    },
}
