//! Error types for the packer.

use thiserror::Error;

/// Result type alias for packing operations.
pub type Result<T> = std::result::Result<T, PackError>;

/// Precondition violations rejected before any packing work happens.
///
/// Boxes that simply do not fit are not errors; they end up in the
/// report's unplaced list.
#[derive(Debug, Error, PartialEq)]
pub enum PackError {
    #[error("invalid bin #{index}: {reason}")]
    InvalidBin { index: usize, reason: String },

    #[error("invalid box '{number}': {reason}")]
    InvalidBox { number: String, reason: String },

    #[error("saw kerf must be a finite non-negative number, got {0}")]
    InvalidKerf(f64),

    #[error("trim must be a finite non-negative number, got {0}")]
    InvalidTrim(f64),

    #[error("bin index {0} is supplied more than once")]
    DuplicateBinIndex(usize),

    #[error("packer has already run; construct a new one per run")]
    AlreadyPacked,

    #[error("{requested} pieces requested, at most {limit} allowed per run")]
    TooManyPieces { requested: u64, limit: usize },
}
