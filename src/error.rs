use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnnIndexError {
    /// A tree must hold at most this many points per leaf, and that must be at least one.
    #[error("Leaf size must be at least 1, got {0}.")]
    InvalidLeafSize(usize),

    /// The number of requested neighbors must be at least one.
    #[error("k must be at least 1, got {0}.")]
    InvalidK(usize),

    /// The approximation factor was negative or NaN.
    #[error("eps must be non-negative, got {0}.")]
    InvalidEps(f64),

    /// The distance upper bound was negative or NaN.
    #[error("Distance upper bound must be non-negative, got {0}.")]
    InvalidDistanceUpperBound(f64),

    /// Points must have at least one coordinate.
    #[error("Dimensionality must be at least 1.")]
    InvalidDimensions,

    /// A point or query has a different number of coordinates than the tree.
    #[error("Expected {expected} dimensions, got {actual}.")]
    DimensionMismatch {
        /// Dimensionality of the tree.
        expected: usize,
        /// Dimensionality of the offending input.
        actual: usize,
    },

    /// A flat coordinate buffer is not a whole number of points.
    #[error("Coordinate buffer of length {len} is not a multiple of {dims} dimensions.")]
    InvalidBufferLength {
        /// Length of the buffer.
        len: usize,
        /// Dimensionality it was interpreted with.
        dims: usize,
    },

    /// Point indices are stored as `u32`.
    #[error("Too many points: {0} exceeds the u32 index range.")]
    TooManyPoints(usize),

    #[error("General error: {0}")]
    General(String),
}

impl KnnIndexError {
    /// Returns `true` for errors caused by invalid tree or query parameters (`leafsize`, `k`,
    /// `eps`, `distance_upper_bound`).
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidLeafSize(_)
                | Self::InvalidK(_)
                | Self::InvalidEps(_)
                | Self::InvalidDistanceUpperBound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, KnnIndexError>;
