use crate::error::{KnnIndexError, Result};
use crate::r#type::IndexableFloat;

/// A flat, row-major buffer of `num_items * dims` coordinates.
///
/// Point `i` occupies `coords[i * dims..(i + 1) * dims]`. The buffer is never reallocated once
/// it is handed to a tree.
///
/// Coordinates must be finite. NaN or infinite values are not rejected, but the tree built from
/// them and every query answered by it are unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct PointBuffer<N: IndexableFloat> {
    coords: Vec<N>,
    dims: usize,
}

impl<N: IndexableFloat> PointBuffer<N> {
    /// Wrap an interleaved coordinate buffer.
    pub fn try_new(coords: Vec<N>, dims: usize) -> Result<Self> {
        check_buffer(&coords, dims)?;
        Ok(Self { coords, dims })
    }

    /// The number of coordinates per point.
    #[inline]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// The number of points in this buffer.
    #[inline]
    pub fn num_items(&self) -> usize {
        self.coords.len() / self.dims
    }

    /// Returns `true` if this buffer holds no points.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// The coordinates of point `index`.
    #[inline]
    pub fn point(&self, index: usize) -> &[N] {
        &self.coords[index * self.dims..(index + 1) * self.dims]
    }

    /// A single coordinate of point `index`.
    #[inline]
    pub fn coord(&self, index: usize, dim: usize) -> N {
        self.coords[index * self.dims + dim]
    }

    /// The underlying raw coordinate buffer.
    pub fn coords(&self) -> &[N] {
        &self.coords
    }

    /// Consume the buffer, returning the raw coordinates.
    pub fn into_inner(self) -> Vec<N> {
        self.coords
    }
}

/// Validate that `coords` holds a whole number of `dims`-dimensional points.
pub(crate) fn check_buffer<N>(coords: &[N], dims: usize) -> Result<()> {
    if dims == 0 {
        return Err(KnnIndexError::InvalidDimensions);
    }
    if coords.len() % dims != 0 {
        return Err(KnnIndexError::InvalidBufferLength {
            len: coords.len(),
            dims,
        });
    }
    Ok(())
}

/// Squared Euclidean distance between two points of equal dimension.
#[inline]
pub(crate) fn sq_dist<N: IndexableFloat>(a: &[N], b: &[N]) -> N {
    a.iter().zip(b).fold(N::zero(), |acc, (x, y)| {
        let d = *x - *y;
        acc + d * d
    })
}
