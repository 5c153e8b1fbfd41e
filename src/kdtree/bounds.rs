use crate::indices::IndexArray;
use crate::kdtree::points::PointBuffer;
use crate::r#type::IndexableFloat;

/// Per-dimension `[min, max]` extents of a set of points.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox<N: IndexableFloat> {
    mins: Vec<N>,
    maxes: Vec<N>,
}

impl<N: IndexableFloat> BoundingBox<N> {
    /// A box containing nothing: every min is `+inf` and every max is `-inf`.
    pub fn empty(dims: usize) -> Self {
        Self {
            mins: vec![N::infinity(); dims],
            maxes: vec![N::neg_infinity(); dims],
        }
    }

    /// The bounding box of every point in `points`.
    pub fn from_points(points: &PointBuffer<N>) -> Self {
        let mut bbox = Self::empty(points.dims());
        for i in 0..points.num_items() {
            bbox.extend(points.point(i));
        }
        bbox
    }

    /// The tight bounding box of the points referenced by `indices[start..end]`.
    pub(crate) fn from_range(
        points: &PointBuffer<N>,
        indices: &IndexArray,
        start: usize,
        end: usize,
    ) -> Self {
        let mut bbox = Self::empty(points.dims());
        for slot in start..end {
            bbox.extend(points.point(indices.get(slot)));
        }
        bbox
    }

    #[inline]
    fn extend(&mut self, point: &[N]) {
        for (dim, value) in point.iter().enumerate() {
            if *value < self.mins[dim] {
                self.mins[dim] = *value;
            }
            if *value > self.maxes[dim] {
                self.maxes[dim] = *value;
            }
        }
    }

    /// The number of dimensions of this box.
    pub fn dims(&self) -> usize {
        self.mins.len()
    }

    /// The lower corner.
    pub fn mins(&self) -> &[N] {
        &self.mins
    }

    /// The upper corner.
    pub fn maxes(&self) -> &[N] {
        &self.maxes
    }

    /// Returns `true` if no point has been added to this box.
    pub fn is_empty(&self) -> bool {
        self.mins
            .iter()
            .zip(&self.maxes)
            .any(|(min, max)| min > max)
    }

    /// The dimension with the largest `max - min`, and that spread. Ties go to the lowest
    /// dimension.
    pub fn widest_dim(&self) -> (usize, N) {
        let mut best_dim = 0;
        let mut best_spread = N::neg_infinity();
        for dim in 0..self.dims() {
            let spread = self.maxes[dim] - self.mins[dim];
            if spread > best_spread {
                best_dim = dim;
                best_spread = spread;
            }
        }
        (best_dim, best_spread)
    }

    /// Squared distance from `point` to the nearest location inside this box.
    pub fn min_sq_dist(&self, point: &[N]) -> N {
        let mut dist = N::zero();
        for (dim, value) in point.iter().enumerate() {
            let d = axis_dist(*value, self.mins[dim], self.maxes[dim]);
            dist = dist + d * d;
        }
        dist
    }
}

/// 1D distance from a value to a range.
#[inline]
pub(crate) fn axis_dist<N: IndexableFloat>(k: N, min: N, max: N) -> N {
    if k < min {
        min - k
    } else if k <= max {
        N::zero()
    } else {
        k - max
    }
}
