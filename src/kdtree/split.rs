//! Strategies for choosing where a k-d tree node is cut.

use crate::indices::IndexArray;
use crate::kdtree::bounds::BoundingBox;
use crate::kdtree::points::PointBuffer;
use crate::r#type::IndexableFloat;

/// The range of the index array being split, and the extent of its points along the cut
/// dimension.
#[derive(Debug, Clone, Copy)]
pub struct SplitParams<N: IndexableFloat> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) cut_dim: usize,
    pub(crate) lo: N,
    pub(crate) hi: N,
}

impl<N: IndexableFloat> SplitParams<N> {
    /// The first slot of the index array in this range.
    pub fn start(&self) -> usize {
        self.start
    }

    /// One past the last slot of the index array in this range.
    pub fn end(&self) -> usize {
        self.end
    }

    /// The dimension being cut.
    pub fn cut_dim(&self) -> usize {
        self.cut_dim
    }

    /// The smallest `cut_dim` coordinate in this range.
    pub fn lo(&self) -> N {
        self.lo
    }

    /// The largest `cut_dim` coordinate in this range.
    pub fn hi(&self) -> N {
        self.hi
    }
}

/// A rule proposing the cut value of a node.
///
/// The proposal only needs to be a hint: it is clamped into `[lo, hi]` and the range is then
/// partitioned so that neither side is empty, whatever the rule returns. Implementations may
/// reorder `indices[start..end]`.
pub trait SplitRule<N: IndexableFloat> {
    /// Propose a cut value for the range described by `params`.
    fn cut_value(params: &SplitParams<N>, points: &PointBuffer<N>, indices: &mut IndexArray) -> N;
}

/// Cut at the midpoint of the range's extent along the widest dimension.
///
/// Splits that would leave one side empty slide to the nearest point value, so heavily skewed
/// or duplicated data still produces non-empty children.
#[derive(Debug, Clone, Copy)]
pub struct SlidingMidpoint;

impl<N: IndexableFloat> SplitRule<N> for SlidingMidpoint {
    #[inline]
    fn cut_value(params: &SplitParams<N>, _points: &PointBuffer<N>, _indices: &mut IndexArray) -> N {
        let half = N::one() / (N::one() + N::one());
        let mid = (params.lo + params.hi) * half;
        if mid.is_finite() {
            mid
        } else {
            // lo + hi overflowed
            params.lo * half + params.hi * half
        }
    }
}

/// Cut at the median coordinate along the widest dimension, producing a balanced tree.
#[derive(Debug, Clone, Copy)]
pub struct MedianSplit;

impl<N: IndexableFloat> SplitRule<N> for MedianSplit {
    fn cut_value(params: &SplitParams<N>, points: &PointBuffer<N>, indices: &mut IndexArray) -> N {
        let nth = (params.end - params.start) / 2;
        indices.select_nth_by(params.start, params.end, nth, |i| {
            points.coord(i, params.cut_dim)
        });
        points.coord(indices.get(params.start + nth), params.cut_dim)
    }
}

/// Where a range was cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Cut<N: IndexableFloat> {
    pub(crate) cut_dim: usize,
    pub(crate) cut_val: N,
    /// First slot of the right child.
    pub(crate) mid: usize,
}

/// Choose a cut for `indices[start..end]` and partition the range around it.
///
/// The range must hold at least two points. Afterwards `start < mid < end`, every point in
/// `start..mid` has `cut_dim` coordinate `<= cut_val` and every point in `mid..end` has one
/// `>= cut_val`.
///
/// Points are three-way partitioned into `< cut_val`, `== cut_val` and `> cut_val`. The split
/// position is the middle of the range, clamped into the block of points equal to the cut, so
/// equal points fill the left side up to the middle and the remainder go right.
pub(crate) fn cut_range<N: IndexableFloat, S: SplitRule<N>>(
    points: &PointBuffer<N>,
    indices: &mut IndexArray,
    start: usize,
    end: usize,
    bbox: &BoundingBox<N>,
) -> Cut<N> {
    let count = end - start;
    debug_assert!(count >= 2);

    let (cut_dim, spread) = bbox.widest_dim();
    let params = SplitParams {
        start,
        end,
        cut_dim,
        lo: bbox.mins()[cut_dim],
        hi: bbox.maxes()[cut_dim],
    };

    let mut cut_val = S::cut_value(&params, points, indices);
    if !(cut_val >= params.lo) {
        tracing::trace!(start, end, "cut slid up to range minimum");
        cut_val = params.lo;
    } else if cut_val > params.hi {
        tracing::trace!(start, end, "cut slid down to range maximum");
        cut_val = params.hi;
    }
    if spread == N::zero() {
        tracing::trace!(start, end, "splitting range of identical points by position");
    }

    let (less, less_or_equal) = partition(points, indices, start, end, cut_dim, cut_val);
    let lower = (less - start).max(1);
    let upper = (less_or_equal - start).min(count - 1);
    let mid = start + (count / 2).clamp(lower, upper);

    Cut {
        cut_dim,
        cut_val,
        mid,
    }
}

/// Three-way partition `indices[start..end]` by the `dim` coordinate of each point.
///
/// Returns `(less, less_or_equal)`: slots `start..less` hold values `< cut_val`,
/// `less..less_or_equal` values `== cut_val` and `less_or_equal..end` values `> cut_val`.
fn partition<N: IndexableFloat>(
    points: &PointBuffer<N>,
    indices: &mut IndexArray,
    start: usize,
    end: usize,
    dim: usize,
    cut_val: N,
) -> (usize, usize) {
    let mut less = start;
    let mut i = start;
    let mut greater = end;
    while i < greater {
        let value = points.coord(indices.get(i), dim);
        if value < cut_val {
            indices.swap(less, i);
            less += 1;
            i += 1;
        } else if value > cut_val {
            greater -= 1;
            indices.swap(i, greater);
        } else {
            i += 1;
        }
    }
    (less, greater)
}
