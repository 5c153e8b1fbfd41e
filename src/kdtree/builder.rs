use std::ops::Range;

use geo_traits::CoordTrait;

use crate::error::{KnnIndexError, Result};
use crate::indices::IndexArray;
use crate::kdtree::bounds::BoundingBox;
use crate::kdtree::index::{KDTree, KDTreeMetadata};
use crate::kdtree::node::{Node, NodeId, ROOT};
use crate::kdtree::points::{check_buffer, PointBuffer};
use crate::kdtree::split::{cut_range, SplitRule};
use crate::r#type::IndexableFloat;

/// The default maximum number of points per leaf used by [`KDTreeBuilder::new`].
pub const DEFAULT_LEAF_SIZE: usize = 16;

/// A builder to create a [`KDTree`].
///
/// ```
/// use knn_index::kdtree::{KDTreeBuilder, KDTreeIndex, QueryOptions, SlidingMidpoint};
///
/// let mut builder = KDTreeBuilder::<f64>::new(3, 2);
/// builder.add(&[0., 0.]).unwrap();
/// builder.add(&[1., 0.]).unwrap();
/// builder.add(&[5., 5.]).unwrap();
/// let tree = builder.finish::<SlidingMidpoint>().unwrap();
///
/// let neighbors = tree.query(&[4., 4.], &QueryOptions::new(1)).unwrap();
/// assert_eq!(neighbors[0].index, 2);
/// ```
#[derive(Debug, Clone)]
pub struct KDTreeBuilder<N: IndexableFloat> {
    coords: Vec<N>,
    dims: usize,
    num_items: usize,
    leaf_size: usize,
}

impl<N: IndexableFloat> KDTreeBuilder<N> {
    /// Create a new builder with the provided number of items, dimensionality and the default
    /// leaf size.
    pub fn new(num_items: usize, dims: usize) -> Self {
        Self::new_with_leaf_size(num_items, dims, DEFAULT_LEAF_SIZE)
    }

    /// Create a new builder with the provided number of items, dimensionality and leaf size.
    ///
    /// The leaf size is validated by [`finish`][Self::finish].
    pub fn new_with_leaf_size(num_items: usize, dims: usize, leaf_size: usize) -> Self {
        Self {
            coords: Vec::with_capacity(num_items * dims),
            dims,
            num_items,
            leaf_size,
        }
    }

    /// Create a builder already holding every point of `points`.
    pub fn from_points(points: PointBuffer<N>, leaf_size: usize) -> Self {
        let num_items = points.num_items();
        let dims = points.dims();
        Self {
            coords: points.into_inner(),
            dims,
            num_items,
            leaf_size,
        }
    }

    /// The number of points added so far.
    pub fn len(&self) -> usize {
        if self.dims == 0 {
            0
        } else {
            self.coords.len() / self.dims
        }
    }

    /// Returns `true` if no point has been added.
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Add a point to the index.
    ///
    /// This returns the insertion index, which is the index reported by queries.
    pub fn add(&mut self, point: &[N]) -> Result<usize> {
        if self.dims == 0 {
            return Err(KnnIndexError::InvalidDimensions);
        }
        if point.len() != self.dims {
            return Err(KnnIndexError::DimensionMismatch {
                expected: self.dims,
                actual: point.len(),
            });
        }
        let index = self.len();
        self.coords.extend_from_slice(point);
        Ok(index)
    }

    /// Add a [`CoordTrait`] to the index.
    pub fn add_coord(&mut self, coord: &impl CoordTrait<T = N>) -> Result<usize> {
        let coord_dims = coord.dim().size();
        if coord_dims != self.dims {
            return Err(KnnIndexError::DimensionMismatch {
                expected: self.dims,
                actual: coord_dims,
            });
        }
        let point: Vec<N> = (0..coord_dims).map(|n| coord.nth_or_panic(n)).collect();
        self.add(&point)
    }

    /// Add many points from an interleaved coordinate buffer.
    ///
    /// Returns the range of insertion indices assigned to them.
    pub fn add_interleaved(&mut self, coords: &[N]) -> Result<Range<usize>> {
        check_buffer(coords, self.dims)?;
        let first = self.len();
        self.coords.extend_from_slice(coords);
        Ok(first..self.len())
    }

    /// Consume this builder, performing the k-d partitioning and generating a [`KDTree`] ready
    /// for queries.
    ///
    /// [`SlidingMidpoint`] and [`MedianSplit`] both implement [`SplitRule`], allowing you to
    /// choose how cut values are picked.
    ///
    /// [`SlidingMidpoint`]: crate::kdtree::SlidingMidpoint
    /// [`MedianSplit`]: crate::kdtree::MedianSplit
    pub fn finish<S: SplitRule<N>>(self) -> Result<KDTree<N>> {
        if self.leaf_size < 1 {
            return Err(KnnIndexError::InvalidLeafSize(self.leaf_size));
        }
        let points = PointBuffer::try_new(self.coords, self.dims)?;
        if points.num_items() != self.num_items {
            return Err(KnnIndexError::General(format!(
                "Added {} items when expected {}.",
                points.num_items(),
                self.num_items
            )));
        }
        build::<N, S>(points, self.leaf_size)
    }
}

/// Build the tree over `points`, partitioning an identity index array in place.
///
/// Ranges are processed from an explicit work stack, so arbitrarily deep trees do not grow the
/// call stack.
#[tracing::instrument(skip_all, fields(num_items = points.num_items(), dims = points.dims()))]
pub(crate) fn build<N: IndexableFloat, S: SplitRule<N>>(
    points: PointBuffer<N>,
    leaf_size: usize,
) -> Result<KDTree<N>> {
    if leaf_size < 1 {
        return Err(KnnIndexError::InvalidLeafSize(leaf_size));
    }

    let num_items = points.num_items();
    let mut indices = IndexArray::identity(num_items)?;
    let bbox = BoundingBox::from_points(&points);

    let mut nodes = vec![Node::Leaf {
        start: 0,
        count: num_items,
    }];
    let mut depth = 0;

    // (node, start, end, depth)
    let mut stack: Vec<(NodeId, usize, usize, usize)> = vec![(ROOT, 0, num_items, 0)];
    while let Some((node_id, start, end, node_depth)) = stack.pop() {
        depth = depth.max(node_depth);
        let count = end - start;
        if count <= leaf_size {
            nodes[node_id] = Node::Leaf { start, count };
            continue;
        }

        let range_bbox = if node_id == ROOT {
            bbox.clone()
        } else {
            BoundingBox::from_range(&points, &indices, start, end)
        };
        let cut = cut_range::<N, S>(&points, &mut indices, start, end, &range_bbox);

        let left = nodes.len();
        nodes.push(Node::Leaf {
            start,
            count: cut.mid - start,
        });
        let right = nodes.len();
        nodes.push(Node::Leaf {
            start: cut.mid,
            count: end - cut.mid,
        });

        nodes[node_id] = Node::Split {
            start,
            count,
            cut_dim: cut.cut_dim,
            cut_val: cut.cut_val,
            cut_bounds_lo: range_bbox.mins()[cut.cut_dim],
            cut_bounds_hi: range_bbox.maxes()[cut.cut_dim],
            left,
            right,
        };

        stack.push((right, cut.mid, end, node_depth + 1));
        stack.push((left, start, cut.mid, node_depth + 1));
    }

    tracing::debug!(
        num_nodes = nodes.len(),
        depth,
        leaf_size,
        "finished building k-d tree"
    );

    let metadata = KDTreeMetadata {
        dims: points.dims(),
        num_items,
        leaf_size,
        depth,
        bbox,
    };
    Ok(KDTree {
        points,
        indices,
        nodes,
        metadata,
    })
}
