use crate::error::Result;
use crate::indices::{IndexArray, Indices};
use crate::kdtree::bounds::BoundingBox;
use crate::kdtree::builder::build;
use crate::kdtree::node::Node;
use crate::kdtree::points::PointBuffer;
use crate::kdtree::split::SlidingMidpoint;
use crate::r#type::IndexableFloat;

/// Common metadata to describe a tree
#[derive(Debug, Clone, PartialEq)]
pub struct KDTreeMetadata<N: IndexableFloat> {
    pub(crate) dims: usize,
    pub(crate) num_items: usize,
    pub(crate) leaf_size: usize,
    pub(crate) depth: usize,
    pub(crate) bbox: BoundingBox<N>,
}

impl<N: IndexableFloat> KDTreeMetadata<N> {
    /// The number of coordinates per point.
    pub fn dims(&self) -> usize {
        self.dims
    }
    /// The number of points in the tree.
    pub fn num_items(&self) -> usize {
        self.num_items
    }
    /// The maximum number of points per leaf.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }
    /// The number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.depth
    }
    /// The bounding box of every point in the tree.
    pub fn bounding_box(&self) -> &BoundingBox<N> {
        &self.bbox
    }
}

/// An owned, immutable k-d tree.
///
/// The tree owns its points, the permutation of point indices produced while building, and a
/// flat arena of nodes. Nothing is mutated after construction, so a tree can be shared freely
/// between threads. Dropping it releases the arena in one step, without walking the node graph.
///
/// Usually this will be created via [`KDTree::build`] or a
/// [`KDTreeBuilder`][crate::kdtree::KDTreeBuilder].
#[derive(Debug, Clone, PartialEq)]
pub struct KDTree<N: IndexableFloat> {
    pub(crate) points: PointBuffer<N>,
    pub(crate) indices: IndexArray,
    pub(crate) nodes: Vec<Node<N>>,
    pub(crate) metadata: KDTreeMetadata<N>,
}

impl<N: IndexableFloat> KDTree<N> {
    /// Build a tree over `points` with at most `leaf_size` points per leaf, using the
    /// [`SlidingMidpoint`] split rule.
    ///
    /// Fails if `leaf_size < 1`.
    pub fn build(points: PointBuffer<N>, leaf_size: usize) -> Result<Self> {
        build::<N, SlidingMidpoint>(points, leaf_size)
    }

    /// Build a tree from an interleaved buffer of `dims`-dimensional coordinates.
    pub fn try_new(coords: Vec<N>, dims: usize, leaf_size: usize) -> Result<Self> {
        Self::build(PointBuffer::try_new(coords, dims)?, leaf_size)
    }

    /// The points this tree was built from, in insertion order.
    pub fn points(&self) -> &PointBuffer<N> {
        &self.points
    }

    /// Release the tree, returning its point buffer.
    pub fn into_points(self) -> PointBuffer<N> {
        self.points
    }

    /// Borrow a read-only view of this tree.
    pub fn as_kdtree_ref(&self) -> KDTreeRef<'_, N> {
        KDTreeRef {
            coords: self.points.coords(),
            indices: self.indices.as_indices(),
            nodes: &self.nodes,
            metadata: &self.metadata,
        }
    }
}

/// A borrowed, read-only view onto a [`KDTree`].
///
/// The view is `Copy`, so each worker of a batched query can hold its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KDTreeRef<'a, N: IndexableFloat> {
    pub(crate) coords: &'a [N],
    pub(crate) indices: Indices<'a>,
    pub(crate) nodes: &'a [Node<N>],
    pub(crate) metadata: &'a KDTreeMetadata<N>,
}
