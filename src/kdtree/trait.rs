use geo_traits::CoordTrait;

use crate::error::{KnnIndexError, Result};
use crate::indices::Indices;
#[cfg(feature = "rayon")]
use crate::kdtree::batch::query_many_in_pool;
use crate::kdtree::batch::{query_many, result_slots, QueryResults};
use crate::kdtree::bounds::BoundingBox;
use crate::kdtree::node::Node;
use crate::kdtree::options::{QueryOptions, Workers};
use crate::kdtree::search::{knn_into, range, within, Neighbor, SearchScratch};
use crate::kdtree::traversal::NodeRef;
use crate::kdtree::{KDTree, KDTreeMetadata, KDTreeRef};
use crate::r#type::IndexableFloat;

/// A trait for searching and accessing data out of a KDTree.
pub trait KDTreeIndex<N: IndexableFloat>: Sized {
    /// The underlying raw coordinate buffer of this tree, in insertion order
    fn coords(&self) -> &[N];

    /// The permutation of insertion indices; every node covers a contiguous range of it
    fn indices(&self) -> Indices<'_>;

    /// The node arena. The root is at position 0.
    fn nodes(&self) -> &[Node<N>];

    /// Access the metadata describing this KDTree
    fn metadata(&self) -> &KDTreeMetadata<N>;

    /// The number of items in this KDTree
    fn num_items(&self) -> usize {
        self.metadata().num_items()
    }

    /// The number of coordinates per point
    fn dims(&self) -> usize {
        self.metadata().dims()
    }

    /// The maximum number of points per leaf
    fn leaf_size(&self) -> usize {
        self.metadata().leaf_size()
    }

    /// The number of edges on the longest root-to-leaf path
    fn depth(&self) -> usize {
        self.metadata().depth()
    }

    /// The total number of nodes, both leaves and splits
    fn num_nodes(&self) -> usize {
        self.nodes().len()
    }

    /// The bounding box of every point in the tree
    fn bounding_box(&self) -> &BoundingBox<N> {
        self.metadata().bounding_box()
    }

    /// The coordinates of the point with insertion index `index`
    fn point(&self, index: usize) -> &[N] {
        let dims = self.dims();
        &self.coords()[index * dims..(index + 1) * dims]
    }

    /// Find the `options.k` nearest neighbors of `point`.
    ///
    /// Returns exactly `k` entries sorted by ascending squared distance; equal distances are
    /// ordered by insertion index. When fewer than `k` points lie within the distance upper
    /// bound, the remaining entries are [`Neighbor::missing`].
    ///
    /// ```
    /// use knn_index::kdtree::{KDTree, KDTreeIndex, QueryOptions};
    ///
    /// let tree = KDTree::try_new(vec![0., 0., 1., 0., 0., 1., 5., 5.], 2, 1).unwrap();
    /// let neighbors = tree.query(&[0., 0.], &QueryOptions::new(2)).unwrap();
    /// assert_eq!(neighbors[0].distance, 0.);
    /// assert_eq!(neighbors[1].distance, 1.);
    /// ```
    fn query(&self, point: &[N], options: &QueryOptions<N>) -> Result<Vec<Neighbor<N>>> {
        let params = options.search_params()?;
        check_query_dims(self.dims(), point.len())?;

        let mut dists = result_slots(params.k, N::infinity())?;
        let mut indices = result_slots(params.k, self.num_items())?;
        let mut scratch = SearchScratch::new();
        knn_into(self, point, &params, &mut scratch, &mut dists, &mut indices);

        Ok(dists
            .into_iter()
            .zip(indices)
            .map(|(distance, index)| Neighbor { distance, index })
            .collect())
    }

    /// Find the `options.k` nearest neighbors of a [`CoordTrait`].
    fn query_coord(
        &self,
        coord: &impl CoordTrait<T = N>,
        options: &QueryOptions<N>,
    ) -> Result<Vec<Neighbor<N>>> {
        let point: Vec<N> = (0..coord.dim().size())
            .map(|n| coord.nth_or_panic(n))
            .collect();
        self.query(&point, options)
    }

    /// Find the `options.k` nearest neighbors of every point in an interleaved buffer of query
    /// points.
    ///
    /// Each query is answered exactly as [`query`][Self::query] would, independently of how
    /// queries are distributed across `workers`.
    fn query_many(
        &self,
        points: &[N],
        options: &QueryOptions<N>,
        workers: Workers,
    ) -> Result<QueryResults<N>>
    where
        Self: Sync,
    {
        query_many(self, points, options, workers)
    }

    /// Like [`query_many`][Self::query_many], but runs on a thread pool owned by the caller so
    /// that the pool can be reused across batches.
    ///
    /// ```
    /// use knn_index::kdtree::{KDTree, KDTreeIndex, QueryOptions};
    ///
    /// let tree = KDTree::try_new(vec![0., 0., 1., 0., 5., 5.], 2, 1).unwrap();
    /// let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
    /// let results = tree
    ///     .query_many_in_pool(&[0.2, 0., 4., 4.], &QueryOptions::new(1), &pool)
    ///     .unwrap();
    /// assert_eq!(results.indices(), &[0, 2]);
    /// ```
    #[cfg(feature = "rayon")]
    fn query_many_in_pool(
        &self,
        points: &[N],
        options: &QueryOptions<N>,
        pool: &rayon::ThreadPool,
    ) -> Result<QueryResults<N>>
    where
        Self: Sync,
    {
        query_many_in_pool(self, points, options, pool)
    }

    /// Search the index for items within a given bounding box.
    ///
    /// Returns insertion indices of found items, in ascending order
    fn range(&self, mins: &[N], maxes: &[N]) -> Result<Vec<usize>> {
        check_query_dims(self.dims(), mins.len())?;
        check_query_dims(self.dims(), maxes.len())?;
        Ok(range(self, mins, maxes))
    }

    /// Search the index for items within a given radius.
    ///
    /// Returns insertion indices of found items, in ascending order
    fn within(&self, point: &[N], r: N) -> Result<Vec<usize>> {
        check_query_dims(self.dims(), point.len())?;
        if !(r >= N::zero()) {
            return Err(KnnIndexError::InvalidDistanceUpperBound(
                r.to_f64().unwrap_or(f64::NAN),
            ));
        }
        Ok(within(self, point, r * r))
    }

    /// Access the root node of the KDTree for manual traversal.
    fn root(&self) -> NodeRef<'_, N, Self> {
        NodeRef::from_root(self)
    }
}

impl<N: IndexableFloat> KDTreeIndex<N> for KDTree<N> {
    fn coords(&self) -> &[N] {
        self.points.coords()
    }

    fn indices(&self) -> Indices<'_> {
        self.indices.as_indices()
    }

    fn nodes(&self) -> &[Node<N>] {
        &self.nodes
    }

    fn metadata(&self) -> &KDTreeMetadata<N> {
        &self.metadata
    }
}

impl<N: IndexableFloat> KDTreeIndex<N> for KDTreeRef<'_, N> {
    fn coords(&self) -> &[N] {
        self.coords
    }

    fn indices(&self) -> Indices<'_> {
        self.indices
    }

    fn nodes(&self) -> &[Node<N>] {
        self.nodes
    }

    fn metadata(&self) -> &KDTreeMetadata<N> {
        self.metadata
    }
}

#[inline]
pub(crate) fn check_query_dims(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(KnnIndexError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
