//! Batched k-nearest-neighbor queries.

#[cfg(feature = "rayon")]
use rayon::iter::{IndexedParallelIterator, ParallelIterator};
#[cfg(feature = "rayon")]
use rayon::slice::{ParallelSlice, ParallelSliceMut};

use crate::error::{KnnIndexError, Result};
use crate::kdtree::options::{QueryOptions, SearchParams, Workers};
use crate::kdtree::points::check_buffer;
use crate::kdtree::search::{knn_into, Neighbor, SearchScratch};
use crate::kdtree::KDTreeIndex;
use crate::r#type::IndexableFloat;

/// The neighbors of a batch of query points, stored row-major with `k` slots per query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults<N: IndexableFloat> {
    k: usize,
    distances: Vec<N>,
    indices: Vec<usize>,
}

impl<N: IndexableFloat> QueryResults<N> {
    /// The number of slots per query.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The number of query points.
    pub fn num_queries(&self) -> usize {
        self.distances.len() / self.k
    }

    /// Squared distances, `k` per query, each row ascending.
    pub fn distances(&self) -> &[N] {
        &self.distances
    }

    /// Insertion indices matching [`distances`][Self::distances].
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The neighbors of query `i`.
    pub fn row(&self, i: usize) -> Vec<Neighbor<N>> {
        let slots = i * self.k..(i + 1) * self.k;
        self.distances[slots.clone()]
            .iter()
            .zip(&self.indices[slots])
            .map(|(distance, index)| Neighbor {
                distance: *distance,
                index: *index,
            })
            .collect()
    }

    /// Consume the results, returning the distance and index buffers.
    pub fn into_parts(self) -> (Vec<N>, Vec<usize>) {
        (self.distances, self.indices)
    }
}

/// Answer every query in `points` against `tree`.
///
/// Each worker writes only to the output rows of the queries it was handed and keeps its own
/// candidate list and traversal stack. The tree is only read.
#[tracing::instrument(skip_all, fields(k = options.k, workers = ?workers))]
pub(crate) fn query_many<N, T>(
    tree: &T,
    points: &[N],
    options: &QueryOptions<N>,
    workers: Workers,
) -> Result<QueryResults<N>>
where
    N: IndexableFloat,
    T: KDTreeIndex<N> + Sync,
{
    let (params, mut distances, mut indices) = prepare(tree, points, options)?;

    #[cfg(feature = "rayon")]
    {
        match workers {
            Workers::Global => dispatch(tree, points, &params, &mut distances, &mut indices),
            Workers::Threads(num_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .map_err(|err| KnnIndexError::General(err.to_string()))?;
                pool.install(|| dispatch(tree, points, &params, &mut distances, &mut indices));
            }
        }
    }

    #[cfg(not(feature = "rayon"))]
    {
        let _ = workers;
        dispatch(tree, points, &params, &mut distances, &mut indices);
    }

    Ok(QueryResults {
        k: params.k,
        distances,
        indices,
    })
}

/// Answer every query in `points` against `tree` on a caller-owned thread pool.
#[cfg(feature = "rayon")]
#[tracing::instrument(skip_all, fields(k = options.k, num_threads = pool.current_num_threads()))]
pub(crate) fn query_many_in_pool<N, T>(
    tree: &T,
    points: &[N],
    options: &QueryOptions<N>,
    pool: &rayon::ThreadPool,
) -> Result<QueryResults<N>>
where
    N: IndexableFloat,
    T: KDTreeIndex<N> + Sync,
{
    let (params, mut distances, mut indices) = prepare(tree, points, options)?;
    pool.install(|| dispatch(tree, points, &params, &mut distances, &mut indices));
    Ok(QueryResults {
        k: params.k,
        distances,
        indices,
    })
}

/// Validate a batch and allocate its output rows, pre-filled with missing slots.
fn prepare<N: IndexableFloat, T: KDTreeIndex<N>>(
    tree: &T,
    points: &[N],
    options: &QueryOptions<N>,
) -> Result<(SearchParams<N>, Vec<N>, Vec<usize>)> {
    let params = options.search_params()?;
    let dims = tree.dims();
    check_buffer(points, dims)?;

    let num_queries = points.len() / dims;
    let num_slots = num_queries.checked_mul(params.k).ok_or_else(|| {
        KnnIndexError::General(format!(
            "{num_queries} queries of {} neighbors overflow the result size.",
            params.k
        ))
    })?;
    let distances = result_slots(num_slots, N::infinity())?;
    let indices = result_slots(num_slots, tree.num_items())?;
    tracing::debug!(num_queries, "dispatching k-nearest-neighbor queries");
    Ok((params, distances, indices))
}

/// A vector of `len` copies of `value`, or an error when it cannot be allocated.
pub(crate) fn result_slots<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(len).map_err(|err| {
        KnnIndexError::General(format!("Cannot allocate {len} result slots: {err}"))
    })?;
    slots.resize(len, value);
    Ok(slots)
}

#[cfg(feature = "rayon")]
fn dispatch<N: IndexableFloat, T: KDTreeIndex<N> + Sync>(
    tree: &T,
    points: &[N],
    params: &SearchParams<N>,
    distances: &mut [N],
    indices: &mut [usize],
) {
    points
        .par_chunks(tree.dims())
        .zip(distances.par_chunks_mut(params.k))
        .zip(indices.par_chunks_mut(params.k))
        .for_each_init(SearchScratch::new, |scratch, ((query, dists), ids)| {
            knn_into(tree, query, params, scratch, dists, ids)
        });
}

#[cfg(not(feature = "rayon"))]
fn dispatch<N: IndexableFloat, T: KDTreeIndex<N>>(
    tree: &T,
    points: &[N],
    params: &SearchParams<N>,
    distances: &mut [N],
    indices: &mut [usize],
) {
    let mut scratch = SearchScratch::new();
    for ((query, dists), ids) in points
        .chunks(tree.dims())
        .zip(distances.chunks_mut(params.k))
        .zip(indices.chunks_mut(params.k))
    {
        knn_into(tree, query, params, &mut scratch, dists, ids);
    }
}
