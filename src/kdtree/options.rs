use crate::error::{KnnIndexError, Result};
use crate::r#type::IndexableFloat;

/// Parameters of a k-nearest-neighbor query.
///
/// ```
/// use knn_index::kdtree::QueryOptions;
///
/// let options = QueryOptions::<f64>::new(4)
///     .with_eps(0.5)
///     .with_distance_upper_bound(10.);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions<N: IndexableFloat> {
    /// The number of neighbors to return per query point.
    pub k: usize,
    /// Approximation slack. The k-th returned distance is at most `1 + eps` times the true k-th
    /// nearest distance.
    pub eps: N,
    /// Only neighbors at a Euclidean distance `<=` this value are returned. `None` means no
    /// bound.
    pub distance_upper_bound: Option<N>,
}

impl<N: IndexableFloat> Default for QueryOptions<N> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<N: IndexableFloat> QueryOptions<N> {
    /// Exact search for the `k` nearest neighbors.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            eps: N::zero(),
            distance_upper_bound: None,
        }
    }

    /// Set the approximation slack.
    pub fn with_eps(mut self, eps: N) -> Self {
        self.eps = eps;
        self
    }

    /// Set the distance upper bound, in the same (linear) units as the coordinates.
    pub fn with_distance_upper_bound(mut self, distance_upper_bound: N) -> Self {
        self.distance_upper_bound = Some(distance_upper_bound);
        self
    }

    /// Check that `k >= 1`, `eps >= 0` and `distance_upper_bound >= 0`.
    pub fn validate(&self) -> Result<()> {
        if self.k < 1 {
            return Err(KnnIndexError::InvalidK(self.k));
        }
        if !(self.eps >= N::zero()) {
            return Err(KnnIndexError::InvalidEps(to_f64(self.eps)));
        }
        if let Some(bound) = self.distance_upper_bound {
            if !(bound >= N::zero()) {
                return Err(KnnIndexError::InvalidDistanceUpperBound(to_f64(bound)));
            }
        }
        Ok(())
    }

    /// Validate and convert to the squared quantities the search works with.
    pub(crate) fn search_params(&self) -> Result<SearchParams<N>> {
        self.validate()?;
        let eps_factor = (N::one() + self.eps) * (N::one() + self.eps);
        let bound_sq = match self.distance_upper_bound {
            Some(bound) => bound * bound,
            None => N::infinity(),
        };
        Ok(SearchParams {
            k: self.k,
            eps_factor,
            bound_sq,
        })
    }
}

/// Validated query parameters, in squared units.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchParams<N: IndexableFloat> {
    pub(crate) k: usize,
    /// `(1 + eps)^2`
    pub(crate) eps_factor: N,
    /// Squared distance upper bound, `+inf` when unbounded.
    pub(crate) bound_sq: N,
}

/// The worker pool used by batched queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workers {
    /// Run on rayon's global thread pool.
    #[default]
    Global,
    /// Run on a dedicated pool with this many threads. `0` lets rayon pick.
    Threads(usize),
}

#[inline]
fn to_f64<N: IndexableFloat>(value: N) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
