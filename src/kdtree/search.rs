//! Branch-and-bound traversals of a k-d tree.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tinyvec::TinyVec;

use crate::kdtree::node::{Node, NodeId, ROOT};
use crate::kdtree::options::SearchParams;
use crate::kdtree::points::sq_dist;
use crate::kdtree::KDTreeIndex;
use crate::r#type::IndexableFloat;

/// One result slot of a k-nearest-neighbor query.
///
/// Slots that could not be filled, because fewer than `k` points lie within the distance upper
/// bound, hold `distance = +inf` and `index = num_items`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<N: IndexableFloat> {
    /// Squared Euclidean distance to the query point.
    pub distance: N,
    /// Insertion index of the point.
    pub index: usize,
}

impl<N: IndexableFloat> Neighbor<N> {
    /// The marker for an unfilled slot in a tree of `num_items` points.
    pub fn missing(num_items: usize) -> Self {
        Self {
            distance: N::infinity(),
            index: num_items,
        }
    }

    /// Returns `true` unless this is an unfilled slot.
    pub fn is_found(&self, num_items: usize) -> bool {
        self.index < num_items
    }
}

/// A candidate in the bounded result heap. The heap's top is the worst candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate<N: IndexableFloat> {
    dist: N,
    index: usize,
}

impl<N: IndexableFloat> Eq for Candidate<N> {}

impl<N: IndexableFloat> Ord for Candidate<N> {
    fn cmp(&self, other: &Self) -> Ordering {
        // NaN distances only arise from non-finite input
        self.dist
            .partial_cmp(&other.dist)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

impl<N: IndexableFloat> PartialOrd for Candidate<N> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The best `k` points found so far, ordered by `(distance, index)`.
#[derive(Debug)]
pub(crate) struct CandidateList<N: IndexableFloat> {
    heap: BinaryHeap<Candidate<N>>,
    capacity: usize,
    bound_sq: N,
}

impl<N: IndexableFloat> CandidateList<N> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            capacity: 0,
            bound_sq: N::infinity(),
        }
    }

    fn reset(&mut self, capacity: usize, bound_sq: N) {
        self.heap.clear();
        self.capacity = capacity;
        self.bound_sq = bound_sq;
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    /// The squared distance a point must not exceed to be admitted.
    #[inline]
    fn worst(&self) -> N {
        match self.heap.peek() {
            Some(top) if self.is_full() => top.dist,
            _ => self.bound_sq,
        }
    }

    #[inline]
    fn offer(&mut self, dist: N, index: usize) {
        if dist > self.bound_sq {
            return;
        }
        let candidate = Candidate { dist, index };
        if !self.is_full() {
            self.heap.push(candidate);
        } else if self.heap.peek().is_some_and(|top| candidate < *top) {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    /// Write the candidates in ascending order, then fill the remaining slots with
    /// `(missing_dist, missing_index)`.
    fn drain_into(&mut self, dists: &mut [N], indices: &mut [usize], missing_index: usize) {
        let mut sorted = std::mem::take(&mut self.heap).into_sorted_vec();
        for slot in 0..dists.len() {
            match sorted.get(slot) {
                Some(candidate) => {
                    dists[slot] = candidate.dist;
                    indices[slot] = candidate.index;
                }
                None => {
                    dists[slot] = N::infinity();
                    indices[slot] = missing_index;
                }
            }
        }
        // keep the allocation for the next query
        sorted.clear();
        self.heap = BinaryHeap::from(sorted);
    }
}

/// Per-worker state reused across k-nearest-neighbor queries.
#[derive(Debug)]
pub(crate) struct SearchScratch<N: IndexableFloat> {
    candidates: CandidateList<N>,
    stack: Vec<(NodeId, N)>,
}

impl<N: IndexableFloat> SearchScratch<N> {
    pub(crate) fn new() -> Self {
        Self {
            candidates: CandidateList::new(),
            stack: Vec::new(),
        }
    }
}

/// Lower bounds on the squared distance from `query` to the two children of a split node whose
/// own lower bound is `lower`. Returns `(near, far, far_lower)`; the near child inherits
/// `lower`.
///
/// Along the cut dimension the node's points span `[lo, hi]`, so its bound already accounts for
/// the distance from the query to that interval. The far child lies entirely beyond the cut
/// plane, so that term is replaced by the distance to the plane.
#[inline]
fn children_by_distance<N: IndexableFloat>(
    node: &Node<N>,
    query: &[N],
    lower: N,
) -> Option<(NodeId, NodeId, N)> {
    let Node::Split {
        cut_dim,
        cut_val,
        cut_bounds_lo,
        cut_bounds_hi,
        left,
        right,
        ..
    } = *node
    else {
        return None;
    };
    let q = query[cut_dim];
    let cut_diff = q - cut_val;
    let (near, far, box_diff) = if cut_diff < N::zero() {
        (left, right, (cut_bounds_lo - q).max(N::zero()))
    } else {
        (right, left, (q - cut_bounds_hi).max(N::zero()))
    };
    let far_lower = (lower - box_diff * box_diff).max(N::zero()) + cut_diff * cut_diff;
    Some((near, far, far_lower))
}

/// Find the `params.k` nearest neighbors of `query`, writing them in ascending order of
/// `(distance, index)` into `dists` and `indices`, which must both have length `params.k`.
///
/// Subtrees are visited near side first. A subtree is skipped when its lower bound exceeds the
/// distance upper bound, or when the candidate list is full and the lower bound scaled by
/// `(1 + eps)^2` exceeds the current k-th distance.
pub(crate) fn knn_into<N: IndexableFloat, T: KDTreeIndex<N>>(
    tree: &T,
    query: &[N],
    params: &SearchParams<N>,
    scratch: &mut SearchScratch<N>,
    dists: &mut [N],
    indices: &mut [usize],
) {
    debug_assert_eq!(query.len(), tree.dims());
    let num_items = tree.num_items();
    let coords = tree.coords();
    let ids = tree.indices();
    let nodes = tree.nodes();
    let dims = tree.dims();

    let candidates = &mut scratch.candidates;
    candidates.reset(params.k, params.bound_sq);

    let stack = &mut scratch.stack;
    stack.clear();
    if num_items > 0 {
        stack.push((ROOT, tree.bounding_box().min_sq_dist(query)));
    }

    while let Some((node_id, lower)) = stack.pop() {
        if lower > params.bound_sq
            || (candidates.is_full() && lower * params.eps_factor > candidates.worst())
        {
            continue;
        }

        let node = &nodes[node_id];
        match children_by_distance(node, query, lower) {
            None => {
                for slot in node.start()..node.start() + node.count() {
                    let index = ids.get(slot);
                    let dist = sq_dist(&coords[index * dims..(index + 1) * dims], query);
                    candidates.offer(dist, index);
                }
            }
            Some((near, far, far_lower)) => {
                // pushed first so it's popped after the near side has tightened the bound
                stack.push((far, far_lower));
                stack.push((near, lower));
            }
        }
    }

    candidates.drain_into(dists, indices, num_items);
}

/// Insertion indices of all points within squared distance `r_sq` of `query`, in ascending
/// order.
pub(crate) fn within<N: IndexableFloat, T: KDTreeIndex<N>>(
    tree: &T,
    query: &[N],
    r_sq: N,
) -> Vec<usize> {
    let coords = tree.coords();
    let ids = tree.indices();
    let nodes = tree.nodes();
    let dims = tree.dims();

    let mut result = vec![];
    if tree.num_items() == 0 {
        return result;
    }

    // Use TinyVec to avoid heap allocations
    let mut stack: TinyVec<[(NodeId, N); 32]> = TinyVec::new();
    stack.push((ROOT, tree.bounding_box().min_sq_dist(query)));

    while let Some((node_id, lower)) = stack.pop() {
        if lower > r_sq {
            continue;
        }
        let node = &nodes[node_id];
        match children_by_distance(node, query, lower) {
            None => {
                for slot in node.start()..node.start() + node.count() {
                    let index = ids.get(slot);
                    if sq_dist(&coords[index * dims..(index + 1) * dims], query) <= r_sq {
                        result.push(index);
                    }
                }
            }
            Some((near, far, far_lower)) => {
                stack.push((far, far_lower));
                stack.push((near, lower));
            }
        }
    }

    result.sort_unstable();
    result
}

/// Insertion indices of all points inside the box `[mins, maxes]` (inclusive), in ascending
/// order.
pub(crate) fn range<N: IndexableFloat, T: KDTreeIndex<N>>(
    tree: &T,
    mins: &[N],
    maxes: &[N],
) -> Vec<usize> {
    let coords = tree.coords();
    let ids = tree.indices();
    let nodes = tree.nodes();
    let dims = tree.dims();

    let mut result = vec![];
    if tree.num_items() == 0 {
        return result;
    }

    let mut stack: TinyVec<[NodeId; 32]> = TinyVec::new();
    stack.push(ROOT);

    while let Some(node_id) = stack.pop() {
        match nodes[node_id] {
            Node::Leaf { start, count } => {
                for slot in start..start + count {
                    let index = ids.get(slot);
                    let point = &coords[index * dims..(index + 1) * dims];
                    let inside = point
                        .iter()
                        .zip(mins.iter().zip(maxes))
                        .all(|(v, (min, max))| v >= min && v <= max);
                    if inside {
                        result.push(index);
                    }
                }
            }
            Node::Split {
                cut_dim,
                cut_val,
                left,
                right,
                ..
            } => {
                // queue search in halves that intersect the query
                if maxes[cut_dim] >= cut_val {
                    stack.push(right);
                }
                if mins[cut_dim] <= cut_val {
                    stack.push(left);
                }
            }
        }
    }

    result.sort_unstable();
    result
}
