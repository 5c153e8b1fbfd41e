use crate::r#type::IndexableFloat;

/// Position of a node in a tree's node arena. The root is always [`ROOT`].
pub type NodeId = usize;

/// The id of the root node.
pub const ROOT: NodeId = 0;

/// A node of the k-d tree.
///
/// Nodes live in a flat arena owned by the tree and refer to their children by [`NodeId`].
/// Every node covers the contiguous slots `start..start + count` of the tree's index array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<N: IndexableFloat> {
    /// A node holding at most `leaf_size` points directly.
    Leaf {
        /// First slot of the index array.
        start: usize,
        /// Number of points.
        count: usize,
    },
    /// An internal node splitting its points along `cut_dim` at `cut_val`.
    ///
    /// Every point under `left` has `cut_dim` coordinate `<= cut_val` and every point under
    /// `right` has one `>= cut_val`. `cut_bounds_lo` and `cut_bounds_hi` are the smallest and
    /// largest `cut_dim` coordinates of the whole subtree.
    Split {
        /// First slot of the index array.
        start: usize,
        /// Number of points in the subtree.
        count: usize,
        /// The coordinate axis being split.
        cut_dim: usize,
        /// The split threshold.
        cut_val: N,
        /// Smallest `cut_dim` coordinate in the subtree.
        cut_bounds_lo: N,
        /// Largest `cut_dim` coordinate in the subtree.
        cut_bounds_hi: N,
        /// Child holding the lower part of the range.
        left: NodeId,
        /// Child holding the upper part of the range.
        right: NodeId,
    },
}

impl<N: IndexableFloat> Node<N> {
    /// Returns `true` if this node holds points directly.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// The first slot of the index array covered by this node.
    #[inline]
    pub fn start(&self) -> usize {
        match self {
            Self::Leaf { start, .. } | Self::Split { start, .. } => *start,
        }
    }

    /// The number of points under this node.
    #[inline]
    pub fn count(&self) -> usize {
        match self {
            Self::Leaf { count, .. } | Self::Split { count, .. } => *count,
        }
    }
}
