//! Utilities to traverse the KDTree structure.

use std::marker::PhantomData;

use crate::kdtree::node::{Node, NodeId, ROOT};
use crate::kdtree::KDTreeIndex;
use crate::r#type::IndexableFloat;

/// A node in the KDTree.
#[derive(Debug)]
pub struct NodeRef<'a, N: IndexableFloat, T: KDTreeIndex<N>> {
    /// The tree that this node is a reference onto
    tree: &'a T,
    id: NodeId,
    phantom: PhantomData<N>,
}

impl<N: IndexableFloat, T: KDTreeIndex<N>> Clone for NodeRef<'_, N, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: IndexableFloat, T: KDTreeIndex<N>> Copy for NodeRef<'_, N, T> {}

impl<'a, N: IndexableFloat, T: KDTreeIndex<N>> NodeRef<'a, N, T> {
    pub(crate) fn from_root(tree: &'a T) -> Self {
        Self::new(tree, ROOT)
    }

    fn new(tree: &'a T, id: NodeId) -> Self {
        Self {
            tree,
            id,
            phantom: PhantomData,
        }
    }

    #[inline]
    fn node(&self) -> &'a Node<N> {
        &self.tree.nodes()[self.id]
    }

    /// The position of this node in the tree's node arena.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// The first slot of the tree's index array covered by this node.
    pub fn start(&self) -> usize {
        self.node().start()
    }

    /// The number of points under this node.
    pub fn count(&self) -> usize {
        self.node().count()
    }

    /// The dimension this node splits on, or `None` for a leaf.
    pub fn cut_dim(&self) -> Option<usize> {
        match self.node() {
            Node::Split { cut_dim, .. } => Some(*cut_dim),
            Node::Leaf { .. } => None,
        }
    }

    /// The value this node splits at, or `None` for a leaf.
    pub fn cut_val(&self) -> Option<N> {
        match self.node() {
            Node::Split { cut_val, .. } => Some(*cut_val),
            Node::Leaf { .. } => None,
        }
    }

    /// The smallest and largest `cut_dim` coordinates under this node, or `None` for a leaf.
    pub fn cut_bounds(&self) -> Option<(N, N)> {
        match self.node() {
            Node::Split {
                cut_bounds_lo,
                cut_bounds_hi,
                ..
            } => Some((*cut_bounds_lo, *cut_bounds_hi)),
            Node::Leaf { .. } => None,
        }
    }

    /// The child holding points at or below the cut value.
    pub fn left_child(&self) -> Option<NodeRef<'a, N, T>> {
        match self.node() {
            Node::Split { left, .. } => Some(Self::new(self.tree, *left)),
            Node::Leaf { .. } => None,
        }
    }

    /// The child holding points at or above the cut value.
    pub fn right_child(&self) -> Option<NodeRef<'a, N, T>> {
        match self.node() {
            Node::Split { right, .. } => Some(Self::new(self.tree, *right)),
            Node::Leaf { .. } => None,
        }
    }

    /// Insertion indices of every point under this node.
    pub fn point_indices(&self) -> impl Iterator<Item = usize> + 'a {
        let indices = self.tree.indices();
        let start = self.start();
        (start..start + self.count()).map(move |slot| indices.get(slot))
    }
}
