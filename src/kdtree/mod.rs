//! An implementation of an immutable k-d tree answering exact, approximate and bounded
//! k-nearest-neighbor queries over points of any dimension.

#![warn(missing_docs)]

mod batch;
mod bounds;
mod builder;
mod index;
mod node;
mod options;
mod points;
mod search;
mod split;
mod r#trait;
mod traversal;

pub use batch::QueryResults;
pub use bounds::BoundingBox;
pub use builder::{KDTreeBuilder, DEFAULT_LEAF_SIZE};
pub use index::{KDTree, KDTreeMetadata, KDTreeRef};
pub use node::{Node, NodeId, ROOT};
pub use options::{QueryOptions, Workers};
pub use points::PointBuffer;
pub use r#trait::KDTreeIndex;
pub use search::Neighbor;
pub use split::{MedianSplit, SlidingMidpoint, SplitParams, SplitRule};
pub use traversal::NodeRef;

#[cfg(test)]
mod test;
