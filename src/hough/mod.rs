/// Growing single trees of a hough forest for 6-DoF pose estimation.
/// A leaf stores the class probabilities and the votes (offset to the
/// object center and orientation) of the training patches reaching it.
/// For literature see
/// * https://pages.iai.uni-bonn.de/gall_juergen/download/jgall_houghforest_cvpr09.pdf

pub mod config;
pub mod evaluate;
pub mod grow;
pub mod hierarchy;
pub mod leaf;
pub mod measure;
pub mod tree;
pub mod treefile;

#[cfg(test)]
mod test_support;

pub use self::binary_test::SplitTest;
pub use self::config::TreeConfig;
pub use self::grow::TreeTrainer;
pub use self::hierarchy::HierarchyNode;
pub use self::leaf::{LeafNode, Vote};
pub use self::tree::{InternalNode, NodeKind, Tree};
