//! A grown tree: inner nodes and leaves stored in arrays and addressed by index.

use errors::*;
use hough::binary_test::SplitTest;
use hough::hierarchy::HierarchyNode;
use hough::leaf::LeafNode;
use types::PatchFeature;

/// What an inner node leads to
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Not resolved yet, only seen while growing
    Pending,
    /// Indices of both child nodes
    Split { left: usize, right: usize },
    /// Index of the leaf
    Leaf(usize),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InternalNode {
    /// Index within the node array
    pub id: usize,
    pub depth: usize,
    /// None for the root
    pub parent: Option<usize>,
    pub kind: NodeKind,
    /// The test of a split node. All zero for a leaf.
    pub test: SplitTest,
}

impl InternalNode {
    pub fn new(id: usize, depth: usize, parent: Option<usize>) -> InternalNode {
        InternalNode {
            id: id,
            depth: depth,
            parent: parent,
            kind: NodeKind::Pending,
            test: SplitTest::default(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        match self.kind {
            NodeKind::Leaf(_) => true,
            _ => false,
        }
    }
}

/// A single tree of a hough forest
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tree {
    /// Scale of the training images
    pub scale: f32,
    pub max_depth: usize,
    /// External class id of every label, 0 is background
    pub class_ids: Vec<i32>,
    pub nodes: Vec<InternalNode>,
    pub leaves: Vec<LeafNode>,
    /// Class hierarchy, empty if none was loaded
    pub hierarchy: Vec<HierarchyNode>,
}

impl Tree {
    /// An empty tree
    pub fn new(scale: f32, max_depth: usize, class_ids: Vec<i32>) -> Tree {
        Tree {
            scale: scale,
            max_depth: max_depth,
            class_ids: class_ids,
            nodes: vec![],
            leaves: vec![],
            hierarchy: vec![],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    pub fn num_labels(&self) -> usize {
        self.class_ids.len()
    }

    /// Passes the patch down the tree and returns the leaf it reaches.
    /// None if the tree is empty or not completely grown.
    pub fn leaf_for<S: PatchFeature>(&self, patch: &S) -> Option<&LeafNode> {
        let mut idx = 0;
        // a valid tree is acyclic, so every path is shorter than the node count
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx)?;
            match node.kind {
                NodeKind::Split { left, right } => {
                    idx = if node.test.goes_left(patch) { left } else { right };
                }
                NodeKind::Leaf(l) => return self.leaves.get(l),
                NodeKind::Pending => return None,
            }
        }
        None
    }

    /// Checks the structure of a finished tree:
    /// ids match positions, children exist and are one level deeper
    /// and every leaf belongs to exactly one node.
    pub fn validate(&self) -> Result<()> {
        let labels = self.num_labels();
        let mut leaf_owner: Vec<Option<usize>> = vec![None; self.leaves.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            if node.id != i {
                bail!(ErrorKind::InvalidNode(i));
            }
            match node.parent {
                None if i != 0 => bail!(ErrorKind::InvalidNode(i)),
                Some(p) if p >= i => bail!(ErrorKind::InvalidNode(i)),
                _ => (),
            }
            match node.kind {
                NodeKind::Pending => bail!(ErrorKind::InvalidNode(i)),
                NodeKind::Split { left, right } => {
                    for &c in [left, right].iter() {
                        let child = self.nodes.get(c).ok_or(ErrorKind::InvalidNode(i))?;
                        if c <= i || child.parent != Some(i) || child.depth != node.depth + 1 {
                            bail!(ErrorKind::InvalidNode(i));
                        }
                    }
                    if left == right {
                        bail!(ErrorKind::InvalidNode(i));
                    }
                }
                NodeKind::Leaf(l) => {
                    let leaf = self.leaves.get(l).ok_or(ErrorKind::InvalidNode(i))?;
                    if leaf_owner[l].is_some() || leaf.depth != node.depth ||
                       leaf.parent != node.parent {
                        bail!(ErrorKind::InvalidNode(i));
                    }
                    leaf_owner[l] = Some(i);
                }
            }
        }

        for (l, leaf) in self.leaves.iter().enumerate() {
            if leaf.id != l || leaf_owner[l].is_none() {
                bail!(ErrorKind::InvalidNode(l));
            }
            for &n in [leaf.num_labels(), leaf.sample_count.len(), leaf.votes.len()].iter() {
                if n != labels {
                    bail!(ErrorKind::LabelMismatch(labels, n));
                }
            }
            // background classes carry no votes
            for (c, &cid) in self.class_ids.iter().enumerate() {
                let expected = if cid == 0 { 0 } else { leaf.sample_count[c] };
                if leaf.votes[c].len() != expected {
                    bail!(ErrorKind::InvalidNode(l));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use hough::leaf::Vote;
    use hough::test_support::*;
    use linalg::Vec3;
    use quaternion::Quaternion;

    fn leaf(id: usize, depth: usize, parent: Option<usize>, p: f32) -> LeafNode {
        LeafNode {
            id: id,
            depth: depth,
            parent: parent,
            background_confidence: 1.0 - p,
            label_probability: vec![p, 1.0 - p],
            sample_count: vec![1, 0],
            votes: vec![vec![], vec![]],
        }
    }

    /// Root split on the ramp slope with a leaf on each side
    pub fn small_tree() -> Tree {
        let mut tree = Tree::new(1.0, 3, vec![0, 1]);
        let mut root = InternalNode::new(0, 0, None);
        root.kind = NodeKind::Split { left: 1, right: 2 };
        root.test = SplitTest::from_params([1, 0, 0, 0, 0, 1]);
        let mut left = InternalNode::new(1, 1, Some(0));
        left.kind = NodeKind::Leaf(0);
        let mut right = InternalNode::new(2, 1, Some(0));
        right.kind = NodeKind::Leaf(1);
        tree.nodes = vec![root, left, right];
        tree.leaves = vec![leaf(0, 1, Some(0), 0.75), leaf(1, 1, Some(0), 0.25)];
        tree
    }

    #[test]
    fn test_leaf_for() {
        let tree = small_tree();
        assert!(tree.validate().is_ok());
        assert_eq!(tree.leaf_for(&RampPatch::new(0)).map(|l| l.id), Some(0));
        assert_eq!(tree.leaf_for(&RampPatch::new(3)).map(|l| l.id), Some(1));
        assert!(Tree::new(1.0, 3, vec![0]).leaf_for(&RampPatch::new(0)).is_none());
        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.num_labels(), 2);
        assert!(tree.nodes[1].is_leaf() && !tree.nodes[0].is_leaf());
    }

    #[test]
    fn test_validate_rejects_broken_trees() {
        let mut tree = small_tree();
        tree.nodes[2].depth = 2;
        assert!(tree.validate().is_err());

        let mut tree = small_tree();
        tree.nodes[2].kind = NodeKind::Leaf(0);
        assert!(tree.validate().is_err());

        let mut tree = small_tree();
        tree.nodes[0].kind = NodeKind::Split { left: 1, right: 5 };
        assert!(tree.validate().is_err());

        let mut tree = small_tree();
        tree.nodes[1].kind = NodeKind::Pending;
        assert!(tree.validate().is_err());

        let mut tree = small_tree();
        tree.leaves[1].label_probability.push(0.0);
        match tree.validate() {
            Err(Error(ErrorKind::LabelMismatch(2, 3), _)) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_validate_vote_counts() {
        let mut tree = small_tree();
        tree.leaves[0].sample_count = vec![1, 1];
        match tree.validate() {
            Err(Error(ErrorKind::InvalidNode(0), _)) => (),
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }

        let vote = Vote {
            offset: Vec3([0.0; 3]),
            orientation: Quaternion::identity(),
            weight: 1.0,
        };
        tree.leaves[0].votes[1].push(vote);
        assert!(tree.validate().is_ok());

        // no votes for the background
        tree.leaves[1].votes[0].push(vote);
        tree.leaves[1].sample_count[0] = 1;
        assert!(tree.validate().is_err());
    }
}
