//! Growing a tree from training patches.
//!
//! A node searches for the best of many random tests on a subsample of
//! its patches. The measure rating a split is drawn anew for every search,
//! so a tree mixes classification and regression nodes.
//! Children are created depth first: the left subtree is completely grown
//! before the right child is created.

use rand::{Rng, SeedableRng, StdRng};

use errors::*;
use hough::binary_test::SplitTest;
use hough::config::TreeConfig;
use hough::evaluate::*;
use hough::leaf::LeafNode;
use hough::measure::{MeasureMode, measure_set};
use hough::tree::{InternalNode, NodeKind, Tree};
use types::PatchFeature;

/// Additional searches for a node before it becomes a leaf
pub const SEARCH_RETRIES: usize = 3;
/// Thresholds tried for every random test
pub const THRESHOLD_CANDIDATES: usize = 10;
/// The largest class of each side of a split needs more samples than this
pub const MIN_SIDE_SAMPLES: usize = 10;
/// Samples per label used while searching a test
pub const SUBSAMPLE_PER_CLASS: usize = 1000;

/// Grows a single tree.
/// All random decisions are taken from the generator of the trainer.
pub struct TreeTrainer<R = StdRng> {
    config: TreeConfig,
    tree: Tree,
    class_ratio: Vec<f32>,
    rng: R,
}

impl TreeTrainer<StdRng> {
    /// A trainer whose generator is seeded with `seed`.
    /// The same seed and training set result in the same tree.
    pub fn with_seed(config: TreeConfig,
                     scale: f32,
                     class_ids: Vec<i32>,
                     seed: usize)
                     -> Result<TreeTrainer<StdRng>> {
        let seed: &[usize] = &[seed];
        TreeTrainer::new(config, scale, class_ids, StdRng::from_seed(seed))
    }
}

impl<R: Rng> TreeTrainer<R> {
    /// # Arguments
    /// * `scale` - scale of the training images, stored in the tree
    /// * `class_ids` - class id of every label, 0 is background
    pub fn new(config: TreeConfig, scale: f32, class_ids: Vec<i32>, rng: R) -> Result<TreeTrainer<R>> {
        config.validate()?;
        Ok(TreeTrainer {
            config: config,
            tree: Tree::new(scale, config.max_depth, class_ids),
            class_ratio: vec![],
            rng: rng,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Grows a tree using every patch of the pool.
    /// `pool[l]` contains the patches of label `l`.
    pub fn train<S>(self, pool: &[Vec<S>]) -> Result<Tree>
        where S: PatchFeature + Sync
    {
        let subset: Vec<Vec<usize>> = pool.iter().map(|c| (0..c.len()).collect()).collect();
        self.train_subset(pool, &subset)
    }

    /// Grows a tree using the patches `pool[l][subset[l][i]]`.
    pub fn train_subset<S>(mut self, pool: &[Vec<S>], subset: &[Vec<usize>]) -> Result<Tree>
        where S: PatchFeature + Sync
    {
        let labels = self.tree.num_labels();
        if pool.len() != labels {
            bail!(ErrorKind::LabelMismatch(labels, pool.len()));
        }
        if subset.len() != labels {
            bail!(ErrorKind::LabelMismatch(labels, subset.len()));
        }

        let mut set: SampleSets<S> = Vec::with_capacity(labels);
        for (l, (patches, ids)) in pool.iter().zip(subset.iter()).enumerate() {
            let mut entries = Vec::with_capacity(ids.len());
            for &i in ids.iter() {
                let patch = patches.get(i).ok_or(ErrorKind::InvalidSubset(l, i))?;
                entries.push(Entry::new(patch, i));
            }
            set.push(entries);
        }
        let total = total_count(&set);
        if total == 0 {
            bail!(ErrorKind::EmptyTrainingSet);
        }

        self.class_ratio = class_ratio(&set);
        info!("Start growing a tree with {} samples of {} labels", total, labels);
        self.tree.nodes.push(InternalNode::new(0, 0, None));
        self.grow(set, 0);
        info!("Finished tree with {} nodes and {} leaves",
              self.tree.num_nodes(),
              self.tree.num_leaves());
        Ok(self.tree)
    }

    fn grow<'a, S>(&mut self, set: SampleSets<'a, S>, node: usize)
        where S: PatchFeature + Sync
    {
        let depth = self.tree.nodes[node].depth;
        debug!("Node {} (depth {}): set sizes {:?}",
               node,
               depth,
               set.iter().map(|c| c.len()).collect::<Vec<_>>());
        if depth >= self.tree.max_depth {
            self.make_leaf(&set, node);
            return;
        }

        let present = set.iter().filter(|c| !c.is_empty()).count();
        for _ in 0..(SEARCH_RETRIES + 1) {
            let mode = MeasureMode::choose(&mut self.rng, present, self.config.pose_measure);
            debug!("Node {}: measure {:?}", node, mode);
            if let Some((test, set_a, set_b)) = self.optimize_test(&set, mode) {
                drop(set);
                self.tree.nodes[node].test = test;
                let left = self.push_child(node);
                self.grow_child(set_a, left);
                let right = self.push_child(node);
                self.grow_child(set_b, right);
                self.tree.nodes[node].kind = NodeKind::Split {
                    left: left,
                    right: right,
                };
                return;
            }
        }
        info!("No valid test found for node {}, it becomes a leaf", node);
        self.make_leaf(&set, node);
    }

    fn grow_child<'a, S>(&mut self, set: SampleSets<'a, S>, node: usize)
        where S: PatchFeature + Sync
    {
        if total_count(&set) > self.config.min_samples {
            self.grow(set, node);
        } else {
            self.make_leaf(&set, node);
        }
    }

    fn push_child(&mut self, parent: usize) -> usize {
        let id = self.tree.nodes.len();
        let depth = self.tree.nodes[parent].depth + 1;
        self.tree.nodes.push(InternalNode::new(id, depth, Some(parent)));
        id
    }

    fn make_leaf<S: PatchFeature>(&mut self, set: &[Vec<Entry<S>>], node: usize) {
        let leaf_id = self.tree.leaves.len();
        let leaf = {
            let n = &self.tree.nodes[node];
            LeafNode::aggregate(leaf_id,
                                n.depth,
                                n.parent,
                                set,
                                &self.tree.class_ids,
                                &self.class_ratio)
        };
        self.tree.leaves.push(leaf);
        let n = &mut self.tree.nodes[node];
        n.kind = NodeKind::Leaf(leaf_id);
        n.test = SplitTest::default();
    }

    /// Searches the best test on a subsample and splits the whole set with it.
    /// None if no test results in a valid split.
    fn optimize_test<'a, S>(&mut self,
                            set: &[Vec<Entry<'a, S>>],
                            mode: MeasureMode)
                            -> Option<(SplitTest, SampleSets<'a, S>, SampleSets<'a, S>)>
        where S: PatchFeature + Sync
    {
        let channels = match set.iter().flat_map(|c| c.iter()).next() {
            Some(e) => e.patch.channel_count() + self.config.surfel_dims,
            None => return None,
        };
        if channels == 0 {
            return None;
        }
        let mut work = subsample(set, SUBSAMPLE_PER_CLASS * set.len());

        let mut best: Option<(SplitTest, f64)> = None;
        for _ in 0..self.config.iterations {
            let test = SplitTest::random(&mut self.rng, self.config.offset_window, channels);
            if mode == MeasureMode::Orientation {
                update_relative_pose(&test, &mut work);
            }
            let responses = evaluate_test(&test, &work);
            let (vmin, vmax) = match response_range(&responses) {
                Some(r) => r,
                None => continue,
            };
            if vmax <= vmin {
                continue;
            }

            for _ in 0..THRESHOLD_CANDIDATES {
                let threshold = self.rng.gen_range(vmin, vmax);
                let (set_a, set_b) = split(&work, &responses, threshold);
                if largest_class(&set_a) <= MIN_SIDE_SAMPLES || largest_class(&set_b) <= MIN_SIDE_SAMPLES {
                    continue;
                }
                let score = measure_set(mode,
                                        &set_a,
                                        &set_b,
                                        &self.tree.class_ids,
                                        &self.class_ratio,
                                        self.config.class_specific_location,
                                        &mut self.rng);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((test.with_threshold(threshold), score));
                }
            }
        }

        let (test, score) = best?;
        debug!("Best test {:?} with score {}", test, score);
        let responses = evaluate_test(&test, set);
        let (set_a, set_b) = split(set, &responses, test.threshold);
        Some((test, set_a, set_b))
    }
}

/// Weight of a sample of every label: the inverse number of samples
/// of its label. With a single label there is nothing to balance and
/// every weight is 0.
pub fn class_ratio<T>(set: &[Vec<T>]) -> Vec<f32> {
    if set.len() <= 1 {
        return vec![0.0; set.len()];
    }
    set.iter()
        .map(|c| if c.is_empty() { 0.0 } else { 1.0 / c.len() as f32 })
        .collect()
}
