//! Leaves of a tree

use hough::evaluate::Entry;
use linalg::Vec3;
use quaternion::Quaternion;
use types::PatchFeature;

/// A vote of a training patch for the object center and its orientation
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Vote {
    /// Vector from the patch to the object center
    pub offset: Vec3<f32>,
    pub orientation: Quaternion,
    pub weight: f32,
}

/// A leaf is made up of the probability of every label and
/// the votes of the foreground patches that reached it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LeafNode {
    pub id: usize,
    pub depth: usize,
    /// Parent of the node owning this leaf
    pub parent: Option<usize>,
    /// Weighted share of foreground patches
    pub background_confidence: f32,
    pub label_probability: Vec<f32>,
    /// Number of patches of every label
    pub sample_count: Vec<usize>,
    /// Votes of every label, empty for background labels
    pub votes: Vec<Vec<Vote>>,
}

impl LeafNode {
    /// Collects the patches reaching a leaf.
    ///
    /// The probability of a label is its number of patches weighted with
    /// its class ratio. If there is no weighted mass (e.g. a tree trained
    /// on a single label) the plain counts are used instead.
    pub fn aggregate<S: PatchFeature>(id: usize,
                                      depth: usize,
                                      parent: Option<usize>,
                                      set: &[Vec<Entry<S>>],
                                      class_ids: &[i32],
                                      class_ratio: &[f32])
                                      -> LeafNode {
        let sample_count: Vec<usize> = set.iter().map(|c| c.len()).collect();
        let weighted: Vec<f32> = sample_count.iter()
            .zip(class_ratio.iter())
            .map(|(&n, &r)| n as f32 * r)
            .collect();
        let sum: f32 = weighted.iter().sum();
        let sum_fg: f32 = weighted.iter()
            .zip(class_ids.iter())
            .filter(|&(_, &id)| id > 0)
            .map(|(w, _)| w)
            .sum();

        let background_confidence = if sum > 0.0 { sum_fg / sum } else { 0.0 };
        let label_probability = if sum > 0.0 {
            weighted.iter().map(|w| w / sum).collect()
        } else {
            normalized_counts(&sample_count)
        };

        let votes = set.iter()
            .zip(class_ids.iter())
            .map(|(class, &cid)| {
                if cid == 0 {
                    return vec![];
                }
                let weight = 1.0 / class.len() as f32;
                class.iter()
                    .map(|e| {
                        Vote {
                            offset: e.patch.offset(),
                            orientation: e.patch.orientation(),
                            weight: weight,
                        }
                    })
                    .collect()
            })
            .collect();

        LeafNode {
            id: id,
            depth: depth,
            parent: parent,
            background_confidence: background_confidence,
            label_probability: label_probability,
            sample_count: sample_count,
            votes: votes,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.label_probability.len()
    }
}

/// Relative frequencies, uniform if there is nothing to count
fn normalized_counts(counts: &[usize]) -> Vec<f32> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        let n = counts.len().max(1) as f32;
        return counts.iter().map(|_| 1.0 / n).collect();
    }
    counts.iter().map(|&c| c as f32 / total as f32).collect()
}
