//! Quality measures for a split of a sample set into two sets.
//! Higher values are better for every measure.

use rand::Rng;

use hough::evaluate::Entry;
use linalg::{Vec3, sum_sq_deviation};
use quaternion::{self, Quaternion};
use types::PatchFeature;

/// Probability to ignore a sample for the mean orientation
const POSE_DROP_RATE: f32 = 0.9;
/// Classes with less than this many samples (after dropping) use every sample
const POSE_MIN_SAMPLES: f32 = 100.0;

/// ln!(x) = ln x if x != 0 and 0 otherwise
macro_rules! ln {
     ($x: expr) => {if $x == 0f64 {0f64} else {$x.ln()} }
}

/// The measure used to rate a split
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureMode {
    /// Entropy over the classes
    ClassEntropy,
    /// Entropy over background and foreground
    ForegroundEntropy,
    /// Spread of the offset votes
    Location,
    /// Spread of the relative orientations
    Orientation,
}

impl MeasureMode {
    /// Draws the measure for the next search.
    /// The entropies are only useful if more than one class is left.
    pub fn choose<R: Rng>(rng: &mut R, present_classes: usize, orientation: bool) -> MeasureMode {
        use self::MeasureMode::*;
        let modes: &[MeasureMode] = match (present_classes > 1, orientation) {
            (true, true) => &[ClassEntropy, ForegroundEntropy, Location, Orientation],
            (true, false) => &[ClassEntropy, ForegroundEntropy, Location],
            (false, true) => &[Location, Orientation],
            (false, false) => &[Location],
        };
        modes[rng.gen_range(0, modes.len())]
    }
}

/// Rates the split into `set_a` and `set_b`.
///
/// # Arguments
/// * `class_ids` - class id of every label, ids <= 0 are background
/// * `class_ratio` - weight of a sample of every label
/// * `class_specific` - use class specific means for the location measure
pub fn measure_set<S, R>(mode: MeasureMode,
                         set_a: &[Vec<Entry<S>>],
                         set_b: &[Vec<Entry<S>>],
                         class_ids: &[i32],
                         class_ratio: &[f32],
                         class_specific: bool,
                         rng: &mut R)
                         -> f64
    where S: PatchFeature,
          R: Rng
{
    match mode {
        MeasureMode::ClassEntropy => info_gain(set_a, set_b, class_ratio, &class_buckets(class_ids)),
        MeasureMode::ForegroundEntropy => {
            info_gain(set_a, set_b, class_ratio, &foreground_buckets(class_ids))
        }
        MeasureMode::Location if class_specific => -dist_mean_mc(set_a, set_b, class_ids),
        MeasureMode::Location => -dist_mean(set_a, set_b, class_ids),
        MeasureMode::Orientation => -orientation_mean_mc(set_a, set_b, class_ids, rng),
    }
}

/// Maps every label to the bucket of its class id.
/// Labels with the same class id share a bucket, wherever they are.
pub fn class_buckets(class_ids: &[i32]) -> Vec<usize> {
    let mut seen: Vec<i32> = vec![];
    class_ids.iter()
        .map(|id| match seen.iter().position(|s| s == id) {
            Some(b) => b,
            None => {
                seen.push(*id);
                seen.len() - 1
            }
        })
        .collect()
}

/// Maps background labels to bucket 0 and foreground labels to bucket 1.
pub fn foreground_buckets(class_ids: &[i32]) -> Vec<usize> {
    class_ids.iter().map(|&id| if id > 0 { 1 } else { 0 }).collect()
}

/// Weighted size times the negative entropy of one side
fn side_entropy<S>(set: &[Vec<Entry<S>>], class_ratio: &[f32], buckets: &[usize]) -> f64 {
    let n = buckets.iter().map(|b| b + 1).max().unwrap_or(0);
    let mut counts = vec![0f64; n];
    let mut size = 0f64;
    for ((class, &ratio), &b) in set.iter().zip(class_ratio.iter()).zip(buckets.iter()) {
        let w = class.len() as f64 * ratio as f64;
        counts[b] += w;
        size += w;
    }
    if size <= 0.0 {
        return 0.0;
    }
    let entropy: f64 = counts.iter()
        .map(|&c| {
            let p = c / size;
            p * ln!(p)
        })
        .sum();
    size * entropy
}

/// Information gain (up to a constant) of the split,
/// counting labels in the given buckets.
pub fn info_gain<S>(set_a: &[Vec<Entry<S>>],
                    set_b: &[Vec<Entry<S>>],
                    class_ratio: &[f32],
                    buckets: &[usize])
                    -> f64 {
    side_entropy(set_a, class_ratio, buckets) + side_entropy(set_b, class_ratio, buckets)
}

fn offsets<S: PatchFeature>(entries: &[Entry<S>]) -> Vec<Vec3<f64>> {
    entries.iter().map(|e| e.patch.offset().to_f64()).collect()
}

/// Sum of squared deviations of the foreground offsets of each side
/// from the mean of that side (class independent).
pub fn dist_mean<S: PatchFeature>(set_a: &[Vec<Entry<S>>],
                                  set_b: &[Vec<Entry<S>>],
                                  class_ids: &[i32])
                                  -> f64 {
    sum_sq_deviation(&foreground_offsets(set_a, class_ids)) +
    sum_sq_deviation(&foreground_offsets(set_b, class_ids))
}

fn foreground_offsets<S: PatchFeature>(set: &[Vec<Entry<S>>], class_ids: &[i32]) -> Vec<Vec3<f64>> {
    set.iter()
        .zip(class_ids.iter())
        .filter(|&(_, &id)| id > 0)
        .flat_map(|(class, _)| offsets(class))
        .collect()
}

/// Sum of squared deviations of the foreground offsets
/// from the mean of their class and side.
pub fn dist_mean_mc<S: PatchFeature>(set_a: &[Vec<Entry<S>>],
                                     set_b: &[Vec<Entry<S>>],
                                     class_ids: &[i32])
                                     -> f64 {
    let mut dist = 0.0;
    for (c, &id) in class_ids.iter().enumerate() {
        if id <= 0 {
            continue;
        }
        dist += sum_sq_deviation(&offsets(&set_a[c]));
        dist += sum_sq_deviation(&offsets(&set_b[c]));
    }
    dist
}

/// Summed angle between the relative poses of the samples and
/// their mean, for both reference points.
fn pose_dispersion<S, R: Rng>(entries: &[Entry<S>], rng: &mut R) -> f64 {
    let keep_all = entries.len() as f32 * POSE_DROP_RATE < POSE_MIN_SAMPLES;
    let mut first: Vec<Quaternion> = Vec::with_capacity(entries.len());
    let mut second: Vec<Quaternion> = Vec::with_capacity(entries.len());
    for e in entries.iter() {
        if keep_all || rng.gen::<f32>() > POSE_DROP_RATE {
            if e.pose.first.is_finite() {
                first.push(e.pose.first);
            }
            if e.pose.second.is_finite() {
                second.push(e.pose.second);
            }
        }
    }
    let mean_first = quaternion::average(&first).inverse();
    let mean_second = quaternion::average(&second).inverse();

    let mut dist = 0.0;
    for e in entries.iter() {
        if e.pose.first.is_finite() {
            dist += (mean_first * e.pose.first).angle();
        }
        if e.pose.second.is_finite() {
            dist += (mean_second * e.pose.second).angle();
        }
    }
    dist
}

/// Spread of the relative orientations of the foreground samples
/// within each class and side.
pub fn orientation_mean_mc<S, R>(set_a: &[Vec<Entry<S>>],
                                 set_b: &[Vec<Entry<S>>],
                                 class_ids: &[i32],
                                 rng: &mut R)
                                 -> f64
    where R: Rng
{
    let mut dist = 0.0;
    for (c, &id) in class_ids.iter().enumerate() {
        if id <= 0 {
            continue;
        }
        dist += pose_dispersion(&set_a[c], rng);
        dist += pose_dispersion(&set_b[c], rng);
    }
    dist
}
