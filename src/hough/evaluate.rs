//! Evaluation of binary tests and partitioning of sample sets.

use rayon::prelude::*;

use hough::binary_test::SplitTest;
use types::{PatchFeature, RelativePose};

/// A training patch while growing a tree.
/// It refers to the patch in the pool of the caller and carries
/// the relative pose computed for the test currently evaluated.
pub struct Entry<'a, S: 'a> {
    pub patch: &'a S,
    /// Index of the patch within the pool of its class
    pub id: usize,
    pub pose: RelativePose,
}

impl<'a, S> Entry<'a, S> {
    pub fn new(patch: &'a S, id: usize) -> Entry<'a, S> {
        Entry {
            patch: patch,
            id: id,
            pose: RelativePose::undefined(),
        }
    }
}

impl<'a, S> Copy for Entry<'a, S> {}
impl<'a, S> Clone for Entry<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

/// Samples of a node, one list for every label
pub type SampleSets<'a, S> = Vec<Vec<Entry<'a, S>>>;

/// Response of the entry `index` of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Response {
    pub val: i32,
    pub index: usize,
}

/// Computes the response of every entry for the given test.
/// The responses of a class are sorted ascending.
pub fn evaluate_test<'a, S>(test: &SplitTest, set: &[Vec<Entry<'a, S>>]) -> Vec<Vec<Response>>
    where S: PatchFeature + Sync
{
    set.par_iter()
        .map(|entries| {
            let mut responses: Vec<Response> = entries.iter()
                .enumerate()
                .map(|(i, e)| {
                    Response {
                        val: test.response(e.patch),
                        index: i,
                    }
                })
                .collect();
            responses.sort();
            responses
        })
        .collect()
}

/// Recomputes the relative pose of every entry for the points of the given test.
pub fn update_relative_pose<'a, S>(test: &SplitTest, set: &mut [Vec<Entry<'a, S>>])
    where S: PatchFeature
{
    for e in set.iter_mut().flat_map(|c| c.iter_mut()) {
        let (p1, p2) = test.points(e.patch);
        e.pose = e.patch.relative_pose(p1, p2);
    }
}

/// Smallest and largest response over all classes.
/// None if there is no response at all.
pub fn response_range(responses: &[Vec<Response>]) -> Option<(i32, i32)> {
    let mut range: Option<(i32, i32)> = None;
    for class in responses.iter() {
        if let (Some(first), Some(last)) = (class.first(), class.last()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(first.val), hi.max(last.val)),
                None => (first.val, last.val),
            });
        }
    }
    range
}

/// Splits the set using the sorted responses of `evaluate_test`.
/// The first set contains every entry with a response lower than the threshold.
pub fn split<'a, S>(set: &[Vec<Entry<'a, S>>],
                    responses: &[Vec<Response>],
                    threshold: i32)
                    -> (SampleSets<'a, S>, SampleSets<'a, S>) {
    let mut set_a = Vec::with_capacity(set.len());
    let mut set_b = Vec::with_capacity(set.len());
    for (entries, resp) in set.iter().zip(responses.iter()) {
        let pos = resp.iter().position(|r| r.val >= threshold).unwrap_or(resp.len());
        set_a.push(resp[..pos].iter().map(|r| entries[r.index]).collect());
        set_b.push(resp[pos..].iter().map(|r| entries[r.index]).collect());
    }
    (set_a, set_b)
}

/// Takes at most about `budget` entries in total.
/// Every class is reduced by the same rate using a regular stride,
/// so the class proportions are kept.
pub fn subsample<'a, S>(set: &[Vec<Entry<'a, S>>], budget: usize) -> SampleSets<'a, S> {
    let total = total_count(set);
    if total == 0 {
        return set.iter().map(|_| vec![]).collect();
    }
    let rate = budget as f32 / total as f32;
    set.iter()
        .map(|class| {
            let n = ((rate * class.len() as f32) as usize).min(class.len());
            if n == 0 {
                return vec![];
            }
            let stride = class.len() as f32 / n as f32;
            (0..n)
                .map(|j| class[((stride * j as f32) as usize).min(class.len() - 1)])
                .collect()
        })
        .collect()
}

/// Number of entries over all classes
pub fn total_count<T>(set: &[Vec<T>]) -> usize {
    set.iter().map(|c| c.len()).sum()
}

/// Number of entries of the largest class
pub fn largest_class<T>(set: &[Vec<T>]) -> usize {
    set.iter().map(|c| c.len()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hough::test_support::*;
    use quaternion::Quaternion;

    fn ids<S>(set: &[Vec<Entry<S>>]) -> Vec<Vec<usize>> {
        set.iter().map(|c| c.iter().map(|e| e.id).collect()).collect()
    }

    #[test]
    fn test_evaluate_sorted() {
        let pool = vec![ramps(&[3, -1, 2], 1), ramps(&[0, 5], 1)];
        let set = entries(&pool);
        // response is slope * (x1 - x2) = slope * 2
        let test = SplitTest::from_params([1, 0, -1, 0, 0, 0]);
        let responses = evaluate_test(&test, &set);
        assert_eq!(responses[0],
                   vec![Response { val: -2, index: 1 },
                        Response { val: 4, index: 2 },
                        Response { val: 6, index: 0 }]);
        assert_eq!(responses[1],
                   vec![Response { val: 0, index: 0 }, Response { val: 10, index: 1 }]);
        assert_eq!(response_range(&responses), Some((-2, 10)));
    }

    #[test]
    fn test_split_keeps_identity() {
        let pool = vec![ramps(&[3, -1, 2], 1), ramps(&[0, 5], 1)];
        let set = entries(&pool);
        let test = SplitTest::from_params([1, 0, -1, 0, 0, 0]);
        let responses = evaluate_test(&test, &set);
        let (a, b) = split(&set, &responses, 4);
        assert_eq!(ids(&a), vec![vec![1], vec![0]]);
        assert_eq!(ids(&b), vec![vec![2, 0], vec![1]]);
        for e in a.iter().chain(b.iter()).flat_map(|c| c.iter()) {
            assert!(::std::ptr::eq(e.patch, &pool[if e.patch.slope == 0 || e.patch.slope == 5 { 1 } else { 0 }][e.id]));
        }
    }

    #[test]
    fn test_split_idempotent() {
        let pool = vec![ramps(&[1, 2, 3, 4, 5, 6], 3), ramps(&[-3, 0, 3], 4)];
        let set = entries(&pool);
        let test = SplitTest::from_params([2, 0, -3, 1, 0, 0]);
        let responses = evaluate_test(&test, &set);
        let (a1, b1) = split(&set, &responses, 7);
        let (a2, b2) = split(&set, &responses, 7);
        assert_eq!(ids(&a1), ids(&a2));
        assert_eq!(ids(&b1), ids(&b2));
        assert_eq!(total_count(&a1) + total_count(&b1), total_count(&set));
        assert_eq!(ids(&set), vec![(0..18).collect::<Vec<_>>(), (0..12).collect()]);
    }

    #[test]
    fn test_split_extremes() {
        let pool = vec![ramps(&[1, 2], 2)];
        let set = entries(&pool);
        let test = SplitTest::from_params([1, 0, 0, 0, 0, 0]);
        let responses = evaluate_test(&test, &set);
        let (a, b) = split(&set, &responses, i32::min_value());
        assert_eq!(total_count(&a), 0);
        assert_eq!(total_count(&b), 4);
        let (a, b) = split(&set, &responses, i32::max_value());
        assert_eq!(total_count(&a), 4);
        assert_eq!(total_count(&b), 0);
    }

    #[test]
    fn test_subsample_keeps_proportions() {
        let pool = vec![ramps(&[1], 300), ramps(&[2], 100), vec![]];
        let set = entries(&pool);
        let sub = subsample(&set, 200);
        assert_eq!(sub[0].len(), 150);
        assert_eq!(sub[1].len(), 50);
        assert!(sub[2].is_empty());
        assert_eq!(sub[0][1].id, 2);
        assert_eq!(sub[1][1].id, 2);
        // nothing to remove
        let sub = subsample(&set, 1000);
        assert_eq!(ids(&sub), ids(&set));
    }

    #[test]
    fn test_relative_pose_is_local() {
        let q = Quaternion::from_axis_angle([0.0, 0.0, 1.0], 0.3);
        let pool = vec![vec![RampPatch::new(1).with_pose(RelativePose::new(q, q))]];
        let set = entries(&pool);
        let mut work = set.clone();
        update_relative_pose(&SplitTest::default(), &mut work);
        assert_eq!(work[0][0].pose.first, q);
        assert!(!set[0][0].pose.first.is_finite());
        assert_eq!(largest_class(&work), 1);
    }
}
