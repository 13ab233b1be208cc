//! Fixtures shared by the tests of the tree growing code.

use rand::{SeedableRng, StdRng};
use std::sync::Arc;
use image::{GrayImage, Luma};

use linalg::Vec3;
use quaternion::Quaternion;
use types::{Channel, ImagePatch, PatchFeature, Point, RelativePose};
use hough::evaluate::{Entry, SampleSets};

pub fn rng(seed: usize) -> StdRng {
    let seed: &[usize] = &[seed];
    StdRng::from_seed(seed)
}

/// A patch whose single channel is a ramp `slope * x`.
/// Different slopes give different responses for the same test.
#[derive(Debug, Clone)]
pub struct RampPatch {
    pub slope: i32,
    pub size: [u32; 2],
    pub offset: Vec3<f32>,
    pub orientation: Quaternion,
    pub surfel: Option<f32>,
    pub pose: RelativePose,
}

impl RampPatch {
    pub fn new(slope: i32) -> RampPatch {
        RampPatch {
            slope: slope,
            size: [40, 40],
            offset: Vec3([0.0; 3]),
            orientation: Quaternion::identity(),
            surfel: None,
            pose: RelativePose::undefined(),
        }
    }

    pub fn with_offset(mut self, offset: [f32; 3]) -> RampPatch {
        self.offset = Vec3(offset);
        self
    }

    pub fn with_pose(mut self, pose: RelativePose) -> RampPatch {
        self.pose = pose;
        self
    }
}

impl PatchFeature for RampPatch {
    fn pixel_location(&self) -> [i32; 2] {
        [20, 20]
    }
    fn scale(&self) -> f32 {
        1.0
    }
    fn image_size(&self) -> [u32; 2] {
        self.size
    }
    fn channel_count(&self) -> usize {
        1
    }
    fn channel_value(&self, _channel: usize, p: Point) -> i32 {
        self.slope * p[0] as i32
    }
    fn offset(&self) -> Vec3<f32> {
        self.offset
    }
    fn orientation(&self) -> Quaternion {
        self.orientation
    }
    fn surfel_feature(&self, _p1: Point, _p2: Point, _component: usize) -> Option<f32> {
        self.surfel
    }
    fn relative_pose(&self, _p1: Point, _p2: Point) -> RelativePose {
        self.pose
    }
}

/// `n` ramp patches per slope in `slopes`
pub fn ramps(slopes: &[i32], n: usize) -> Vec<RampPatch> {
    slopes.iter()
        .flat_map(|&s| (0..n).map(move |_| RampPatch::new(s)))
        .collect()
}

/// Wraps every patch of the pool into an entry
pub fn entries<S>(pool: &[Vec<S>]) -> SampleSets<S> {
    pool.iter()
        .map(|class| class.iter().enumerate().map(|(i, p)| Entry::new(p, i)).collect())
        .collect()
}

/// An image patch of a gray value gradient image
pub fn gradient_patch(x: i32, y: i32) -> ImagePatch {
    let gray = GrayImage::from_fn(32, 32, |x, y| Luma([(4 * x + y) as u8]));
    ImagePatch::new(Arc::new(vec![Channel::Narrow(gray)]),
                    [x, y],
                    1.0,
                    Vec3([x as f32, y as f32, 0.0]),
                    Quaternion::identity())
        .unwrap()
}
