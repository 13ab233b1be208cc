use image::{ImageBuffer, Luma, GrayImage, Primitive};
use std::sync::Arc;

use linalg::Vec3;
use quaternion::Quaternion;

pub type Channel16 = ImageBuffer<Luma<u16>, Vec<u16>>;

/// A pixel position within an image (x, y)
pub type Point = [u32; 2];

/// A feature channel of a training image.
/// A binary test compares two pixels of the same channel,
/// so 8 bit and 16 bit values are never mixed.
pub enum Channel {
    /// Appearance channels (gray values, gradients, ...)
    Narrow(GrayImage),
    /// Depth-like channels
    Wide(Channel16),
}

impl Channel {
    pub fn width(&self) -> u32 {
        match *self {
            Channel::Narrow(ref img) => img.width(),
            Channel::Wide(ref img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match *self {
            Channel::Narrow(ref img) => img.height(),
            Channel::Wide(ref img) => img.height(),
        }
    }

    /// Returns the value at the given point.
    /// The point has to be within the image.
    #[inline]
    pub fn value(&self, p: Point) -> i32 {
        match *self {
            Channel::Narrow(ref img) => read_pixel(img, p),
            Channel::Wide(ref img) => read_pixel(img, p),
        }
    }
}

#[inline]
fn read_pixel<X>(img: &ImageBuffer<Luma<X>, Vec<X>>, p: Point) -> i32
    where X: PixelHelper + Primitive
{
    debug_assert!(p[0] < img.width() && p[1] < img.height());
    #[cfg(feature="reduce_bound_checks")]
    {
        use image::GenericImage;
        unsafe { img.unsafe_get_pixel(p[0], p[1]).to_i32() }
    }
    #[cfg(not(feature="reduce_bound_checks"))]
    {
        img.get_pixel(p[0], p[1]).to_i32()
    }
}

pub trait PixelHelper: Copy + 'static {
    fn to_i32(self) -> i32;
}

impl PixelHelper for u16 {
    fn to_i32(self) -> i32 {
        self as i32
    }
}
impl PixelHelper for u8 {
    fn to_i32(self) -> i32 {
        self as i32
    }
}
impl<X> PixelHelper for Luma<X>
    where X: PixelHelper + Primitive
{
    fn to_i32(self) -> i32 {
        self.data[0].to_i32()
    }
}

/// Orientation of the object relative to the two points of
/// the binary test currently evaluated at a node.
/// Values which could not be computed are not finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelativePose {
    pub first: Quaternion,
    pub second: Quaternion,
}

impl RelativePose {
    pub fn new(first: Quaternion, second: Quaternion) -> RelativePose {
        RelativePose {
            first: first,
            second: second,
        }
    }

    pub fn undefined() -> RelativePose {
        RelativePose::new(Quaternion::undefined(), Quaternion::undefined())
    }
}

/// A training patch as seen by a tree.
///
/// The feature computation (image channels, surface normals, ...) is done
/// outside of this crate, this trait is the interface to it.
pub trait PatchFeature {
    /// Center of the patch in image coordinates
    fn pixel_location(&self) -> [i32; 2];
    /// Scale of the image the patch was taken from.
    /// Test offsets are multiplied by it.
    fn scale(&self) -> f32;
    /// Width and height of the image the patch was taken from
    fn image_size(&self) -> [u32; 2];
    /// Number of appearance channels
    fn channel_count(&self) -> usize;
    /// Value of the channel at the given point.
    /// `channel < channel_count()` and the point lies within `image_size()`.
    fn channel_value(&self, channel: usize, p: Point) -> i32;
    /// Vector from the patch to the object center
    fn offset(&self) -> Vec3<f32>;
    /// Orientation of the object relative to its canonical pose
    fn orientation(&self) -> Quaternion;

    /// Component `component` of the surfel feature between the two points.
    /// Returns None if the feature is not defined for these points.
    fn surfel_feature(&self, _p1: Point, _p2: Point, _component: usize) -> Option<f32> {
        None
    }

    /// Orientation of the object relative to the local frames at both points.
    fn relative_pose(&self, _p1: Point, _p2: Point) -> RelativePose {
        RelativePose::undefined()
    }
}

/// A patch of an image whose feature channels are kept in memory.
/// Several patches of the same image share its channels.
///
/// It has no surface normals, so every relative pose is undefined and the
/// orientation measure scores all tests alike. Train it with
/// `TreeConfig::with_pose_measure(false)` or use a `PatchFeature` which
/// provides relative poses.
pub struct ImagePatch {
    channels: Arc<Vec<Channel>>,
    location: [i32; 2],
    scale: f32,
    offset: Vec3<f32>,
    orientation: Quaternion,
}

impl ImagePatch {
    /// Creates a patch centered at `location`.
    /// Returns None if there are no channels, the channels have different sizes
    /// or the location lies outside of the image.
    pub fn new(channels: Arc<Vec<Channel>>,
               location: [i32; 2],
               scale: f32,
               offset: Vec3<f32>,
               orientation: Quaternion)
               -> Option<ImagePatch> {
        let (w, h) = match channels.first() {
            Some(c) => (c.width(), c.height()),
            None => return None,
        };
        if channels.iter().any(|c| c.width() != w || c.height() != h) {
            return None;
        }
        if location[0] < 0 || location[1] < 0 || location[0] as u32 >= w ||
           location[1] as u32 >= h || !(scale > 0.0) {
            return None;
        }
        Some(ImagePatch {
            channels: channels,
            location: location,
            scale: scale,
            offset: offset,
            orientation: orientation,
        })
    }
}

impl PatchFeature for ImagePatch {
    fn pixel_location(&self) -> [i32; 2] {
        self.location
    }
    fn scale(&self) -> f32 {
        self.scale
    }
    fn image_size(&self) -> [u32; 2] {
        [self.channels[0].width(), self.channels[0].height()]
    }
    fn channel_count(&self) -> usize {
        self.channels.len()
    }
    fn channel_value(&self, channel: usize, p: Point) -> i32 {
        self.channels[channel].value(p)
    }
    fn offset(&self) -> Vec3<f32> {
        self.offset
    }
    fn orientation(&self) -> Quaternion {
        self.orientation
    }
}

/// Moves `location + offset * scale` into the image.
pub fn clamp_point(location: [i32; 2], offset: [i32; 2], scale: f32, size: [u32; 2]) -> Point {
    let mut res = [0u32; 2];
    for i in 0..2 {
        let v = (location[i] as f32 + offset[i] as f32 * scale) as i64;
        let max = (size[i] as i64 - 1).max(0);
        res[i] = v.max(0).min(max) as u32;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn channels() -> Arc<Vec<Channel>> {
        let gray = GrayImage::from_fn(8, 6, |x, y| Luma([(x + 10 * y) as u8]));
        let depth = Channel16::from_fn(8, 6, |x, _| Luma([1000 + x as u16]));
        Arc::new(vec![Channel::Narrow(gray), Channel::Wide(depth)])
    }

    #[test]
    fn test_clamp_point() {
        assert_eq!(clamp_point([4, 3], [1, -1], 1.0, [8, 6]), [5, 2]);
        assert_eq!(clamp_point([4, 3], [10, -10], 1.0, [8, 6]), [7, 0]);
        assert_eq!(clamp_point([4, 3], [2, 2], 0.5, [8, 6]), [5, 4]);
        assert_eq!(clamp_point([0, 0], [-3, 100], 2.0, [8, 6]), [0, 5]);
    }

    #[test]
    fn test_image_patch() {
        let patch = ImagePatch::new(channels(), [2, 3], 1.0, Vec3([1.0, 2.0, 3.0]), Quaternion::identity())
            .unwrap();
        assert_eq!(patch.channel_count(), 2);
        assert_eq!(patch.image_size(), [8, 6]);
        assert_eq!(patch.channel_value(0, [3, 2]), 23);
        assert_eq!(patch.channel_value(1, [7, 0]), 1007);
        assert!(patch.surfel_feature([0, 0], [1, 1], 0).is_none());
        assert!(!patch.relative_pose([0, 0], [1, 1]).first.is_finite());
    }

    #[test]
    fn test_invalid_patch() {
        let o = Vec3([0.0; 3]);
        let q = Quaternion::identity();
        assert!(ImagePatch::new(channels(), [8, 0], 1.0, o, q).is_none());
        assert!(ImagePatch::new(channels(), [-1, 0], 1.0, o, q).is_none());
        assert!(ImagePatch::new(channels(), [1, 1], 0.0, o, q).is_none());
        assert!(ImagePatch::new(Arc::new(vec![]), [1, 1], 1.0, o, q).is_none());
    }
}
