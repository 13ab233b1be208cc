//! Unit quaternions for the orientation votes of a leaf and
//! the orientation dispersion measure.

use linalg::{Mat4, Vec4, Vecn};
use std::f64;
use std::ops::Mul;

/// Maximal number of power iterations used by `average`
const AVERAGE_ITERATIONS: usize = 64;
/// Stop the power iteration if the estimate moves less than this
const AVERAGE_EPSILON: f64 = 1e-12;

/// A quaternion `w + xi + yj + zk`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Quaternion {
        Quaternion { w: w, x: x, y: y, z: z }
    }

    pub fn identity() -> Quaternion {
        Quaternion::new(1.0, 0.0, 0.0, 0.0)
    }

    /// A quaternion for a pose that could not be computed.
    pub fn undefined() -> Quaternion {
        Quaternion::new(f64::NAN, f64::NAN, f64::NAN, f64::NAN)
    }

    /// Rotation of `angle` radians around `axis`.
    /// The axis does not need to be normalized.
    pub fn from_axis_angle(axis: [f64; 3], angle: f64) -> Quaternion {
        let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
        if len == 0.0 {
            return Quaternion::identity();
        }
        let s = (angle / 2.0).sin() / len;
        Quaternion::new((angle / 2.0).cos(), axis[0] * s, axis[1] * s, axis[2] * s)
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn norm(&self) -> f64 {
        self.as_vec4().norm()
    }

    /// Returns this quaternion scaled to unit length.
    /// A zero quaternion becomes the identity.
    pub fn normalized(&self) -> Quaternion {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return Quaternion::identity();
        }
        Quaternion::new(self.w / n, self.x / n, self.y / n, self.z / n)
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn inverse(&self) -> Quaternion {
        let n2 = self.as_vec4().dot(&self.as_vec4());
        let c = self.conjugate();
        Quaternion::new(c.w / n2, c.x / n2, c.y / n2, c.z / n2)
    }

    /// Rotation angle in `[0, pi]` of the rotation this quaternion represents.
    /// `q` and `-q` have the same angle.
    pub fn angle(&self) -> f64 {
        let v = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        2.0 * v.atan2(self.w.abs())
    }

    /// Geodesic angle between two orientations
    pub fn angle_to(&self, other: &Quaternion) -> f64 {
        (self.inverse() * *other).angle()
    }

    pub fn as_vec4(&self) -> Vec4<f64> {
        Vec4([self.w, self.x, self.y, self.z])
    }

    pub fn from_vec4(v: Vec4<f64>) -> Quaternion {
        Quaternion::new(v.0[0], v.0[1], v.0[2], v.0[3])
    }
}

impl Default for Quaternion {
    fn default() -> Quaternion {
        Quaternion::identity()
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;
    fn mul(self, r: Quaternion) -> Quaternion {
        Quaternion::new(self.w * r.w - self.x * r.x - self.y * r.y - self.z * r.z,
                        self.w * r.x + self.x * r.w + self.y * r.z - self.z * r.y,
                        self.w * r.y - self.x * r.z + self.y * r.w + self.z * r.x,
                        self.w * r.z + self.x * r.y - self.y * r.x + self.z * r.w)
    }
}

/// Computes the mean orientation of a stack of quaternions.
///
/// The mean is the eigenvector to the largest eigenvalue of `sum q * q^T`
/// (Markley et al., "Averaging Quaternions"), found by power iteration.
/// Because of the outer product, `q` and `-q` contribute equally.
/// An empty stack results in the identity.
pub fn average(stack: &[Quaternion]) -> Quaternion {
    if stack.is_empty() {
        return Quaternion::identity();
    }
    let m = stack.iter()
        .map(|q| q.normalized().as_vec4().transposed_matrix())
        .fold(Mat4([[0.0; 4]; 4]), |acc, x| acc + x);

    let mut v = stack[0].normalized().as_vec4();
    for _ in 0..AVERAGE_ITERATIONS {
        let next = m * v;
        let n = next.norm();
        if n == 0.0 || !n.is_finite() {
            break;
        }
        let next = next / n;
        let diff = next - v;
        v = next;
        if diff.norm() < AVERAGE_EPSILON {
            break;
        }
    }
    let mean = Quaternion::from_vec4(v).normalized();
    if mean.w < 0.0 {
        Quaternion::new(-mean.w, -mean.x, -mean.y, -mean.z)
    } else {
        mean
    }
}
