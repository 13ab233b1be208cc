//! Small fixed size vectors and matrices.
//! They are used for the offset votes (3d) and the quaternion averaging (4d).

use std::ops::{Add, Mul, Sub, Deref, Div};
use std::iter::Sum;

/// Assert with tolerance
#[cfg(test)]
macro_rules! assert_feq {
    ($a: expr, $b: expr, $tol: expr) => (
        assert!(::linalg::tests::FEq::feq($a, $b, $tol), "{:?} != {:?}", $a, $b);
    )
}

/// Vectors whose outer product is a matrix
pub trait Vecn: Add<Output = Self> + Sized + Copy {
    type MatrixOut;
    /// Returns the outer product `v * v^T`
    fn transposed_matrix(&self) -> Self::MatrixOut;
}

/// Square matrices
pub trait MatrixFuncSimple {
    type Output;
    fn trace(&self) -> Self::Output;
}

/// Creates the vector type `$Vec` and the matrix type `$Mat`
/// of dimension `$n` with the operations used by the
/// scatter matrices and the quaternion averaging.
///
/// # Example:
/// `VecMat!(Vec3, Mat3, 3)`
macro_rules! VecMat {
    ($Vec: ident, $Mat: ident, $n: expr) => {

        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        pub struct $Vec<T>(pub [T; $n]);

        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        pub struct $Mat<T>(pub [[T; $n]; $n]);

        impl<T: Copy> Copy for $Vec<T> {}
        impl<T: Copy> Clone for $Vec<T> {
            fn clone(&self) -> $Vec<T> {
                *self
            }
        }
        impl<T: Copy> Copy for $Mat<T> {}
        impl<T: Copy> Clone for $Mat<T> {
            fn clone(&self) -> $Mat<T> {
                *self
            }
        }

        impl<T> Deref for $Vec<T> {
            type Target = [T; $n];
            fn deref(&self) -> &[T; $n] {
                &self.0
            }
        }

        impl<T> $Vec<T> where T: Add<Output = T> + Mul<Output = T> + Copy {
            /// Scalar product
            pub fn dot(&self, other: &$Vec<T>) -> T {
                (1..$n).fold(self.0[0] * other.0[0], |acc, i| acc + self.0[i] * other.0[i])
            }
        }

        impl<T> Add for $Vec<T> where T: Add<Output = T> + Copy {
            type Output = $Vec<T>;
            fn add(mut self, rhs: $Vec<T>) -> $Vec<T> {
                for (a, &b) in self.0.iter_mut().zip(rhs.0.iter()) {
                    *a = *a + b;
                }
                self
            }
        }

        impl<T> Sub for $Vec<T> where T: Sub<Output = T> + Copy {
            type Output = $Vec<T>;
            fn sub(mut self, rhs: $Vec<T>) -> $Vec<T> {
                for (a, &b) in self.0.iter_mut().zip(rhs.0.iter()) {
                    *a = *a - b;
                }
                self
            }
        }

        impl<T> Div<T> for $Vec<T> where T: Div<Output = T> + Copy {
            type Output = $Vec<T>;
            fn div(mut self, rhs: T) -> $Vec<T> {
                for a in self.0.iter_mut() {
                    *a = *a / rhs;
                }
                self
            }
        }

        impl<T> Add for $Mat<T> where T: Add<Output = T> + Copy {
            type Output = $Mat<T>;
            fn add(mut self, rhs: $Mat<T>) -> $Mat<T> {
                for (row, rrow) in self.0.iter_mut().zip(rhs.0.iter()) {
                    for (a, &b) in row.iter_mut().zip(rrow.iter()) {
                        *a = *a + b;
                    }
                }
                self
            }
        }

        impl<T> Mul<$Vec<T>> for $Mat<T> where T: Add<Output = T> + Mul<Output = T> + Copy {
            type Output = $Vec<T>;
            fn mul(self, rhs: $Vec<T>) -> $Vec<T> {
                let mut res = rhs;
                for (r, row) in res.0.iter_mut().zip(self.0.iter()) {
                    *r = $Vec(*row).dot(&rhs);
                }
                res
            }
        }

        impl<T> MatrixFuncSimple for $Mat<T> where T: Sum + Copy {
            type Output = T;
            fn trace(&self) -> T {
                self.0.iter().enumerate().map(|(i, row)| row[i]).sum()
            }
        }

        impl<T> Vecn for $Vec<T> where T: Add<Output = T> + Mul<Output = T> + Copy {
            type MatrixOut = $Mat<T>;
            fn transposed_matrix(&self) -> $Mat<T> {
                let mut res = $Mat([self.0; $n]);
                for (row, &a) in res.0.iter_mut().zip(self.0.iter()) {
                    for (x, &b) in row.iter_mut().zip(self.0.iter()) {
                        *x = a * b;
                    }
                }
                res
            }
        }
    }
}

VecMat!(Vec3, Mat3, 3);
VecMat!(Vec4, Mat4, 4);

impl Vec3<f32> {
    pub fn to_f64(&self) -> Vec3<f64> {
        Vec3([self.0[0] as f64, self.0[1] as f64, self.0[2] as f64])
    }
}

impl Vec4<f64> {
    /// Euclidean length
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }
}

/// Computes the mean and the (unnormalized) scatter matrix
/// `sum (x - mean) * (x - mean)^T` of the given set.
/// Returns None for an empty set.
pub fn scatter<V, M>(set: &[V]) -> Option<(V, M)>
    where V: Vecn<MatrixOut = M> + Sub<V, Output = V> + Div<f64, Output = V>,
          M: Add<M, Output = M>
{
    if set.is_empty() {
        return None;
    }
    let mut mean = set[0];
    for v in &set[1..] {
        mean = mean + *v;
    }
    let mean = mean / set.len() as f64;

    let mut sc = (set[0] - mean).transposed_matrix();
    for v in &set[1..] {
        sc = sc + (*v - mean).transposed_matrix();
    }
    Some((mean, sc))
}

/// Sum of squared euclidean distances of every point to the mean of the set.
/// An empty set has no deviation.
pub fn sum_sq_deviation(set: &[Vec3<f64>]) -> f64 {
    match scatter::<Vec3<f64>, Mat3<f64>>(set) {
        Some((_, sc)) => sc.trace(),
        None => 0.0,
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Helper trait for assertion with tolerance
    pub trait FEq {
        fn feq(a: Self, b: Self, tolerance: f64) -> bool;
    }

    impl FEq for f64 {
        fn feq(a: Self, b: Self, tolerance: f64) -> bool {
            (a - b).abs() < tolerance
        }
    }

    impl FEq for f32 {
        fn feq(a: Self, b: Self, tolerance: f64) -> bool {
            ((a - b).abs() as f64) < tolerance
        }
    }

    macro_rules! FEqVec {
        ($Vec: ident, $n: expr) => (
            impl FEq for $Vec<f64>{
                fn feq(a: Self, b: Self, tolerance: f64) -> bool{
                    for i in 0..$n{
                        if !FEq::feq(a.0[i],b.0[i],tolerance) {
                            return false;
                        }
                    }
                    true
                }
            }
            )
    }

    macro_rules! FEqMat {
        ($Mat: ident, $n: expr) => (
            impl FEq for $Mat<f64>{
                fn feq(a: Self, b: Self, tolerance: f64) -> bool{
                    for j in 0..$n{
                        for i in 0..$n{
                            if !FEq::feq(a.0[j][i],b.0[j][i],tolerance) {
                                return false;
                            }
                        }
                    }
                    true
                }
            }
            )
    }

    FEqMat!(Mat3, 3);
    FEqMat!(Mat4, 4);
    FEqVec!(Vec3, 3);
    FEqVec!(Vec4, 4);

    #[test]
    fn test_scatter3() {
        let v = [Vec3([1.0, 2.0, 3.0]), Vec3([1.2, 1.0, 3.2]), Vec3([-1.0, -2.1, 3.0]), Vec3([0.0, 1.0, 0.0])];
        let (m, sc) = scatter::<Vec3<f64>, Mat3<f64>>(&v[..]).unwrap();
        assert_feq!(m, Vec3([0.3, 0.475, 2.3]), 0.001);
        assert_feq!(sc.0[0][0], 3.08, 0.001);
        assert_feq!(sc.0[1][1], 9.5075, 0.001);
        assert_feq!(sc.0[2][2], 7.08, 0.001);
        assert_feq!(sc.0[0][1], 4.73, 0.001);
        assert_feq!(sc.0[1][0], 4.73, 0.001);
        assert_feq!(sum_sq_deviation(&v[..]), 19.6675, 0.0001);
    }

    #[test]
    fn test_empty_and_single_deviation() {
        assert_feq!(sum_sq_deviation(&[]), 0.0, 1e-12);
        assert_feq!(sum_sq_deviation(&[Vec3([4.0, -2.0, 1.0])]), 0.0, 1e-12);
    }

    #[test]
    fn test_mat_vec_mul() {
        let m3 = Mat3([[1.3, 12.1, 2.3], [3.1, 33.1, 14.1], [1.0, 2.0, 3.0]]);
        let v3 = Vec3([11.0, 12.0, 32.2]);
        assert_feq!(m3 * v3, Vec3([233.56, 885.32, 131.6]), 0.001);
        let m4 = Mat4([[1.0, 0.0, 0.0, 2.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 3.0, 0.0], [1.0, 1.0, 1.0, 1.0]]);
        let v4 = Vec4([1.0, 2.0, 3.0, 4.0]);
        assert_feq!(m4 * v4, Vec4([9.0, 2.0, 9.0, 10.0]), 0.001);
    }

    #[test]
    fn test_transposed_matrix(){
        let v = Vec3([2.0,1.1,4.3]);
        assert_feq!(v.transposed_matrix(), Mat3([[4.0,2.2,8.6],[2.2,1.21,4.73],[8.6,4.73,18.49]]),0.001);
        assert_feq!(v.transposed_matrix().trace(), v.dot(&v), 0.001);
    }

    #[test]
    fn test_norm() {
        assert_feq!(Vec4([1.0, 2.0, 2.0, 4.0]).norm(), 5.0, 1e-12);
    }
}
