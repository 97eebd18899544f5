use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

use bevy::math::{IVec3, Mat2, Mat3, Vec2, Vec3};
use nalgebra::{Matrix2, Matrix3};

pub type Real = f32;

/// Grid cell coordinate. Planar simulations keep `z == 0`.
pub type Coord = IVec3;

/// Compile-time spatial dimension of a simulation.
///
/// Vectors and matrices are bevy's glam types so the solver reads the same in
/// 2D and 3D; the few operations glam does not share between `Mat2` and `Mat3`
/// (SVD, outer products, diagonals) live here.
pub trait Dimension: Copy + Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    const DIM: usize;
    /// Number of grid nodes covered by the quadratic B-spline support (3^DIM).
    const STENCIL_SIZE: usize;

    type Vector: Copy
        + Debug
        + Default
        + PartialEq
        + Send
        + Sync
        + Add<Output = Self::Vector>
        + AddAssign
        + Sub<Output = Self::Vector>
        + SubAssign
        + Mul<Real, Output = Self::Vector>
        + Div<Real, Output = Self::Vector>
        + Neg<Output = Self::Vector>
        + Index<usize, Output = Real>
        + IndexMut<usize>;

    type Matrix: Copy
        + Debug
        + PartialEq
        + Send
        + Sync
        + Add<Output = Self::Matrix>
        + AddAssign
        + Sub<Output = Self::Matrix>
        + Mul<Real, Output = Self::Matrix>
        + Mul<Self::Matrix, Output = Self::Matrix>
        + Mul<Self::Vector, Output = Self::Vector>;

    fn splat(value: Real) -> Self::Vector;
    fn identity() -> Self::Matrix;
    fn zero_matrix() -> Self::Matrix;
    fn from_diagonal(diagonal: Self::Vector) -> Self::Matrix;
    fn diagonal(m: &Self::Matrix) -> Self::Vector;
    fn transpose(m: &Self::Matrix) -> Self::Matrix;
    fn determinant(m: &Self::Matrix) -> Real;
    fn inverse(m: &Self::Matrix) -> Self::Matrix;
    fn outer_product(a: Self::Vector, b: Self::Vector) -> Self::Matrix;
    fn matrix_is_finite(m: &Self::Matrix) -> bool;

    /// Raw singular value decomposition; `u` and `v` may be reflections.
    fn raw_svd(m: &Self::Matrix) -> Svd<Self>;

    #[inline(always)]
    fn zero_vector() -> Self::Vector {
        Self::splat(0.0)
    }

    #[inline]
    fn vector_from_fn<F: FnMut(usize) -> Real>(mut f: F) -> Self::Vector {
        let mut v = Self::zero_vector();
        for axis in 0..Self::DIM {
            v[axis] = f(axis);
        }
        v
    }

    #[inline]
    fn vector_from_slice(values: &[Real]) -> Option<Self::Vector> {
        (values.len() == Self::DIM).then(|| Self::vector_from_fn(|axis| values[axis]))
    }

    #[inline]
    fn dot(a: Self::Vector, b: Self::Vector) -> Real {
        (0..Self::DIM).map(|axis| a[axis] * b[axis]).sum()
    }

    #[inline]
    fn length(v: Self::Vector) -> Real {
        Self::dot(v, v).sqrt()
    }

    #[inline]
    fn vector_is_finite(v: Self::Vector) -> bool {
        (0..Self::DIM).all(|axis| v[axis].is_finite())
    }

    #[inline]
    fn component_sum(v: Self::Vector) -> Real {
        (0..Self::DIM).map(|axis| v[axis]).sum()
    }

    #[inline]
    fn component_product(v: Self::Vector) -> Real {
        (0..Self::DIM).map(|axis| v[axis]).product()
    }

    #[inline]
    fn trace(m: &Self::Matrix) -> Real {
        Self::component_sum(Self::diagonal(m))
    }

    /// Sum of squared entries, `tr(M M^T)`.
    #[inline]
    fn norm_squared(m: &Self::Matrix) -> Real {
        Self::trace(&(*m * Self::transpose(m)))
    }

    /// Singular value decomposition with `u` and `v` proper rotations.
    ///
    /// A reflection is moved onto the smallest singular value, which then
    /// carries the sign of `det(M)`.
    fn svd(m: &Self::Matrix) -> Svd<Self> {
        Self::raw_svd(m).into_rotations()
    }
}

/// `M = U diag(sigma) V^T`.
#[derive(Debug)]
pub struct Svd<D: Dimension> {
    pub u: D::Matrix,
    pub sigma: D::Vector,
    pub v: D::Matrix,
}

impl<D: Dimension> Clone for Svd<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for Svd<D> {}

impl<D: Dimension> Svd<D> {
    #[inline]
    pub fn recompose(&self) -> D::Matrix {
        self.recompose_with(self.sigma)
    }

    /// `U diag(sigma) V^T` with replacement singular values.
    #[inline]
    pub fn recompose_with(&self, sigma: D::Vector) -> D::Matrix {
        self.u * D::from_diagonal(sigma) * D::transpose(&self.v)
    }

    /// Closest rotation `U V^T`.
    #[inline]
    pub fn rotation(&self) -> D::Matrix {
        self.u * D::transpose(&self.v)
    }

    fn into_rotations(mut self) -> Self {
        let mut smallest = 0;
        for axis in 1..D::DIM {
            if self.sigma[axis].abs() < self.sigma[smallest].abs() {
                smallest = axis;
            }
        }

        let mut flip = D::splat(1.0);
        flip[smallest] = -1.0;
        let flip = D::from_diagonal(flip);

        if D::determinant(&self.u) < 0.0 {
            self.u = self.u * flip;
            self.sigma[smallest] = -self.sigma[smallest];
        }
        if D::determinant(&self.v) < 0.0 {
            self.v = self.v * flip;
            self.sigma[smallest] = -self.sigma[smallest];
        }
        self
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dim2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Dim3;

impl Dimension for Dim2 {
    const DIM: usize = 2;
    const STENCIL_SIZE: usize = 9;

    type Vector = Vec2;
    type Matrix = Mat2;

    #[inline(always)]
    fn splat(value: Real) -> Vec2 {
        Vec2::splat(value)
    }

    #[inline(always)]
    fn identity() -> Mat2 {
        Mat2::IDENTITY
    }

    #[inline(always)]
    fn zero_matrix() -> Mat2 {
        Mat2::ZERO
    }

    #[inline(always)]
    fn from_diagonal(diagonal: Vec2) -> Mat2 {
        Mat2::from_diagonal(diagonal)
    }

    #[inline(always)]
    fn diagonal(m: &Mat2) -> Vec2 {
        Vec2::new(m.x_axis.x, m.y_axis.y)
    }

    #[inline(always)]
    fn transpose(m: &Mat2) -> Mat2 {
        m.transpose()
    }

    #[inline(always)]
    fn determinant(m: &Mat2) -> Real {
        m.determinant()
    }

    #[inline(always)]
    fn inverse(m: &Mat2) -> Mat2 {
        m.inverse()
    }

    #[inline(always)]
    fn outer_product(a: Vec2, b: Vec2) -> Mat2 {
        Mat2::from_cols(a * b.x, a * b.y)
    }

    #[inline(always)]
    fn matrix_is_finite(m: &Mat2) -> bool {
        m.is_finite()
    }

    fn raw_svd(m: &Mat2) -> Svd<Self> {
        let svd = Matrix2::from_column_slice(&m.to_cols_array()).svd(true, true);
        let u = svd.u.unwrap_or_else(Matrix2::identity);
        let v = svd
            .v_t
            .map(|v_t| v_t.transpose())
            .unwrap_or_else(Matrix2::identity);
        Svd {
            u: Mat2::from_cols_slice(u.as_slice()),
            sigma: Vec2::new(svd.singular_values[0], svd.singular_values[1]),
            v: Mat2::from_cols_slice(v.as_slice()),
        }
    }
}

impl Dimension for Dim3 {
    const DIM: usize = 3;
    const STENCIL_SIZE: usize = 27;

    type Vector = Vec3;
    type Matrix = Mat3;

    #[inline(always)]
    fn splat(value: Real) -> Vec3 {
        Vec3::splat(value)
    }

    #[inline(always)]
    fn identity() -> Mat3 {
        Mat3::IDENTITY
    }

    #[inline(always)]
    fn zero_matrix() -> Mat3 {
        Mat3::ZERO
    }

    #[inline(always)]
    fn from_diagonal(diagonal: Vec3) -> Mat3 {
        Mat3::from_diagonal(diagonal)
    }

    #[inline(always)]
    fn diagonal(m: &Mat3) -> Vec3 {
        Vec3::new(m.x_axis.x, m.y_axis.y, m.z_axis.z)
    }

    #[inline(always)]
    fn transpose(m: &Mat3) -> Mat3 {
        m.transpose()
    }

    #[inline(always)]
    fn determinant(m: &Mat3) -> Real {
        m.determinant()
    }

    #[inline(always)]
    fn inverse(m: &Mat3) -> Mat3 {
        m.inverse()
    }

    #[inline(always)]
    fn outer_product(a: Vec3, b: Vec3) -> Mat3 {
        Mat3::from_cols(a * b.x, a * b.y, a * b.z)
    }

    #[inline(always)]
    fn matrix_is_finite(m: &Mat3) -> bool {
        m.is_finite()
    }

    fn raw_svd(m: &Mat3) -> Svd<Self> {
        let svd = Matrix3::from_column_slice(&m.to_cols_array()).svd(true, true);
        let u = svd.u.unwrap_or_else(Matrix3::identity);
        let v = svd
            .v_t
            .map(|v_t| v_t.transpose())
            .unwrap_or_else(Matrix3::identity);
        let s = svd.singular_values;
        Svd {
            u: Mat3::from_cols_slice(u.as_slice()),
            sigma: Vec3::new(s[0], s[1], s[2]),
            v: Mat3::from_cols_slice(v.as_slice()),
        }
    }
}

/// Pad a dimension-sized vector into the three-component layout used by
/// dimension-erased consumers.
#[inline]
pub fn to_padded<D: Dimension>(v: D::Vector) -> [Real; 3] {
    let mut out = [0.0; 3];
    for (axis, slot) in out.iter_mut().enumerate().take(D::DIM) {
        *slot = v[axis];
    }
    out
}
