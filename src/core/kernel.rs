//! Quadratic B-spline transfer kernel.
//!
//! Each particle touches a 3-wide stencil per axis starting at its base cell
//! `floor(x / dx - 0.5)`. Weights are separable and cached once per inner
//! step so P2G and G2P read the same values.

use bevy::math::IVec3;

use crate::math::{Coord, Dimension, Real};

/// Inverse of the quadratic B-spline inertia tensor, `4 / dx^2`.
#[inline]
pub fn inv_d(cell_width: Real) -> Real {
    4.0 / (cell_width * cell_width)
}

const fn stencil<const N: usize>(depth: i32) -> [IVec3; N] {
    let mut out = [IVec3::ZERO; N];
    let mut idx = 0;
    let mut k = 0;
    while k < depth {
        let mut j = 0;
        while j < 3 {
            let mut i = 0;
            while i < 3 {
                out[idx] = IVec3::new(i, j, k);
                idx += 1;
                i += 1;
            }
            j += 1;
        }
        k += 1;
    }
    out
}

pub const STENCIL_2D: [IVec3; 9] = stencil::<9>(1);
pub const STENCIL_3D: [IVec3; 27] = stencil::<27>(3);

/// Offsets of every node in a particle's support, relative to its base cell.
#[inline(always)]
pub fn stencil_offsets<D: Dimension>() -> &'static [IVec3] {
    if D::DIM == 2 { &STENCIL_2D } else { &STENCIL_3D }
}

/// Base cell of the support for a particle at `position`.
#[inline]
pub fn base_cell<D: Dimension>(position: D::Vector, inv_dx: Real) -> Coord {
    let mut base = IVec3::ZERO;
    for axis in 0..D::DIM {
        base[axis] = (position[axis] * inv_dx - 0.5).floor() as i32;
    }
    base
}

#[inline(always)]
fn bspline_weights(fx: Real) -> [Real; 3] {
    let a = 1.5 - fx;
    let b = fx - 1.0;
    let c = fx - 0.5;
    [0.5 * a * a, 0.75 - b * b, 0.5 * c * c]
}

/// Cached interpolation data for one particle.
///
/// Unused axes (z in 2D) carry weights `[1, 0, 0]` so the separable product
/// reduces to the planar one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadraticKernel {
    pub base: Coord,
    /// Particle position relative to the base cell, in cell units.
    pub fx: [Real; 3],
    /// `weights[axis][offset]`.
    pub weights: [[Real; 3]; 3],
}

impl Default for QuadraticKernel {
    fn default() -> Self {
        Self {
            base: IVec3::ZERO,
            fx: [0.0; 3],
            weights: [[1.0, 0.0, 0.0]; 3],
        }
    }
}

impl QuadraticKernel {
    #[inline]
    pub fn new<D: Dimension>(position: D::Vector, inv_dx: Real) -> Self {
        let base = base_cell::<D>(position, inv_dx);
        let mut kernel = Self {
            base,
            ..Self::default()
        };
        for axis in 0..D::DIM {
            let fx = position[axis] * inv_dx - base[axis] as Real;
            kernel.fx[axis] = fx;
            kernel.weights[axis] = bspline_weights(fx);
        }
        kernel
    }

    #[inline(always)]
    pub fn weight(&self, offset: IVec3) -> Real {
        self.weights[0][offset.x as usize]
            * self.weights[1][offset.y as usize]
            * self.weights[2][offset.z as usize]
    }

    #[inline(always)]
    pub fn node(&self, offset: IVec3) -> Coord {
        self.base + offset
    }

    /// World-space vector from the particle to the node at `offset`.
    #[inline(always)]
    pub fn offset_vector<D: Dimension>(&self, offset: IVec3, cell_width: Real) -> D::Vector {
        D::vector_from_fn(|axis| (offset[axis] as Real - self.fx[axis]) * cell_width)
    }

    /// Iterator over (node, weight, particle-to-node vector) tuples.
    #[inline]
    pub fn iter_neighbors<D: Dimension>(
        &self,
        cell_width: Real,
    ) -> impl Iterator<Item = (Coord, Real, D::Vector)> + '_ {
        stencil_offsets::<D>().iter().map(move |&offset| {
            (
                self.node(offset),
                self.weight(offset),
                self.offset_vector::<D>(offset, cell_width),
            )
        })
    }
}
