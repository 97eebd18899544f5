//! Grid-to-Particle (G2P) transfer
//!
//! Pulls post-solve velocities back to particles, rebuilds the APIC affine
//! field, advects, and updates the deformation gradient with
//! `F <- (I + dt C) F`.

use rayon::prelude::*;

use crate::core::{Particle, QuadraticKernel, stencil_offsets};
use crate::geometry::SpGrid;
use crate::math::{Dimension, Real};

pub struct AdvectionParams<D: Dimension> {
    pub dt: Real,
    pub cell_width: Real,
    /// `4 / dx^2`.
    pub inv_d: Real,
    /// Per-axis position bounds in bounded mode.
    pub clamp: Option<(D::Vector, D::Vector)>,
}

/// Weighted velocity and affine field around one particle.
#[inline]
pub fn gather<D: Dimension>(
    grid: &SpGrid<D>,
    kernel: &QuadraticKernel,
    cell_width: Real,
    inv_d: Real,
) -> (D::Vector, D::Matrix) {
    let mut velocity = D::zero_vector();
    let mut affine = D::zero_matrix();
    for &offset in stencil_offsets::<D>() {
        let weight = kernel.weight(offset);
        let node_velocity = grid.read_velocity(kernel.node(offset));
        let dpos = kernel.offset_vector::<D>(offset, cell_width);
        velocity += node_velocity * weight;
        affine += D::outer_product(node_velocity, dpos) * (weight * inv_d);
    }
    (velocity, affine)
}

pub fn grid_to_particle<D: Dimension>(
    grid: &SpGrid<D>,
    particles: &mut [Particle<D>],
    cache: &[QuadraticKernel],
    params: &AdvectionParams<D>,
) {
    particles
        .par_iter_mut()
        .zip(cache.par_iter())
        .for_each(|(particle, kernel)| {
            let (velocity, affine) = gather(grid, kernel, params.cell_width, params.inv_d);
            particle.velocity = velocity;
            particle.affine_momentum_matrix = affine;

            let mut position = particle.position + velocity * params.dt;
            if let Some((lower, upper)) = params.clamp {
                for axis in 0..D::DIM {
                    position[axis] = position[axis].clamp(lower[axis], upper[axis]);
                }
            }
            particle.position = position;

            particle.deformation_gradient =
                (D::identity() + affine * params.dt) * particle.deformation_gradient;
        });
}
