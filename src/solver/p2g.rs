//! Particle-to-Grid (P2G) transfer
//!
//! Gather formulation: every active leaf pulls contributions from particles
//! bucketed in itself and its lower neighbours (a support is 3 cells wide, a
//! leaf 16), so each node is written by exactly one task. No atomics, and the
//! accumulation order is fixed by bucket order, which keeps results
//! bit-identical between runs.

use crate::core::{Particle, QuadraticKernel, stencil_offsets};
use crate::geometry::{SpGrid, gather_offsets};
use crate::math::{Dimension, Real};

pub fn particle_to_grid<D: Dimension>(
    grid: &mut SpGrid<D>,
    particles: &[Particle<D>],
    cache: &[QuadraticKernel],
    affine: &[D::Matrix],
    cell_width: Real,
) {
    grid.par_gather(|leaf, buckets| {
        for &neighbor in gather_offsets::<D>() {
            for &pid in buckets.bucket(leaf.coord + neighbor) {
                let particle = &particles[pid];
                let kernel = &cache[pid];
                let momentum = particle.velocity * particle.mass;

                for &offset in stencil_offsets::<D>() {
                    let Some(local) = leaf.local_index(kernel.node(offset)) else {
                        continue;
                    };
                    let weight = kernel.weight(offset);
                    let dpos = kernel.offset_vector::<D>(offset, cell_width);
                    let node = &mut leaf.nodes[local];
                    node.mass += weight * particle.mass;
                    node.velocity += (momentum + affine[pid] * dpos) * weight;
                }
            }
        }
    });
}

/// Serial scatter through the grid's accumulate API. Same result as
/// [`particle_to_grid`] up to summation order.
pub fn particle_to_grid_serial<D: Dimension>(
    grid: &mut SpGrid<D>,
    particles: &[Particle<D>],
    cache: &[QuadraticKernel],
    affine: &[D::Matrix],
    cell_width: Real,
) -> crate::error::Result<()> {
    for ((particle, kernel), affine) in particles.iter().zip(cache).zip(affine) {
        let momentum = particle.velocity * particle.mass;
        for (cell, weight, dpos) in kernel.iter_neighbors::<D>(cell_width) {
            grid.accumulate_mass(cell, weight * particle.mass)?;
            grid.accumulate_momentum(cell, (momentum + *affine * dpos) * weight)?;
        }
    }
    Ok(())
}
