//! Constitutive pass
//!
//! Runs once per inner step before P2G: applies each material's plastic
//! projection to `F` and turns the resulting Kirchhoff stress into the
//! per-particle affine term P2G scatters:
//!
//! `affine = -dt * V0 * 4/dx^2 * tau + m * C`

use rayon::prelude::*;

use crate::bukkit::MaterialBatches;
use crate::core::Particle;
use crate::materials::{ConstitutiveModel, MaterialTable, MaterialType, StressUpdate};
use crate::math::{Dimension, Real};

pub fn compute_affine_terms<D: Dimension>(
    particles: &mut [Particle<D>],
    affine: &mut [D::Matrix],
    batches: &MaterialBatches,
    table: &MaterialTable,
    dt: Real,
    inv_d: Real,
) {
    for (material, batch) in batches.iter() {
        if batch.is_empty() {
            continue;
        }
        match material {
            MaterialType::Water => run_batch(&table.water, batch, particles, affine, dt, inv_d),
            MaterialType::Elastic => run_batch(&table.elastic, batch, particles, affine, dt, inv_d),
            MaterialType::Snow => run_batch(&table.snow, batch, particles, affine, dt, inv_d),
            MaterialType::Sand => run_batch(&table.sand, batch, particles, affine, dt, inv_d),
        }
    }
}

fn run_batch<D: Dimension, M: ConstitutiveModel>(
    model: &M,
    batch: &[usize],
    particles: &mut [Particle<D>],
    affine: &mut [D::Matrix],
    dt: Real,
    inv_d: Real,
) {
    let updates: Vec<StressUpdate<D>> = {
        let particles = &*particles;
        batch
            .par_iter()
            .map(|&pid| model.compute_stress(&particles[pid].material_state()))
            .collect()
    };

    for (&pid, update) in batch.iter().zip(updates) {
        let particle = &mut particles[pid];
        particle.apply_material_state(update.state);
        affine[pid] = update.kirchhoff * (-dt * particle.volume0 * inv_d)
            + particle.affine_momentum_matrix * particle.mass;
    }
}
