//! Per-step particle bucketing.
//!
//! Every inner step the grid is rebuilt from current particle positions:
//! leaves touched by a particle's support are activated and the particle id
//! is appended to the list of the leaf holding its base cell. Particles are
//! also batched by material so the constitutive pass dispatches once per
//! material instead of once per particle.

use std::time::Instant;

use bevy::log::trace;

use crate::core::kernel::QuadraticKernel;
use crate::core::particle::Particle;
use crate::error::Result;
use crate::geometry::SpGrid;
use crate::materials::MaterialType;
use crate::math::Dimension;

/// Particle ids grouped by material tag, in ascending id order.
#[derive(Clone, Debug, Default)]
pub struct MaterialBatches {
    batches: [Vec<usize>; MaterialType::COUNT],
}

impl MaterialBatches {
    pub fn batch(&self, material: MaterialType) -> &[usize] {
        &self.batches[material.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialType, &[usize])> {
        MaterialType::ALL
            .into_iter()
            .map(|material| (material, self.batch(material)))
    }

    pub fn len(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        for batch in &mut self.batches {
            batch.clear();
        }
    }
}

/// Core data structure for the bucketing pass; buffers are reused between
/// steps.
#[derive(Default)]
pub struct BukkitSystem {
    batches: MaterialBatches,
}

impl BukkitSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &MaterialBatches {
        &self.batches
    }

    /// Activate the grid around every particle and fill the per-leaf lists.
    ///
    /// `grid` must have been deactivated since the last rebuild. Fails if a
    /// support leaves the virtual index space.
    pub fn rebuild<D: Dimension>(
        &mut self,
        grid: &mut SpGrid<D>,
        particles: &[Particle<D>],
        cache: &[QuadraticKernel],
    ) -> Result<()> {
        let start = Instant::now();
        for (pid, kernel) in cache.iter().enumerate() {
            let leaf = grid.activate_support(kernel.base)?;
            grid.push_particle(leaf, pid);
        }
        trace!(
            "bukkit_insert: {:.3}ms ({} leaves)",
            start.elapsed().as_secs_f32() * 1000.0,
            grid.active_block_count()
        );

        let start = Instant::now();
        self.batches.clear();
        for (pid, particle) in particles.iter().enumerate() {
            self.batches.batches[particle.material_type.index()].push(pid);
        }
        trace!(
            "bukkit_batch: {:.3}ms",
            start.elapsed().as_secs_f32() * 1000.0
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::leaf_of;
    use crate::math::Dim2;
    use bevy::math::{IVec3, Vec2};

    #[test]
    fn particles_land_in_base_leaf_and_batches() {
        let inv_dx = 64.0;
        let particles = vec![
            Particle::<Dim2>::new(Vec2::new(0.5, 0.5), MaterialType::Sand, 1.0, 1.0),
            Particle::<Dim2>::new(Vec2::new(0.505, 0.5), MaterialType::Water, 1.0, 1.0),
            Particle::<Dim2>::new(Vec2::new(0.1, 0.9), MaterialType::Sand, 1.0, 1.0),
        ];
        let cache: Vec<_> = particles
            .iter()
            .map(|p| QuadraticKernel::new::<Dim2>(p.position, inv_dx))
            .collect();

        let mut grid = SpGrid::<Dim2>::new();
        let mut bukkits = BukkitSystem::new();
        bukkits.rebuild(&mut grid, &particles, &cache).unwrap();

        let leaf = leaf_of::<Dim2>(cache[0].base).unwrap();
        assert_eq!(grid.bucket(leaf), &[0, 1]);
        assert_eq!(bukkits.batches().batch(MaterialType::Sand), &[0, 2]);
        assert_eq!(bukkits.batches().batch(MaterialType::Water), &[1]);
        assert!(bukkits.batches().batch(MaterialType::Snow).is_empty());
        assert_eq!(bukkits.batches().len(), 3);
        assert!(grid.active_block_count() >= 2);
        assert_eq!(cache[0].base, IVec3::new(31, 31, 0));
    }
}
