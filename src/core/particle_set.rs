use std::ops::Range;

use rayon::prelude::*;

use crate::core::kernel::QuadraticKernel;
use crate::core::particle::{Particle, ParticleId};
use crate::error::{MpmError, Result};
use crate::math::{Dimension, Real};

/// Flat particle store with a hard capacity.
///
/// Alongside the records it keeps per-step scratch parallel to them: the
/// kernel cache and the P2G affine term produced by the constitutive pass.
pub struct ParticleSet<D: Dimension> {
    particles: Vec<Particle<D>>,
    transfer_cache: Vec<QuadraticKernel>,
    affine_terms: Vec<D::Matrix>,
    max_particles: usize,
    checkpoint: Vec<Particle<D>>,
}

impl<D: Dimension> ParticleSet<D> {
    pub fn new(max_particles: usize) -> Self {
        Self {
            particles: Vec::new(),
            transfer_cache: Vec::new(),
            affine_terms: Vec::new(),
            max_particles,
            checkpoint: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn max_particles(&self) -> usize {
        self.max_particles
    }

    pub fn remaining_capacity(&self) -> usize {
        self.max_particles.saturating_sub(self.particles.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle<D>> {
        self.particles.iter()
    }

    pub fn for_each<F: FnMut(ParticleId, &Particle<D>)>(&self, mut f: F) {
        for (idx, particle) in self.particles.iter().enumerate() {
            f(ParticleId(idx), particle);
        }
    }

    pub fn push(&mut self, particle: Particle<D>) -> Result<ParticleId> {
        if self.particles.len() >= self.max_particles {
            return Err(MpmError::Capacity {
                max_particles: self.max_particles,
            });
        }
        let index = self.particles.len();
        self.particles.push(particle);
        Ok(ParticleId(index))
    }

    /// Appends the whole batch or nothing.
    pub fn push_batch(&mut self, batch: Vec<Particle<D>>) -> Result<Range<usize>> {
        if batch.len() > self.remaining_capacity() {
            return Err(MpmError::Capacity {
                max_particles: self.max_particles,
            });
        }
        let start = self.particles.len();
        self.particles.extend(batch);
        Ok(start..self.particles.len())
    }

    pub fn particles(&self) -> &[Particle<D>] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle<D>] {
        &mut self.particles
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle<D>> {
        self.particles.get(id.0)
    }

    pub fn get_mut(&mut self, id: ParticleId) -> Option<&mut Particle<D>> {
        self.particles.get_mut(id.0)
    }

    /// Keeps particles matching `keep`; returns how many were dropped.
    pub fn retain<F: FnMut(&Particle<D>) -> bool>(&mut self, keep: F) -> usize {
        let before = self.particles.len();
        self.particles.retain(keep);
        before - self.particles.len()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.transfer_cache.clear();
        self.affine_terms.clear();
    }

    /// Recompute kernel weights for the current positions and size the
    /// affine scratch to match.
    pub fn rebuild_transfer_cache(&mut self, inv_dx: Real) {
        self.particles
            .par_iter()
            .map(|particle| QuadraticKernel::new::<D>(particle.position, inv_dx))
            .collect_into_vec(&mut self.transfer_cache);
        self.affine_terms
            .resize(self.particles.len(), D::zero_matrix());
    }

    pub fn transfer_cache(&self) -> &[QuadraticKernel] {
        &self.transfer_cache
    }

    pub fn affine_terms(&self) -> &[D::Matrix] {
        &self.affine_terms
    }

    pub fn particles_and_cache(&self) -> (&[Particle<D>], &[QuadraticKernel]) {
        (&self.particles, &self.transfer_cache)
    }

    pub fn particles_mut_and_cache(&mut self) -> (&mut [Particle<D>], &[QuadraticKernel]) {
        (&mut self.particles, &self.transfer_cache)
    }

    pub fn particles_mut_and_affine(&mut self) -> (&mut [Particle<D>], &mut [D::Matrix]) {
        (&mut self.particles, &mut self.affine_terms)
    }

    /// Copy the records aside; the buffer is reused between frames.
    pub fn save_checkpoint(&mut self) {
        self.checkpoint.clone_from(&self.particles);
    }

    /// Return to the last checkpoint. Scratch is invalidated.
    pub fn restore_checkpoint(&mut self) {
        std::mem::swap(&mut self.particles, &mut self.checkpoint);
        self.checkpoint.clear();
        self.transfer_cache.clear();
        self.affine_terms.clear();
    }

    /// Index of the first particle holding a non-finite value.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.particles
            .par_iter()
            .position_first(|particle| !particle.is_finite())
    }
}
