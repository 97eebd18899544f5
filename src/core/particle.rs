//! Material particles for MPM simulation
//!
//! Particles carry position, velocity, mass and the deformation state every
//! constitutive model reads.

use crate::materials::{MaterialState, MaterialType};
use crate::math::{Dimension, Real};

/// Default color tag, opaque to the solver.
pub const DEFAULT_COLOR: u32 = 0xFF_FF_FF;

/// Index of a particle in the store.
///
/// Ids are positions, so removals (escaping particles in unbounded mode)
/// shift the ids of later particles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct Particle<D: Dimension> {
    pub position: D::Vector,
    pub velocity: D::Vector,
    pub mass: Real,
    pub volume0: Real,
    pub affine_momentum_matrix: D::Matrix, // APIC affine velocity field (C matrix)
    pub deformation_gradient: D::Matrix,
    pub plastic_deformation_gradient_det: Real,
    pub log_volume_gain: Real,
    pub material_type: MaterialType,
    pub color: u32,
}

impl<D: Dimension> Particle<D> {
    pub fn new(position: D::Vector, material_type: MaterialType, mass: Real, volume0: Real) -> Self {
        Self {
            position,
            velocity: D::zero_vector(),
            mass,
            volume0,
            affine_momentum_matrix: D::zero_matrix(),
            deformation_gradient: D::identity(),
            plastic_deformation_gradient_det: 1.0,
            log_volume_gain: 0.0,
            material_type,
            color: DEFAULT_COLOR,
        }
    }

    pub fn with_velocity(mut self, velocity: D::Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    #[inline(always)]
    pub fn jacobian(&self) -> Real {
        D::determinant(&self.deformation_gradient)
    }

    #[inline(always)]
    pub fn material_state(&self) -> MaterialState<D> {
        MaterialState {
            deformation_gradient: self.deformation_gradient,
            plastic_ratio: self.plastic_deformation_gradient_det,
            log_volume_gain: self.log_volume_gain,
        }
    }

    #[inline(always)]
    pub fn apply_material_state(&mut self, state: MaterialState<D>) {
        self.deformation_gradient = state.deformation_gradient;
        self.plastic_deformation_gradient_det = state.plastic_ratio;
        self.log_volume_gain = state.log_volume_gain;
    }

    /// True when every kinematic and deformation quantity is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        D::vector_is_finite(self.position)
            && D::vector_is_finite(self.velocity)
            && D::matrix_is_finite(&self.affine_momentum_matrix)
            && D::matrix_is_finite(&self.deformation_gradient)
            && self.plastic_deformation_gradient_det.is_finite()
    }

    pub fn snapshot(&self) -> ParticleSnapshot<D> {
        ParticleSnapshot {
            position: self.position,
            velocity: self.velocity,
            material: self.material_type,
            color: self.color,
        }
    }
}

/// Read-only view handed to renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSnapshot<D: Dimension> {
    pub position: D::Vector,
    pub velocity: D::Vector,
    pub material: MaterialType,
    pub color: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dim2;
    use bevy::math::{Mat2, Vec2};

    #[test]
    fn new_particle_is_at_rest() {
        let particle = Particle::<Dim2>::new(Vec2::new(0.5, 0.5), MaterialType::Snow, 1.0, 1.0);
        assert_eq!(particle.deformation_gradient, Mat2::IDENTITY);
        assert_eq!(particle.plastic_deformation_gradient_det, 1.0);
        assert_eq!(particle.jacobian(), 1.0);
        assert!(particle.is_finite());
    }

    #[test]
    fn non_finite_deformation_is_detected() {
        let mut particle = Particle::<Dim2>::new(Vec2::ZERO, MaterialType::Water, 1.0, 1.0);
        particle.deformation_gradient.x_axis.x = Real::NAN;
        assert!(!particle.is_finite());
    }
}
