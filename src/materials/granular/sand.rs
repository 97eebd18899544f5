//! Sand/granular material
//!
//! Drucker-Prager plasticity: a return mapping in log-strain space projects the
//! singular values of `F` back onto the friction cone, then a Hencky-style
//! elastic response produces the stress.

use crate::config::SAND_FRICTION_ANGLE;
use crate::materials::model::{ConstitutiveModel, MaterialState, StressUpdate};
use crate::materials::utils::{clamped_determinant, safe_ln};
use crate::math::{Dimension, Real};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandModel {
    pub lambda: Real,
    pub mu: Real,
    /// Friction cone coefficient derived from the friction angle.
    pub alpha: Real,
}

impl SandModel {
    pub fn new(lambda: Real, mu: Real) -> Self {
        Self::with_friction_angle(lambda, mu, SAND_FRICTION_ANGLE)
    }

    pub fn with_friction_angle(lambda: Real, mu: Real, degrees: Real) -> Self {
        let sin_phi = degrees.to_radians().sin();
        let alpha = (2.0 as Real / 3.0).sqrt() * 2.0 * sin_phi / (3.0 - sin_phi);
        Self { lambda, mu, alpha }
    }

    /// Project singular values onto the yield surface.
    ///
    /// Returns the projected singular values and the new log-volume gain.
    pub fn project<D: Dimension>(&self, sigma: D::Vector, log_volume_gain: Real) -> (D::Vector, Real) {
        let dim = D::DIM as Real;
        let epsilon = D::vector_from_fn(|axis| safe_ln(sigma[axis]));
        let trace = D::component_sum(epsilon) + log_volume_gain;
        let epsilon_hat = epsilon - D::splat(trace / dim);
        let epsilon_hat_norm = D::length(epsilon_hat) + 1e-20;

        if trace >= 0.0 {
            // Separation: the grains lose contact and the elastic strain resets.
            return (D::splat(1.0), trace);
        }

        let delta_gamma = epsilon_hat_norm
            + (dim * self.lambda + 2.0 * self.mu) / (2.0 * self.mu) * trace * self.alpha;
        if delta_gamma <= 0.0 {
            // Inside the cone.
            return (
                D::vector_from_fn(|axis| epsilon[axis].exp()),
                0.0,
            );
        }
        let scale = delta_gamma / epsilon_hat_norm;
        (
            D::vector_from_fn(|axis| (epsilon[axis] - scale * epsilon_hat[axis]).exp()),
            0.0,
        )
    }
}

impl ConstitutiveModel for SandModel {
    fn is_fluid(&self) -> bool {
        false
    }

    fn compute_stress<D: Dimension>(&self, state: &MaterialState<D>) -> StressUpdate<D> {
        let svd = D::svd(&state.deformation_gradient);
        let (projected, log_volume_gain) = self.project::<D>(svd.sigma, state.log_volume_gain);
        let deformation_gradient = svd.recompose_with(projected);

        let plastic_ratio = state.plastic_ratio
            * clamped_determinant(D::component_product(svd.sigma))
            / D::component_product(projected);

        let log_sigma = D::vector_from_fn(|axis| projected[axis].ln());
        let log_sum = D::component_sum(log_sigma);
        let center = D::vector_from_fn(|axis| {
            (2.0 * self.mu * log_sigma[axis] + self.lambda * log_sum) / projected[axis]
        });
        let kirchhoff = svd.u
            * D::from_diagonal(center)
            * D::transpose(&svd.v)
            * D::transpose(&deformation_gradient);

        StressUpdate {
            kirchhoff,
            state: MaterialState {
                deformation_gradient,
                plastic_ratio,
                log_volume_gain,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dim2;
    use bevy::math::{Mat2, Vec2};

    fn model() -> SandModel {
        SandModel::new(1.0e3, 1.0e3)
    }

    #[test]
    fn rest_state_is_stress_free() {
        let update = model().compute_stress(&MaterialState::<Dim2>::rest());
        assert!(Dim2::norm_squared(&update.kirchhoff) < 1e-8);
        assert_eq!(update.state.log_volume_gain, 0.0);
    }

    #[test]
    fn expansion_separates_grains() {
        let mut state = MaterialState::<Dim2>::rest();
        state.deformation_gradient = Mat2::from_diagonal(Vec2::new(1.1, 1.1));
        let update = model().compute_stress(&state);
        // No tensile strength: deformation resets and the volume gain is kept.
        let diff = update.state.deformation_gradient - Mat2::IDENTITY;
        assert!(Dim2::norm_squared(&diff) < 1e-10);
        assert!(update.state.log_volume_gain > 0.0);
    }

    #[test]
    fn pure_compression_stays_elastic() {
        let mut state = MaterialState::<Dim2>::rest();
        state.deformation_gradient = Mat2::from_diagonal(Vec2::new(0.95, 0.95));
        let update = model().compute_stress(&state);
        let diff = update.state.deformation_gradient - state.deformation_gradient;
        assert!(Dim2::norm_squared(&diff) < 1e-8);
        // Compression pushes back: negative (compressive) Kirchhoff trace.
        assert!(Dim2::trace(&update.kirchhoff) < 0.0);
    }

    #[test]
    fn shear_beyond_cone_is_projected() {
        let mut state = MaterialState::<Dim2>::rest();
        state.deformation_gradient = Mat2::from_diagonal(Vec2::new(1.3, 0.7));
        let update = model().compute_stress(&state);
        let before = Dim2::svd(&state.deformation_gradient).sigma;
        let after = Dim2::svd(&update.state.deformation_gradient).sigma;
        let spread = |s: Vec2| (s.x.ln() - s.y.ln()).abs();
        assert!(spread(after) < spread(before));
    }
}
