//! Hyperelastic energies with closed-form gradients.
//!
//! Each energy exposes the strain-energy density `psi(F)`, its first
//! Piola-Kirchhoff stress `P = dpsi/dF`, and the Kirchhoff stress
//! `tau = P F^T` the transfer stage consumes.

use crate::materials::model::{ConstitutiveModel, MaterialState, StressUpdate};
use crate::materials::utils::clamped_determinant;
use crate::math::{Dimension, Real};

/// Compressible Neo-Hookean energy
/// `psi = mu/2 (tr(F F^T) - d) - mu ln J + lambda/2 (ln J)^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeoHookean {
    pub lambda: Real,
    pub mu: Real,
}

impl NeoHookean {
    pub fn new(lambda: Real, mu: Real) -> Self {
        Self { lambda, mu }
    }

    pub fn energy_density<D: Dimension>(&self, f: &D::Matrix) -> Real {
        let ln_j = clamped_determinant(D::determinant(f)).ln();
        0.5 * self.mu * (D::norm_squared(f) - D::DIM as Real) - self.mu * ln_j
            + 0.5 * self.lambda * ln_j * ln_j
    }

    /// `P = mu (F - F^-T) + lambda ln J F^-T`. Only meaningful for invertible `F`.
    pub fn first_piola<D: Dimension>(&self, f: &D::Matrix) -> D::Matrix {
        let ln_j = clamped_determinant(D::determinant(f)).ln();
        let f_inv_t = D::transpose(&D::inverse(f));
        (*f - f_inv_t) * self.mu + f_inv_t * (self.lambda * ln_j)
    }

    /// `tau = mu (F F^T - I) + lambda ln J I`, with `J` floored.
    pub fn kirchhoff<D: Dimension>(&self, f: &D::Matrix) -> D::Matrix {
        let ln_j = clamped_determinant(D::determinant(f)).ln();
        (*f * D::transpose(f) - D::identity()) * self.mu + D::identity() * (self.lambda * ln_j)
    }
}

/// Fixed-corotated energy
/// `psi = mu |F - R|^2 + lambda/2 (J - 1)^2` with `R` the polar rotation of `F`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCorotated {
    pub lambda: Real,
    pub mu: Real,
}

impl FixedCorotated {
    pub fn new(lambda: Real, mu: Real) -> Self {
        Self { lambda, mu }
    }

    pub fn energy_density<D: Dimension>(&self, f: &D::Matrix) -> Real {
        let svd = D::svd(f);
        let stretch = svd.sigma - D::splat(1.0);
        let j = D::component_product(svd.sigma);
        self.mu * D::dot(stretch, stretch) + 0.5 * self.lambda * (j - 1.0) * (j - 1.0)
    }

    /// `P = 2 mu (F - R) + lambda (J - 1) J F^-T`. Only meaningful for invertible `F`.
    pub fn first_piola<D: Dimension>(&self, f: &D::Matrix) -> D::Matrix {
        let rotation = D::svd(f).rotation();
        let j = D::determinant(f);
        let f_inv_t = D::transpose(&D::inverse(f));
        (*f - rotation) * (2.0 * self.mu) + f_inv_t * (self.lambda * (j - 1.0) * j)
    }

    /// `tau = 2 mu (F - R) F^T + lambda J (J - 1) I`.
    pub fn kirchhoff<D: Dimension>(&self, f: &D::Matrix, rotation: &D::Matrix, j: Real) -> D::Matrix {
        (*f - *rotation) * D::transpose(f) * (2.0 * self.mu)
            + D::identity() * (self.lambda * j * (j - 1.0))
    }
}

/// Purely elastic ("jelly") material: Neo-Hookean, no plastic correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticModel {
    pub energy: NeoHookean,
}

impl ElasticModel {
    pub fn new(lambda: Real, mu: Real) -> Self {
        Self {
            energy: NeoHookean::new(lambda, mu),
        }
    }
}

impl ConstitutiveModel for ElasticModel {
    fn is_fluid(&self) -> bool {
        false
    }

    fn compute_stress<D: Dimension>(&self, state: &MaterialState<D>) -> StressUpdate<D> {
        StressUpdate {
            kirchhoff: self.energy.kirchhoff::<D>(&state.deformation_gradient),
            state: *state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Dim2, Dim3};
    use bevy::math::{Mat2, Mat3, Vec2, Vec3};

    fn finite_difference_2d(energy: impl Fn(&Mat2) -> Real, f: Mat2) -> Mat2 {
        let h = 1e-2;
        let mut cols = f.to_cols_array();
        let mut grad = [0.0; 4];
        for i in 0..4 {
            let original = cols[i];
            cols[i] = original + h;
            let plus = energy(&Mat2::from_cols_array(&cols));
            cols[i] = original - h;
            let minus = energy(&Mat2::from_cols_array(&cols));
            cols[i] = original;
            grad[i] = (plus - minus) / (2.0 * h);
        }
        Mat2::from_cols_array(&grad)
    }

    fn assert_close(a: Mat2, b: Mat2, tolerance: Real) {
        for (x, y) in a.to_cols_array().iter().zip(b.to_cols_array().iter()) {
            assert!((x - y).abs() < tolerance, "{a:?} != {b:?}");
        }
    }

    fn sheared() -> Mat2 {
        Mat2::from_cols(Vec2::new(1.1, 0.05), Vec2::new(0.2, 0.95))
    }

    #[test]
    fn neo_hookean_rest_state_is_stress_free() {
        let model = NeoHookean::new(3.0, 2.0);
        assert!(model.energy_density::<Dim3>(&Mat3::IDENTITY).abs() < 1e-6);
        let tau = model.kirchhoff::<Dim3>(&Mat3::IDENTITY);
        assert!(Dim3::norm_squared(&tau) < 1e-10);
    }

    #[test]
    fn neo_hookean_piola_matches_energy_gradient() {
        let model = NeoHookean::new(1.5, 1.0);
        let f = sheared();
        let numeric = finite_difference_2d(|m| model.energy_density::<Dim2>(m), f);
        assert_close(model.first_piola::<Dim2>(&f), numeric, 1e-2);
    }

    #[test]
    fn neo_hookean_kirchhoff_is_piola_times_ft() {
        let model = NeoHookean::new(1.5, 1.0);
        let f = sheared();
        let tau = model.first_piola::<Dim2>(&f) * f.transpose();
        assert_close(model.kirchhoff::<Dim2>(&f), tau, 1e-4);
    }

    #[test]
    fn fixed_corotated_piola_matches_energy_gradient() {
        let model = FixedCorotated::new(1.5, 1.0);
        let f = sheared();
        let numeric = finite_difference_2d(|m| model.energy_density::<Dim2>(m), f);
        assert_close(model.first_piola::<Dim2>(&f), numeric, 1e-2);

        let svd = Dim2::svd(&f);
        let j = Dim2::determinant(&f);
        let tau = model.first_piola::<Dim2>(&f) * f.transpose();
        assert_close(model.kirchhoff::<Dim2>(&f, &svd.rotation(), j), tau, 1e-4);
    }

    #[test]
    fn collapsed_volume_stays_finite() {
        let model = NeoHookean::new(1.0, 1.0);
        let crushed = Mat3::from_diagonal(Vec3::new(1.0, 1.0, 0.0));
        let tau = model.kirchhoff::<Dim3>(&crushed);
        assert!(tau.is_finite());
        assert!(model.energy_density::<Dim3>(&crushed).is_finite());
    }

    #[test]
    fn elastic_model_keeps_deformation() {
        let model = ElasticModel::new(1.0, 1.0);
        let mut state = MaterialState::<Dim2>::rest();
        state.deformation_gradient = sheared();
        let update = model.compute_stress(&state);
        assert_eq!(update.state.deformation_gradient, sheared());
        assert_eq!(update.state.plastic_ratio, 1.0);
    }
}
