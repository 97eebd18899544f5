//! Shared parameter packs for material families.

use crate::config;
use crate::materials::utils::physics;
use crate::math::Real;

/// Isotropic linear-elastic moduli a constitutive model is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticParams {
    pub youngs_modulus: Real,
    pub poisson_ratio: Real,
}

impl ElasticParams {
    pub const fn new(youngs_modulus: Real, poisson_ratio: Real) -> Self {
        Self {
            youngs_modulus,
            poisson_ratio,
        }
    }

    /// (lambda, mu)
    pub fn lame(&self) -> (Real, Real) {
        physics::lame_lambda_mu(self.youngs_modulus, self.poisson_ratio)
    }

    /// Same Poisson ratio, Young's modulus multiplied by `factor`.
    pub fn scaled(&self, factor: Real) -> Self {
        Self::new(self.youngs_modulus * factor, self.poisson_ratio)
    }
}

impl Default for ElasticParams {
    fn default() -> Self {
        Self::new(config::YOUNGS_MODULUS, config::POISSON_RATIO)
    }
}
