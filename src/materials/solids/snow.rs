//! Snow: fixed-corotated elasticity with singular-value clamping.
//!
//! Stretch beyond the critical band is absorbed into the plastic ratio `Jp`,
//! and compaction hardens the material exponentially.

use crate::config::{
    SNOW_CRITICAL_COMPRESSION, SNOW_CRITICAL_STRETCH, SNOW_HARDENING, SNOW_MAX_HARDENING_FACTOR,
    SNOW_MIN_HARDENING_FACTOR,
};
use crate::materials::model::{ConstitutiveModel, MaterialState, StressUpdate};
use crate::materials::solids::elastic::FixedCorotated;
use crate::math::{Dimension, Real};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowModel {
    pub energy: FixedCorotated,
    pub min_stretch: Real,
    pub max_stretch: Real,
    pub hardening_coeff: Real,
}

impl SnowModel {
    pub fn new(lambda: Real, mu: Real) -> Self {
        Self {
            energy: FixedCorotated::new(lambda, mu),
            min_stretch: 1.0 - SNOW_CRITICAL_COMPRESSION,
            max_stretch: 1.0 + SNOW_CRITICAL_STRETCH,
            hardening_coeff: SNOW_HARDENING,
        }
    }

    #[inline]
    pub fn hardening_factor(&self, plastic_ratio: Real) -> Real {
        (self.hardening_coeff * (1.0 - plastic_ratio))
            .exp()
            .clamp(SNOW_MIN_HARDENING_FACTOR, SNOW_MAX_HARDENING_FACTOR)
    }
}

impl ConstitutiveModel for SnowModel {
    fn is_fluid(&self) -> bool {
        false
    }

    fn compute_stress<D: Dimension>(&self, state: &MaterialState<D>) -> StressUpdate<D> {
        let h = self.hardening_factor(state.plastic_ratio);
        let svd = D::svd(&state.deformation_gradient);

        let clamped =
            D::vector_from_fn(|axis| svd.sigma[axis].clamp(self.min_stretch, self.max_stretch));
        let plastic_ratio = state.plastic_ratio * D::component_product(svd.sigma)
            / D::component_product(clamped);
        let deformation_gradient = svd.recompose_with(clamped);
        let j = D::component_product(clamped);

        let hardened = FixedCorotated::new(self.energy.lambda * h, self.energy.mu * h);
        StressUpdate {
            kirchhoff: hardened.kirchhoff::<D>(&deformation_gradient, &svd.rotation(), j),
            state: MaterialState {
                deformation_gradient,
                plastic_ratio,
                log_volume_gain: state.log_volume_gain,
            },
        }
    }
}
