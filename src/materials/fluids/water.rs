//! Water fluid material
//!
//! Nearly incompressible: pressure-only response, no shear memory.

use crate::materials::model::{ConstitutiveModel, MaterialState, StressUpdate};
use crate::materials::utils::clamped_determinant;
use crate::math::{Dimension, Real};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterModel {
    /// Bulk stiffness (first Lamé parameter).
    pub lambda: Real,
}

impl WaterModel {
    pub fn new(lambda: Real) -> Self {
        Self { lambda }
    }

    /// Pressure for volume ratio `j` (positive under compression).
    #[inline]
    pub fn pressure(&self, j: Real) -> Real {
        let j = clamped_determinant(j);
        -self.lambda * (j - 1.0)
    }
}

impl ConstitutiveModel for WaterModel {
    fn is_fluid(&self) -> bool {
        true
    }

    fn compute_stress<D: Dimension>(&self, state: &MaterialState<D>) -> StressUpdate<D> {
        let j = clamped_determinant(D::determinant(&state.deformation_gradient));
        // Shear is forgotten: F collapses to its isotropic volumetric part.
        let deformation_gradient = D::identity() * j.powf(1.0 / D::DIM as Real);
        StressUpdate {
            kirchhoff: D::identity() * (-self.pressure(j) * j),
            state: MaterialState {
                deformation_gradient,
                plastic_ratio: state.plastic_ratio,
                log_volume_gain: state.log_volume_gain,
            },
        }
    }
}
