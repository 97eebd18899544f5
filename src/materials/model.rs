//! The shared stress-computation capability every material implements.

use crate::math::{Dimension, Real};

/// Deformation state a constitutive model reads and rewrites.
#[derive(Debug)]
pub struct MaterialState<D: Dimension> {
    pub deformation_gradient: D::Matrix,
    /// Plastic volume ratio `Jp`.
    pub plastic_ratio: Real,
    /// Accumulated log-volume correction of granular return mapping.
    pub log_volume_gain: Real,
}

impl<D: Dimension> Clone for MaterialState<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for MaterialState<D> {}

impl<D: Dimension> MaterialState<D> {
    pub fn rest() -> Self {
        Self {
            deformation_gradient: D::identity(),
            plastic_ratio: 1.0,
            log_volume_gain: 0.0,
        }
    }
}

/// Result of one constitutive evaluation: the Kirchhoff stress used by P2G
/// and the plastically corrected state carried into the next step.
#[derive(Debug)]
pub struct StressUpdate<D: Dimension> {
    pub kirchhoff: D::Matrix,
    pub state: MaterialState<D>,
}

impl<D: Dimension> Clone for StressUpdate<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for StressUpdate<D> {}

pub trait ConstitutiveModel: Send + Sync {
    fn is_fluid(&self) -> bool;

    /// `compute_stress(F, Jp, params) -> (stress, updated F, updated Jp)`.
    fn compute_stress<D: Dimension>(&self, state: &MaterialState<D>) -> StressUpdate<D>;
}
