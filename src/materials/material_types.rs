//! Material tags and the per-solver table of constitutive models.

use crate::config::ELASTIC_SOFTENING;
use crate::error::MpmError;
use crate::materials::families::ElasticParams;
use crate::materials::fluids::water::WaterModel;
use crate::materials::granular::sand::SandModel;
use crate::materials::model::{ConstitutiveModel, MaterialState, StressUpdate};
use crate::materials::solids::elastic::ElasticModel;
use crate::materials::solids::snow::SnowModel;
use crate::math::Dimension;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MaterialType {
    Water = 0,
    Elastic = 1,
    Snow = 2,
    Sand = 3,
}

impl MaterialType {
    pub const COUNT: usize = 4;
    pub const ALL: [MaterialType; Self::COUNT] =
        [Self::Water, Self::Elastic, Self::Snow, Self::Sand];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_fluid(self) -> bool {
        matches!(self, Self::Water)
    }

    pub fn material_name(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Elastic => "elastic",
            Self::Snow => "snow",
            Self::Sand => "sand",
        }
    }
}

impl TryFrom<u32> for MaterialType {
    type Error = MpmError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| MpmError::Configuration(format!("unknown material tag {tag}")))
    }
}

/// One constitutive model per material tag, built once from the solver
/// configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialTable {
    pub water: WaterModel,
    pub elastic: ElasticModel,
    pub snow: SnowModel,
    pub sand: SandModel,
}

impl MaterialTable {
    pub fn new(params: ElasticParams) -> Self {
        let (lambda, mu) = params.lame();
        let (soft_lambda, soft_mu) = params.scaled(ELASTIC_SOFTENING).lame();
        Self {
            water: WaterModel::new(lambda),
            elastic: ElasticModel::new(soft_lambda, soft_mu),
            snow: SnowModel::new(lambda, mu),
            sand: SandModel::new(lambda, mu),
        }
    }

    pub fn is_fluid(&self, material: MaterialType) -> bool {
        match material {
            MaterialType::Water => self.water.is_fluid(),
            MaterialType::Elastic => self.elastic.is_fluid(),
            MaterialType::Snow => self.snow.is_fluid(),
            MaterialType::Sand => self.sand.is_fluid(),
        }
    }

    /// Single-particle dispatch. Hot loops go through
    /// [`crate::solver::constitutive`], which dispatches once per batch.
    pub fn compute_stress<D: Dimension>(
        &self,
        material: MaterialType,
        state: &MaterialState<D>,
    ) -> StressUpdate<D> {
        match material {
            MaterialType::Water => self.water.compute_stress(state),
            MaterialType::Elastic => self.elastic.compute_stress(state),
            MaterialType::Snow => self.snow.compute_stress(state),
            MaterialType::Sand => self.sand.compute_stress(state),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_ids() {
        for material in MaterialType::ALL {
            assert_eq!(MaterialType::try_from(material as u32), Ok(material));
        }
        assert!(MaterialType::try_from(7).is_err());
    }

    #[test]
    fn elastic_is_softer_than_snow() {
        let table = MaterialTable::new(ElasticParams::default());
        assert!(table.elastic.energy.mu < table.snow.energy.mu);
        assert!(table.is_fluid(MaterialType::Water));
        assert!(!table.is_fluid(MaterialType::Sand));
    }
}
