//! Materials for MPM simulation
//!
//! Four families behind one [`ConstitutiveModel`] capability:
//!
//! * `fluids` - water (pressure only)
//! * `solids` - Neo-Hookean jelly and plastic snow
//! * `granular` - Drucker-Prager sand

pub mod families;
pub mod fluids;
pub mod granular;
pub mod material_types;
pub mod model;
pub mod solids;
pub mod utils;

pub use families::ElasticParams;
pub use material_types::{MaterialTable, MaterialType};
pub use model::{ConstitutiveModel, MaterialState, StressUpdate};

pub use utils::physics;
