//! Per-step solver stages, in pipeline order:
//! constitutive pass, P2G, grid update, G2P.

pub mod constitutive;
pub mod g2p;
pub mod grid_update;
pub mod p2g;

pub use constitutive::compute_affine_terms;
pub use g2p::{AdvectionParams, gather, grid_to_particle};
pub use grid_update::{GridUpdateParams, update_grid_velocities};
pub use p2g::{particle_to_grid, particle_to_grid_serial};
