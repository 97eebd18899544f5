pub mod grid;
pub mod kernel;
pub mod mpm_state;
pub mod particle;
pub mod particle_set;

pub use grid::{
    BoundaryHandling, DomainWalls, SurfaceCollider, SurfaceKind, apply_boundary_conditions,
};
pub use kernel::{QuadraticKernel, base_cell, inv_d, stencil_offsets};
pub use mpm_state::{MpmSolver, StepStats};
pub use particle::{DEFAULT_COLOR, Particle, ParticleId, ParticleSnapshot};
pub use particle_set::ParticleSet;
