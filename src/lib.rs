//! Hybrid particle/grid Material Point Method engine.
//!
//! Particles carry all persistent state; a two-level sparse grid is rebuilt
//! around them every inner step for the APIC transfers.

pub mod bukkit;
pub mod config;
pub mod core;
pub mod error;
pub mod geometry;
pub mod materials;
pub mod math;
pub mod plugin;
pub mod sampling;
pub mod simulation;
pub mod solver;

// Public re-exports for clean API
pub use config::SolverConfig;
pub use crate::core::{
    BoundaryHandling, MpmSolver, Particle, ParticleId, ParticleSnapshot, StepStats, SurfaceKind,
};
pub use error::{MpmError, Result};
pub use materials::MaterialType;
pub use math::{Dim2, Dim3, Dimension, Real};
pub use plugin::{FrameSettings, MpmPlugin, SimulationStatus};
pub use sampling::ParticleSource;
pub use simulation::{Simulation, SnapshotEntry, create_solver};
