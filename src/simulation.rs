//! Dimension-erased front end.
//!
//! `create_solver` picks 2D or 3D from the length of the configured
//! resolution; vectors cross this boundary as slices of length `dim`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::SolverConfig;
use crate::core::{MpmSolver, ParticleId, ParticleSnapshot, StepStats, SurfaceKind};
use crate::error::{MpmError, Result};
use crate::materials::MaterialType;
use crate::math::{Dim2, Dim3, Dimension, Real, to_padded};

pub enum Simulation {
    Planar(MpmSolver<Dim2>),
    Volumetric(MpmSolver<Dim3>),
}

/// One rendered particle; unused trailing components are zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotEntry {
    pub position: [Real; 3],
    pub velocity: [Real; 3],
    pub material: MaterialType,
    pub color: u32,
}

impl<D: Dimension> From<ParticleSnapshot<D>> for SnapshotEntry {
    fn from(snapshot: ParticleSnapshot<D>) -> Self {
        Self {
            position: to_padded::<D>(snapshot.position),
            velocity: to_padded::<D>(snapshot.velocity),
            material: snapshot.material,
            color: snapshot.color,
        }
    }
}

pub fn create_solver(config: SolverConfig) -> Result<Simulation> {
    match config.dim() {
        2 => MpmSolver::new(config).map(Simulation::Planar),
        3 => MpmSolver::new(config).map(Simulation::Volumetric),
        dim => Err(MpmError::Configuration(format!(
            "MPM solver supports only 2D and 3D simulations, got {dim} axes"
        ))),
    }
}

fn vector<D: Dimension>(values: &[Real], name: &str) -> Result<D::Vector> {
    D::vector_from_slice(values).ok_or_else(|| {
        MpmError::Configuration(format!(
            "{name} has {} components, expected {}",
            values.len(),
            D::DIM
        ))
    })
}

macro_rules! dispatch {
    ($self:expr, $solver:ident => $body:expr) => {
        match $self {
            Simulation::Planar($solver) => $body,
            Simulation::Volumetric($solver) => $body,
        }
    };
}

impl Simulation {
    pub fn dim(&self) -> usize {
        match self {
            Simulation::Planar(_) => 2,
            Simulation::Volumetric(_) => 3,
        }
    }

    pub fn config(&self) -> &SolverConfig {
        dispatch!(self, solver => solver.config())
    }

    pub fn particle_count(&self) -> usize {
        dispatch!(self, solver => solver.particle_count())
    }

    pub fn add_particle(
        &mut self,
        position: &[Real],
        velocity: &[Real],
        material: MaterialType,
    ) -> Result<ParticleId> {
        match self {
            Simulation::Planar(solver) => solver.add_particle(
                vector::<Dim2>(position, "position")?,
                vector::<Dim2>(velocity, "velocity")?,
                material,
            ),
            Simulation::Volumetric(solver) => solver.add_particle(
                vector::<Dim3>(position, "position")?,
                vector::<Dim3>(velocity, "velocity")?,
                material,
            ),
        }
    }

    pub fn add_cube(
        &mut self,
        lower: &[Real],
        size: &[Real],
        material: MaterialType,
        velocity: &[Real],
        color: u32,
    ) -> Result<usize> {
        match self {
            Simulation::Planar(solver) => solver.add_cube(
                vector::<Dim2>(lower, "lower")?,
                vector::<Dim2>(size, "size")?,
                material,
                None,
                vector::<Dim2>(velocity, "velocity")?,
                color,
            ),
            Simulation::Volumetric(solver) => solver.add_cube(
                vector::<Dim3>(lower, "lower")?,
                vector::<Dim3>(size, "size")?,
                material,
                None,
                vector::<Dim3>(velocity, "velocity")?,
                color,
            ),
        }
    }

    pub fn add_surface_collider(
        &mut self,
        point: &[Real],
        normal: &[Real],
        surface: SurfaceKind,
        friction: Real,
    ) -> Result<()> {
        match self {
            Simulation::Planar(solver) => solver.add_surface_collider(
                vector::<Dim2>(point, "point")?,
                vector::<Dim2>(normal, "normal")?,
                surface,
                friction,
            ),
            Simulation::Volumetric(solver) => solver.add_surface_collider(
                vector::<Dim3>(point, "point")?,
                vector::<Dim3>(normal, "normal")?,
                surface,
                friction,
            ),
        }
    }

    pub fn set_gravity(&mut self, gravity: &[Real]) -> Result<()> {
        match self {
            Simulation::Planar(solver) => solver.set_gravity(vector::<Dim2>(gravity, "gravity")?),
            Simulation::Volumetric(solver) => {
                solver.set_gravity(vector::<Dim3>(gravity, "gravity")?)
            }
        }
        Ok(())
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        dispatch!(self, solver => solver.cancel_handle())
    }

    pub fn step(&mut self, frame_dt: Real) -> Result<StepStats> {
        dispatch!(self, solver => solver.step(frame_dt))
    }

    /// Particles in store order, padded to three components.
    pub fn snapshot(&self) -> Vec<SnapshotEntry> {
        dispatch!(self, solver => solver.snapshot().into_iter().map(SnapshotEntry::from).collect())
    }
}
