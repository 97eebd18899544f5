use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bevy::log::{debug, info, trace, warn};
use bevy::prelude::Resource;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::bukkit::BukkitSystem;
use crate::config::SolverConfig;
use crate::error::{MpmError, Result};
use crate::geometry::{SpGrid, support_in_domain};
use crate::materials::{MaterialTable, MaterialType};
use crate::math::{Dimension, Real};
use crate::sampling::{self, ParticleSource};
use crate::solver::{
    AdvectionParams, GridUpdateParams, compute_affine_terms, grid_to_particle, particle_to_grid,
    update_grid_velocities,
};

use super::grid::{DomainWalls, SurfaceCollider, SurfaceKind};
use super::kernel::{base_cell, inv_d};
use super::particle::{Particle, ParticleId, ParticleSnapshot};
use super::particle_set::ParticleSet;

/// Observability record for one `step` call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepStats {
    /// Inner steps taken.
    pub substeps: usize,
    /// Inner timestep.
    pub dt: Real,
    /// Active leaf blocks after the last inner step.
    pub active_blocks: usize,
    pub active_outer_blocks: usize,
    pub particle_count: usize,
    /// Particles dropped for leaving the virtual domain.
    pub removed: usize,
    /// Particles emitted by sources at frame start.
    pub injected: usize,
    /// Total mass scattered to the grid in the last inner step.
    pub grid_mass: Real,
}

/// Aggregate simulation state and the time integrator.
///
/// The grid holds no state across inner steps; everything persistent lives
/// on the particles.
#[derive(Resource)]
pub struct MpmSolver<D: Dimension> {
    config: SolverConfig,
    particle_set: ParticleSet<D>,
    grid: SpGrid<D>,
    bukkits: BukkitSystem,
    materials: MaterialTable,
    gravity: D::Vector,
    walls: DomainWalls,
    colliders: Vec<SurfaceCollider<D>>,
    sources: Vec<ParticleSource<D>>,
    rng: StdRng,
    rng_checkpoint: StdRng,
    cancel: Arc<AtomicBool>,
}

impl<D: Dimension> MpmSolver<D> {
    pub fn new(config: SolverConfig) -> Result<Self> {
        config.validate()?;
        if config.dim() != D::DIM {
            return Err(MpmError::Configuration(format!(
                "resolution has {} axes but the solver is {}D",
                config.dim(),
                D::DIM
            )));
        }

        let mut gravity = D::zero_vector();
        gravity[1] = -config.gravity;
        let walls = if config.unbounded {
            DomainWalls::virtual_domain(config.boundary_cells, config.boundary)
        } else {
            DomainWalls::bounded(&config.resolution, config.boundary_cells, config.boundary)
        };
        let rng = StdRng::seed_from_u64(config.seed);

        info!(
            "MPM solver: {}D, resolution {:?}, dx {:.5}, inner dt {:.3e}, max particles {}, unbounded {}",
            D::DIM,
            config.resolution,
            config.dx(),
            config.max_dt(),
            config.max_particles,
            config.unbounded
        );

        Ok(Self {
            particle_set: ParticleSet::new(config.max_particles),
            grid: SpGrid::new(),
            bukkits: BukkitSystem::new(),
            materials: MaterialTable::new(config.elastic_params()),
            gravity,
            walls,
            colliders: Vec::new(),
            sources: Vec::new(),
            rng_checkpoint: rng.clone(),
            rng,
            cancel: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn dx(&self) -> Real {
        self.config.dx()
    }

    /// Stability-bounded inner timestep.
    pub fn inner_dt(&self) -> Real {
        self.config.max_dt()
    }

    pub fn particle_count(&self) -> usize {
        self.particle_set.len()
    }

    pub fn particles(&self) -> &[Particle<D>] {
        self.particle_set.particles()
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle<D>> {
        self.particle_set.get(id)
    }

    pub fn particle_set(&self) -> &ParticleSet<D> {
        &self.particle_set
    }

    pub fn grid(&self) -> &SpGrid<D> {
        &self.grid
    }

    pub fn gravity(&self) -> D::Vector {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: D::Vector) {
        self.gravity = gravity;
    }

    /// Flag checked between inner steps; setting it aborts the current frame
    /// with [`MpmError::Cancelled`] and rolls particles back.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn new_particle(&self, position: D::Vector, velocity: D::Vector, material: MaterialType) -> Particle<D> {
        Particle::new(
            position,
            material,
            self.config.particle_mass(),
            self.config.particle_volume(),
        )
        .with_velocity(velocity)
    }

    /// Rejects state the integrator could never advance: non-finite values,
    /// positions outside the box in bounded mode, and supports past the
    /// virtual domain in unbounded mode.
    fn check_insertion(&self, position: D::Vector, velocity: D::Vector) -> Result<()> {
        if !D::vector_is_finite(position) || !D::vector_is_finite(velocity) {
            return Err(MpmError::Configuration(format!(
                "particle state must be finite, got position {position:?} velocity {velocity:?}"
            )));
        }
        let inside = if self.config.unbounded {
            support_in_domain::<D>(base_cell::<D>(position, self.config.inv_dx()))
        } else {
            let dx = self.config.dx();
            (0..D::DIM).all(|axis| {
                (0.0..=self.config.resolution[axis] as Real * dx).contains(&position[axis])
            })
        };
        if inside {
            Ok(())
        } else {
            Err(MpmError::Configuration(format!(
                "particle position {position:?} lies outside the simulation domain"
            )))
        }
    }

    pub fn add_particle(
        &mut self,
        position: D::Vector,
        velocity: D::Vector,
        material: MaterialType,
    ) -> Result<ParticleId> {
        self.check_insertion(position, velocity)?;
        let particle = self.new_particle(position, velocity, material);
        self.particle_set.push(particle)
    }

    pub fn add_particle_with_color(
        &mut self,
        position: D::Vector,
        velocity: D::Vector,
        material: MaterialType,
        color: u32,
    ) -> Result<ParticleId> {
        self.check_insertion(position, velocity)?;
        let particle = self.new_particle(position, velocity, material).with_color(color);
        self.particle_set.push(particle)
    }

    fn add_positions(
        &mut self,
        positions: Vec<D::Vector>,
        velocity: D::Vector,
        material: MaterialType,
        color: u32,
    ) -> Result<usize> {
        for &position in &positions {
            self.check_insertion(position, velocity)?;
        }
        let batch: Vec<_> = positions
            .into_iter()
            .map(|position| self.new_particle(position, velocity, material).with_color(color))
            .collect();
        let range = self.particle_set.push_batch(batch)?;
        Ok(range.len())
    }

    /// Seed the box `[lower, lower + size)`. `sample_density` defaults to
    /// `2^dim` particles per cell. Adds everything or nothing.
    pub fn add_cube(
        &mut self,
        lower: D::Vector,
        size: D::Vector,
        material: MaterialType,
        sample_density: Option<Real>,
        velocity: D::Vector,
        color: u32,
    ) -> Result<usize> {
        let density = sample_density.unwrap_or_else(sampling::default_sample_density::<D>);
        let count = sampling::sample_count::<D>(sampling::box_volume::<D>(size), self.dx(), density);
        if count > self.particle_set.remaining_capacity() {
            return Err(MpmError::Capacity {
                max_particles: self.config.max_particles,
            });
        }
        let positions = sampling::sample_box::<D>(&mut self.rng, lower, size, count);
        self.add_positions(positions, velocity, material, color)
    }

    /// Seed the ellipsoid around `center` with per-axis `radius`.
    pub fn add_ellipsoid(
        &mut self,
        center: D::Vector,
        radius: D::Vector,
        material: MaterialType,
        sample_density: Option<Real>,
        velocity: D::Vector,
        color: u32,
    ) -> Result<usize> {
        let density = sample_density.unwrap_or_else(sampling::default_sample_density::<D>);
        let count =
            sampling::sample_count::<D>(sampling::ellipsoid_volume::<D>(radius), self.dx(), density);
        if count > self.particle_set.remaining_capacity() {
            return Err(MpmError::Capacity {
                max_particles: self.config.max_particles,
            });
        }
        let positions = sampling::sample_ellipsoid::<D>(&mut self.rng, center, radius, count);
        self.add_positions(positions, velocity, material, color)
    }

    pub fn add_source(&mut self, source: ParticleSource<D>) {
        self.sources.push(source);
    }

    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    pub fn add_surface_collider(
        &mut self,
        point: D::Vector,
        normal: D::Vector,
        surface: SurfaceKind,
        friction: Real,
    ) -> Result<()> {
        self.colliders
            .push(SurfaceCollider::new(point, normal, surface, friction)?);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<ParticleSnapshot<D>> {
        self.particle_set.iter().map(Particle::snapshot).collect()
    }

    /// Inner step count and timestep covering `frame_dt`.
    pub fn substep_plan(&self, frame_dt: Real) -> (usize, Real) {
        let substeps = ((frame_dt / self.inner_dt()).ceil() as usize).max(1);
        (substeps, frame_dt / substeps as Real)
    }

    /// Advance by `frame_dt`, split into stability-bounded inner steps.
    ///
    /// On any error the particles are restored to their state at entry.
    pub fn step(&mut self, frame_dt: Real) -> Result<StepStats> {
        if !(frame_dt.is_finite() && frame_dt > 0.0) {
            return Err(MpmError::Configuration(format!(
                "frame_dt must be finite and positive, got {frame_dt}"
            )));
        }

        self.particle_set.save_checkpoint();
        self.rng_checkpoint.clone_from(&self.rng);

        match self.advance_frame(frame_dt) {
            Ok(stats) => {
                debug!(
                    "frame: {} substeps of {:.3e}s, {} particles, {} leaves / {} outer blocks, removed {}, injected {}",
                    stats.substeps,
                    stats.dt,
                    stats.particle_count,
                    stats.active_blocks,
                    stats.active_outer_blocks,
                    stats.removed,
                    stats.injected
                );
                Ok(stats)
            }
            Err(err) => {
                warn!("frame rolled back: {err}");
                self.particle_set.restore_checkpoint();
                std::mem::swap(&mut self.rng, &mut self.rng_checkpoint);
                self.grid.deactivate_all();
                Err(err)
            }
        }
    }

    fn advance_frame(&mut self, frame_dt: Real) -> Result<StepStats> {
        let (substeps, dt) = self.substep_plan(frame_dt);
        let mut stats = StepStats {
            substeps,
            dt,
            injected: self.emit_sources(),
            ..StepStats::default()
        };

        for substep in 0..substeps {
            if self.cancel.swap(false, Ordering::AcqRel) {
                return Err(MpmError::Cancelled);
            }
            stats.removed += self.inner_step(dt, substep)?;
            stats.grid_mass = self.grid.total_mass();
        }

        stats.active_blocks = self.grid.active_block_count();
        stats.active_outer_blocks = self.grid.active_outer_count();
        stats.particle_count = self.particle_set.len();
        Ok(stats)
    }

    fn emit_sources(&mut self) -> usize {
        let mut injected = 0;
        for source in self.sources.clone() {
            let budget = self.particle_set.remaining_capacity();
            if budget < source.per_frame {
                warn!(
                    "{} source limited to {budget} of {} particles by capacity",
                    source.material.material_name(),
                    source.per_frame
                );
            }
            let positions = source.emit(&mut self.rng, budget);
            match self.add_positions(positions, source.velocity, source.material, source.color) {
                Ok(count) => injected += count,
                Err(err) => warn!(
                    "{} source skipped this frame: {err}",
                    source.material.material_name()
                ),
            }
        }
        injected
    }

    /// One inner step. Returns the number of particles removed for leaving
    /// the virtual domain.
    fn inner_step(&mut self, dt: Real, substep: usize) -> Result<usize> {
        let dx = self.config.dx();
        let inv_dx = self.config.inv_dx();
        let inv_d = inv_d(dx);

        self.grid.deactivate_all();

        let removed = if self.config.unbounded {
            self.particle_set
                .retain(|particle| support_in_domain::<D>(base_cell::<D>(particle.position, inv_dx)))
        } else {
            0
        };
        if removed > 0 {
            warn!("removed {removed} particles that left the virtual domain");
        }

        self.particle_set.rebuild_transfer_cache(inv_dx);
        {
            let (particles, cache) = self.particle_set.particles_and_cache();
            self.bukkits.rebuild(&mut self.grid, particles, cache)?;
        }

        {
            let (particles, affine) = self.particle_set.particles_mut_and_affine();
            compute_affine_terms(
                particles,
                affine,
                self.bukkits.batches(),
                &self.materials,
                dt,
                inv_d,
            );
        }

        {
            let (particles, cache) = self.particle_set.particles_and_cache();
            particle_to_grid(
                &mut self.grid,
                particles,
                cache,
                self.particle_set.affine_terms(),
                dx,
            );
        }

        update_grid_velocities(
            &mut self.grid,
            &GridUpdateParams {
                dt,
                gravity: self.gravity,
                cell_width: dx,
                walls: self.walls,
                colliders: &self.colliders,
            },
        );

        let clamp = (!self.config.unbounded).then(|| {
            (
                D::splat(dx),
                D::vector_from_fn(|axis| (self.config.resolution[axis] as Real - 1.0) * dx),
            )
        });
        {
            let (particles, cache) = self.particle_set.particles_mut_and_cache();
            grid_to_particle(
                &self.grid,
                particles,
                cache,
                &AdvectionParams {
                    dt,
                    cell_width: dx,
                    inv_d,
                    clamp,
                },
            );
        }

        self.check_validity(substep)?;
        trace!(
            "inner step {substep}: {} particles, {} leaves",
            self.particle_set.len(),
            self.grid.active_block_count()
        );
        Ok(removed)
    }

    fn check_validity(&self, substep: usize) -> Result<()> {
        if let Some(particle) = self.particle_set.first_non_finite() {
            return Err(MpmError::NumericalInstability {
                substep,
                particle: Some(particle),
            });
        }
        if self.grid.first_non_finite().is_some() {
            return Err(MpmError::NumericalInstability {
                substep,
                particle: None,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BoundaryHandling;
    use crate::math::{Dim2, Dim3};
    use bevy::math::{Vec2, Vec3};

    fn solver() -> MpmSolver<Dim2> {
        MpmSolver::new(SolverConfig::new([64, 64])).unwrap()
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        assert!(matches!(
            MpmSolver::<Dim3>::new(SolverConfig::new([64, 64])),
            Err(MpmError::Configuration(_))
        ));
        assert!(MpmSolver::<Dim3>::new(SolverConfig::new([32, 32, 32])).is_ok());
    }

    #[test]
    fn substeps_cover_the_frame() {
        let solver = solver();
        let (n, dt) = solver.substep_plan(8e-3);
        assert!(dt <= solver.inner_dt() * (1.0 + 1e-5));
        assert!((n as Real * dt - 8e-3).abs() < 1e-7);
        assert_eq!(solver.substep_plan(1e-9).0, 1);
    }

    #[test]
    fn invalid_frame_dt_is_rejected() {
        let mut solver = solver();
        assert!(matches!(solver.step(0.0), Err(MpmError::Configuration(_))));
        assert!(matches!(solver.step(Real::NAN), Err(MpmError::Configuration(_))));
    }

    #[test]
    fn cancel_rolls_back() {
        let mut solver = solver();
        solver
            .add_particle(Vec2::new(0.5, 0.5), Vec2::ZERO, MaterialType::Water)
            .unwrap();
        solver.cancel_handle().store(true, Ordering::Release);
        assert_eq!(solver.step(1e-2), Err(MpmError::Cancelled));
        assert_eq!(solver.particles()[0].position, Vec2::new(0.5, 0.5));
        // The flag is consumed.
        assert!(solver.step(1e-3).is_ok());
    }

    #[test]
    fn stats_report_grid_activity() {
        let mut solver = solver();
        solver
            .add_cube(Vec2::splat(0.4), Vec2::splat(0.1), MaterialType::Snow, None, Vec2::ZERO, 0)
            .unwrap();
        let count = solver.particle_count();
        let stats = solver.step(1e-3).unwrap();
        assert_eq!(stats.particle_count, count);
        assert!(stats.active_blocks > 0);
        assert_eq!(stats.active_outer_blocks, 1);
        let total = solver.config().particle_mass() * count as Real;
        assert!((stats.grid_mass - total).abs() <= 1e-4 * total);
    }

    #[test]
    fn source_injects_until_capacity() {
        let config = SolverConfig::new([32, 32, 32]).with_max_particles(25);
        let mut solver = MpmSolver::<Dim3>::new(config).unwrap();
        solver.add_source(ParticleSource::new(
            Vec3::splat(0.4),
            Vec3::splat(0.1),
            MaterialType::Sand,
            10,
        ));
        assert_eq!(solver.step(1e-3).unwrap().injected, 10);
        assert_eq!(solver.step(1e-3).unwrap().injected, 10);
        assert_eq!(solver.step(1e-3).unwrap().injected, 5);
        assert_eq!(solver.step(1e-3).unwrap().injected, 0);
        assert_eq!(solver.particle_count(), 25);
    }

    #[test]
    fn ellipsoid_samples_stay_inside() {
        let mut solver = solver();
        let center = Vec2::new(0.5, 0.5);
        let radius = Vec2::new(0.1, 0.05);
        let count = solver
            .add_ellipsoid(center, radius, MaterialType::Elastic, Some(1.0), Vec2::ZERO, 7)
            .unwrap();
        assert_eq!(count, solver.particle_count());
        assert!(count > 1);
        for particle in solver.particles() {
            let d = (particle.position - center) / radius;
            assert!(d.length_squared() <= 1.0 + 1e-4);
            assert_eq!(particle.color, 7);
        }
    }

    #[test]
    fn colored_particle_keeps_its_tag() {
        let mut solver = solver();
        let id = solver
            .add_particle_with_color(Vec2::splat(0.5), Vec2::ZERO, MaterialType::Snow, 0x00FF00)
            .unwrap();
        assert_eq!(solver.particle(id).map(|p| p.color), Some(0x00FF00));
        assert_eq!(solver.snapshot()[0].color, 0x00FF00);
    }

    #[test]
    fn cleared_sources_stop_injecting() {
        let mut solver = solver();
        solver.add_source(ParticleSource::new(
            Vec2::splat(0.4),
            Vec2::splat(0.1),
            MaterialType::Water,
            4,
        ));
        assert_eq!(solver.step(1e-3).unwrap().injected, 4);
        solver.clear_sources();
        assert_eq!(solver.step(1e-3).unwrap().injected, 0);
        assert_eq!(solver.particle_count(), 4);
    }

    #[test]
    fn unbounded_mode_drops_escaped_particles() {
        let config = SolverConfig::new([64, 64])
            .with_unbounded(true)
            .with_boundary(BoundaryHandling::None);
        let mut solver = MpmSolver::<Dim2>::new(config).unwrap();
        let dx = solver.dx();
        solver
            .add_particle(Vec2::new(0.5, 0.5), Vec2::ZERO, MaterialType::Elastic)
            .unwrap();
        // Seven cells inside the lower virtual edge, moving out at six cells per frame.
        solver
            .add_particle(Vec2::new(0.5, -505.0 * dx), Vec2::new(0.0, -100.0), MaterialType::Elastic)
            .unwrap();
        let mut removed = 0;
        for _ in 0..4 {
            removed += solver.step(1e-3).unwrap().removed;
        }
        assert_eq!(removed, 1);
        assert_eq!(solver.particle_count(), 1);
        assert_eq!(solver.particles()[0].position.x, 0.5);
    }

    #[test]
    fn insertion_rejects_state_that_cannot_advance() {
        let mut solver = solver();
        solver
            .add_particle(Vec2::new(0.5, 0.5), Vec2::ZERO, MaterialType::Water)
            .unwrap();
        for (position, velocity) in [
            (Vec2::new(10.0, 0.5), Vec2::ZERO),
            (Vec2::new(-0.1, 0.5), Vec2::ZERO),
            (Vec2::new(Real::NAN, 0.5), Vec2::ZERO),
            (Vec2::new(0.5, 0.5), Vec2::new(Real::INFINITY, 0.0)),
        ] {
            assert!(matches!(
                solver.add_particle(position, velocity, MaterialType::Water),
                Err(MpmError::Configuration(_))
            ));
            assert!(matches!(
                solver.add_particle_with_color(position, velocity, MaterialType::Water, 1),
                Err(MpmError::Configuration(_))
            ));
        }
        assert!(matches!(
            solver.add_cube(Vec2::new(0.95, 0.5), Vec2::splat(0.1), MaterialType::Sand, None, Vec2::ZERO, 0),
            Err(MpmError::Configuration(_))
        ));
        assert_eq!(solver.particle_count(), 1);
        for _ in 0..3 {
            assert!(solver.step(1e-3).is_ok());
        }
    }

    #[test]
    fn unbounded_insertion_is_limited_by_the_virtual_domain() {
        let config = SolverConfig::new([64, 64]).with_unbounded(true);
        let mut solver = MpmSolver::<Dim2>::new(config).unwrap();
        let dx = solver.dx();
        assert!(
            solver
                .add_particle(Vec2::new(5.0, 0.5), Vec2::ZERO, MaterialType::Sand)
                .is_ok()
        );
        assert!(matches!(
            solver.add_particle(Vec2::new(0.5, -600.0 * dx), Vec2::ZERO, MaterialType::Sand),
            Err(MpmError::Configuration(_))
        ));
        assert_eq!(solver.particle_count(), 1);
        assert!(solver.step(1e-3).is_ok());
    }
}
