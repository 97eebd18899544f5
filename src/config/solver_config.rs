use crate::config::constants::{
    DEFAULT_BOUNDARY_CELLS, DEFAULT_GRAVITY, DEFAULT_MAX_PARTICLES, DENSITY, DT_FACTOR, GRID_SIZE,
    POISSON_RATIO, YOUNGS_MODULUS,
};
use crate::core::grid::BoundaryHandling;
use crate::error::{MpmError, Result};
use crate::math::Real;
use crate::materials::families::ElasticParams;

/// Construction-time solver configuration.
///
/// Immutable once a solver is built; every solver owns its own copy so several
/// instances can run side by side.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Cell count per axis; its length selects 2D or 3D.
    pub resolution: Vec<u32>,
    /// World-space extent of the first axis. `dx = domain_size / resolution[0]`.
    pub domain_size: Real,
    /// Hard cap on live particles.
    pub max_particles: usize,
    /// Scales the inner timestep.
    pub dt_scale: Real,
    /// Scales material stiffness constants.
    pub stiffness_scale: Real,
    /// Disables the domain walls and position clamping.
    pub unbounded: bool,
    /// Gravity magnitude along -y.
    pub gravity: Real,
    /// Wall behaviour at the domain boundary.
    pub boundary: BoundaryHandling,
    /// Thickness of the wall band, in cells.
    pub boundary_cells: u32,
    /// Rest density shared by every material.
    pub density: Real,
    pub youngs_modulus: Real,
    pub poisson_ratio: Real,
    /// Seed for region sampling.
    pub seed: u64,
}

impl SolverConfig {
    pub fn new(resolution: impl Into<Vec<u32>>) -> Self {
        Self {
            resolution: resolution.into(),
            domain_size: 1.0,
            max_particles: DEFAULT_MAX_PARTICLES,
            dt_scale: 1.0,
            stiffness_scale: 1.0,
            unbounded: false,
            gravity: DEFAULT_GRAVITY,
            boundary: BoundaryHandling::Separate,
            boundary_cells: DEFAULT_BOUNDARY_CELLS,
            density: DENSITY,
            youngs_modulus: YOUNGS_MODULUS,
            poisson_ratio: POISSON_RATIO,
            seed: 0,
        }
    }

    pub fn with_domain_size(mut self, domain_size: Real) -> Self {
        self.domain_size = domain_size;
        self
    }

    pub fn with_max_particles(mut self, max_particles: usize) -> Self {
        self.max_particles = max_particles;
        self
    }

    pub fn with_dt_scale(mut self, dt_scale: Real) -> Self {
        self.dt_scale = dt_scale;
        self
    }

    pub fn with_stiffness_scale(mut self, stiffness_scale: Real) -> Self {
        self.stiffness_scale = stiffness_scale;
        self
    }

    pub fn with_unbounded(mut self, unbounded: bool) -> Self {
        self.unbounded = unbounded;
        self
    }

    pub fn with_gravity(mut self, gravity: Real) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundaryHandling) -> Self {
        self.boundary = boundary;
        self
    }

    pub fn with_boundary_cells(mut self, boundary_cells: u32) -> Self {
        self.boundary_cells = boundary_cells;
        self
    }

    pub fn with_density(mut self, density: Real) -> Self {
        self.density = density;
        self
    }

    pub fn with_elasticity(mut self, youngs_modulus: Real, poisson_ratio: Real) -> Self {
        self.youngs_modulus = youngs_modulus;
        self.poisson_ratio = poisson_ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn dim(&self) -> usize {
        self.resolution.len()
    }

    pub fn dx(&self) -> Real {
        self.domain_size / self.resolution[0] as Real
    }

    pub fn inv_dx(&self) -> Real {
        1.0 / self.dx()
    }

    /// Largest stable inner timestep.
    pub fn max_dt(&self) -> Real {
        DT_FACTOR * self.dx() / self.domain_size * self.dt_scale
    }

    pub fn particle_volume(&self) -> Real {
        self.dx().powi(self.dim() as i32)
    }

    pub fn particle_mass(&self) -> Real {
        self.particle_volume() * self.density
    }

    /// Base elastic parameters after stiffness scaling.
    pub fn elastic_params(&self) -> ElasticParams {
        ElasticParams::new(
            self.youngs_modulus * self.domain_size * self.stiffness_scale,
            self.poisson_ratio,
        )
    }

    pub fn validate(&self) -> Result<()> {
        let dim = self.dim();
        if dim != 2 && dim != 3 {
            return Err(MpmError::Configuration(format!(
                "MPM solver supports only 2D and 3D simulations, got {dim} axes"
            )));
        }
        let max_cells = (GRID_SIZE / 2) as u32;
        if let Some(bad) = self
            .resolution
            .iter()
            .find(|&&cells| cells == 0 || cells >= max_cells)
        {
            return Err(MpmError::Configuration(format!(
                "resolution {bad} must lie in 1..{max_cells}"
            )));
        }
        positive("domain_size", self.domain_size)?;
        positive("dt_scale", self.dt_scale)?;
        positive("stiffness_scale", self.stiffness_scale)?;
        positive("density", self.density)?;
        positive("youngs_modulus", self.youngs_modulus)?;
        if self.max_particles == 0 {
            return Err(MpmError::Configuration(
                "max_particles must be at least 1".into(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(MpmError::Configuration("gravity must be finite".into()));
        }
        if !(self.poisson_ratio > -1.0 && self.poisson_ratio < 0.5) {
            return Err(MpmError::Configuration(format!(
                "poisson_ratio {} must lie in (-1, 0.5)",
                self.poisson_ratio
            )));
        }
        if 2 * self.boundary_cells >= self.resolution.iter().copied().min().unwrap_or(0) {
            return Err(MpmError::Configuration(format!(
                "boundary band of {} cells leaves no interior",
                self.boundary_cells
            )));
        }
        Ok(())
    }
}

fn positive(name: &str, value: Real) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(MpmError::Configuration(format!(
            "{name} must be finite and positive, got {value}"
        )))
    }
}
