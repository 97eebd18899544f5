// Physical and layout constants for the MPM solver
use crate::math::Real;

// Virtual index space: GRID_SIZE cells per axis, centred on the origin
pub const GRID_SIZE: i32 = 1024;
pub const GRID_OFFSET: i32 = -GRID_SIZE / 2;

// Two-level block hierarchy
pub const OUTER_BLOCK_SIZE: i32 = 128;
pub const LEAF_BLOCK_SIZE: i32 = 16;
pub const LEAVES_PER_OUTER: i32 = OUTER_BLOCK_SIZE / LEAF_BLOCK_SIZE;

// Timestep policy: dt = DT_FACTOR * dx / domain_size * dt_scale
pub const DT_FACTOR: Real = 2e-2;

pub const DEFAULT_MAX_PARTICLES: usize = 1 << 27;
pub const DEFAULT_GRAVITY: Real = 9.8;
pub const DEFAULT_BOUNDARY_CELLS: u32 = 3;

// Material defaults
pub const DENSITY: Real = 1000.0;
pub const YOUNGS_MODULUS: Real = 1e6;
pub const POISSON_RATIO: Real = 0.2;

// Elastic (jelly) material is softened relative to the base stiffness
pub const ELASTIC_SOFTENING: Real = 0.3;

// Snow plasticity
pub const SNOW_CRITICAL_COMPRESSION: Real = 2.5e-2;
pub const SNOW_CRITICAL_STRETCH: Real = 4.5e-3;
pub const SNOW_HARDENING: Real = 10.0;
pub const SNOW_MIN_HARDENING_FACTOR: Real = 0.1;
pub const SNOW_MAX_HARDENING_FACTOR: Real = 5.0;

// Sand (Drucker-Prager) friction angle in degrees
pub const SAND_FRICTION_ANGLE: Real = 45.0;

// Stability floors
pub const DETERMINANT_FLOOR: Real = 1e-2;
pub const LOG_FLOOR: Real = 1e-4;
