//! Region seeding: jittered particle positions inside boxes and ellipsoids,
//! plus a box source that emits particles every frame.

use rand::Rng;
use rand::rngs::StdRng;

use crate::materials::MaterialType;
use crate::math::{Dimension, Real};

/// Particles for a region of `volume`: `sample_density * volume / dx^dim + 1`.
pub fn sample_count<D: Dimension>(volume: Real, cell_width: Real, sample_density: Real) -> usize {
    let cell_volume = cell_width.powi(D::DIM as i32);
    (sample_density * volume / cell_volume) as usize + 1
}

/// Default samples per cell volume, `2^dim`.
pub fn default_sample_density<D: Dimension>() -> Real {
    (1u32 << D::DIM) as Real
}

/// Uniform positions in the box `[lower, lower + size)`.
pub fn sample_box<D: Dimension>(
    rng: &mut StdRng,
    lower: D::Vector,
    size: D::Vector,
    count: usize,
) -> Vec<D::Vector> {
    (0..count)
        .map(|_| D::vector_from_fn(|axis| lower[axis] + rng.random::<Real>() * size[axis]))
        .collect()
}

/// Uniform positions in the axis-aligned ellipsoid around `center`, by
/// rejection from its bounding box.
pub fn sample_ellipsoid<D: Dimension>(
    rng: &mut StdRng,
    center: D::Vector,
    radius: D::Vector,
    count: usize,
) -> Vec<D::Vector> {
    let mut positions = Vec::with_capacity(count);
    while positions.len() < count {
        let unit = D::vector_from_fn(|_| rng.random_range(-1.0..1.0));
        if D::dot(unit, unit) <= 1.0 {
            positions.push(D::vector_from_fn(|axis| center[axis] + unit[axis] * radius[axis]));
        }
    }
    positions
}

pub fn box_volume<D: Dimension>(size: D::Vector) -> Real {
    D::component_product(size)
}

pub fn ellipsoid_volume<D: Dimension>(radius: D::Vector) -> Real {
    let unit_ball = if D::DIM == 2 {
        std::f32::consts::PI
    } else {
        4.0 / 3.0 * std::f32::consts::PI
    };
    unit_ball * D::component_product(radius)
}

/// Box region that emits `per_frame` particles at the start of every frame.
#[derive(Debug)]
pub struct ParticleSource<D: Dimension> {
    pub lower: D::Vector,
    pub size: D::Vector,
    pub velocity: D::Vector,
    pub material: MaterialType,
    pub color: u32,
    pub per_frame: usize,
}

impl<D: Dimension> Clone for ParticleSource<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for ParticleSource<D> {}

impl<D: Dimension> ParticleSource<D> {
    pub fn new(lower: D::Vector, size: D::Vector, material: MaterialType, per_frame: usize) -> Self {
        Self {
            lower,
            size,
            velocity: D::zero_vector(),
            material,
            color: crate::core::particle::DEFAULT_COLOR,
            per_frame,
        }
    }

    pub fn with_velocity(mut self, velocity: D::Vector) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Positions for this frame, at most `budget` of them.
    pub fn emit(&self, rng: &mut StdRng, budget: usize) -> Vec<D::Vector> {
        sample_box::<D>(rng, self.lower, self.size, self.per_frame.min(budget))
    }
}
