//! Grid-side boundary conditions
//!
//! Domain walls act on a band of cells at each face of the box; surface
//! colliders are half-spaces applied on top of them.

use bevy::math::IVec3;

use crate::config::{GRID_OFFSET, GRID_SIZE};
use crate::error::{MpmError, Result};
use crate::math::{Coord, Dimension, Real};

/// How domain walls act on grid velocities inside the wall band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BoundaryHandling {
    /// Whole velocity zeroed.
    Stick,
    /// Normal component zeroed, tangential kept.
    Slip,
    /// Only the component heading into the wall is removed.
    #[default]
    Separate,
    /// No walls.
    None,
}

/// Wall band of one simulation, in cell coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DomainWalls {
    pub lower: Coord,
    pub upper: Coord,
    pub band: i32,
    pub mode: BoundaryHandling,
}

impl DomainWalls {
    /// Walls at the faces of `[0, resolution)`.
    pub fn bounded(resolution: &[u32], band: u32, mode: BoundaryHandling) -> Self {
        let mut upper = IVec3::ZERO;
        for (axis, &cells) in resolution.iter().enumerate().take(3) {
            upper[axis] = cells as i32;
        }
        Self {
            lower: IVec3::ZERO,
            upper,
            band: band as i32,
            mode,
        }
    }

    /// Walls at the edges of the virtual index space.
    pub fn virtual_domain(band: u32, mode: BoundaryHandling) -> Self {
        Self {
            lower: IVec3::splat(GRID_OFFSET),
            upper: IVec3::splat(GRID_OFFSET + GRID_SIZE),
            band: band as i32,
            mode,
        }
    }

    #[inline]
    pub fn apply<D: Dimension>(&self, velocity: &mut D::Vector, cell: Coord) {
        apply_boundary_conditions::<D>(velocity, cell, self);
    }
}

/// Native coordinate-based boundary conditions.
#[inline(always)]
pub fn apply_boundary_conditions<D: Dimension>(
    velocity: &mut D::Vector,
    cell: Coord,
    walls: &DomainWalls,
) {
    if walls.mode == BoundaryHandling::None {
        return;
    }
    for axis in 0..D::DIM {
        let below = cell[axis] - walls.lower[axis] < walls.band;
        let above = cell[axis] > walls.upper[axis] - walls.band;
        if !below && !above {
            continue;
        }
        match walls.mode {
            BoundaryHandling::Stick => {
                *velocity = D::zero_vector();
                return;
            }
            BoundaryHandling::Slip => velocity[axis] = 0.0,
            BoundaryHandling::Separate => {
                if (below && velocity[axis] < 0.0) || (above && velocity[axis] > 0.0) {
                    velocity[axis] = 0.0;
                }
            }
            BoundaryHandling::None => {}
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Velocity zeroed behind the surface.
    Sticky,
    /// Normal component removed, tangential kept.
    Slip,
    /// Only inward normal motion removed; material may leave the surface.
    Separate,
}

/// Half-space collider: cells with `(x - point) . normal < 0` are behind it.
#[derive(Debug)]
pub struct SurfaceCollider<D: Dimension> {
    pub point: D::Vector,
    pub normal: D::Vector,
    pub surface: SurfaceKind,
    pub friction: Real,
}

impl<D: Dimension> Clone for SurfaceCollider<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for SurfaceCollider<D> {}

impl<D: Dimension> SurfaceCollider<D> {
    /// Normalizes `normal`; a zero or non-finite normal is rejected.
    pub fn new(point: D::Vector, normal: D::Vector, surface: SurfaceKind, friction: Real) -> Result<Self> {
        let length = D::length(normal);
        if !(length.is_finite() && length > 0.0) || !D::vector_is_finite(point) {
            return Err(MpmError::Configuration(
                "surface collider needs a finite point and a non-zero normal".into(),
            ));
        }
        if !(friction.is_finite() && friction >= 0.0) {
            return Err(MpmError::Configuration(format!(
                "collider friction must be non-negative, got {friction}"
            )));
        }
        Ok(Self {
            point,
            normal: normal / length,
            surface,
            friction,
        })
    }

    /// Apply to the velocity of a node at world position `position`.
    #[inline]
    pub fn apply(&self, velocity: &mut D::Vector, position: D::Vector) {
        if D::dot(position - self.point, self.normal) >= 0.0 {
            return;
        }
        if self.surface == SurfaceKind::Sticky {
            *velocity = D::zero_vector();
            return;
        }

        let mut v = *velocity;
        let normal_component = D::dot(self.normal, v);
        match self.surface {
            SurfaceKind::Slip => v -= self.normal * normal_component,
            _ => v -= self.normal * normal_component.min(0.0),
        }
        let speed = D::length(v);
        if normal_component < 0.0 && speed > 1e-30 {
            // Coulomb friction proportional to the removed normal speed.
            v = v * ((speed + normal_component * self.friction).max(0.0) / speed);
        }
        *velocity = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Dim2;
    use bevy::math::Vec2;

    fn walls(mode: BoundaryHandling) -> DomainWalls {
        DomainWalls::bounded(&[64, 64], 3, mode)
    }

    #[test]
    fn separate_only_removes_inward_motion() {
        let walls = walls(BoundaryHandling::Separate);
        let mut v = Vec2::new(1.0, -2.0);
        walls.apply::<Dim2>(&mut v, IVec3::new(30, 1, 0));
        assert_eq!(v, Vec2::new(1.0, 0.0));

        let mut v = Vec2::new(1.0, 2.0);
        walls.apply::<Dim2>(&mut v, IVec3::new(30, 1, 0));
        assert_eq!(v, Vec2::new(1.0, 2.0));

        let mut v = Vec2::new(1.0, 2.0);
        walls.apply::<Dim2>(&mut v, IVec3::new(62, 30, 0));
        assert_eq!(v, Vec2::new(0.0, 2.0));
    }

    #[test]
    fn stick_and_slip() {
        let mut v = Vec2::new(1.0, 2.0);
        walls(BoundaryHandling::Stick).apply::<Dim2>(&mut v, IVec3::new(0, 30, 0));
        assert_eq!(v, Vec2::ZERO);

        let mut v = Vec2::new(1.0, 2.0);
        walls(BoundaryHandling::Slip).apply::<Dim2>(&mut v, IVec3::new(0, 30, 0));
        assert_eq!(v, Vec2::new(0.0, 2.0));

        let mut v = Vec2::new(1.0, 2.0);
        walls(BoundaryHandling::None).apply::<Dim2>(&mut v, IVec3::new(0, 0, 0));
        assert_eq!(v, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn interior_is_untouched() {
        let mut v = Vec2::new(-1.0, -2.0);
        walls(BoundaryHandling::Stick).apply::<Dim2>(&mut v, IVec3::new(32, 32, 0));
        assert_eq!(v, Vec2::new(-1.0, -2.0));
    }

    #[test]
    fn collider_friction_slows_tangential_motion() {
        let floor = SurfaceCollider::<Dim2>::new(
            Vec2::new(0.0, 0.5),
            Vec2::new(0.0, 2.0),
            SurfaceKind::Separate,
            0.5,
        )
        .unwrap();
        let mut v = Vec2::new(1.0, -1.0);
        floor.apply(&mut v, Vec2::new(0.3, 0.4));
        // Normal removed, tangential speed reduced by friction * 1.0.
        assert!((v - Vec2::new(0.5, 0.0)).length() < 1e-6);

        let mut v = Vec2::new(1.0, -1.0);
        floor.apply(&mut v, Vec2::new(0.3, 0.6));
        assert_eq!(v, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn collider_rejects_zero_normal() {
        assert!(
            SurfaceCollider::<Dim2>::new(Vec2::ZERO, Vec2::ZERO, SurfaceKind::Slip, 0.0).is_err()
        );
    }
}
