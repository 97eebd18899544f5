//! Grid velocity solve: normalize momentum, apply gravity, then walls and
//! surface colliders.

use crate::core::{DomainWalls, SurfaceCollider};
use crate::geometry::SpGrid;
use crate::materials::utils::inv_exact;
use crate::math::{Dimension, Real};

pub struct GridUpdateParams<'a, D: Dimension> {
    pub dt: Real,
    pub gravity: D::Vector,
    pub cell_width: Real,
    pub walls: DomainWalls,
    pub colliders: &'a [SurfaceCollider<D>],
}

pub fn update_grid_velocities<D: Dimension>(grid: &mut SpGrid<D>, params: &GridUpdateParams<'_, D>) {
    let gravity_step = params.gravity * params.dt;
    grid.par_for_each_leaf_mut(|leaf| {
        for index in 0..leaf.nodes.len() {
            let node = &mut leaf.nodes[index];
            if node.mass <= 0.0 {
                node.velocity = D::zero_vector();
                continue;
            }
            let mut velocity = node.velocity * inv_exact(node.mass) + gravity_step;

            let cell = leaf.cell_coord(index);
            params.walls.apply::<D>(&mut velocity, cell);
            if !params.colliders.is_empty() {
                let position = D::vector_from_fn(|axis| cell[axis] as Real * params.cell_width);
                for collider in params.colliders {
                    collider.apply(&mut velocity, position);
                }
            }
            leaf.nodes[index].velocity = velocity;
        }
    });
}
