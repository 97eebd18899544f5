//! Two-level sparse grid over a fixed virtual index space.
//!
//! The virtual domain spans `GRID_SIZE` cells per axis starting at
//! `GRID_OFFSET`. Outer blocks of `OUTER_BLOCK_SIZE` cells are pointer blocks
//! whose slots reference leaf blocks of `LEAF_BLOCK_SIZE` cells. Leaves live
//! in an arena with a free list; their particle-id lists live in a parallel
//! arena so P2G can write one leaf while reading its neighbours' lists.

use bevy::math::IVec3;
use indexmap::IndexMap;
use rayon::prelude::*;

use crate::config::{GRID_OFFSET, GRID_SIZE, LEAF_BLOCK_SIZE, LEAVES_PER_OUTER};
use crate::error::{MpmError, Result};
use crate::math::{Coord, Dimension, Real};

/// Leaf blocks whose particles can reach a given leaf: offsets `{-1, 0}^D`.
const GATHER_2D: [IVec3; 4] = [
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 0, 0),
];

const GATHER_3D: [IVec3; 8] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 0, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 0, 0),
];

#[inline(always)]
pub fn gather_offsets<D: Dimension>() -> &'static [IVec3] {
    if D::DIM == 2 { &GATHER_2D } else { &GATHER_3D }
}

/// Leaf coordinate (in leaf units over the virtual domain) holding `cell`.
///
/// Fails when the cell lies outside the virtual index space.
#[inline]
pub fn leaf_of<D: Dimension>(cell: Coord) -> Result<IVec3> {
    let mut leaf = IVec3::ZERO;
    for axis in 0..D::DIM {
        let virtual_index = cell[axis] - GRID_OFFSET;
        if !(0..GRID_SIZE).contains(&virtual_index) {
            return Err(MpmError::OutOfDomain {
                cell: cell.to_array(),
            });
        }
        leaf[axis] = virtual_index / LEAF_BLOCK_SIZE;
    }
    Ok(leaf)
}

/// True when the whole 3-wide support starting at `base` is addressable.
#[inline]
pub fn support_in_domain<D: Dimension>(base: Coord) -> bool {
    (0..D::DIM).all(|axis| {
        let lo = base[axis] - GRID_OFFSET;
        lo >= 0 && lo + 2 < GRID_SIZE
    })
}

#[inline(always)]
fn outer_and_slot(leaf: IVec3) -> (IVec3, usize) {
    let per = LEAVES_PER_OUTER;
    let outer = leaf.div_euclid(IVec3::splat(per));
    let local = leaf.rem_euclid(IVec3::splat(per));
    (outer, (local.x + per * (local.y + per * local.z)) as usize)
}

/// Grid node. `velocity` holds momentum until the grid solve normalizes it.
#[derive(Debug)]
pub struct GridNode<D: Dimension> {
    pub mass: Real,
    pub velocity: D::Vector,
}

impl<D: Dimension> Clone for GridNode<D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: Dimension> Copy for GridNode<D> {}

impl<D: Dimension> Default for GridNode<D> {
    fn default() -> Self {
        Self {
            mass: 0.0,
            velocity: D::zero_vector(),
        }
    }
}

/// Dense `LEAF_BLOCK_SIZE^D` block of nodes.
pub struct LeafBlock<D: Dimension> {
    /// Position in leaf units over the virtual domain.
    pub coord: IVec3,
    /// World cell coordinate of the first node.
    pub origin: Coord,
    pub active: bool,
    pub nodes: Vec<GridNode<D>>,
}

impl<D: Dimension> LeafBlock<D> {
    fn new(coord: IVec3) -> Self {
        let mut leaf = Self {
            coord,
            origin: IVec3::ZERO,
            active: false,
            nodes: vec![GridNode::default(); (LEAF_BLOCK_SIZE as usize).pow(D::DIM as u32)],
        };
        leaf.reset(coord);
        leaf
    }

    fn reset(&mut self, coord: IVec3) {
        self.coord = coord;
        self.origin = IVec3::ZERO;
        for axis in 0..D::DIM {
            self.origin[axis] = coord[axis] * LEAF_BLOCK_SIZE + GRID_OFFSET;
        }
        self.active = true;
        self.nodes.fill(GridNode::default());
    }

    /// Index into `nodes` when `cell` lies in this leaf.
    #[inline(always)]
    pub fn local_index(&self, cell: Coord) -> Option<usize> {
        let local = cell - self.origin;
        let size = LEAF_BLOCK_SIZE;
        if (0..D::DIM).any(|axis| local[axis] < 0 || local[axis] >= size) {
            return None;
        }
        Some((local.x + size * (local.y + size * local.z)) as usize)
    }

    /// World cell coordinate of `nodes[index]`.
    #[inline(always)]
    pub fn cell_coord(&self, index: usize) -> Coord {
        let size = LEAF_BLOCK_SIZE as usize;
        let local = IVec3::new(
            (index % size) as i32,
            ((index / size) % size) as i32,
            (index / (size * size)) as i32,
        );
        self.origin + local
    }
}

#[derive(Clone)]
struct PointerBlock {
    slots: Vec<Option<u32>>,
}

/// Read-only access to the per-leaf particle lists during a parallel gather.
pub struct BucketView<'a> {
    outer: &'a IndexMap<IVec3, PointerBlock>,
    buckets: &'a [Vec<usize>],
}

impl<'a> BucketView<'a> {
    /// Particles whose base cell lies in `leaf`; empty if the leaf is inactive.
    #[inline]
    pub fn bucket(&self, leaf: IVec3) -> &'a [usize] {
        let (outer, slot) = outer_and_slot(leaf);
        self.outer
            .get(&outer)
            .and_then(|block| block.slots[slot])
            .map(|index| self.buckets[index as usize].as_slice())
            .unwrap_or(&[])
    }
}

pub struct SpGrid<D: Dimension> {
    outer: IndexMap<IVec3, PointerBlock>,
    leaves: Vec<LeafBlock<D>>,
    buckets: Vec<Vec<usize>>,
    free: Vec<u32>,
    active: Vec<u32>,
}

impl<D: Dimension> Default for SpGrid<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dimension> SpGrid<D> {
    pub fn new() -> Self {
        Self {
            outer: IndexMap::new(),
            leaves: Vec::new(),
            buckets: Vec::new(),
            free: Vec::new(),
            active: Vec::new(),
        }
    }

    /// Number of active leaf blocks.
    pub fn active_block_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_outer_count(&self) -> usize {
        self.outer.len()
    }

    /// Leaf blocks ever allocated, active or on the free list.
    pub fn allocated_block_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    fn leaf_index(&self, leaf: IVec3) -> Option<u32> {
        let (outer, slot) = outer_and_slot(leaf);
        self.outer.get(&outer).and_then(|block| block.slots[slot])
    }

    /// Activate the leaf holding `cell` and return its arena index.
    pub fn activate(&mut self, cell: Coord) -> Result<u32> {
        let leaf = leaf_of::<D>(cell)?;
        Ok(self.activate_leaf(leaf))
    }

    fn activate_leaf(&mut self, leaf: IVec3) -> u32 {
        let (outer, slot) = outer_and_slot(leaf);
        let slot_count = (LEAVES_PER_OUTER as usize).pow(D::DIM as u32);
        let block = self.outer.entry(outer).or_insert_with(|| PointerBlock {
            slots: vec![None; slot_count],
        });
        if let Some(index) = block.slots[slot] {
            return index;
        }

        let index = match self.free.pop() {
            Some(index) => {
                self.leaves[index as usize].reset(leaf);
                index
            }
            None => {
                self.leaves.push(LeafBlock::new(leaf));
                self.buckets.push(Vec::new());
                (self.leaves.len() - 1) as u32
            }
        };
        block.slots[slot] = Some(index);
        self.active.push(index);
        index
    }

    /// Activate every leaf touched by the support `base..=base + 2` and return
    /// the arena index of the leaf holding `base`.
    pub fn activate_support(&mut self, base: Coord) -> Result<u32> {
        let base_leaf = leaf_of::<D>(base)?;
        let far_leaf = leaf_of::<D>(base + IVec3::splat(2))?;
        let base_index = self.activate_leaf(base_leaf);
        let span = far_leaf - base_leaf;
        for dz in 0..=span.z {
            for dy in 0..=span.y {
                for dx in 0..=span.x {
                    if dx != 0 || dy != 0 || dz != 0 {
                        self.activate_leaf(base_leaf + IVec3::new(dx, dy, dz));
                    }
                }
            }
        }
        Ok(base_index)
    }

    /// Record particle `pid` in the list of leaf `index`.
    #[inline]
    pub fn push_particle(&mut self, index: u32, pid: usize) {
        self.buckets[index as usize].push(pid);
    }

    pub fn bucket(&self, leaf: IVec3) -> &[usize] {
        self.bucket_view().bucket(leaf)
    }

    pub fn bucket_view(&self) -> BucketView<'_> {
        BucketView {
            outer: &self.outer,
            buckets: &self.buckets,
        }
    }

    /// Release every active block back to the free list.
    ///
    /// Costs O(active blocks); a second call in a row does nothing.
    pub fn deactivate_all(&mut self) {
        for index in self.active.drain(..) {
            self.leaves[index as usize].active = false;
            self.buckets[index as usize].clear();
            self.free.push(index);
        }
        self.outer.clear();
    }

    pub fn accumulate_mass(&mut self, cell: Coord, mass: Real) -> Result<()> {
        self.node_mut(cell)?.mass += mass;
        Ok(())
    }

    pub fn accumulate_momentum(&mut self, cell: Coord, momentum: D::Vector) -> Result<()> {
        self.node_mut(cell)?.velocity += momentum;
        Ok(())
    }

    fn node_mut(&mut self, cell: Coord) -> Result<&mut GridNode<D>> {
        let index = self.activate(cell)?;
        let leaf = &mut self.leaves[index as usize];
        let local = leaf.local_index(cell).ok_or(MpmError::OutOfDomain {
            cell: cell.to_array(),
        })?;
        Ok(&mut leaf.nodes[local])
    }

    /// Node at `cell` if its leaf is active.
    #[inline]
    pub fn node(&self, cell: Coord) -> Option<&GridNode<D>> {
        let leaf = leaf_of::<D>(cell).ok()?;
        let block = &self.leaves[self.leaf_index(leaf)? as usize];
        block.local_index(cell).map(|local| &block.nodes[local])
    }

    pub fn cell_mass(&self, cell: Coord) -> Real {
        self.node(cell).map_or(0.0, |node| node.mass)
    }

    /// Post-solve velocity; zero for inactive or massless cells.
    #[inline]
    pub fn read_velocity(&self, cell: Coord) -> D::Vector {
        match self.node(cell) {
            Some(node) if node.mass > 0.0 => node.velocity,
            _ => D::zero_vector(),
        }
    }

    /// Divide momentum by mass on every active node; massless nodes get zero.
    pub fn normalize(&mut self) {
        self.par_for_each_leaf_mut(|leaf| {
            for node in leaf.nodes.iter_mut() {
                node.velocity = if node.mass > 0.0 {
                    node.velocity / node.mass
                } else {
                    D::zero_vector()
                };
            }
        });
    }

    pub fn total_mass(&self) -> Real {
        self.active_leaves()
            .map(|leaf| leaf.nodes.iter().map(|node| node.mass).sum::<Real>())
            .sum()
    }

    pub fn active_leaves(&self) -> impl Iterator<Item = &LeafBlock<D>> {
        self.active.iter().map(|&index| &self.leaves[index as usize])
    }

    pub fn par_for_each_leaf_mut<F>(&mut self, f: F)
    where
        F: Fn(&mut LeafBlock<D>) + Send + Sync,
    {
        self.leaves
            .par_iter_mut()
            .filter(|leaf| leaf.active)
            .for_each(f);
    }

    /// Run `f` on every active leaf in parallel with read access to all
    /// particle lists. Each leaf is written by exactly one task.
    pub fn par_gather<F>(&mut self, f: F)
    where
        F: Fn(&mut LeafBlock<D>, &BucketView<'_>) + Send + Sync,
    {
        let view = BucketView {
            outer: &self.outer,
            buckets: &self.buckets,
        };
        self.leaves
            .par_iter_mut()
            .filter(|leaf| leaf.active)
            .for_each(|leaf| f(leaf, &view));
    }

    /// First active cell holding a non-finite velocity.
    pub fn first_non_finite(&self) -> Option<Coord> {
        self.active_leaves().find_map(|leaf| {
            leaf.nodes
                .iter()
                .position(|node| !D::vector_is_finite(node.velocity) || !node.mass.is_finite())
                .map(|index| leaf.cell_coord(index))
        })
    }
}
