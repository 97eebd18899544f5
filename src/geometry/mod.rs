pub mod sp_grid;

pub use sp_grid::{BucketView, GridNode, LeafBlock, SpGrid, gather_offsets, leaf_of, support_in_domain};
