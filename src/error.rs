//! Error types for the MPM solver.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MpmError {
    #[error("particle capacity of {max_particles} reached")]
    Capacity { max_particles: usize },

    /// `particle` is `None` when the non-finite value was found on the grid.
    #[error("non-finite state after inner step {substep} (particle {particle:?})")]
    NumericalInstability {
        substep: usize,
        particle: Option<usize>,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("grid cell {cell:?} lies outside the virtual domain")]
    OutOfDomain { cell: [i32; 3] },

    #[error("frame cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, MpmError>;
