//! Configuration and parameters
//!
//! Constants and solver settings.

pub mod constants;
pub mod solver_config;

pub use constants::*;
pub use solver_config::*;
