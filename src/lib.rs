//! Pseudospectral model of the beta-plane barotropic vorticity equation on a
//! doubly periodic domain.

pub mod config;
pub mod error;
pub mod physics;
pub mod solver;
pub mod state;

pub use error::{Result, SolverError};
