//! Simulation dynamics: force integration, sleeping and the contact solver.

pub mod integrator;
pub mod solver;

pub use integrator::Integrator;
pub use solver::{ContactSolver, SolverStepMetrics};
