//! Impulsive transfer utilities: multi-revolution Lambert solver and rendezvous costing.

pub mod lambert;

pub use lambert::{
    ExactTransfer, LambertBranch, LambertSolverError, TransferDirection, solve_cost, solve_exact,
};
