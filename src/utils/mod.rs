//! Solver bookkeeping utilities.

pub mod convergence;
pub use convergence::{Convergence, CostRecord, CostTrace, ReconStats, StopReason};
