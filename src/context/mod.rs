//! Reconstruction context and the one-call entry point.
//!
//! [`ReconContext`] validates raw acquisition arrays, assembles the SENSE
//! operator, data fidelity and temporal regularizer on a caller-supplied
//! [`Backend`](crate::parallel::Backend), and runs the solver.
//! [`reconstruct`] wraps it with serial defaults.

pub mod recon_context;
pub use recon_context::{ReconContext, reconstruct};
