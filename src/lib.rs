//! tvrecon: temporal total-variation reconstruction of dynamic multi-coil k-space
//!
//! This crate recovers a time series of complex images from non-Cartesian,
//! multi-channel frequency-domain measurements by minimizing data fidelity plus a
//! temporal TV penalty with nonlinear conjugate gradients, on serial,
//! shared-memory or distributed backends.

pub mod parallel;

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod objective;
pub mod operator;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use crate::core::*;
pub use error::*;
pub use objective::*;
pub use operator::*;
pub use parallel::{Backend, Comm};
pub use solver::*;
pub use utils::*;
