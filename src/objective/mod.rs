//! Objective terms: k-space data consistency and temporal total variation.

pub mod fidelity;
pub mod temporal_tv;

pub use fidelity::KSpaceFidelity;
pub use temporal_tv::{TemporalTv, temporal_cost, temporal_gradient};
