//! Solver configuration.

pub mod options;
pub use options::{LineSearchOptions, NlcgOptions, TracePolicy};
