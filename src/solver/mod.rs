//! Nonlinear conjugate-gradient solver and its building blocks.

pub mod conjugate;
pub use conjugate::ConjugateDirection;

pub mod line_search;
pub use line_search::{LineSearch, LineSearchOutcome};

pub mod nlcg;
pub use nlcg::{NlcgIter, NlcgSolver, NlcgState, Observer, Reconstruction};
