//! API options for the nonlinear conjugate-gradient solver.
//!
//! This module provides the `NlcgOptions` struct, which holds the outer
//! iteration limits and stopping thresholds, and `LineSearchOptions`, which
//! holds the expand/contract factors of the step-size search. Defaults carry
//! the reference values (15 sub-iterations, growth 1.3, shrink 0.8, initial
//! step 2.0, step threshold 2e-3).

use crate::core::traits::{Real, lit};
use crate::error::ReconError;

/// Whether the record of the iteration that triggered a convergence stop
/// appears in the returned cost trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TracePolicy {
    /// Keep the terminating iteration's record.
    #[default]
    IncludeTerminal,
    /// Drop the terminating iteration's record.
    ExcludeTerminal,
}

/// Expand/contract step-size search parameters.
#[derive(Debug, Clone, Copy)]
pub struct LineSearchOptions<T> {
    /// Sub-iteration budget
    pub max_iters: usize,
    /// Growth factor a > 1 applied after an improvement
    pub grow: T,
    /// Shrink factor 0 < b < 1 applied before the first improvement
    pub shrink: T,
}

impl<T: Real> Default for LineSearchOptions<T> {
    fn default() -> Self {
        Self { max_iters: 15, grow: lit(1.3), shrink: lit(0.8) }
    }
}

impl<T: Real> LineSearchOptions<T> {
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.max_iters == 0 {
            return Err(ReconError::InvalidParameter("line search needs at least one sub-iteration".into()));
        }
        if !(self.grow.is_finite() && self.grow > T::one()) {
            return Err(ReconError::InvalidParameter("line search growth factor must exceed 1".into()));
        }
        if !(self.shrink > T::zero() && self.shrink < T::one()) {
            return Err(ReconError::InvalidParameter("line search shrink factor must lie in (0, 1)".into()));
        }
        Ok(())
    }
}

/// Outer-loop parameters.
#[derive(Debug, Clone, Copy)]
pub struct NlcgOptions<T> {
    /// Maximum number of outer iterations
    pub max_iters: usize,
    /// Step size tried by the first line search
    pub initial_step: T,
    /// Stop once the accepted step falls below this value
    pub step_tol: T,
    /// Stop once ⟨p, p⟩ · step falls below this value
    pub update_tol: Option<T>,
    /// Trace handling on convergence stops
    pub trace: TracePolicy,
    pub line_search: LineSearchOptions<T>,
}

impl<T: Real> Default for NlcgOptions<T> {
    fn default() -> Self {
        Self {
            max_iters: 100,
            initial_step: lit(2.0),
            step_tol: lit(2e-3),
            update_tol: None,
            trace: TracePolicy::IncludeTerminal,
            line_search: LineSearchOptions::default(),
        }
    }
}

impl<T: Real> NlcgOptions<T> {
    pub fn new(max_iters: usize) -> Self {
        Self { max_iters, ..Self::default() }
    }

    /// Free-function flavour: threshold 1e-4, terminal record kept.
    pub fn legacy_function(max_iters: usize) -> Self {
        Self { max_iters, step_tol: lit(1e-4), trace: TracePolicy::IncludeTerminal, ..Self::default() }
    }

    /// Object flavour: threshold 2e-3, terminal record dropped.
    pub fn legacy_object(max_iters: usize) -> Self {
        Self { max_iters, step_tol: lit(2e-3), trace: TracePolicy::ExcludeTerminal, ..Self::default() }
    }

    pub fn with_initial_step(mut self, step: T) -> Self {
        self.initial_step = step;
        self
    }

    pub fn with_step_tol(mut self, tol: T) -> Self {
        self.step_tol = tol;
        self
    }

    pub fn with_update_tol(mut self, tol: T) -> Self {
        self.update_tol = Some(tol);
        self
    }

    pub fn with_trace_policy(mut self, trace: TracePolicy) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_line_search(mut self, line_search: LineSearchOptions<T>) -> Self {
        self.line_search = line_search;
        self
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.max_iters == 0 {
            return Err(ReconError::InvalidParameter("max_iterations must be positive".into()));
        }
        if !(self.initial_step.is_finite() && self.initial_step > T::zero()) {
            return Err(ReconError::InvalidParameter("initial step must be finite and positive".into()));
        }
        if self.step_tol.is_nan() || self.step_tol < T::zero() {
            return Err(ReconError::InvalidParameter("step threshold must be non-negative".into()));
        }
        self.line_search.validate()
    }
}
