//! Convergence tracking & stopping checks for the NLCG solver.

use crate::core::traits::Real;

/// Why the outer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Accepted step fell below `step_tol`.
    StepCollapse,
    /// ⟨p, p⟩ · step fell below `update_tol`.
    UpdateTolerance,
    /// Iteration budget exhausted.
    MaxIterations,
}

impl StopReason {
    /// Both threshold stops count as convergence.
    pub fn is_converged(self) -> bool {
        !matches!(self, StopReason::MaxIterations)
    }
}

/// Stopping criteria.
pub struct Convergence<T> {
    pub step_tol: T,
    pub update_tol: Option<T>,
    pub max_iters: usize,
}

impl<T: Real> Convergence<T> {
    /// Returns the stop reason, if any, after `i` completed iterations.
    pub fn check(&self, step: T, update_sqnorm: T, i: usize) -> Option<StopReason> {
        if step < self.step_tol {
            return Some(StopReason::StepCollapse);
        }
        if let Some(tol) = self.update_tol {
            if update_sqnorm * step < tol {
                return Some(StopReason::UpdateTolerance);
            }
        }
        if i >= self.max_iters {
            return Some(StopReason::MaxIterations);
        }
        None
    }
}

/// Cost components of one completed iteration, measured before its step is applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CostRecord<T> {
    pub iteration: usize,
    pub fidelity: T,
    pub temporal: T,
    pub total: T,
    /// Step accepted by the line search
    pub step: T,
}

/// Append-only per-iteration cost history.
#[derive(Clone, Debug, Default)]
pub struct CostTrace<T> {
    records: Vec<CostRecord<T>>,
}

impl<T: Real> CostTrace<T> {
    pub fn new() -> Self {
        Self { records: Vec::new() }
    }

    pub fn push(&mut self, record: CostRecord<T>) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CostRecord<T>] {
        &self.records
    }

    pub fn last(&self) -> Option<&CostRecord<T>> {
        self.records.last()
    }

    pub fn fidelity(&self) -> Vec<T> {
        self.records.iter().map(|r| r.fidelity).collect()
    }

    pub fn temporal(&self) -> Vec<T> {
        self.records.iter().map(|r| r.temporal).collect()
    }

    pub fn total(&self) -> Vec<T> {
        self.records.iter().map(|r| r.total).collect()
    }

    pub fn steps(&self) -> Vec<T> {
        self.records.iter().map(|r| r.step).collect()
    }
}

#[derive(Clone, Debug)]
pub struct ReconStats<T> {
    /// Outer iterations whose step was applied to the image
    pub iterations: usize,
    /// `None` when the caller stopped iterating first
    pub stop_reason: Option<StopReason>,
    /// Total cost of the last recorded iteration, if any
    pub final_cost: Option<T>,
    pub converged: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_collapse_takes_precedence() {
        let conv = Convergence { step_tol: 2e-3, update_tol: Some(1e-6), max_iters: 3 };
        assert_eq!(conv.check(1e-3, 0.0, 3), Some(StopReason::StepCollapse));
        assert_eq!(conv.check(1.0, 1e-9, 1), Some(StopReason::UpdateTolerance));
        assert_eq!(conv.check(1.0, 1.0, 3), Some(StopReason::MaxIterations));
        assert_eq!(conv.check(1.0, 1.0, 2), None);
    }

    #[test]
    fn trace_splits_components() {
        let mut trace = CostTrace::new();
        trace.push(CostRecord { iteration: 0, fidelity: 1.0, temporal: 0.5, total: 1.5, step: 2.0 });
        trace.push(CostRecord { iteration: 1, fidelity: 0.5, temporal: 0.25, total: 0.75, step: 2.6 });
        assert_eq!(trace.fidelity(), vec![1.0, 0.5]);
        assert_eq!(trace.temporal(), vec![0.5, 0.25]);
        assert_eq!(trace.total(), vec![1.5, 0.75]);
        assert_eq!(trace.steps(), vec![2.0, 2.6]);
    }
}
