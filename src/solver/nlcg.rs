//! Nonlinear conjugate gradient on fidelity + temporal TV.
//!
//! One outer iteration:
//!
//! 1. `g = ∇fidelity(x) + λ ∇tv(x)` (descent convention) and the total cost;
//! 2. `p = g + β p_prev` ([`ConjugateDirection`]);
//! 3. line search from the previous accepted step, the total cost as reference;
//! 4. `x ← x + step · p`, one [`CostRecord`] for the costs measured at step 1;
//! 5. stop when the step collapses, the optional update criterion fires, or the
//!    iteration budget is spent.
//!
//! [`NlcgIter`] yields one record per iteration so the caller can stop early;
//! [`NlcgSolver::solve`] drains it and feeds the optional observer.

use crate::config::{NlcgOptions, TracePolicy};
use crate::core::array::ImageSequence;
use crate::core::traits::{DataFidelity, Real, Regularizer, as_f64};
use crate::error::ReconError;
use crate::solver::conjugate::ConjugateDirection;
use crate::solver::line_search::LineSearch;
use crate::utils::convergence::{Convergence, CostRecord, CostTrace, ReconStats, StopReason};

/// Per-iteration observer hook.
pub type Observer<T> = Box<dyn FnMut(&CostRecord<T>)>;

pub struct NlcgSolver<T> {
    pub opts: NlcgOptions<T>,
    pub observer: Option<Observer<T>>,
}

impl<T: Real> NlcgSolver<T> {
    pub fn new(opts: NlcgOptions<T>) -> Self {
        Self { opts, observer: None }
    }

    pub fn with_observer<F>(mut self, f: F) -> Self
    where
        F: FnMut(&CostRecord<T>) + 'static,
    {
        self.observer = Some(Box::new(f));
        self
    }

    /// Validates inputs and returns the iteration driver. Nothing is evaluated
    /// until the first call to `next`.
    pub fn iter<'s, D, R>(
        &self,
        fidelity: &'s D,
        regularizer: &'s R,
        initial: ImageSequence<T>,
    ) -> Result<NlcgIter<'s, T, D, R>, ReconError>
    where
        D: DataFidelity<T> + ?Sized,
        R: Regularizer<T> + ?Sized,
    {
        self.opts.validate()?;
        if !regularizer.lambda().is_finite() {
            return Err(ReconError::InvalidParameter("regularization weight must be finite".into()));
        }
        let (frames, rows, cols) = fidelity.image_shape();
        if frames < 2 {
            return Err(ReconError::TooFewFrames(frames));
        }
        ReconError::check_dim("image frames", frames, initial.frames())?;
        ReconError::check_dim("image rows", rows, initial.rows())?;
        ReconError::check_dim("image cols", cols, initial.cols())?;

        Ok(NlcgIter {
            fidelity,
            regularizer,
            trace_policy: self.opts.trace,
            line_search: LineSearch::new(self.opts.line_search),
            conv: Convergence {
                step_tol: self.opts.step_tol,
                update_tol: self.opts.update_tol,
                max_iters: self.opts.max_iters,
            },
            state: NlcgState {
                image: initial,
                direction: ConjugateDirection::new(),
                step: self.opts.initial_step,
                iteration: 0,
                trace: CostTrace::new(),
            },
            stop: None,
        })
    }

    /// Run to termination.
    pub fn solve<D, R>(
        &mut self,
        fidelity: &D,
        regularizer: &R,
        initial: ImageSequence<T>,
    ) -> Result<Reconstruction<T>, ReconError>
    where
        D: DataFidelity<T> + ?Sized,
        R: Regularizer<T> + ?Sized,
    {
        let mut iter = self.iter(fidelity, regularizer, initial)?;
        for record in iter.by_ref() {
            if let Some(ref mut observer) = self.observer {
                observer(&record);
            }
        }
        Ok(iter.finish())
    }
}

/// Everything carried from one outer iteration to the next.
#[derive(Clone, Debug)]
pub struct NlcgState<T> {
    pub image: ImageSequence<T>,
    pub direction: ConjugateDirection<T>,
    /// Step the next line search starts from
    pub step: T,
    /// Completed iterations
    pub iteration: usize,
    pub trace: CostTrace<T>,
}

pub struct NlcgIter<'s, T, D: ?Sized, R: ?Sized> {
    fidelity: &'s D,
    regularizer: &'s R,
    trace_policy: TracePolicy,
    line_search: LineSearch<T>,
    conv: Convergence<T>,
    state: NlcgState<T>,
    stop: Option<StopReason>,
}

impl<'s, T, D, R> NlcgIter<'s, T, D, R>
where
    T: Real,
    D: DataFidelity<T> + ?Sized,
    R: Regularizer<T> + ?Sized,
{
    pub fn state(&self) -> &NlcgState<T> {
        &self.state
    }

    pub fn image(&self) -> &ImageSequence<T> {
        &self.state.image
    }

    /// `None` while running or if the caller stopped first.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    pub fn finish(self) -> Reconstruction<T> {
        let NlcgState { image, iteration, trace, .. } = self.state;
        let stats = ReconStats {
            iterations: iteration,
            stop_reason: self.stop,
            final_cost: trace.last().map(|r| r.total),
            converged: self.stop.is_some_and(StopReason::is_converged),
        };
        Reconstruction { image, trace, stats }
    }
}

impl<'s, T, D, R> Iterator for NlcgIter<'s, T, D, R>
where
    T: Real,
    D: DataFidelity<T> + ?Sized,
    R: Regularizer<T> + ?Sized,
{
    type Item = CostRecord<T>;

    fn next(&mut self) -> Option<CostRecord<T>> {
        if self.stop.is_some() {
            return None;
        }
        let (fidelity, regularizer) = (self.fidelity, self.regularizer);
        let s = &mut self.state;

        let (mut gradient, fidelity_cost) = fidelity.gradient(&s.image);
        let lambda = regularizer.lambda();
        if lambda != T::zero() {
            gradient.axpy(lambda, &regularizer.gradient(&s.image));
        }
        let temporal_cost = regularizer.cost(&s.image);
        let total = fidelity_cost + temporal_cost;

        let direction = s.direction.update(gradient);
        let outcome = self.line_search.search(&s.image, direction, total, s.step, |x| {
            fidelity.cost(x) + regularizer.cost(x)
        });
        let step = fidelity.consensus_step(outcome.step);
        let update_sqnorm = match self.conv.update_tol {
            Some(_) => direction.norm_sqr(),
            None => T::zero(),
        };
        s.image.axpy(step, direction);
        s.step = step;
        s.iteration += 1;

        let record = CostRecord {
            iteration: s.iteration - 1,
            fidelity: fidelity_cost,
            temporal: temporal_cost,
            total,
            step,
        };
        log::debug!(
            "nlcg iter {}: step={:.4e} fidelity={:.6e} temporal={:.6e} total={:.6e} beta={:.3e}",
            record.iteration,
            as_f64(step),
            as_f64(fidelity_cost),
            as_f64(temporal_cost),
            as_f64(total),
            as_f64(s.direction.beta())
        );

        if let Some(reason) = self.conv.check(step, update_sqnorm, s.iteration) {
            self.stop = Some(reason);
            log::info!("nlcg stopped after {} iterations: {:?}", s.iteration, reason);
            if reason.is_converged() && self.trace_policy == TracePolicy::ExcludeTerminal {
                return None;
            }
        }
        s.trace.push(record);
        Some(record)
    }
}

/// Final image with its cost history.
#[derive(Clone, Debug)]
pub struct Reconstruction<T> {
    pub image: ImageSequence<T>,
    pub trace: CostTrace<T>,
    pub stats: ReconStats<T>,
}

impl<T: Real> Reconstruction<T> {
    pub fn fidelity_trace(&self) -> Vec<T> {
        self.trace.fidelity()
    }

    pub fn temporal_trace(&self) -> Vec<T> {
        self.trace.temporal()
    }

    pub fn cost_trace(&self) -> Vec<T> {
        self.trace.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objective::TemporalTv;
    use approx::assert_abs_diff_eq;
    use num_complex::Complex;
    use std::cell::Cell;
    use std::rc::Rc;

    /// ‖x − t‖² / N with descent gradient t − x.
    struct Target(ImageSequence<f64>);

    impl DataFidelity<f64> for Target {
        fn image_shape(&self) -> (usize, usize, usize) {
            self.0.shape()
        }

        fn gradient(&self, image: &ImageSequence<f64>) -> (ImageSequence<f64>, f64) {
            let g = self.0.add_scaled(-1.0, image);
            let cost = g.norm_sqr() / image.len() as f64;
            (g, cost)
        }

        fn cost(&self, image: &ImageSequence<f64>) -> f64 {
            self.gradient(image).1
        }
    }

    fn target(frames: usize) -> Target {
        Target(ImageSequence::from_fn(frames, 2, 2, |k, r, c| {
            Complex::new(1.0 + r as f64 + 0.1 * k as f64, c as f64 - 0.5)
        }))
    }

    #[test]
    fn rejects_single_frame() {
        let fid = target(1);
        let err = NlcgSolver::new(NlcgOptions::new(5))
            .iter(&fid, &TemporalTv::new(0.1), ImageSequence::zeros(1, 2, 2))
            .err();
        assert!(matches!(err, Some(ReconError::TooFewFrames(1))));
    }

    #[test]
    fn rejects_wrong_initial_shape() {
        let fid = target(3);
        let err = NlcgSolver::new(NlcgOptions::new(5))
            .iter(&fid, &TemporalTv::new(0.1), ImageSequence::zeros(3, 2, 3))
            .err();
        assert!(matches!(err, Some(ReconError::ShapeMismatch { what: "image cols", .. })));
    }

    #[test]
    fn rejects_non_finite_lambda() {
        let fid = target(2);
        let tv = TemporalTv::new(f64::NAN);
        let res = NlcgSolver::new(NlcgOptions::new(5)).iter(&fid, &tv, ImageSequence::zeros(2, 2, 2));
        assert!(matches!(res.err(), Some(ReconError::InvalidParameter(_))));
    }

    #[test]
    fn stationary_start_collapses_step() {
        // zero gradient: every line search shrinks 15 times, 2 · 0.8^45 < 2e-3 after 3 iterations
        let fid = target(2);
        let x0 = fid.0.clone();
        let out = NlcgSolver::new(NlcgOptions::new(50)).solve(&fid, &TemporalTv::new(0.0), x0.clone()).unwrap();
        assert_eq!(out.stats.stop_reason, Some(StopReason::StepCollapse));
        assert!(out.stats.converged);
        assert_eq!(out.stats.iterations, 3);
        assert_eq!(out.trace.len(), 3);
        assert_eq!(out.image, x0);
    }

    #[test]
    fn exclude_terminal_drops_last_record() {
        let fid = target(2);
        let opts = NlcgOptions::new(50).with_trace_policy(TracePolicy::ExcludeTerminal);
        let out = NlcgSolver::new(opts).solve(&fid, &TemporalTv::new(0.0), fid.0.clone()).unwrap();
        assert_eq!(out.stats.iterations, 3);
        assert_eq!(out.trace.len(), 2);
    }

    #[test]
    fn max_iterations_keeps_every_record() {
        let fid = target(3);
        let opts = NlcgOptions::new(4).with_trace_policy(TracePolicy::ExcludeTerminal);
        let out = NlcgSolver::new(opts).solve(&fid, &TemporalTv::new(0.0), ImageSequence::zeros(3, 2, 2)).unwrap();
        assert_eq!(out.stats.stop_reason, Some(StopReason::MaxIterations));
        assert!(!out.stats.converged);
        assert_eq!(out.trace.len(), 4);
        assert_eq!(out.cost_trace().len(), 4);
    }

    #[test]
    fn first_step_follows_line_search() {
        // along p = t from 0 the cost is (1 − s)² C: 2 ties, 1.6 improves, 2.08 worsens
        let fid = target(2);
        let tv = TemporalTv::new(0.0);
        let mut it = NlcgSolver::new(NlcgOptions::new(10)).iter(&fid, &tv, ImageSequence::zeros(2, 2, 2)).unwrap();
        let first = it.next().unwrap();
        assert_abs_diff_eq!(first.step, 1.6, epsilon = 1e-12);
        for (a, b) in it.image().as_slice().iter().zip(fid.0.as_slice()) {
            assert_abs_diff_eq!(a.re, 1.6 * b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, 1.6 * b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn caller_can_stop_early() {
        let fid = target(2);
        let tv = TemporalTv::new(0.05);
        let mut it = NlcgSolver::new(NlcgOptions::new(100)).iter(&fid, &tv, ImageSequence::zeros(2, 2, 2)).unwrap();
        let taken: Vec<_> = it.by_ref().take(2).collect();
        assert_eq!(taken.len(), 2);
        assert_eq!(it.stop_reason(), None);
        let out = it.finish();
        assert_eq!(out.stats.iterations, 2);
        assert_eq!(out.stats.stop_reason, None);
        assert!(!out.stats.converged);
        assert_eq!(out.stats.final_cost, Some(taken[1].total));
    }

    #[test]
    fn observer_sees_every_record() {
        let fid = target(3);
        let seen = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&seen);
        let mut solver = NlcgSolver::new(NlcgOptions::<f64>::new(6)).with_observer(move |_| counter.set(counter.get() + 1));
        let out = solver.solve(&fid, &TemporalTv::new(0.01), ImageSequence::zeros(3, 2, 2)).unwrap();
        assert_eq!(seen.get(), out.trace.len());
    }

    #[test]
    fn update_tolerance_stops() {
        let fid = target(2);
        let opts = NlcgOptions::new(100).with_step_tol(0.0).with_update_tol(1e-3);
        let out = NlcgSolver::new(opts).solve(&fid, &TemporalTv::new(0.0), ImageSequence::zeros(2, 2, 2)).unwrap();
        assert_eq!(out.stats.stop_reason, Some(StopReason::UpdateTolerance));
        assert!(out.stats.iterations < 100);
    }

    #[test]
    fn quadratic_cost_does_not_increase() {
        let fid = target(4);
        let out = NlcgSolver::new(NlcgOptions::new(20)).solve(&fid, &TemporalTv::new(0.0), ImageSequence::zeros(4, 2, 2)).unwrap();
        let costs = out.cost_trace();
        for w in costs.windows(2) {
            assert!(w[1] <= w[0] + 1e-12, "cost rose from {} to {}", w[0], w[1]);
        }
        assert!(costs[costs.len() - 1] < costs[0]);
    }
}
