//! Adaptive bidirectional step-size search.
//!
//! Starting from `initial_step`, each sub-iteration evaluates the cost at
//! `x + step · p`:
//!
//! - decrease: accept it as the new reference and grow the step by `a`;
//! - no decrease before any improvement: shrink the step by `b`;
//! - no decrease after an improvement: divide once by `a` and stop, the
//!   minimum along `p` is bracketed.
//!
//! The search ends after at most `max_iters` evaluations and returns the last
//! step it computed, which need not have been evaluated. It is a bracketing
//! heuristic, not an exact line search.

use crate::config::LineSearchOptions;
use crate::core::array::ImageSequence;
use crate::core::traits::{Real, as_f64};

/// Result of one search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSearchOutcome<T> {
    pub step: T,
    /// Cost evaluations spent
    pub evaluations: usize,
    /// At least one candidate decreased the cost
    pub improved: bool,
    /// Stopped on the first increase after an improvement
    pub bracketed: bool,
    /// Lowest cost seen, or the reference if nothing improved
    pub best_cost: T,
}

pub struct LineSearch<T> {
    pub opts: LineSearchOptions<T>,
}

impl<T: Real> LineSearch<T> {
    pub fn new(opts: LineSearchOptions<T>) -> Self {
        Self { opts }
    }

    /// Search along `direction` from `image`; `cost` evaluates the total objective.
    pub fn search<F>(
        &self,
        image: &ImageSequence<T>,
        direction: &ImageSequence<T>,
        cost_reference: T,
        initial_step: T,
        mut cost: F,
    ) -> LineSearchOutcome<T>
    where
        F: FnMut(&ImageSequence<T>) -> T,
    {
        let (a, b) = (self.opts.grow, self.opts.shrink);
        let mut step = initial_step;
        let mut reference = cost_reference;
        let mut improved = false;
        let mut bracketed = false;
        let mut evaluations = 0;

        while evaluations < self.opts.max_iters {
            let candidate = image.add_scaled(step, direction);
            let c = cost(&candidate);
            evaluations += 1;
            log::trace!(
                "line search {}: step={:.5e} cost={:.6e} reference={:.6e}",
                evaluations,
                as_f64(step),
                as_f64(c),
                as_f64(reference)
            );
            if c < reference {
                step = step * a;
                reference = c;
                improved = true;
            } else if improved {
                step = step / a;
                bracketed = true;
                break;
            } else {
                step = step * b;
            }
        }

        if !improved {
            log::debug!(
                "line search found no decrease in {} evaluations, step now {:.3e}",
                evaluations,
                as_f64(step)
            );
        }
        LineSearchOutcome { step, evaluations, improved, bracketed, best_cost: reference }
    }
}

impl<T: Real> Default for LineSearch<T> {
    fn default() -> Self {
        Self::new(LineSearchOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use num_complex::Complex;

    fn scalar(v: f64) -> ImageSequence<f64> {
        ImageSequence::from_vec(2, 1, 1, vec![Complex::new(v, 0.0), Complex::new(0.0, 0.0)]).unwrap()
    }

    /// (t − target)² along a unit direction from 0.
    fn parabola(target: f64) -> impl FnMut(&ImageSequence<f64>) -> f64 {
        move |x: &ImageSequence<f64>| (x.get(0, 0, 0).re - target).powi(2)
    }

    #[test]
    fn grows_until_first_increase_then_backs_off() {
        let ls = LineSearch::default();
        let out = ls.search(&scalar(0.0), &scalar(1.0), 100.0, 2.0, parabola(10.0));
        // steps tried: 2, 2.6, 3.38, 4.394, 5.7122, 7.42586, 9.653618, 12.5497034 (worse)
        assert!(out.improved && out.bracketed);
        assert_eq!(out.evaluations, 8);
        assert_relative_eq!(out.step, 2.0 * 1.3f64.powi(6), epsilon = 1e-12);
    }

    #[test]
    fn shrinks_while_nothing_improves() {
        let ls = LineSearch::default();
        // every positive step overshoots a target just ahead
        let out = ls.search(&scalar(0.0), &scalar(1.0), 1e-4, 2.0, parabola(0.001));
        assert!(!out.improved);
        assert_eq!(out.evaluations, 15);
        assert_relative_eq!(out.step, 2.0 * 0.8f64.powi(15), epsilon = 1e-12);
    }

    #[test]
    fn shrinks_then_grows_then_stops() {
        let ls = LineSearch::default();
        let out = ls.search(&scalar(0.0), &scalar(1.0), 1.0, 2.0, parabola(0.5));
        // 2 (2.25) → 1.6 (1.21) → 1.28 (0.608 < 1) → grow 1.664 (1.355, worse) → back to 1.28
        assert!(out.improved && out.bracketed);
        assert_eq!(out.evaluations, 4);
        assert_relative_eq!(out.step, 2.0 * 0.8f64.powi(2), epsilon = 1e-12);
    }

    #[test]
    fn zero_direction_collapses_step() {
        let ls = LineSearch::default();
        let out = ls.search(&scalar(1.0), &scalar(0.0), 0.0, 2.0, |_: &ImageSequence<f64>| 0.0);
        assert!(!out.improved);
        assert_eq!(out.evaluations, 15);
        assert!(out.step < 0.1);
    }

    #[test]
    fn never_exceeds_budget() {
        let opts = LineSearchOptions { max_iters: 4, grow: 1.3, shrink: 0.8 };
        let ls = LineSearch::new(opts);
        let mut calls = 0;
        // strictly decreasing along the ray: never brackets
        let out = ls.search(&scalar(0.0), &scalar(1.0), 0.0, 1.0, |x: &ImageSequence<f64>| {
            calls += 1;
            -x.get(0, 0, 0).re
        });
        assert_eq!(calls, 4);
        assert_eq!(out.evaluations, 4);
        assert!(out.improved && !out.bracketed);
    }

    #[test]
    fn candidates_do_not_touch_the_image() {
        let ls = LineSearch::default();
        let x = scalar(3.0);
        let before = x.clone();
        ls.search(&x, &scalar(1.0), 1.0, 2.0, parabola(4.0));
        assert_eq!(x, before);
    }
}
