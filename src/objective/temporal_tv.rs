//! Temporal total variation along the frame axis.
//!
//! With `d[k] = x[k+1] − x[k]`, the penalty is `λ Σ |d[k]| / N`. Its gradient is
//! taken from the smoothed magnitude `d / √(|d|² + ε)` and pushed back through
//! the adjoint of the forward difference, with free ends:
//!
//! ```text
//! g[0]   =  n[0]
//! g[k]   =  n[k] − n[k−1]      0 < k < F−1
//! g[F−1] = −n[F−2]
//! ```
//!
//! The sign makes `g` a descent direction, matching the fidelity gradient.

use crate::core::array::ImageSequence;
use crate::core::traits::{Real, Regularizer, lit};
use num_complex::Complex;
use num_traits::Zero;

/// Smoothed-TV descent gradient, unweighted by λ.
pub fn temporal_gradient<T: Real>(image: &ImageSequence<T>) -> ImageSequence<T> {
    let (frames, rows, cols) = image.shape();
    let n = rows * cols;
    let eps = T::epsilon();
    let mut g = ImageSequence::zeros(frames, rows, cols);
    // n[k-1]; zero ahead of the first frame
    let mut prev = vec![Complex::<T>::zero(); n];
    for k in 0..frames {
        let out = g.frame_mut(k);
        if k + 1 < frames {
            let (a, b) = (image.frame(k), image.frame(k + 1));
            for p in 0..n {
                let d = b[p] - a[p];
                let nd = d / (d.norm_sqr() + eps).sqrt();
                out[p] = nd - prev[p];
                prev[p] = nd;
            }
        } else {
            for p in 0..n {
                out[p] = -prev[p];
            }
        }
    }
    g
}

/// λ Σ_k Σ_p |x[k+1, p] − x[k, p]| / N, unsmoothed.
pub fn temporal_cost<T: Real>(image: &ImageSequence<T>, lambda: T) -> T {
    let frames = image.frames();
    let mut sum = T::zero();
    for k in 1..frames {
        for (b, a) in image.frame(k).iter().zip(image.frame(k - 1)) {
            sum = sum + (*b - *a).norm();
        }
    }
    lambda * sum / lit::<T>(image.len() as f64)
}

/// Temporal TV regularizer with weight λ.
#[derive(Clone, Copy, Debug)]
pub struct TemporalTv<T> {
    lambda: T,
}

impl<T: Real> TemporalTv<T> {
    /// λ ≤ 0 is accepted; it disables meaningful smoothing.
    pub fn new(lambda: T) -> Self {
        if !(lambda > T::zero()) {
            log::warn!("temporal TV weight {:?} is not positive; smoothing is disabled", lambda);
        }
        Self { lambda }
    }
}

impl<T: Real> Regularizer<T> for TemporalTv<T> {
    fn lambda(&self) -> T {
        self.lambda
    }

    fn gradient(&self, image: &ImageSequence<T>) -> ImageSequence<T> {
        temporal_gradient(image)
    }

    fn cost(&self, image: &ImageSequence<T>) -> T {
        temporal_cost(image, self.lambda)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    fn smooth(d: Complex<f64>) -> Complex<f64> {
        d / (d.norm_sqr() + f64::EPSILON).sqrt()
    }

    #[test]
    fn constant_sequence_has_zero_gradient_and_cost() {
        let x = ImageSequence::from_fn(4, 2, 3, |_, r, col| c(r as f64 - 1.0, col as f64 * 0.5));
        let g = temporal_gradient(&x);
        assert!(g.as_slice().iter().all(|v| v.norm() == 0.0));
        assert_eq!(temporal_cost(&x, 0.7), 0.0);
    }

    #[test]
    fn boundary_frames_use_one_sided_differences() {
        // frames A, B, C of a single pixel
        let (a, b, cc) = (c(1.0, 0.0), c(3.0, 1.0), c(2.0, -2.0));
        let x = ImageSequence::from_vec(3, 1, 1, vec![a, b, cc]).unwrap();
        let g = temporal_gradient(&x);
        let n0 = smooth(b - a);
        let n1 = smooth(cc - b);
        let expected = [n0, n1 - n0, -n1];
        for (got, want) in g.as_slice().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(got.re, want.re, epsilon = 1e-14);
            assert_abs_diff_eq!(got.im, want.im, epsilon = 1e-14);
        }
    }

    #[test]
    fn first_frame_ignores_later_differences() {
        let x1 = ImageSequence::from_vec(3, 1, 1, vec![c(0.0, 0.0), c(1.0, 0.0), c(5.0, 0.0)]).unwrap();
        let x2 = ImageSequence::from_vec(3, 1, 1, vec![c(0.0, 0.0), c(1.0, 0.0), c(-7.0, 2.0)]).unwrap();
        let (g1, g2) = (temporal_gradient(&x1), temporal_gradient(&x2));
        assert_eq!(g1.get(0, 0, 0), g2.get(0, 0, 0));
        assert_ne!(g1.get(2, 0, 0), g2.get(2, 0, 0));
    }

    #[test]
    fn cost_is_weighted_mean_abs_difference() {
        let x = ImageSequence::from_vec(2, 1, 2, vec![c(0.0, 0.0), c(1.0, 1.0), c(3.0, 4.0), c(1.0, 1.0)]).unwrap();
        // |3+4i| = 5, second pixel unchanged; N = 4
        assert_abs_diff_eq!(temporal_cost(&x, 2.0), 2.0 * 5.0 / 4.0, epsilon = 1e-14);
        assert_abs_diff_eq!(TemporalTv::new(2.0).cost(&x), 2.5, epsilon = 1e-14);
    }

    #[test]
    fn gradient_sums_to_zero_over_frames() {
        let x = ImageSequence::from_fn(5, 1, 2, |k, _, col| c((k * k) as f64, col as f64 - k as f64));
        let g = temporal_gradient(&x);
        for p in 0..2 {
            let s: Complex<f64> = (0..5).map(|k| g.frame(k)[p]).sum();
            assert_abs_diff_eq!(s.norm(), 0.0, epsilon = 1e-14);
        }
    }
}
