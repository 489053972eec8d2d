//! Fletcher–Reeves conjugate direction with an ε-guarded coefficient.
//!
//! ```text
//! p_0 = g_0
//! β_n = ⟨g_n, g_n⟩ / (⟨g_{n−1}, g_{n−1}⟩ + ε)
//! p_n = g_n + β_n p_{n−1}
//! ```
//!
//! No restart other than the first iteration.

use crate::core::array::ImageSequence;
use crate::core::traits::Real;

/// Direction state carried across outer iterations.
#[derive(Clone, Debug)]
pub struct ConjugateDirection<T> {
    prev_sqnorm: Option<T>,
    direction: Option<ImageSequence<T>>,
    beta: T,
}

impl<T: Real> ConjugateDirection<T> {
    pub fn new() -> Self {
        Self { prev_sqnorm: None, direction: None, beta: T::zero() }
    }

    /// Fold a new combined gradient into the direction and return it.
    pub fn update(&mut self, gradient: ImageSequence<T>) -> &ImageSequence<T> {
        let g2 = gradient.norm_sqr();
        let direction = match (self.prev_sqnorm, self.direction.take()) {
            (Some(g2_prev), Some(mut p)) => {
                self.beta = g2 / (g2_prev + T::epsilon());
                p.scale_add(self.beta, &gradient);
                p
            }
            _ => {
                self.beta = T::zero();
                gradient
            }
        };
        self.prev_sqnorm = Some(g2);
        self.direction.insert(direction)
    }

    /// Coefficient used by the latest update; zero on the first.
    pub fn beta(&self) -> T {
        self.beta
    }

    pub fn direction(&self) -> Option<&ImageSequence<T>> {
        self.direction.as_ref()
    }

    /// ⟨g, g⟩ of the latest gradient.
    pub fn previous_gradient_sqnorm(&self) -> Option<T> {
        self.prev_sqnorm
    }

    /// Forget all history; the next update starts a fresh direction.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T: Real> Default for ConjugateDirection<T> {
    fn default() -> Self {
        Self::new()
    }
}
