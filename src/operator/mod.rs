//! Measurement operators.
//!
//! The solver only consumes [`MeasurementOperator`](crate::core::MeasurementOperator).
//! This module provides the multi-coil composition used for non-Cartesian
//! acquisitions,
//!
//! ```text
//! forward:  y_c = √w ⊙ F(S_c ⊙ x)
//! adjoint:  x   = Σ_c conj(S_c) ⊙ Fᴴ(√w ⊙ y_c)
//! ```
//!
//! and two single-channel transforms `F` to plug into it:
//!
//! - [`NudftTransform`]: exact non-uniform DFT on a 2-D trajectory.
//! - [`DenseEncoding`]: explicit per-frame encoding matrices.
//!
//! A fast NUFFT can be used by implementing [`FrequencyTransform`].

use crate::core::traits::Real;
use num_complex::Complex;

pub mod dense;
pub mod nudft;
pub mod sense;

pub use dense::DenseEncoding;
pub use nudft::NudftTransform;
pub use sense::SenseOperator;

/// Single-channel transform between one image frame and that frame's samples.
pub trait FrequencyTransform<T: Real>: Send + Sync {
    /// Number of frames (one trajectory each).
    fn frames(&self) -> usize;
    /// Samples per frame.
    fn samples(&self) -> usize;
    /// (rows, cols) of the image grid.
    fn image_dims(&self) -> (usize, usize);
    /// out (samples) = F_frame · image (rows * cols)
    fn forward(&self, frame: usize, image: &[Complex<T>], out: &mut [Complex<T>]);
    /// out (rows * cols) = F_frameᴴ · samples
    fn adjoint(&self, frame: usize, samples: &[Complex<T>], out: &mut [Complex<T>]);
}
