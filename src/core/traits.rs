//! Core traits for tvrecon: the scalar bound, the measurement operator contract,
//! and the two pluggable objective terms the solver is parameterized over.

use crate::core::array::ImageSequence;
use num_complex::Complex;
use num_traits::{Float, FromPrimitive};

/// Real scalar type underlying every complex array (`f32` or `f64`).
pub trait Real: Float + FromPrimitive + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Real for T where T: Float + FromPrimitive + Send + Sync + std::fmt::Debug + 'static {}

/// Converts a literal into `T`; NaN if it is not representable.
#[inline]
pub(crate) fn lit<T: Real>(x: f64) -> T {
    T::from_f64(x).unwrap_or_else(T::nan)
}

/// Lossy view of `T` for logging.
#[inline]
pub(crate) fn as_f64<T: Real>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

/// Per-frame encoding operator y = A x and its adjoint x = Aᴴ y.
///
/// `image` slices hold `rows * cols` pixels (row-major), `kspace` slices hold
/// `channels * samples` values (channel-major). `forward` and `adjoint` must be
/// formal adjoints under the standard complex inner product.
pub trait MatVecFrame<T: Real> {
    /// Compute out = A_frame · image.
    fn forward(&self, frame: usize, image: &[Complex<T>], out: &mut [Complex<T>]);
    /// Compute out = A_frameᴴ · kspace.
    fn adjoint(&self, frame: usize, kspace: &[Complex<T>], out: &mut [Complex<T>]);
}

/// Shape information of a measurement operator.
pub trait MeasurementOperator<T: Real>: MatVecFrame<T> + Send + Sync {
    /// Number of frames the operator encodes.
    fn frames(&self) -> usize;
    /// (rows, cols) of one image frame.
    fn image_dims(&self) -> (usize, usize);
    /// (channels, samples) of one k-space frame.
    fn kspace_dims(&self) -> (usize, usize);
}

/// Data-consistency term of the objective.
pub trait DataFidelity<T: Real> {
    /// (frames, rows, cols) of the images this term accepts.
    fn image_shape(&self) -> (usize, usize, usize);
    /// Descent gradient Aᴴ(y − A x) together with the mean squared residual.
    fn gradient(&self, image: &ImageSequence<T>) -> (ImageSequence<T>, T);
    /// Mean squared residual only.
    fn cost(&self, image: &ImageSequence<T>) -> T;
    /// Agree on an accepted step across cooperating processes.
    fn consensus_step(&self, step: T) -> T {
        step
    }
}

/// Regularization term of the objective.
pub trait Regularizer<T: Real> {
    /// Weight applied to `gradient` when it is added to the fidelity gradient.
    fn lambda(&self) -> T;
    /// Unweighted descent gradient of the (smoothed) penalty.
    fn gradient(&self, image: &ImageSequence<T>) -> ImageSequence<T>;
    /// Weighted penalty value, already including `lambda`.
    fn cost(&self, image: &ImageSequence<T>) -> T;
}
