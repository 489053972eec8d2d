//! Explicit per-frame encoding matrices on top of Faer.
//!
//! Each frame owns a `samples × (rows·cols)` matrix `E_k`; forward is
//! `E_k x`, adjoint is `E_kᴴ y`. Useful for small systems where the encoding
//! is known in closed form, and for the identity operator.

use crate::core::traits::Real;
use crate::error::ReconError;
use crate::operator::FrequencyTransform;
use faer::Mat;
use num_complex::Complex;
use num_traits::{One, Zero};

pub struct DenseEncoding<T> {
    matrices: Vec<Mat<Complex<T>>>,
    rows: usize,
    cols: usize,
}

impl<T: Real> DenseEncoding<T> {
    /// Wrap one encoding matrix per frame; all must be `samples × (rows·cols)`.
    pub fn new(matrices: Vec<Mat<Complex<T>>>, rows: usize, cols: usize) -> Result<Self, ReconError> {
        let Some(first) = matrices.first() else {
            return Err(ReconError::InvalidParameter("at least one encoding matrix is required".into()));
        };
        let samples = first.nrows();
        for m in &matrices {
            ReconError::check_dim("encoding matrix rows", samples, m.nrows())?;
            ReconError::check_dim("encoding matrix cols", rows * cols, m.ncols())?;
        }
        Ok(Self { matrices, rows, cols })
    }

    /// Build `frames` matrices from `f(frame, sample, pixel)`.
    pub fn from_fn<F>(frames: usize, samples: usize, rows: usize, cols: usize, f: F) -> Result<Self, ReconError>
    where
        F: Fn(usize, usize, usize) -> Complex<T>,
    {
        let matrices = (0..frames)
            .map(|k| Mat::from_fn(samples, rows * cols, |i, j| f(k, i, j)))
            .collect();
        Self::new(matrices, rows, cols)
    }

    /// Identity encoding: one sample per pixel.
    pub fn identity(frames: usize, rows: usize, cols: usize) -> Self {
        let n = rows * cols;
        let matrices = (0..frames)
            .map(|_| Mat::from_fn(n, n, |i, j| if i == j { Complex::one() } else { Complex::zero() }))
            .collect();
        Self { matrices, rows, cols }
    }

    pub fn matrix(&self, frame: usize) -> &Mat<Complex<T>> {
        &self.matrices[frame]
    }
}

impl<T: Real> FrequencyTransform<T> for DenseEncoding<T> {
    fn frames(&self) -> usize {
        self.matrices.len()
    }

    fn samples(&self) -> usize {
        self.matrices.first().map_or(0, |m| m.nrows())
    }

    fn image_dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn forward(&self, frame: usize, image: &[Complex<T>], out: &mut [Complex<T>]) {
        let a = &self.matrices[frame];
        assert_eq!(a.nrows(), out.len(), "Output vector y has incorrect length");
        assert_eq!(a.ncols(), image.len(), "Input vector x has incorrect length");
        for i in 0..a.nrows() {
            let mut acc: Complex<T> = Complex::zero();
            for j in 0..a.ncols() {
                acc = acc + a[(i, j)] * image[j];
            }
            out[i] = acc;
        }
    }

    fn adjoint(&self, frame: usize, samples: &[Complex<T>], out: &mut [Complex<T>]) {
        let a = &self.matrices[frame];
        assert_eq!(a.ncols(), out.len(), "Output vector y has incorrect length");
        assert_eq!(a.nrows(), samples.len(), "Input vector x has incorrect length");
        for j in 0..a.ncols() {
            let mut acc: Complex<T> = Complex::zero();
            for i in 0..a.nrows() {
                acc = acc + a[(i, j)].conj() * samples[i];
            }
            out[j] = acc;
        }
    }
}
