//! Data-consistency term ‖y_w − A x‖² / N and its descent gradient Aᴴ(y_w − A x).
//!
//! `y_w` is the measured k-space pre-weighted by √w; the operator applies √w
//! on both its forward and adjoint paths, so the gradient equals
//! `Fᴴ Sᴴ w (y − F S x)`. Frames are independent and are evaluated through
//! [`Backend::map_frames`]; under a distributed backend each process handles
//! its own frames and the partial gradient and cost are summed.

use crate::core::array::{ImageSequence, KSpaceDataset};
use crate::core::traits::{DataFidelity, MeasurementOperator, Real, lit};
use crate::error::ReconError;
use crate::parallel::{Backend, Comm};
use num_complex::Complex;
use num_traits::Zero;

pub struct KSpaceFidelity<'b, T, A> {
    operator: A,
    kspace: KSpaceDataset<T>,
    backend: &'b Backend,
}

impl<'b, T: Real, A: MeasurementOperator<T>> KSpaceFidelity<'b, T, A> {
    /// `kspace` must already carry the √w weighting.
    pub fn new(operator: A, kspace: KSpaceDataset<T>, backend: &'b Backend) -> Result<Self, ReconError> {
        let (channels, samples) = operator.kspace_dims();
        ReconError::check_dim("k-space frames", operator.frames(), kspace.frames())?;
        ReconError::check_dim("k-space channels", channels, kspace.channels())?;
        ReconError::check_dim("k-space samples", samples, kspace.samples())?;
        Ok(Self { operator, kspace, backend })
    }

    pub fn operator(&self) -> &A {
        &self.operator
    }

    pub fn kspace(&self) -> &KSpaceDataset<T> {
        &self.kspace
    }

    /// Starting estimate Aᴴ y_w.
    pub fn initial_image(&self) -> ImageSequence<T> {
        let (frames, rows, cols) = self.image_shape();
        let op = &self.operator;
        let y = &self.kspace;
        let parts = self.backend.map_frames(frames, |k| {
            let mut img = vec![Complex::zero(); rows * cols];
            op.adjoint(k, y.frame(k), &mut img);
            img
        });
        let mut x = ImageSequence::zeros(frames, rows, cols);
        for (k, img) in parts {
            x.frame_mut(k).copy_from_slice(&img);
        }
        self.backend.all_reduce_complex(x.as_mut_slice());
        x
    }

    fn check_shape(&self, image: &ImageSequence<T>) {
        assert_eq!(image.shape(), self.image_shape(), "Image shape does not match the operator");
    }
}

/// r = y_w[k] − A_k x[k] together with Σ|r|².
fn residual<T: Real, A: MeasurementOperator<T>>(
    operator: &A,
    kspace: &KSpaceDataset<T>,
    k: usize,
    image: &[Complex<T>],
) -> (Vec<Complex<T>>, T) {
    let y = kspace.frame(k);
    let mut r = vec![Complex::zero(); y.len()];
    operator.forward(k, image, &mut r);
    let mut sq = T::zero();
    for (ri, yi) in r.iter_mut().zip(y) {
        *ri = *yi - *ri;
        sq = sq + ri.norm_sqr();
    }
    (r, sq)
}

impl<'b, T: Real, A: MeasurementOperator<T>> DataFidelity<T> for KSpaceFidelity<'b, T, A> {
    fn image_shape(&self) -> (usize, usize, usize) {
        let (rows, cols) = self.operator.image_dims();
        (self.operator.frames(), rows, cols)
    }

    fn gradient(&self, image: &ImageSequence<T>) -> (ImageSequence<T>, T) {
        self.check_shape(image);
        let (frames, rows, cols) = image.shape();
        let (op, y) = (&self.operator, &self.kspace);
        let parts = self.backend.map_frames(frames, |k| {
            let (r, sq) = residual(op, y, k, image.frame(k));
            let mut g = vec![Complex::zero(); rows * cols];
            op.adjoint(k, &r, &mut g);
            (g, sq)
        });
        let mut gradient = ImageSequence::zeros(frames, rows, cols);
        let mut sq = T::zero();
        for (k, (g, s)) in parts {
            gradient.frame_mut(k).copy_from_slice(&g);
            sq = sq + s;
        }
        self.backend.all_reduce_complex(gradient.as_mut_slice());
        let sq = self.backend.all_reduce_real(sq);
        (gradient, sq / lit::<T>(image.len() as f64))
    }

    fn cost(&self, image: &ImageSequence<T>) -> T {
        self.check_shape(image);
        let (op, y) = (&self.operator, &self.kspace);
        let parts = self.backend.map_frames(image.frames(), |k| residual(op, y, k, image.frame(k)).1);
        let sq = parts.into_iter().fold(T::zero(), |acc, (_, s)| acc + s);
        self.backend.all_reduce_real(sq) / lit::<T>(image.len() as f64)
    }

    fn consensus_step(&self, step: T) -> T {
        if self.backend.size() == 1 {
            return step;
        }
        let agreed = self.backend.broadcast(step.to_f64().unwrap_or(f64::NAN), 0);
        T::from_f64(agreed).unwrap_or_else(T::nan)
    }
}
