//! Exact non-uniform discrete Fourier transform on a 2-D trajectory.
//!
//! Each sample `k = (k_r, k_c)`, given in cycles per field of view, maps a
//! centred `rows × cols` grid to
//!
//! ```text
//! y(k) = 1/√(rows·cols) · Σ_{r,c} x[r,c] · exp(-2πi (k_r (r - rows/2) / rows + k_c (c - cols/2) / cols))
//! ```
//!
//! The adjoint uses the conjugate kernel with the same scaling. Cost is
//! O(samples · pixels) per frame and channel, so this serves as the reference
//! transform for small problems and for validating faster transforms.

use crate::core::array::Trajectory;
use crate::core::traits::{Real, lit};
use crate::error::ReconError;
use crate::operator::FrequencyTransform;
use num_complex::Complex;
use num_traits::Zero;

pub struct NudftTransform<T> {
    trajectory: Trajectory<T>,
    rows: usize,
    cols: usize,
    scale: T,
}

impl<T: Real> NudftTransform<T> {
    pub fn new(trajectory: Trajectory<T>, rows: usize, cols: usize) -> Result<Self, ReconError> {
        ReconError::check_dim("trajectory dims", 2, trajectory.dims())?;
        if rows == 0 || cols == 0 {
            return Err(ReconError::InvalidParameter("image grid must be non-empty".into()));
        }
        let scale = T::one() / lit::<T>((rows * cols) as f64).sqrt();
        Ok(Self { trajectory, rows, cols, scale })
    }

    pub fn trajectory(&self) -> &Trajectory<T> {
        &self.trajectory
    }

    /// Separable kernels exp(-2πi k_r (r - r0)/rows) and exp(-2πi k_c (c - c0)/cols).
    fn kernels(&self, frame: usize, sample: usize) -> (Vec<Complex<T>>, Vec<Complex<T>>) {
        let k = self.trajectory.coord(frame, sample);
        let two_pi = lit::<T>(2.0 * std::f64::consts::PI);
        let axis = |kk: T, n: usize| -> Vec<Complex<T>> {
            let n_t = lit::<T>(n as f64);
            let centre = lit::<T>((n / 2) as f64);
            (0..n)
                .map(|i| Complex::cis(-two_pi * kk * (lit::<T>(i as f64) - centre) / n_t))
                .collect()
        };
        (axis(k[0], self.rows), axis(k[1], self.cols))
    }
}

impl<T: Real> FrequencyTransform<T> for NudftTransform<T> {
    fn frames(&self) -> usize {
        self.trajectory.frames()
    }

    fn samples(&self) -> usize {
        self.trajectory.samples()
    }

    fn image_dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn forward(&self, frame: usize, image: &[Complex<T>], out: &mut [Complex<T>]) {
        assert_eq!(image.len(), self.rows * self.cols, "Input image has incorrect length");
        assert_eq!(out.len(), self.samples(), "Output samples have incorrect length");
        for (s, o) in out.iter_mut().enumerate() {
            let (er, ec) = self.kernels(frame, s);
            let mut acc: Complex<T> = Complex::zero();
            for r in 0..self.rows {
                let row = &image[r * self.cols..(r + 1) * self.cols];
                let mut row_acc: Complex<T> = Complex::zero();
                for (x, e) in row.iter().zip(&ec) {
                    row_acc = row_acc + *x * *e;
                }
                acc = acc + row_acc * er[r];
            }
            *o = acc * self.scale;
        }
    }

    fn adjoint(&self, frame: usize, samples: &[Complex<T>], out: &mut [Complex<T>]) {
        assert_eq!(samples.len(), self.samples(), "Input samples have incorrect length");
        assert_eq!(out.len(), self.rows * self.cols, "Output image has incorrect length");
        out.iter_mut().for_each(|v| *v = Complex::zero());
        for (s, y) in samples.iter().enumerate() {
            let (er, ec) = self.kernels(frame, s);
            let y = *y * self.scale;
            for r in 0..self.rows {
                let yr = y * er[r].conj();
                let row = &mut out[r * self.cols..(r + 1) * self.cols];
                for (o, e) in row.iter_mut().zip(&ec) {
                    *o = *o + yr * e.conj();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn dc_sample_sums_the_image() {
        let traj = Trajectory::from_vec(1, 1, 2, vec![0.0, 0.0]).unwrap();
        let f = NudftTransform::new(traj, 2, 2).unwrap();
        let x = vec![Complex::new(1.0, 0.0); 4];
        let mut y = vec![Complex::zero(); 1];
        f.forward(0, &x, &mut y);
        // 4 / √4
        assert_abs_diff_eq!(y[0].re, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[0].im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cartesian_grid_is_unitary() {
        // Full 4-point grid in one dimension: FᴴF = I
        let coords: Vec<f64> = [-2.0, -1.0, 0.0, 1.0].iter().flat_map(|&k| [0.0, k]).collect();
        let traj = Trajectory::from_vec(1, 4, 2, coords).unwrap();
        let f = NudftTransform::new(traj, 1, 4).unwrap();
        let x: Vec<Complex<f64>> = (0..4).map(|i| Complex::new(i as f64, 1.0 - i as f64)).collect();
        let mut y = vec![Complex::zero(); 4];
        let mut back = vec![Complex::zero(); 4];
        f.forward(0, &x, &mut y);
        f.adjoint(0, &y, &mut back);
        for (a, b) in x.iter().zip(&back) {
            assert_abs_diff_eq!(a.re, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_three_dimensional_trajectory() {
        let traj = Trajectory::from_vec(1, 1, 3, vec![0.0; 3]).unwrap();
        assert!(NudftTransform::new(traj, 2, 2).is_err());
    }
}
