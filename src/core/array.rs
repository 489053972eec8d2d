//! Dense complex arrays of the reconstruction data model.
//!
//! All arrays are flat, row-major `Vec`s with their extents stored alongside:
//!
//! - [`ImageSequence`]: (frame, row, col), the unknown.
//! - [`KSpaceDataset`]: (frame, channel, sample), measured data.
//! - [`DensityWeights`]: scalar or (frame, sample), non-negative.
//! - [`Trajectory`]: (frame, sample, dim), sample coordinates.
//! - [`SensitivityMap`]: (channel, row, col), coil sensitivities.
//!
//! Vector arithmetic on [`ImageSequence`] runs on the calling thread in element
//! order. Parallel work belongs to the injected
//! [`Backend`](crate::parallel::Backend), which splits the per-frame operator
//! applications; these kernels never touch a thread pool of their own.

use crate::core::traits::Real;
use crate::error::ReconError;
use num_complex::Complex;
use num_traits::Zero;

/// Complex image sequence indexed by (frame, row, col).
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSequence<T> {
    frames: usize,
    rows: usize,
    cols: usize,
    data: Vec<Complex<T>>,
}

impl<T: Real> ImageSequence<T> {
    pub fn zeros(frames: usize, rows: usize, cols: usize) -> Self {
        Self { frames, rows, cols, data: vec![Complex::zero(); frames * rows * cols] }
    }

    /// Wrap row-major data of length `frames * rows * cols`.
    pub fn from_vec(frames: usize, rows: usize, cols: usize, data: Vec<Complex<T>>) -> Result<Self, ReconError> {
        ReconError::check_dim("image data length", frames * rows * cols, data.len())?;
        Ok(Self { frames, rows, cols, data })
    }

    /// Build from a generator over (frame, row, col).
    pub fn from_fn<F>(frames: usize, rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> Complex<T>,
    {
        let mut data = Vec::with_capacity(frames * rows * cols);
        for k in 0..frames {
            for r in 0..rows {
                for c in 0..cols {
                    data.push(f(k, r, c));
                }
            }
        }
        Self { frames, rows, cols, data }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.frames, self.rows, self.cols)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Pixels per frame.
    pub fn frame_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Total element count, used to normalize every cost term.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn frame(&self, k: usize) -> &[Complex<T>] {
        let n = self.frame_len();
        &self.data[k * n..(k + 1) * n]
    }

    pub fn frame_mut(&mut self, k: usize) -> &mut [Complex<T>] {
        let n = self.frame_len();
        &mut self.data[k * n..(k + 1) * n]
    }

    pub fn get(&self, k: usize, r: usize, c: usize) -> Complex<T> {
        self.data[(k * self.rows + r) * self.cols + c]
    }

    pub fn as_slice(&self) -> &[Complex<T>] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex<T>] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<Complex<T>> {
        self.data
    }

    /// y ← y + alpha · x
    pub fn axpy(&mut self, alpha: T, x: &Self) {
        assert_eq!(self.shape(), x.shape(), "axpy operands must share a shape");
        for (yi, xi) in self.data.iter_mut().zip(x.data.iter()) {
            *yi = *yi + *xi * alpha;
        }
    }

    /// y ← beta · y + x
    pub fn scale_add(&mut self, beta: T, x: &Self) {
        assert_eq!(self.shape(), x.shape(), "scale_add operands must share a shape");
        for (yi, xi) in self.data.iter_mut().zip(x.data.iter()) {
            *yi = *yi * beta + *xi;
        }
    }

    /// New array `self + alpha · x`; `self` is left untouched.
    pub fn add_scaled(&self, alpha: T, x: &Self) -> Self {
        let mut out = self.clone();
        out.axpy(alpha, x);
        out
    }

    /// ⟨self, x⟩ = Σ conj(selfᵢ) xᵢ
    pub fn vdot(&self, x: &Self) -> Complex<T> {
        assert_eq!(self.shape(), x.shape(), "vdot operands must share a shape");
        vdot(&self.data, &x.data)
    }

    /// ‖self‖₂², accumulated left to right.
    pub fn norm_sqr(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, v| acc + v.norm_sqr())
    }
}

/// Σ conj(xᵢ) yᵢ over two equal-length slices.
pub fn vdot<T: Real>(x: &[Complex<T>], y: &[Complex<T>]) -> Complex<T> {
    assert_eq!(x.len(), y.len(), "Vectors must have the same length");
    x.iter()
        .zip(y.iter())
        .fold(Complex::zero(), |acc, (xi, yi)| acc + xi.conj() * *yi)
}

/// Measured k-space indexed by (frame, channel, sample).
#[derive(Clone, Debug, PartialEq)]
pub struct KSpaceDataset<T> {
    frames: usize,
    channels: usize,
    samples: usize,
    data: Vec<Complex<T>>,
}

impl<T: Real> KSpaceDataset<T> {
    pub fn from_vec(frames: usize, channels: usize, samples: usize, data: Vec<Complex<T>>) -> Result<Self, ReconError> {
        ReconError::check_dim("k-space data length", frames * channels * samples, data.len())?;
        Ok(Self { frames, channels, samples, data })
    }

    pub fn zeros(frames: usize, channels: usize, samples: usize) -> Self {
        Self { frames, channels, samples, data: vec![Complex::zero(); frames * channels * samples] }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Values per frame (`channels * samples`).
    pub fn frame_len(&self) -> usize {
        self.channels * self.samples
    }

    pub fn frame(&self, k: usize) -> &[Complex<T>] {
        let n = self.frame_len();
        &self.data[k * n..(k + 1) * n]
    }

    pub fn frame_mut(&mut self, k: usize) -> &mut [Complex<T>] {
        let n = self.frame_len();
        &mut self.data[k * n..(k + 1) * n]
    }

    pub fn as_slice(&self) -> &[Complex<T>] {
        &self.data
    }

    /// Copy of the data with every sample multiplied by √w.
    pub fn weighted(&self, weights: &DensityWeights<T>) -> Self {
        let mut out = self.clone();
        for k in 0..self.frames {
            let samples = self.samples;
            for (i, v) in out.frame_mut(k).iter_mut().enumerate() {
                *v = *v * weights.sqrt_at(k, i % samples);
            }
        }
        out
    }
}

/// Density-compensation weights, either one value for every sample or one per (frame, sample).
#[derive(Clone, Debug, PartialEq)]
pub enum DensityWeights<T> {
    Uniform(T),
    PerSample { frames: usize, samples: usize, data: Vec<T> },
}

impl<T: Real> DensityWeights<T> {
    pub fn per_sample(frames: usize, samples: usize, data: Vec<T>) -> Result<Self, ReconError> {
        ReconError::check_dim("density weight length", frames * samples, data.len())?;
        Ok(DensityWeights::PerSample { frames, samples, data })
    }

    pub fn get(&self, frame: usize, sample: usize) -> T {
        match self {
            DensityWeights::Uniform(w) => *w,
            DensityWeights::PerSample { samples, data, .. } => data[frame * samples + sample],
        }
    }

    /// √w at (frame, sample).
    pub fn sqrt_at(&self, frame: usize, sample: usize) -> T {
        self.get(frame, sample).sqrt()
    }

    /// (frames, samples) if the weights are per-sample.
    pub fn dims(&self) -> Option<(usize, usize)> {
        match self {
            DensityWeights::Uniform(_) => None,
            DensityWeights::PerSample { frames, samples, .. } => Some((*frames, *samples)),
        }
    }

    /// Rejects negative or non-finite weights.
    pub fn validate(&self) -> Result<(), ReconError> {
        let bad = |w: &T| !(w.is_finite() && *w >= T::zero());
        let invalid = match self {
            DensityWeights::Uniform(w) => bad(w),
            DensityWeights::PerSample { data, .. } => data.iter().any(bad),
        };
        if invalid {
            return Err(ReconError::InvalidParameter(
                "density weights must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Sample coordinates indexed by (frame, sample, dim).
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory<T> {
    frames: usize,
    samples: usize,
    dims: usize,
    data: Vec<T>,
}

impl<T: Real> Trajectory<T> {
    pub fn from_vec(frames: usize, samples: usize, dims: usize, data: Vec<T>) -> Result<Self, ReconError> {
        ReconError::check_dim("trajectory data length", frames * samples * dims, data.len())?;
        Ok(Self { frames, samples, dims, data })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Coordinates of one sample.
    pub fn coord(&self, frame: usize, sample: usize) -> &[T] {
        let start = (frame * self.samples + sample) * self.dims;
        &self.data[start..start + self.dims]
    }
}

/// Coil sensitivities indexed by (channel, row, col).
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityMap<T> {
    channels: usize,
    rows: usize,
    cols: usize,
    data: Vec<Complex<T>>,
}

impl<T: Real> SensitivityMap<T> {
    pub fn from_vec(channels: usize, rows: usize, cols: usize, data: Vec<Complex<T>>) -> Result<Self, ReconError> {
        ReconError::check_dim("sensitivity map length", channels * rows * cols, data.len())?;
        Ok(Self { channels, rows, cols, data })
    }

    /// Single channel of unit sensitivity.
    pub fn unit(rows: usize, cols: usize) -> Self {
        Self { channels: 1, rows, cols, data: vec![Complex::new(T::one(), T::zero()); rows * cols] }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn channel(&self, c: usize) -> &[Complex<T>] {
        let n = self.rows * self.cols;
        &self.data[c * n..(c + 1) * n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64, im: f64) -> Complex<f64> {
        Complex::new(re, im)
    }

    #[test]
    fn axpy_and_add_scaled_leave_source_untouched() {
        let x = ImageSequence::from_fn(2, 1, 2, |k, _, col| c(k as f64, col as f64));
        let d = ImageSequence::from_fn(2, 1, 2, |_, _, _| c(1.0, -1.0));
        let y = x.add_scaled(0.5, &d);
        assert_eq!(x.get(1, 0, 1), c(1.0, 1.0));
        assert_eq!(y.get(1, 0, 1), c(1.5, 0.5));
    }

    #[test]
    fn vdot_conjugates_left_operand() {
        let a = [c(0.0, 1.0)];
        let b = [c(0.0, 1.0)];
        let d = vdot(&a, &b);
        assert_abs_diff_eq!(d.re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(d.im, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn weighted_kspace_uses_sqrt_weights() {
        let y = KSpaceDataset::from_vec(2, 1, 2, vec![c(1.0, 0.0); 4]).unwrap();
        let w = DensityWeights::per_sample(2, 2, vec![4.0, 1.0, 0.0, 9.0]).unwrap();
        let yw = y.weighted(&w);
        assert_eq!(yw.frame(0), &[c(2.0, 0.0), c(1.0, 0.0)]);
        assert_eq!(yw.frame(1), &[c(0.0, 0.0), c(3.0, 0.0)]);
    }

    #[test]
    fn negative_density_weights_are_rejected() {
        assert!(DensityWeights::Uniform(-1.0f64).validate().is_err());
        assert!(DensityWeights::Uniform(0.0f64).validate().is_ok());
    }

    #[test]
    fn norm_sqr_sums_in_element_order() {
        // 1e16 + 1 + 1 loses both ones left to right; any regrouping keeps them
        let x = ImageSequence::from_vec(1, 1, 3, vec![c(1e8, 0.0), c(1.0, 0.0), c(1.0, 0.0)]).unwrap();
        assert_eq!(x.norm_sqr(), 1e16);
    }

    #[test]
    fn scale_add_updates_in_place() {
        let mut p = ImageSequence::from_fn(1, 1, 2, |_, _, col| c(col as f64, 1.0));
        let g = ImageSequence::from_fn(1, 1, 2, |_, _, _| c(1.0, -1.0));
        p.scale_add(2.0, &g);
        assert_eq!(p.as_slice(), &[c(1.0, 1.0), c(3.0, 1.0)]);
    }

    #[test]
    fn from_vec_checks_length() {
        let err = ImageSequence::<f64>::from_vec(2, 2, 2, vec![c(0.0, 0.0); 7]).unwrap_err();
        assert!(matches!(err, ReconError::ShapeMismatch { expected: 8, found: 7, .. }));
    }
}
