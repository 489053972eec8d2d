//! Multi-coil SENSE encoding with density-compensation weighting.

use crate::core::array::{DensityWeights, SensitivityMap};
use crate::core::traits::{MatVecFrame, MeasurementOperator, Real};
use crate::error::ReconError;
use crate::operator::FrequencyTransform;
use num_complex::Complex;
use num_traits::Zero;

/// Per-frame `√w · F · S` built from shared coil maps, a transform and density weights.
pub struct SenseOperator<T, F> {
    maps: SensitivityMap<T>,
    transform: F,
    weights: DensityWeights<T>,
}

impl<T: Real, F: FrequencyTransform<T>> SenseOperator<T, F> {
    pub fn new(maps: SensitivityMap<T>, transform: F, weights: DensityWeights<T>) -> Result<Self, ReconError> {
        let (rows, cols) = transform.image_dims();
        ReconError::check_dim("sensitivity map rows", rows, maps.rows())?;
        ReconError::check_dim("sensitivity map cols", cols, maps.cols())?;
        if let Some((frames, samples)) = weights.dims() {
            ReconError::check_dim("density weight frames", transform.frames(), frames)?;
            ReconError::check_dim("density weight samples", transform.samples(), samples)?;
        }
        weights.validate()?;
        Ok(Self { maps, transform, weights })
    }

    pub fn maps(&self) -> &SensitivityMap<T> {
        &self.maps
    }

    pub fn weights(&self) -> &DensityWeights<T> {
        &self.weights
    }

    pub fn transform(&self) -> &F {
        &self.transform
    }
}

impl<T: Real, F: FrequencyTransform<T>> MatVecFrame<T> for SenseOperator<T, F> {
    fn forward(&self, frame: usize, image: &[Complex<T>], out: &mut [Complex<T>]) {
        let ns = self.transform.samples();
        assert_eq!(image.len(), self.maps.rows() * self.maps.cols(), "Input image has incorrect length");
        assert_eq!(out.len(), self.maps.channels() * ns, "Output k-space has incorrect length");
        let mut coil_image = vec![Complex::zero(); image.len()];
        for c in 0..self.maps.channels() {
            for ((v, s), x) in coil_image.iter_mut().zip(self.maps.channel(c)).zip(image) {
                *v = *s * *x;
            }
            let dst = &mut out[c * ns..(c + 1) * ns];
            self.transform.forward(frame, &coil_image, dst);
            for (i, v) in dst.iter_mut().enumerate() {
                *v = *v * self.weights.sqrt_at(frame, i);
            }
        }
    }

    fn adjoint(&self, frame: usize, kspace: &[Complex<T>], out: &mut [Complex<T>]) {
        let ns = self.transform.samples();
        assert_eq!(kspace.len(), self.maps.channels() * ns, "Input k-space has incorrect length");
        assert_eq!(out.len(), self.maps.rows() * self.maps.cols(), "Output image has incorrect length");
        out.iter_mut().for_each(|v| *v = Complex::zero());
        let mut weighted = vec![Complex::zero(); ns];
        let mut coil_image = vec![Complex::zero(); out.len()];
        for c in 0..self.maps.channels() {
            for (i, (w, y)) in weighted.iter_mut().zip(&kspace[c * ns..(c + 1) * ns]).enumerate() {
                *w = *y * self.weights.sqrt_at(frame, i);
            }
            self.transform.adjoint(frame, &weighted, &mut coil_image);
            for ((o, s), v) in out.iter_mut().zip(self.maps.channel(c)).zip(&coil_image) {
                *o = *o + s.conj() * *v;
            }
        }
    }
}

impl<T: Real, F: FrequencyTransform<T>> MeasurementOperator<T> for SenseOperator<T, F> {
    fn frames(&self) -> usize {
        self.transform.frames()
    }

    fn image_dims(&self) -> (usize, usize) {
        (self.maps.rows(), self.maps.cols())
    }

    fn kspace_dims(&self) -> (usize, usize) {
        (self.maps.channels(), self.transform.samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::DenseEncoding;

    #[test]
    fn zero_weight_sample_is_silent_both_ways() {
        let maps = SensitivityMap::unit(1, 2);
        let enc = DenseEncoding::<f64>::identity(2, 1, 2);
        let w = DensityWeights::per_sample(2, 2, vec![1.0, 0.0, 1.0, 1.0]).unwrap();
        let op = SenseOperator::new(maps, enc, w).unwrap();

        let x = [Complex::new(3.0, 1.0), Complex::new(-2.0, 5.0)];
        let mut y = [Complex::zero(); 2];
        op.forward(0, &x, &mut y);
        assert_eq!(y[0], x[0]);
        assert_eq!(y[1], Complex::zero());

        let mut back = [Complex::zero(); 2];
        op.adjoint(0, &[Complex::new(1.0, 0.0), Complex::new(7.0, 7.0)], &mut back);
        assert_eq!(back[1], Complex::zero());
    }

    #[test]
    fn two_coils_combine_with_conjugate_maps() {
        let i = Complex::new(0.0, 1.0);
        let one = Complex::new(1.0, 0.0);
        let maps = SensitivityMap::from_vec(2, 1, 1, vec![one, i]).unwrap();
        let enc = DenseEncoding::<f64>::identity(2, 1, 1);
        let op = SenseOperator::new(maps, enc, DensityWeights::Uniform(1.0)).unwrap();

        let mut y = [Complex::zero(); 2];
        op.forward(1, &[Complex::new(2.0, 0.0)], &mut y);
        assert_eq!(y, [Complex::new(2.0, 0.0), Complex::new(0.0, 2.0)]);

        // Σ|S_c|² = 2, so AᴴA x = 2x
        let mut x = [Complex::zero(); 1];
        op.adjoint(1, &y, &mut x);
        assert_eq!(x[0], Complex::new(4.0, 0.0));
    }

    #[test]
    fn rejects_mismatched_weights() {
        let maps = SensitivityMap::<f64>::unit(2, 2);
        let enc = DenseEncoding::identity(3, 2, 2);
        let w = DensityWeights::per_sample(2, 4, vec![1.0; 8]).unwrap();
        assert!(matches!(
            SenseOperator::new(maps, enc, w),
            Err(ReconError::ShapeMismatch { what: "density weight frames", .. })
        ));
    }
}
