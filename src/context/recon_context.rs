//! Factory for temporal-TV reconstructions.
//!
//! `ReconContext` holds the regularization weight, solver options, backend and
//! optional observer, and turns raw acquisition arrays into a solved
//! [`Reconstruction`]:
//!
//! 1. validate every dimension and parameter before any work is done;
//! 2. pre-weight the k-space by √w and build the SENSE operator;
//! 3. start from Aᴴ y_w and run [`NlcgSolver`].
//!
//! [`reconstruct`] is the one-call entry point with the exact non-uniform DFT
//! on the serial backend.
//!
//! # Example
//! ```rust,ignore
//! use tvrecon::context::ReconContext;
//! let backend = Backend::rayon()?;
//! let mut ctx = ReconContext::new(0.01, NlcgOptions::new(50), &backend);
//! let out = ctx.reconstruct(&kspace, weights, trajectory, maps)?;
//! ```

use crate::config::NlcgOptions;
use crate::core::array::{DensityWeights, KSpaceDataset, SensitivityMap, Trajectory};
use crate::core::traits::Real;
use crate::error::ReconError;
use crate::objective::{KSpaceFidelity, TemporalTv};
use crate::operator::{FrequencyTransform, NudftTransform, SenseOperator};
use crate::parallel::Backend;
use crate::solver::{NlcgSolver, Observer, Reconstruction};
use crate::utils::convergence::CostRecord;

pub struct ReconContext<'b, T> {
    /// Temporal TV weight λ
    pub lambda: T,
    pub opts: NlcgOptions<T>,
    pub backend: &'b Backend,
    pub observer: Option<Observer<T>>,
}

impl<'b, T: Real> ReconContext<'b, T> {
    pub fn new(lambda: T, opts: NlcgOptions<T>, backend: &'b Backend) -> Self {
        Self { lambda, opts, backend, observer: None }
    }

    pub fn with_observer<F>(mut self, f: F) -> Self
    where
        F: FnMut(&CostRecord<T>) + 'static,
    {
        self.observer = Some(Box::new(f));
        self
    }

    /// Reconstruct with the exact non-uniform DFT on `trajectory`.
    pub fn reconstruct(
        &mut self,
        kspace: &KSpaceDataset<T>,
        weights: DensityWeights<T>,
        trajectory: Trajectory<T>,
        maps: SensitivityMap<T>,
    ) -> Result<Reconstruction<T>, ReconError> {
        ReconError::check_dim("trajectory frames", kspace.frames(), trajectory.frames())?;
        ReconError::check_dim("trajectory samples", kspace.samples(), trajectory.samples())?;
        let transform = NudftTransform::new(trajectory, maps.rows(), maps.cols())?;
        self.reconstruct_with(kspace, weights, transform, maps)
    }

    /// Reconstruct with any single-channel transform.
    pub fn reconstruct_with<F>(
        &mut self,
        kspace: &KSpaceDataset<T>,
        weights: DensityWeights<T>,
        transform: F,
        maps: SensitivityMap<T>,
    ) -> Result<Reconstruction<T>, ReconError>
    where
        F: FrequencyTransform<T>,
    {
        self.validate(kspace, &weights, &maps)?;
        let weighted = kspace.weighted(&weights);
        let operator = SenseOperator::new(maps, transform, weights)?;
        let fidelity = KSpaceFidelity::new(operator, weighted, self.backend)?;
        let regularizer = TemporalTv::new(self.lambda);
        let initial = fidelity.initial_image();
        log::debug!(
            "reconstructing {} frames of {}x{} from {} channels",
            kspace.frames(),
            fidelity.operator().maps().rows(),
            fidelity.operator().maps().cols(),
            kspace.channels()
        );

        let mut solver = NlcgSolver::new(self.opts);
        solver.observer = self.observer.take();
        let result = solver.solve(&fidelity, &regularizer, initial);
        self.observer = solver.observer.take();
        result
    }

    fn validate(
        &self,
        kspace: &KSpaceDataset<T>,
        weights: &DensityWeights<T>,
        maps: &SensitivityMap<T>,
    ) -> Result<(), ReconError> {
        if kspace.frames() < 2 {
            return Err(ReconError::TooFewFrames(kspace.frames()));
        }
        ReconError::check_dim("k-space channels", maps.channels(), kspace.channels())?;
        if let Some((frames, samples)) = weights.dims() {
            ReconError::check_dim("density weight frames", kspace.frames(), frames)?;
            ReconError::check_dim("density weight samples", kspace.samples(), samples)?;
        }
        weights.validate()?;
        if !self.lambda.is_finite() {
            return Err(ReconError::InvalidParameter("regularization weight must be finite".into()));
        }
        self.opts.validate()
    }
}

/// Temporal-TV reconstruction of multi-coil non-Cartesian k-space.
///
/// Runs serially with the exact non-uniform DFT, the default stopping rules and
/// `initial_step` as the first trial step.
pub fn reconstruct<T: Real>(
    kspace: &KSpaceDataset<T>,
    density_weights: DensityWeights<T>,
    trajectory: Trajectory<T>,
    sensitivity_map: SensitivityMap<T>,
    reg_lambda: T,
    max_iterations: usize,
    initial_step: T,
) -> Result<Reconstruction<T>, ReconError> {
    let backend = Backend::Serial;
    let opts = NlcgOptions::new(max_iterations).with_initial_step(initial_step);
    ReconContext::new(reg_lambda, opts, &backend).reconstruct(kspace, density_weights, trajectory, sensitivity_map)
}
