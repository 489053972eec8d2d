//! Core scalar bound, data model arrays, and operator/objective traits.

pub mod array;
pub mod traits;

pub use array::{DensityWeights, ImageSequence, KSpaceDataset, SensitivityMap, Trajectory};
pub use traits::{DataFidelity, MatVecFrame, MeasurementOperator, Real, Regularizer};
