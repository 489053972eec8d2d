use thiserror::Error;

// Unified error type for tvrecon

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("temporal regularization needs at least 2 frames, found {0}")]
    TooFewFrames(usize),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl ReconError {
    /// Fails with `ShapeMismatch` unless `found == expected`.
    pub(crate) fn check_dim(what: &'static str, expected: usize, found: usize) -> Result<(), Self> {
        if expected == found {
            Ok(())
        } else {
            Err(ReconError::ShapeMismatch { what, expected, found })
        }
    }
}
