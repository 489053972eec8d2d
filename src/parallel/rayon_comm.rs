// rayon-based shared-memory backend

use crate::error::ReconError;
use rayon::prelude::*;

/// Private thread pool; frames are evaluated concurrently on it.
pub struct RayonComm {
    pool: rayon::ThreadPool,
}

impl RayonComm {
    pub fn new() -> Result<Self, ReconError> {
        Self::with_threads(num_cpus::get())
    }

    pub fn with_threads(threads: usize) -> Result<Self, ReconError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("tvrecon-{i}"))
            .build()
            .map_err(|e| ReconError::Backend(e.to_string()))?;
        Ok(RayonComm { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn map_frames<R, F>(&self, frames: usize, f: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        self.pool.install(|| (0..frames).into_par_iter().map(|k| (k, f(k))).collect())
    }
}

impl super::Comm for RayonComm {
    fn rank(&self) -> usize { 0 }
    fn size(&self) -> usize { 1 }
    fn barrier(&self) { self.pool.install(|| rayon::scope(|_| {})); }
    fn all_reduce(&self, x: f64) -> f64 {
        x // single address space
    }
    fn all_reduce_slice(&self, _buf: &mut [f64]) {}
    fn broadcast(&self, x: f64, _root: usize) -> f64 { x }
}
