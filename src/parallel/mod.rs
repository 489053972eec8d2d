//! Compute backends: serial, shared-memory (Rayon) and distributed (MPI).
//!
//! A [`Backend`] is acquired once by the caller and passed by reference into
//! every component that does per-frame work; its resources (thread pool, MPI
//! environment) are released when it is dropped. Frames are partitioned across
//! processes by [`Comm::owns_frame`]; results computed on owned frames are
//! combined with [`Comm::all_reduce_slice`].

use crate::core::traits::Real;
use num_complex::Complex;

pub trait Comm {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;
    fn barrier(&self);
    /// Sum of `x` over all processes.
    fn all_reduce(&self, x: f64) -> f64;
    /// Element-wise sum of `buf` over all processes, in place.
    fn all_reduce_slice(&self, buf: &mut [f64]);
    /// Value of `x` on process `root`.
    fn broadcast(&self, x: f64, root: usize) -> f64;
    /// Round-robin frame ownership.
    fn owns_frame(&self, frame: usize) -> bool {
        frame % self.size() == self.rank()
    }
}

#[cfg(feature="mpi")]
pub mod mpi_comm;
#[cfg(feature="mpi")]
pub use mpi_comm::MpiComm;

#[cfg(feature="rayon")]
pub mod rayon_comm;
#[cfg(feature="rayon")]
pub use rayon_comm::RayonComm;

/// Compute-backend handle injected into fidelity and context constructors.
pub enum Backend {
    Serial,
    #[cfg(feature="rayon")]
    Rayon(RayonComm),
    #[cfg(feature="mpi")]
    Mpi(MpiComm),
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Serial
    }
}

impl Backend {
    /// Thread-pool backend sized to the number of logical CPUs.
    #[cfg(feature="rayon")]
    pub fn rayon() -> Result<Self, crate::error::ReconError> {
        Ok(Backend::Rayon(RayonComm::new()?))
    }

    /// Evaluate `f` on every frame this process owns, returning `(frame, value)` in frame order.
    pub fn map_frames<R, F>(&self, frames: usize, f: F) -> Vec<(usize, R)>
    where
        R: Send,
        F: Fn(usize) -> R + Send + Sync,
    {
        match self {
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.map_frames(frames, f),
            _ => (0..frames)
                .filter(|&k| self.owns_frame(k))
                .map(|k| (k, f(k)))
                .collect(),
        }
    }

    /// Element-wise complex sum across processes; a no-op on a single process.
    pub fn all_reduce_complex<T: Real>(&self, buf: &mut [Complex<T>]) {
        if self.size() == 1 {
            return;
        }
        let mut flat: Vec<f64> = Vec::with_capacity(2 * buf.len());
        for v in buf.iter() {
            flat.push(v.re.to_f64().unwrap_or(f64::NAN));
            flat.push(v.im.to_f64().unwrap_or(f64::NAN));
        }
        self.all_reduce_slice(&mut flat);
        for (v, pair) in buf.iter_mut().zip(flat.chunks_exact(2)) {
            let re = T::from_f64(pair[0]).unwrap_or_else(T::nan);
            let im = T::from_f64(pair[1]).unwrap_or_else(T::nan);
            *v = Complex::new(re, im);
        }
    }

    /// Scalar sum across processes; identity on a single process.
    pub fn all_reduce_real<T: Real>(&self, x: T) -> T {
        if self.size() == 1 {
            return x;
        }
        let sum = self.all_reduce(x.to_f64().unwrap_or(f64::NAN));
        T::from_f64(sum).unwrap_or_else(T::nan)
    }
}

impl Comm for Backend {
    fn rank(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.rank(),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.rank(),
            Backend::Serial => 0,
        }
    }
    fn size(&self) -> usize {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.size(),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.size(),
            Backend::Serial => 1,
        }
    }
    fn barrier(&self) {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.barrier(),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.barrier(),
            Backend::Serial => {},
        }
    }
    fn all_reduce(&self, x: f64) -> f64 {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.all_reduce(x),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.all_reduce(x),
            Backend::Serial => x,
        }
    }
    fn all_reduce_slice(&self, buf: &mut [f64]) {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.all_reduce_slice(buf),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.all_reduce_slice(buf),
            Backend::Serial => {},
        }
    }
    fn broadcast(&self, x: f64, root: usize) -> f64 {
        match self {
            #[cfg(feature="mpi")]
            Backend::Mpi(comm) => comm.broadcast(x, root),
            #[cfg(feature="rayon")]
            Backend::Rayon(comm) => comm.broadcast(x, root),
            Backend::Serial => x,
        }
    }
}
