//! MPI-based distributed backend.
//!
//! Each process evaluates the frames it owns (see `Comm::owns_frame`); the
//! fidelity gradient and cost are then summed with `all_reduce_slice` /
//! `all_reduce`, and the accepted step is broadcast from rank 0 so every
//! process applies the same update to its replicated image.
//!
//! # Example
//! ```no_run
//! #[cfg(feature = "mpi")]
//! {
//!     use tvrecon::parallel::{Comm, MpiComm};
//!     let comm = MpiComm::new().unwrap();
//!     println!("Rank: {} / {}", comm.rank(), comm.size());
//!     comm.barrier();
//! }
//! ```

use crate::error::ReconError;
use mpi::collective::SystemOperation;
use mpi::environment::Universe;
use mpi::topology::SimpleCommunicator;
use mpi::traits::*;

/// MPI world communicator together with the environment that owns it.
pub struct MpiComm {
    pub world: SimpleCommunicator,
    pub rank: usize,
    pub size: usize,
    // MPI is finalized when this is dropped; keep it last.
    _universe: Universe,
}

impl MpiComm {
    /// Initializes MPI. Fails if MPI was already initialized in this process.
    pub fn new() -> Result<Self, ReconError> {
        let universe = mpi::initialize()
            .ok_or_else(|| ReconError::Backend("MPI is already initialized".into()))?;
        let world = universe.world();
        let rank = world.rank() as usize;
        let size = world.size() as usize;
        Ok(MpiComm { world, rank, size, _universe: universe })
    }
}

impl super::Comm for MpiComm {
    fn rank(&self) -> usize { self.rank }
    fn size(&self) -> usize { self.size }
    fn barrier(&self) { self.world.barrier(); }

    fn all_reduce(&self, x: f64) -> f64 {
        let mut y = x;
        self.world.all_reduce_into(&x, &mut y, SystemOperation::sum());
        y
    }

    fn all_reduce_slice(&self, buf: &mut [f64]) {
        let local = buf.to_vec();
        self.world.all_reduce_into(&local[..], buf, SystemOperation::sum());
    }

    fn broadcast(&self, x: f64, root: usize) -> f64 {
        let mut y = x;
        self.world.process_at_rank(root as i32).broadcast_into(&mut y);
        y
    }
}
