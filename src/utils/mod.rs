//! Utility modules for the spatial pooling library.
//!
//! Contains the deterministic random number generator and the N-dimensional
//! topology helpers used by initialization and inhibition.

mod random;
mod topology;

pub use random::Random;
pub use topology::Topology;
