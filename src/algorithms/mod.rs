//! The spatial pooling algorithm.
//!
//! This module contains the pieces of the Spatial Pooler proper:
//!
//! - **Column**: a single computational unit with its potential pool
//! - **Connections**: the state bundle holding configuration and all learned state
//! - **Spatial Pooler**: initialization, the compute pipeline and inhibition

mod column;
mod connections;
mod spatial_pooler;

pub use column::{Column, Pool, ProximalDendrite};
pub use connections::{Connections, SpatialPoolerParams};
pub use spatial_pooler::SpatialPooler;
