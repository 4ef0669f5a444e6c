//! # Perun - HTM Spatial Pooling in Rust
//!
//! Perun is an idiomatic Rust implementation of the Hierarchical Temporal Memory
//! (HTM) Spatial Pooler: a biologically inspired learning algorithm that converts
//! arbitrary binary input vectors into Sparse Distributed Representations (SDRs).
//!
//! ## Overview
//!
//! The Spatial Pooler maintains a population of columns, each with a *potential
//! pool* of input bits it may connect to. Synapses whose permanence crosses a
//! threshold are *connected* and contribute to a column's overlap with the
//! current input. A competitive inhibition step selects a small, fixed-sparsity
//! set of winner columns, and Hebbian permanence updates plus several
//! homeostatic feedback loops (duty cycles, boosting, permanence bumping,
//! inhibition-radius adaptation) keep every column competitive over time.
//!
//! All learned state lives in a single [`Connections`](algorithms::Connections)
//! value that is passed explicitly through the compute pipeline; there are no
//! process-wide singletons and no environment variables.
//!
//! ## Quick Start
//!
//! ```rust
//! use perun::prelude::*;
//!
//! let params = SpatialPoolerParams {
//!     input_dimensions: vec![64],
//!     column_dimensions: vec![128],
//!     ..Default::default()
//! };
//!
//! let mut connections = Connections::new(params).unwrap();
//! let pooler = SpatialPooler::new();
//! pooler.init(&mut connections);
//!
//! let input = vec![1u8; 64];
//! let mut active = vec![0u8; 128];
//! pooler.compute(&mut connections, &input, &mut active, true, false).unwrap();
//!
//! assert_eq!(active.len(), connections.num_columns());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support
//! - `rayon`: Enable parallel column initialization

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod algorithms;
pub mod matrix;
pub mod types;
pub mod utils;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::algorithms::{
        Column, Connections, Pool, ProximalDendrite, SpatialPooler, SpatialPoolerParams,
    };
    pub use crate::matrix::{PermanenceMatrix, SparseBinaryMatrix};
    pub use crate::types::{
        ElemDense, ElemSparse, Permanence, Real, UInt, MAX_PERMANENCE, MIN_PERMANENCE,
    };
    pub use crate::utils::{Random, Topology};

    pub use crate::error::{PoolerError, Result};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use thiserror::Error;

    /// Main error type for perun operations.
    #[derive(Error, Debug)]
    pub enum PoolerError {
        /// Invalid dimensions provided.
        #[error("Invalid dimensions: {0}")]
        InvalidDimensions(String),

        /// Invalid parameter value.
        #[error("Invalid parameter '{name}': {message}")]
        InvalidParameter {
            /// Name of the invalid parameter.
            name: &'static str,
            /// Description of the error.
            message: String,
        },

        /// An input or output buffer does not match the configured size.
        #[error("Dimension mismatch: expected {expected}, got {got}")]
        DimensionMismatch {
            /// Expected number of elements.
            expected: usize,
            /// Actual number of elements.
            got: usize,
        },
    }

    /// Result type alias using [`PoolerError`].
    pub type Result<T> = std::result::Result<T, PoolerError>;
}

pub use error::{PoolerError, Result};
