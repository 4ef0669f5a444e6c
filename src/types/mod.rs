//! Core types for the spatial pooling library.
//!
//! This module contains the fundamental numeric type definitions shared by the
//! matrix structures and the spatial pooling algorithm.

mod primitives;

pub use primitives::*;
