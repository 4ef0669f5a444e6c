//! Columns and their proximal dendrites.
//!
//! A column is one computational unit of the spatial pooler. Each column owns
//! exactly one proximal dendrite, and the dendrite owns the column's potential
//! pool: the fixed set of input indices the column is allowed to grow synapses
//! to. Permanence values for the pool live in the
//! [`PermanenceMatrix`](crate::matrix::PermanenceMatrix), index-aligned with
//! the pool.

use crate::types::{ElemSparse, UInt};

/// The potential pool of a proximal dendrite: a strictly increasing sequence
/// of unique input indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pool {
    indices: Vec<ElemSparse>,
}

impl Pool {
    /// Creates a pool from sorted, unique input indices.
    #[must_use]
    pub fn new(indices: Vec<ElemSparse>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }

    /// Returns the input indices of the pool.
    #[must_use]
    pub fn indices(&self) -> &[ElemSparse] {
        &self.indices
    }

    /// Returns the number of entries in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns whether the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns whether `input` is a member of the pool.
    #[must_use]
    pub fn contains(&self, input: ElemSparse) -> bool {
        self.indices.binary_search(&input).is_ok()
    }
}

/// The single proximal dendrite of a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProximalDendrite {
    pool: Pool,
}

impl ProximalDendrite {
    /// Creates a dendrite over the given potential pool.
    #[must_use]
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Returns the dendrite's potential pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

/// A single column of the spatial pooler.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Column {
    index: UInt,
    proximal: ProximalDendrite,
}

impl Column {
    /// Creates a column with an empty potential pool.
    #[must_use]
    pub fn new(index: UInt) -> Self {
        Self {
            index,
            proximal: ProximalDendrite::default(),
        }
    }

    /// Returns the column's flat index.
    #[must_use]
    pub fn index(&self) -> UInt {
        self.index
    }

    /// Installs the column's potential pool. The pool size is fixed from this
    /// point on.
    pub fn connect(&mut self, pool: Pool) {
        self.proximal = ProximalDendrite::new(pool);
    }

    /// Returns the column's proximal dendrite.
    #[must_use]
    pub fn proximal(&self) -> &ProximalDendrite {
        &self.proximal
    }

    /// Returns the column's potential pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        self.proximal.pool()
    }
}
