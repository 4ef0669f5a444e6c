//! Sparse matrix structures backing the spatial pooler.
//!
//! The connectivity between columns and input bits is large, sparse and
//! bipartite. [`SparseBinaryMatrix`] stores one sorted index row per column
//! and answers the overlap query for a dense input vector;
//! [`PermanenceMatrix`] adds the per-column permanence values (dense within
//! each column's potential pool) and keeps the connected-bit rows and
//! connected counts mirrored against them.

mod permanence;
mod sparse_binary;

pub use permanence::PermanenceMatrix;
pub use sparse_binary::SparseBinaryMatrix;
