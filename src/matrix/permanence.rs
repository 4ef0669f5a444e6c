//! Per-column permanence storage with a mirrored connected-bit mask.

use crate::matrix::SparseBinaryMatrix;
use crate::types::{ElemDense, ElemSparse, Permanence, UInt};

/// Permanence values for every column, dense within each column's potential
/// pool, together with the derived connected-synapse state.
///
/// Row `c` holds one permanence per entry of column `c`'s potential pool,
/// index-aligned with the pool. The connected mask (a [`SparseBinaryMatrix`]
/// row over the input space) and the per-column connected counts are rebuilt
/// on every write, so they always equal
/// `{ pool[i] : permanences[i] >= connected_threshold }` and its size.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PermanenceMatrix {
    permanences: Vec<Vec<Permanence>>,
    connected: SparseBinaryMatrix,
    connected_counts: Vec<UInt>,
}

impl PermanenceMatrix {
    /// Creates empty permanence storage for `num_columns` columns over
    /// `num_inputs` input bits.
    #[must_use]
    pub fn new(num_columns: usize, num_inputs: usize) -> Self {
        Self {
            permanences: vec![Vec::new(); num_columns],
            connected: SparseBinaryMatrix::new(num_columns, num_inputs),
            connected_counts: vec![0; num_columns],
        }
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn num_columns(&self) -> usize {
        self.permanences.len()
    }

    /// Stores the permanences of `column` and refreshes its connected row
    /// and connected count.
    ///
    /// `pool` is the column's potential pool (strictly increasing input
    /// indices) and `values` the pool-aligned permanences; callers are
    /// responsible for trimming and clipping beforehand.
    pub fn set_column(
        &mut self,
        column: usize,
        pool: &[ElemSparse],
        values: &[Permanence],
        connected_threshold: Permanence,
    ) {
        debug_assert_eq!(pool.len(), values.len());
        debug_assert!(values.iter().all(|p| p.is_finite()));

        let connected_indices: Vec<ElemSparse> = pool
            .iter()
            .zip(values)
            .filter(|(_, &p)| p >= connected_threshold)
            .map(|(&j, _)| j)
            .collect();

        self.connected_counts[column] = connected_indices.len() as UInt;
        self.connected.replace_row(column, connected_indices);
        self.permanences[column] = values.to_vec();
    }

    /// Returns the pool-aligned permanences of `column`.
    #[must_use]
    pub fn permanences(&self, column: usize) -> &[Permanence] {
        &self.permanences[column]
    }

    /// Returns the sorted input indices of `column`'s connected synapses.
    #[must_use]
    pub fn connected_indices(&self, column: usize) -> &[ElemSparse] {
        self.connected.row(column)
    }

    /// Returns the number of connected synapses of `column`.
    #[must_use]
    pub fn connected_count(&self, column: usize) -> UInt {
        self.connected_counts[column]
    }

    /// Returns the connected counts of all columns.
    #[must_use]
    pub fn connected_counts(&self) -> &[UInt] {
        &self.connected_counts
    }

    /// Computes the raw overlap of every column with a dense input vector:
    /// the count of connected synapses whose input bit is set.
    pub fn overlaps(&self, input: &[ElemDense], out: &mut [UInt]) {
        self.connected.right_vec_sum_at_nz(input, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_column_mirrors_connected_state() {
        let mut m = PermanenceMatrix::new(2, 10);
        m.set_column(0, &[1, 3, 5, 7], &[0.05, 0.2, 0.1, 0.0], 0.1);

        assert_eq!(m.permanences(0), &[0.05, 0.2, 0.1, 0.0]);
        assert_eq!(m.connected_indices(0), &[3, 5]);
        assert_eq!(m.connected_count(0), 2);
        assert_eq!(m.connected_count(1), 0);
    }

    #[test]
    fn test_set_column_replaces_previous_state() {
        let mut m = PermanenceMatrix::new(1, 10);
        m.set_column(0, &[0, 1, 2], &[0.5, 0.5, 0.5], 0.1);
        assert_eq!(m.connected_count(0), 3);

        m.set_column(0, &[0, 1, 2], &[0.0, 0.5, 0.0], 0.1);
        assert_eq!(m.connected_indices(0), &[1]);
        assert_eq!(m.connected_count(0), 1);
    }

    #[test]
    fn test_overlaps() {
        let mut m = PermanenceMatrix::new(2, 6);
        m.set_column(0, &[0, 2, 4], &[0.3, 0.3, 0.05], 0.1);
        m.set_column(1, &[1, 3, 5], &[0.3, 0.3, 0.3], 0.1);

        let input = [1, 1, 1, 0, 1, 0];
        let mut out = [0; 2];
        m.overlaps(&input, &mut out);

        // Column 0: inputs 0 and 2 are connected and set; input 4 is set but
        // below the threshold. Column 1: only input 1 is connected and set.
        assert_eq!(out, [2, 1]);
    }

    #[test]
    fn test_connected_counts_bulk() {
        let mut m = PermanenceMatrix::new(3, 4);
        m.set_column(0, &[0], &[0.9], 0.1);
        m.set_column(2, &[1, 2], &[0.2, 0.2], 0.1);
        assert_eq!(m.connected_counts(), &[1, 0, 2]);
    }
}
