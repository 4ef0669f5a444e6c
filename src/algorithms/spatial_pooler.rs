//! Spatial Pooler implementation.
//!
//! The Spatial Pooler converts a binary input vector into a sparse set of
//! active columns and, when learning is enabled, adapts synapse permanences
//! so that similar inputs come to share columns.
//!
//! What are duty cycles?
//! - They are rolling averages measuring how often each column meets a
//!   criterion over a recent window of iterations.
//! - The overlap duty cycle tracks how often a column overlaps the input at
//!   all; the active duty cycle tracks how often it wins inhibition.
//! - Columns whose duty cycles fall below their neighborhood's minimum get
//!   their permanences bumped or their overlaps boosted, so no column goes
//!   permanently dark.
//!
//! The pooler itself holds no state: every operation takes the
//! [`Connections`] bundle explicitly. Concurrent `compute` calls on one
//! `Connections` value are not supported; the pipeline steps have
//! read-after-write dependencies and local inhibition additionally depends on
//! ascending column order.

use crate::algorithms::{Column, Connections, Pool};
use crate::error::{PoolerError, Result};
use crate::matrix::PermanenceMatrix;
use crate::types::{ElemDense, ElemSparse, Permanence, Real, UInt};
use crate::utils::Random;

/// The Spatial Pooler algorithm.
///
/// All state lives in a [`Connections`] value created by
/// [`Connections::new`]; the pooler's methods borrow it explicitly.
///
/// # Example
///
/// ```rust
/// use perun::prelude::*;
///
/// let mut c = Connections::new(SpatialPoolerParams {
///     input_dimensions: vec![100],
///     column_dimensions: vec![200],
///     ..Default::default()
/// }).unwrap();
///
/// let pooler = SpatialPooler::new();
/// pooler.init(&mut c);
///
/// let mut input = vec![0u8; 100];
/// input[..20].fill(1);
/// let mut active = vec![0u8; 200];
/// pooler.compute(&mut c, &input, &mut active, true, false).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SpatialPooler;

impl SpatialPooler {
    /// Creates a new Spatial Pooler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Initializes the state bundle: allocates the column and matrix storage,
    /// draws tie breakers, grows every column's potential pool and initial
    /// permanences, and derives the initial inhibition radius.
    ///
    /// Calling `init` a second time before any compute is a no-op.
    pub fn init(&self, c: &mut Connections) {
        if c.initialized {
            return;
        }
        self.init_matrices(c);
        self.connect_and_configure_inputs(c);
        c.initialized = true;
    }

    /// Allocates column memory and resets the per-column arrays.
    fn init_matrices(&self, c: &mut Connections) {
        c.columns = (0..c.num_columns).map(|i| Column::new(i as UInt)).collect();
        c.permanences = PermanenceMatrix::new(c.num_columns, c.num_inputs);

        for i in 0..c.num_columns {
            c.tie_breaker[i] = 0.01 * c.rng.get_real64();
        }
        c.boost_factors.fill(1.0);
        c.overlap_duty_cycles.fill(0.0);
        c.active_duty_cycles.fill(0.0);
        c.min_overlap_duty_cycles.fill(0.0);
        c.min_active_duty_cycles.fill(0.0);
    }

    /// Grows every column's potential pool and installs its initial
    /// permanences.
    ///
    /// Each column draws from its own sub-generator derived from the master
    /// seed and the column index, so the result does not depend on the order
    /// columns are processed in; with the `rayon` feature the loop runs in
    /// parallel and produces bit-identical state.
    fn connect_and_configure_inputs(&self, c: &mut Connections) {
        let seed = c.seed();

        #[cfg(feature = "rayon")]
        let grown: Vec<(Vec<ElemSparse>, Vec<Permanence>)> = {
            use rayon::prelude::*;
            let shared: &Connections = c;
            (0..shared.num_columns)
                .into_par_iter()
                .map(|column| self.grow_column(shared, seed, column))
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let grown: Vec<(Vec<ElemSparse>, Vec<Permanence>)> = (0..c.num_columns)
            .map(|column| self.grow_column(c, seed, column))
            .collect();

        for (column, (pool, mut perm)) in grown.into_iter().enumerate() {
            c.columns[column].connect(Pool::new(pool));
            c.update_permanences_for_column(&mut perm, column, true);
        }

        self.update_inhibition_radius(c);
    }

    fn grow_column(
        &self,
        c: &Connections,
        seed: u64,
        column: usize,
    ) -> (Vec<ElemSparse>, Vec<Permanence>) {
        let mut rng = Random::substream(seed, 1 + column as u64);
        let pool = self.map_potential(c, column, c.wrap_around, &mut rng);
        let perm = self.init_permanence(c, &pool, c.init_connected_pct, &mut rng);
        (pool, perm)
    }

    /// Maps a column to the input index at the center of its receptive field.
    ///
    /// Each column coordinate is ratio-scaled into input coordinates, offset
    /// by half a step for an even spread, and clipped to the input bounds.
    fn map_column(&self, c: &Connections, column: usize) -> usize {
        let coords = c.column_topology.coordinates(column);
        let input_coords: Vec<UInt> = coords
            .iter()
            .zip(&c.column_dimensions)
            .zip(&c.input_dimensions)
            .map(|((&coord, &col_dim), &in_dim)| {
                let ratio = Real::from(in_dim) / Real::from(col_dim);
                let center = (Real::from(coord) * ratio + 0.5 * ratio) as UInt;
                center.min(in_dim - 1)
            })
            .collect();
        c.input_topology.index_from_coordinates(&input_coords)
    }

    /// Selects a column's potential pool: the center input, its neighborhood
    /// within the potential radius, and a `potential_pct` sample of those
    /// candidates, returned as sorted unique input indices.
    fn map_potential(
        &self,
        c: &Connections,
        column: usize,
        wrap: bool,
        rng: &mut Random,
    ) -> Vec<ElemSparse> {
        let center = self.map_column(c, column);
        let mut candidates =
            c.input_topology
                .neighborhood(center, c.potential_radius as usize, wrap);
        if let Err(pos) = candidates.binary_search(&center) {
            candidates.insert(pos, center);
        }

        // Sizing rounds half away from zero.
        let num_potential = ((candidates.len() as Real) * c.potential_pct).round() as usize;

        let mut pool = rng.sample(candidates, num_potential);
        pool.sort_unstable();
        pool.into_iter().map(|j| j as ElemSparse).collect()
    }

    /// Draws initial permanences for a potential pool as a dense working
    /// array over the whole input space.
    ///
    /// A `connected_pct` fraction of the pool starts at or above the
    /// connected threshold; the rest starts below it. Values are truncated to
    /// five decimals for cross-platform reproducibility of the connected
    /// mask, then trimmed.
    fn init_permanence(
        &self,
        c: &Connections,
        pool: &[ElemSparse],
        connected_pct: Real,
        rng: &mut Random,
    ) -> Vec<Permanence> {
        let num_connected = ((pool.len() as Real) * connected_pct).round() as usize;
        let mut connected_slot = vec![false; pool.len()];
        for slot in rng.sample_indices(pool.len(), num_connected) {
            connected_slot[slot] = true;
        }

        let mut perm = vec![0.0; c.num_inputs];
        for (slot, &input) in pool.iter().enumerate() {
            let p = if connected_slot[slot] {
                c.syn_perm_connected + rng.get_real64() * c.syn_perm_active_inc / 4.0
            } else {
                c.syn_perm_connected * rng.get_real64()
            };
            let p = (p * 1e5).floor() / 1e5;
            perm[input as usize] = if p <= c.syn_perm_trim_threshold { 0.0 } else { p };
        }
        perm
    }

    // ========================================================================
    // Compute pipeline
    // ========================================================================

    /// Processes one input vector.
    ///
    /// Computes per-column overlaps, applies boosting when learning, selects
    /// the winner columns through inhibition, and writes them into `active`
    /// as a dense 0/1 array. With `learn` set the permanences, duty cycles,
    /// boost factors and (periodically) the inhibition radius and minimum
    /// duty cycles are updated. With `learn` unset and `strip_unlearned` set,
    /// columns that have never been active are removed from the result.
    ///
    /// # Errors
    ///
    /// Fails with a dimension mismatch, without mutating `c`, if `input` does
    /// not hold exactly `num_inputs` entries or `active` does not hold
    /// exactly `num_columns` entries.
    pub fn compute(
        &self,
        c: &mut Connections,
        input: &[ElemDense],
        active: &mut [ElemDense],
        learn: bool,
        strip_unlearned: bool,
    ) -> Result<()> {
        if input.len() != c.num_inputs {
            return Err(PoolerError::DimensionMismatch {
                expected: c.num_inputs,
                got: input.len(),
            });
        }
        if active.len() != c.num_columns {
            return Err(PoolerError::DimensionMismatch {
                expected: c.num_columns,
                got: active.len(),
            });
        }
        debug_assert!(c.initialized);

        c.iteration_num += 1;
        if learn {
            c.iteration_learn_num += 1;
        }

        let overlaps = self.calculate_overlap(c, input);

        let boosted: Vec<Real> = if learn {
            overlaps
                .iter()
                .zip(&c.boost_factors)
                .map(|(&o, &b)| Real::from(o) * b)
                .collect()
        } else {
            overlaps.iter().map(|&o| Real::from(o)).collect()
        };

        let mut active_columns = self.inhibit_columns(c, &boosted);

        if learn {
            self.adapt_synapses(c, input, &active_columns);
            self.update_duty_cycles(c, &overlaps, &active_columns);
            self.bump_up_weak_columns(c);
            self.update_boost_factors(c);
            if c.iteration_num % c.update_period == 0 {
                self.update_inhibition_radius(c);
                self.update_min_duty_cycles(c);
            }
        } else if strip_unlearned {
            active_columns.retain(|&column| c.active_duty_cycles[column] > 0.0);
        }

        active.fill(0);
        for &column in &active_columns {
            active[column] = 1;
        }
        Ok(())
    }

    /// Computes the raw overlap of every column: the count of connected
    /// synapses whose input bit is set, with sub-threshold counts zeroed.
    fn calculate_overlap(&self, c: &Connections, input: &[ElemDense]) -> Vec<UInt> {
        let mut overlaps = vec![0; c.num_columns];
        c.permanences.overlaps(input, &mut overlaps);
        if c.stimulus_threshold > 0 {
            for overlap in &mut overlaps {
                if *overlap < c.stimulus_threshold {
                    *overlap = 0;
                }
            }
        }
        overlaps
    }

    // ========================================================================
    // Inhibition
    // ========================================================================

    /// Selects the winner columns for the current iteration.
    ///
    /// Works on a tie-broken copy of the boosted overlaps. The target density
    /// comes either directly from `local_area_density` or from the active
    /// count divided by the current inhibition area. Global selection is used
    /// when configured, or whenever the inhibition radius has grown past the
    /// largest column dimension.
    fn inhibit_columns(&self, c: &Connections, boosted: &[Real]) -> Vec<usize> {
        let density = if c.local_area_density > 0.0 {
            c.local_area_density
        } else {
            let volume = (2.0 * Real::from(c.inhibition_radius) + 1.0)
                .powi(c.column_dimensions.len() as i32);
            let area = volume.min(c.num_columns as Real);
            ((c.num_active_columns_per_inh_area as Real) / area).min(0.5)
        };

        let mut overlaps: Vec<Real> = boosted
            .iter()
            .zip(&c.tie_breaker)
            .map(|(&overlap, &tie)| overlap + tie)
            .collect();

        let max_dimension = c.column_dimensions.iter().copied().max().unwrap_or(1);
        if c.global_inhibition || c.inhibition_radius > max_dimension {
            self.inhibit_columns_global(c, &overlaps, density)
        } else {
            self.inhibit_columns_local(c, &mut overlaps, density)
        }
    }

    /// Global inhibition: the top `floor(density * num_columns)` columns by
    /// overlap, ties broken by ascending column index, returned ascending.
    ///
    /// A column with zero thresholded overlap never wins: its tie-broken
    /// score stays below one.
    fn inhibit_columns_global(
        &self,
        c: &Connections,
        overlaps: &[Real],
        density: Real,
    ) -> Vec<usize> {
        let num_active = (density * c.num_columns as Real) as usize;

        let mut candidates: Vec<usize> =
            (0..c.num_columns).filter(|&i| overlaps[i] >= 1.0).collect();
        candidates.sort_unstable_by(|&a, &b| overlaps[b].total_cmp(&overlaps[a]).then(a.cmp(&b)));
        candidates.truncate(num_active);
        candidates.sort_unstable();
        candidates
    }

    /// Local inhibition: every column competes against its neighborhood.
    ///
    /// Columns are visited in ascending index order and a winner's overlap is
    /// nudged up by `max(overlaps) / 1000` as soon as it is selected, so
    /// later columns see already-selected neighbors as slightly stronger.
    /// The traversal order is part of the algorithm's observable behavior.
    fn inhibit_columns_local(
        &self,
        c: &Connections,
        overlaps: &mut [Real],
        density: Real,
    ) -> Vec<usize> {
        let winner_bump = overlaps.iter().copied().fold(0.0, Real::max) / 1000.0;
        let radius = c.inhibition_radius as usize;
        let mut winners = Vec::new();

        for column in 0..c.num_columns {
            if overlaps[column] < 1.0 {
                continue;
            }
            let neighbors = c.column_topology.neighborhood(column, radius, false);
            let num_bigger = neighbors
                .iter()
                .filter(|&&n| overlaps[n] > overlaps[column])
                .count();
            let num_active = (density * (neighbors.len() + 1) as Real).round_ties_even() as usize;

            if num_bigger < num_active {
                winners.push(column);
                overlaps[column] += winner_bump;
            }
        }
        winners
    }

    // ========================================================================
    // Learning
    // ========================================================================

    /// Adapts the permanences of every winner column: synapses on active
    /// input bits are strengthened, all others weakened.
    fn adapt_synapses(&self, c: &mut Connections, input: &[ElemDense], active_columns: &[usize]) {
        let mut perm_changes = vec![-c.syn_perm_inactive_dec; c.num_inputs];
        for (j, &bit) in input.iter().enumerate() {
            if bit > 0 {
                perm_changes[j] = c.syn_perm_active_inc;
            }
        }

        let mut perm = vec![0.0; c.num_inputs];
        for &column in active_columns {
            perm.fill(0.0);
            {
                let pool = c.columns[column].pool().indices();
                let values = c.permanences.permanences(column);
                for (slot, &j) in pool.iter().enumerate() {
                    perm[j as usize] = values[slot];
                }
            }
            for (p, &delta) in perm.iter_mut().zip(&perm_changes) {
                *p += delta;
            }
            c.update_permanences_for_column(&mut perm, column, true);
        }
    }

    /// Updates the rolling overlap and active duty cycles of every column.
    fn update_duty_cycles(&self, c: &mut Connections, overlaps: &[UInt], active_columns: &[usize]) {
        let period = Real::from(c.duty_cycle_period.min(c.iteration_num));

        let mut was_active = vec![false; c.num_columns];
        for &column in active_columns {
            was_active[column] = true;
        }

        for i in 0..c.num_columns {
            let overlap_hit = if overlaps[i] > 0 { 1.0 } else { 0.0 };
            let active_hit = if was_active[i] { 1.0 } else { 0.0 };
            c.overlap_duty_cycles[i] =
                (c.overlap_duty_cycles[i] * (period - 1.0) + overlap_hit) / period;
            c.active_duty_cycles[i] =
                (c.active_duty_cycles[i] * (period - 1.0) + active_hit) / period;
        }
    }

    /// Bumps all permanences of columns whose overlap duty cycle has fallen
    /// below the neighborhood minimum, giving starved columns a way back
    /// into competition.
    fn bump_up_weak_columns(&self, c: &mut Connections) {
        for column in 0..c.num_columns {
            if c.overlap_duty_cycles[column] >= c.min_overlap_duty_cycles[column] {
                continue;
            }
            let mut perm: Vec<Permanence> = c.permanences.permanences(column).to_vec();
            for p in &mut perm {
                *p += c.syn_perm_below_stimulus_inc;
            }
            c.update_permanences_for_column_sparse(&mut perm, column, false);
        }
    }

    /// Recomputes every column's boost factor from its active duty cycle.
    ///
    /// Columns at or below their minimum duty cycle get a factor
    /// interpolated up to `max_boost`; columns above it are reset to 1.
    /// While the minimum vector is still all zero the factors are left
    /// unchanged.
    fn update_boost_factors(&self, c: &mut Connections) {
        if c.min_active_duty_cycles.iter().all(|&m| m <= 0.0) {
            return;
        }

        for i in 0..c.num_columns {
            let min = c.min_active_duty_cycles[i];
            if min > 0.0 {
                c.boost_factors[i] =
                    (1.0 - c.max_boost) / min * c.active_duty_cycles[i] + c.max_boost;
            }
            if c.active_duty_cycles[i] > min {
                c.boost_factors[i] = 1.0;
            }
        }
    }

    /// Refreshes the per-column minimum duty cycles from the current maxima,
    /// globally or per neighborhood depending on the inhibition mode.
    fn update_min_duty_cycles(&self, c: &mut Connections) {
        if c.global_inhibition || c.inhibition_radius as usize > c.num_inputs {
            self.update_min_duty_cycles_global(c);
        } else {
            self.update_min_duty_cycles_local(c);
        }
    }

    fn update_min_duty_cycles_global(&self, c: &mut Connections) {
        let max_overlap = c.overlap_duty_cycles.iter().copied().fold(0.0, Real::max);
        let max_active = c.active_duty_cycles.iter().copied().fold(0.0, Real::max);

        c.min_overlap_duty_cycles
            .fill(c.min_pct_overlap_duty_cycles * max_overlap);
        c.min_active_duty_cycles
            .fill(c.min_pct_active_duty_cycles * max_active);
    }

    fn update_min_duty_cycles_local(&self, c: &mut Connections) {
        let radius = c.inhibition_radius as usize;
        let mut min_overlap = vec![0.0; c.num_columns];
        let mut min_active = vec![0.0; c.num_columns];

        for column in 0..c.num_columns {
            let neighbors = c.column_topology.neighborhood(column, radius, true);
            let mut max_overlap = c.overlap_duty_cycles[column];
            let mut max_active = c.active_duty_cycles[column];
            for &n in &neighbors {
                max_overlap = max_overlap.max(c.overlap_duty_cycles[n]);
                max_active = max_active.max(c.active_duty_cycles[n]);
            }
            min_overlap[column] = c.min_pct_overlap_duty_cycles * max_overlap;
            min_active[column] = c.min_pct_active_duty_cycles * max_active;
        }

        c.min_overlap_duty_cycles = min_overlap;
        c.min_active_duty_cycles = min_active;
    }

    /// Recomputes the inhibition radius from the average connected receptive
    /// field span, scaled by the column-to-input size ratio.
    fn update_inhibition_radius(&self, c: &mut Connections) {
        if c.global_inhibition {
            c.inhibition_radius = c.column_dimensions.iter().copied().max().unwrap_or(1);
            return;
        }

        let total_span: Real = (0..c.num_columns)
            .map(|column| self.avg_connected_span(c, column))
            .sum();
        let avg_span = total_span / c.num_columns as Real;
        let diameter = avg_span * self.avg_columns_per_input(c);

        c.inhibition_radius = ((diameter - 1.0) / 2.0).round().max(1.0) as UInt;
    }

    /// The span of a column's connected inputs: per-dimension max minus min
    /// coordinate, averaged across dimensions, plus one. Zero when nothing
    /// is connected.
    fn avg_connected_span(&self, c: &Connections, column: usize) -> Real {
        let connected = c.permanences.connected_indices(column);
        if connected.is_empty() {
            return 0.0;
        }

        let ndim = c.input_dimensions.len();
        let mut mins = vec![UInt::MAX; ndim];
        let mut maxs = vec![0; ndim];
        for &input in connected {
            let coords = c.input_topology.coordinates(input as usize);
            for (d, &coord) in coords.iter().enumerate() {
                mins[d] = mins[d].min(coord);
                maxs[d] = maxs[d].max(coord);
            }
        }

        let total: Real = mins
            .iter()
            .zip(&maxs)
            .map(|(&lo, &hi)| Real::from(hi - lo))
            .sum();
        total / ndim as Real + 1.0
    }

    /// The mean of the per-dimension column-to-input size ratios.
    fn avg_columns_per_input(&self, c: &Connections) -> Real {
        let ratios: Real = c
            .column_dimensions
            .iter()
            .zip(&c.input_dimensions)
            .map(|(&col_dim, &in_dim)| Real::from(col_dim) / Real::from(in_dim))
            .sum();
        ratios / c.column_dimensions.len() as Real
    }
}
