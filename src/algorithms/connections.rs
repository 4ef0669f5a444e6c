//! Connections - the spatial pooler state bundle.
//!
//! A [`Connections`] value holds everything the spatial pooler knows: the
//! validated configuration, the columns with their potential pools, the
//! permanence matrix with its mirrored connected-synapse state, the duty
//! cycle and boost arrays, and the seeded random source. The compute pipeline
//! borrows a `Connections` mutably; nothing is copied out with a separate
//! identity and there is no global state anywhere.

use crate::algorithms::Column;
use crate::error::{PoolerError, Result};
use crate::matrix::PermanenceMatrix;
use crate::types::{ElemSparse, Permanence, Real, UInt, MAX_PERMANENCE, MIN_PERMANENCE};
use crate::utils::{Random, Topology};

/// Parameters for creating a spatial pooler's [`Connections`].
///
/// Sparsity is controlled by exactly one of `local_area_density` (a fraction
/// in `(0, 0.5]`) or `num_active_columns_per_inh_area` (a positive count);
/// the inactive one must be left at its `<= 0` sentinel.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialPoolerParams {
    /// Dimensions of the input space (e.g., `vec![100]` for 100 inputs).
    pub input_dimensions: Vec<UInt>,

    /// Dimensions of the column space (e.g., `vec![2048]` for 2048 columns).
    pub column_dimensions: Vec<UInt>,

    /// Maximum distance, in input coordinates, from a column's center to any
    /// potentially-connected input.
    pub potential_radius: UInt,

    /// Fraction of inputs within the potential radius sampled into each
    /// column's potential pool (0.0-1.0].
    pub potential_pct: Real,

    /// If true, all columns compete globally. If false, local inhibition is used.
    pub global_inhibition: bool,

    /// Target density of active columns, or a `<= 0` sentinel when
    /// `num_active_columns_per_inh_area` is used instead.
    pub local_area_density: Real,

    /// Number of active columns per inhibition area, or a `<= 0` sentinel
    /// when `local_area_density` is used instead.
    pub num_active_columns_per_inh_area: i64,

    /// Minimum raw overlap required before a column can participate in
    /// inhibition.
    pub stimulus_threshold: UInt,

    /// Amount to decrease permanence of inactive synapses during learning.
    pub syn_perm_inactive_dec: Permanence,

    /// Amount to increase permanence of active synapses during learning.
    pub syn_perm_active_inc: Permanence,

    /// Amount added while raising a weak column's permanences toward the
    /// stimulus threshold.
    pub syn_perm_below_stimulus_inc: Permanence,

    /// Permanences at or below this value are forced to zero.
    pub syn_perm_trim_threshold: Permanence,

    /// Permanence threshold for a synapse to be considered connected.
    pub syn_perm_connected: Permanence,

    /// Minimum fraction of the neighborhood's max overlap duty cycle below
    /// which a column is bumped.
    pub min_pct_overlap_duty_cycles: Real,

    /// Minimum fraction of the neighborhood's max active duty cycle below
    /// which a column is boosted.
    pub min_pct_active_duty_cycles: Real,

    /// The window, in iterations, over which duty cycles are averaged.
    pub duty_cycle_period: UInt,

    /// The maximum boost factor applied to an underactive column's overlap.
    pub max_boost: Real,

    /// How often (in iterations) the inhibition radius and minimum duty
    /// cycles are refreshed.
    pub update_period: UInt,

    /// Fraction of each column's pool that starts above the connected
    /// threshold.
    pub init_connected_pct: Real,

    /// If true, neighborhoods wrap around the edges of the space.
    pub wrap_around: bool,

    /// Random seed; a negative value selects a seed from system randomness.
    pub seed: i64,
}

impl Default for SpatialPoolerParams {
    fn default() -> Self {
        Self {
            input_dimensions: vec![100],
            column_dimensions: vec![2048],
            potential_radius: 16,
            potential_pct: 0.5,
            global_inhibition: true,
            local_area_density: 0.0,
            num_active_columns_per_inh_area: 10,
            stimulus_threshold: 0,
            syn_perm_inactive_dec: 0.008,
            syn_perm_active_inc: 0.05,
            syn_perm_below_stimulus_inc: 0.01,
            syn_perm_trim_threshold: 0.025,
            syn_perm_connected: 0.1,
            min_pct_overlap_duty_cycles: 0.001,
            min_pct_active_duty_cycles: 0.001,
            duty_cycle_period: 1000,
            max_boost: 10.0,
            update_period: 50,
            init_connected_pct: 0.5,
            wrap_around: true,
            seed: 1,
        }
    }
}

impl SpatialPoolerParams {
    fn validate(&self) -> Result<()> {
        fn invalid(name: &'static str, message: impl Into<String>) -> PoolerError {
            PoolerError::InvalidParameter {
                name,
                message: message.into(),
            }
        }

        for (name, dims) in [
            ("input_dimensions", &self.input_dimensions),
            ("column_dimensions", &self.column_dimensions),
        ] {
            if dims.is_empty() {
                return Err(PoolerError::InvalidDimensions(format!(
                    "{name} cannot be empty"
                )));
            }
            if dims.iter().any(|&d| d == 0) {
                return Err(PoolerError::InvalidDimensions(format!(
                    "{name} must have positive components, got {dims:?}"
                )));
            }
        }
        if self.input_dimensions.len() != self.column_dimensions.len() {
            return Err(PoolerError::InvalidDimensions(format!(
                "input space has {} dimensions but column space has {}",
                self.input_dimensions.len(),
                self.column_dimensions.len()
            )));
        }

        if !(self.potential_pct > 0.0 && self.potential_pct <= 1.0) {
            return Err(invalid("potential_pct", "must be in range (0, 1]"));
        }

        let density_set = self.local_area_density > 0.0;
        let count_set = self.num_active_columns_per_inh_area > 0;
        if density_set == count_set {
            return Err(invalid(
                "local_area_density",
                "exactly one of local_area_density and num_active_columns_per_inh_area must be positive",
            ));
        }
        if density_set && self.local_area_density > 0.5 {
            return Err(invalid("local_area_density", "must be in range (0, 0.5]"));
        }

        if !(self.syn_perm_trim_threshold >= MIN_PERMANENCE
            && self.syn_perm_trim_threshold <= self.syn_perm_connected
            && self.syn_perm_connected <= MAX_PERMANENCE)
        {
            return Err(invalid(
                "syn_perm_connected",
                "permanence thresholds must satisfy 0 <= trim <= connected <= 1",
            ));
        }
        for (name, value) in [
            ("syn_perm_inactive_dec", self.syn_perm_inactive_dec),
            ("syn_perm_active_inc", self.syn_perm_active_inc),
        ] {
            if !(value >= 0.0 && value <= 1.0) {
                return Err(invalid(name, "must be in range [0, 1]"));
            }
        }
        if !(self.syn_perm_below_stimulus_inc > 0.0 && self.syn_perm_below_stimulus_inc <= 1.0) {
            return Err(invalid(
                "syn_perm_below_stimulus_inc",
                "must be in range (0, 1]",
            ));
        }

        for (name, value) in [
            ("min_pct_overlap_duty_cycles", self.min_pct_overlap_duty_cycles),
            ("min_pct_active_duty_cycles", self.min_pct_active_duty_cycles),
            ("init_connected_pct", self.init_connected_pct),
        ] {
            if !(value >= 0.0 && value <= 1.0) {
                return Err(invalid(name, "must be in range [0, 1]"));
            }
        }

        if self.duty_cycle_period == 0 {
            return Err(invalid("duty_cycle_period", "must be positive"));
        }
        if self.update_period == 0 {
            return Err(invalid("update_period", "must be positive"));
        }
        if self.max_boost.is_nan() || self.max_boost < 1.0 {
            return Err(invalid("max_boost", "must be at least 1.0"));
        }

        Ok(())
    }
}

/// The spatial pooler state bundle: configuration plus all learned state.
///
/// Created by [`Connections::new`] (which validates the configuration),
/// populated by [`SpatialPooler::init`](crate::algorithms::SpatialPooler::init)
/// and thereafter mutated only by
/// [`SpatialPooler::compute`](crate::algorithms::SpatialPooler::compute).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connections {
    // Geometry
    pub(crate) input_dimensions: Vec<UInt>,
    pub(crate) column_dimensions: Vec<UInt>,
    pub(crate) num_inputs: usize,
    pub(crate) num_columns: usize,
    pub(crate) input_topology: Topology,
    pub(crate) column_topology: Topology,

    // Configuration
    pub(crate) potential_radius: UInt,
    pub(crate) potential_pct: Real,
    pub(crate) global_inhibition: bool,
    pub(crate) local_area_density: Real,
    pub(crate) num_active_columns_per_inh_area: i64,
    pub(crate) stimulus_threshold: UInt,
    pub(crate) syn_perm_inactive_dec: Permanence,
    pub(crate) syn_perm_active_inc: Permanence,
    pub(crate) syn_perm_below_stimulus_inc: Permanence,
    pub(crate) syn_perm_trim_threshold: Permanence,
    pub(crate) syn_perm_connected: Permanence,
    pub(crate) min_pct_overlap_duty_cycles: Real,
    pub(crate) min_pct_active_duty_cycles: Real,
    pub(crate) duty_cycle_period: UInt,
    pub(crate) max_boost: Real,
    pub(crate) update_period: UInt,
    pub(crate) init_connected_pct: Real,
    pub(crate) wrap_around: bool,

    // Learned state
    pub(crate) columns: Vec<Column>,
    pub(crate) permanences: PermanenceMatrix,
    pub(crate) overlap_duty_cycles: Vec<Real>,
    pub(crate) active_duty_cycles: Vec<Real>,
    pub(crate) min_overlap_duty_cycles: Vec<Real>,
    pub(crate) min_active_duty_cycles: Vec<Real>,
    pub(crate) boost_factors: Vec<Real>,
    pub(crate) tie_breaker: Vec<Real>,
    pub(crate) inhibition_radius: UInt,

    // Bookkeeping
    pub(crate) iteration_num: UInt,
    pub(crate) iteration_learn_num: UInt,
    pub(crate) rng: Random,
    pub(crate) initialized: bool,
}

impl Connections {
    /// Creates a new state bundle from validated parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any parameter violates its documented
    /// range, if the dimension vectors are empty or contain zeros, or if the
    /// sparsity controls are not mutually exclusive.
    pub fn new(params: SpatialPoolerParams) -> Result<Self> {
        params.validate()?;

        let input_topology = Topology::new(&params.input_dimensions);
        let column_topology = Topology::new(&params.column_dimensions);
        let num_inputs = input_topology.num_elements();
        let num_columns = column_topology.num_elements();

        Ok(Self {
            input_dimensions: params.input_dimensions,
            column_dimensions: params.column_dimensions,
            num_inputs,
            num_columns,
            input_topology,
            column_topology,

            potential_radius: params.potential_radius,
            potential_pct: params.potential_pct,
            global_inhibition: params.global_inhibition,
            local_area_density: params.local_area_density,
            num_active_columns_per_inh_area: params.num_active_columns_per_inh_area,
            stimulus_threshold: params.stimulus_threshold,
            syn_perm_inactive_dec: params.syn_perm_inactive_dec,
            syn_perm_active_inc: params.syn_perm_active_inc,
            syn_perm_below_stimulus_inc: params.syn_perm_below_stimulus_inc,
            syn_perm_trim_threshold: params.syn_perm_trim_threshold,
            syn_perm_connected: params.syn_perm_connected,
            min_pct_overlap_duty_cycles: params.min_pct_overlap_duty_cycles,
            min_pct_active_duty_cycles: params.min_pct_active_duty_cycles,
            duty_cycle_period: params.duty_cycle_period,
            max_boost: params.max_boost,
            update_period: params.update_period,
            init_connected_pct: params.init_connected_pct,
            wrap_around: params.wrap_around,

            columns: (0..num_columns).map(|i| Column::new(i as UInt)).collect(),
            permanences: PermanenceMatrix::new(num_columns, num_inputs),
            overlap_duty_cycles: vec![0.0; num_columns],
            active_duty_cycles: vec![0.0; num_columns],
            min_overlap_duty_cycles: vec![0.0; num_columns],
            min_active_duty_cycles: vec![0.0; num_columns],
            boost_factors: vec![1.0; num_columns],
            tie_breaker: vec![0.0; num_columns],
            inhibition_radius: 0,

            iteration_num: 0,
            iteration_learn_num: 0,
            rng: Random::new(params.seed),
            initialized: false,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the input dimensions.
    pub fn input_dimensions(&self) -> &[UInt] {
        &self.input_dimensions
    }

    /// Returns the column dimensions.
    pub fn column_dimensions(&self) -> &[UInt] {
        &self.column_dimensions
    }

    /// Returns the number of input bits.
    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Returns the number of columns.
    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// Returns the potential radius.
    pub fn potential_radius(&self) -> UInt {
        self.potential_radius
    }

    /// Returns whether global inhibition is enabled.
    pub fn global_inhibition(&self) -> bool {
        self.global_inhibition
    }

    /// Returns the stimulus threshold.
    pub fn stimulus_threshold(&self) -> UInt {
        self.stimulus_threshold
    }

    /// Returns the permanence threshold for a synapse to be connected.
    pub fn syn_perm_connected(&self) -> Permanence {
        self.syn_perm_connected
    }

    /// Returns the current inhibition radius.
    pub fn inhibition_radius(&self) -> UInt {
        self.inhibition_radius
    }

    /// Returns the total number of compute iterations performed.
    pub fn iteration_num(&self) -> UInt {
        self.iteration_num
    }

    /// Returns the number of compute iterations performed with learning.
    pub fn iteration_learn_num(&self) -> UInt {
        self.iteration_learn_num
    }

    /// Returns the master seed of the random source.
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Returns the boost factors of all columns.
    pub fn boost_factors(&self) -> &[Real] {
        &self.boost_factors
    }

    /// Returns the overlap duty cycles of all columns.
    pub fn overlap_duty_cycles(&self) -> &[Real] {
        &self.overlap_duty_cycles
    }

    /// Returns the active duty cycles of all columns.
    pub fn active_duty_cycles(&self) -> &[Real] {
        &self.active_duty_cycles
    }

    /// Returns the minimum overlap duty cycles of all columns.
    pub fn min_overlap_duty_cycles(&self) -> &[Real] {
        &self.min_overlap_duty_cycles
    }

    /// Returns the minimum active duty cycles of all columns.
    pub fn min_active_duty_cycles(&self) -> &[Real] {
        &self.min_active_duty_cycles
    }

    /// Returns the columns.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Returns the potential pool of `column` as sorted input indices.
    pub fn potential_pool(&self, column: usize) -> &[ElemSparse] {
        self.columns[column].pool().indices()
    }

    /// Returns the pool-aligned permanences of `column`.
    pub fn column_permanences(&self, column: usize) -> &[Permanence] {
        self.permanences.permanences(column)
    }

    /// Returns the sorted input indices of `column`'s connected synapses.
    pub fn column_connected_indices(&self, column: usize) -> &[ElemSparse] {
        self.permanences.connected_indices(column)
    }

    /// Returns the number of connected synapses of `column`.
    pub fn connected_count(&self, column: usize) -> UInt {
        self.permanences.connected_count(column)
    }

    /// Returns the connected counts of all columns.
    pub fn connected_counts(&self) -> &[UInt] {
        self.permanences.connected_counts()
    }

    // ========================================================================
    // Permanence updates
    // ========================================================================

    /// Normalizes and stores a dense permanence working array for `column`.
    ///
    /// `perm` has one entry per input bit; only the entries at the column's
    /// pool indices are kept. With `raise` set, all entries of the dense
    /// array are first incremented until the pool holds at least
    /// `stimulus_threshold` connected synapses (capped at the pool size).
    /// Entries at or below the trim threshold become zero, the rest are
    /// clipped to the permanence bounds, and the column's connected row and
    /// count are refreshed.
    pub(crate) fn update_permanences_for_column(
        &mut self,
        perm: &mut [Permanence],
        column: usize,
        raise: bool,
    ) {
        debug_assert_eq!(perm.len(), self.num_inputs);

        if raise {
            self.raise_permanence_to_threshold(perm, column);
        }
        self.trim_and_clip(perm);

        let pool = self.columns[column].pool().indices();
        let values: Vec<Permanence> = pool.iter().map(|&j| perm[j as usize]).collect();
        self.permanences
            .set_column(column, pool, &values, self.syn_perm_connected);
    }

    /// Pool-aligned variant of [`update_permanences_for_column`]: `perm` has
    /// one entry per pool index and the raise step touches pool entries only.
    ///
    /// [`update_permanences_for_column`]: Connections::update_permanences_for_column
    pub(crate) fn update_permanences_for_column_sparse(
        &mut self,
        perm: &mut [Permanence],
        column: usize,
        raise: bool,
    ) {
        debug_assert_eq!(perm.len(), self.columns[column].pool().len());

        if raise {
            self.raise_permanence_to_threshold_sparse(perm);
        }
        self.trim_and_clip(perm);

        let pool = self.columns[column].pool().indices();
        self.permanences
            .set_column(column, pool, perm, self.syn_perm_connected);
    }

    fn raise_permanence_to_threshold(&self, perm: &mut [Permanence], column: usize) {
        let pool = self.columns[column].pool().indices();
        let target = (self.stimulus_threshold as usize).min(pool.len());

        loop {
            let connected = pool
                .iter()
                .filter(|&&j| perm[j as usize] >= self.syn_perm_connected)
                .count();
            if connected >= target {
                break;
            }
            for p in perm.iter_mut() {
                *p += self.syn_perm_below_stimulus_inc;
            }
        }
    }

    fn raise_permanence_to_threshold_sparse(&self, perm: &mut [Permanence]) {
        let target = (self.stimulus_threshold as usize).min(perm.len());

        loop {
            let connected = perm
                .iter()
                .filter(|&&p| p >= self.syn_perm_connected)
                .count();
            if connected >= target {
                break;
            }
            for p in perm.iter_mut() {
                *p += self.syn_perm_below_stimulus_inc;
            }
        }
    }

    fn trim_and_clip(&self, perm: &mut [Permanence]) {
        for p in perm.iter_mut() {
            if *p <= self.syn_perm_trim_threshold {
                *p = 0.0;
            } else {
                *p = p.clamp(MIN_PERMANENCE, MAX_PERMANENCE);
            }
        }
    }
}
