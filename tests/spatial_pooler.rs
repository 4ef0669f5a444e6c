//! End-to-end tests for the spatial pooler.
//!
//! These exercise the public facade the way a host application would: build a
//! `Connections` bundle, initialize it, and drive `compute` with dense binary
//! vectors, checking the algorithm's observable laws along the way.
//!
//! Run with: `cargo test --test spatial_pooler`

use perun::prelude::*;

fn one_d_params(seed: i64) -> SpatialPoolerParams {
    SpatialPoolerParams {
        input_dimensions: vec![32],
        column_dimensions: vec![16],
        potential_radius: 16,
        potential_pct: 0.5,
        global_inhibition: true,
        local_area_density: 0.0,
        num_active_columns_per_inh_area: 3,
        syn_perm_connected: 0.1,
        seed,
        ..Default::default()
    }
}

fn build(params: SpatialPoolerParams) -> (SpatialPooler, Connections) {
    let mut c = Connections::new(params).unwrap();
    let pooler = SpatialPooler::new();
    pooler.init(&mut c);
    (pooler, c)
}

fn random_input(rng: &mut Random, len: usize, density: f64) -> Vec<u8> {
    (0..len)
        .map(|_| u8::from(rng.get_real64() < density))
        .collect()
}

fn active_set(active: &[u8]) -> Vec<usize> {
    active
        .iter()
        .enumerate()
        .filter(|(_, &a)| a > 0)
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn one_d_sanity() {
    let (pooler, mut c) = build(one_d_params(42));

    let input = vec![1u8; c.num_inputs()];
    let mut active = vec![0u8; c.num_columns()];
    pooler
        .compute(&mut c, &input, &mut active, false, false)
        .unwrap();

    let winners = active_set(&active);
    assert_eq!(winners.len(), 3);

    // With the whole input lit, every winner's overlap equals its connected
    // count, which must clear the stimulus threshold.
    for &w in &winners {
        assert!(c.connected_count(w) >= c.stimulus_threshold());
        assert!(c.connected_count(w) > 0);
    }
}

#[test]
fn zero_input_stays_silent() {
    let (pooler, mut c) = build(one_d_params(42));

    let input = vec![0u8; c.num_inputs()];
    let mut active = vec![0u8; c.num_columns()];

    for learn in [false, true] {
        pooler
            .compute(&mut c, &input, &mut active, learn, false)
            .unwrap();
        assert!(active.iter().all(|&a| a == 0));
    }
}

#[test]
fn identical_seeds_run_in_lockstep() {
    let (pooler, mut c1) = build(one_d_params(42));
    let (_, mut c2) = build(one_d_params(42));

    let mut inputs = Random::new(123);
    let mut active1 = vec![0u8; c1.num_columns()];
    let mut active2 = vec![0u8; c2.num_columns()];

    for _ in 0..50 {
        let input = random_input(&mut inputs, c1.num_inputs(), 0.3);
        pooler
            .compute(&mut c1, &input, &mut active1, true, false)
            .unwrap();
        pooler
            .compute(&mut c2, &input, &mut active2, true, false)
            .unwrap();
        assert_eq!(active1, active2);
    }

    assert_eq!(c1.iteration_num(), c2.iteration_num());
    for column in 0..c1.num_columns() {
        assert_eq!(c1.column_permanences(column), c2.column_permanences(column));
    }
}

#[test]
fn different_seeds_diverge() {
    let (_, c1) = build(one_d_params(42));
    let (_, c2) = build(one_d_params(43));

    let differs = (0..c1.num_columns()).any(|column| {
        c1.potential_pool(column) != c2.potential_pool(column)
            || c1.column_permanences(column) != c2.column_permanences(column)
    });
    assert!(differs);
}

#[test]
fn non_learning_compute_is_idempotent() {
    let (pooler, mut c) = build(one_d_params(42));

    let mut inputs = Random::new(9);
    let input = random_input(&mut inputs, c.num_inputs(), 0.4);
    let mut active = vec![0u8; c.num_columns()];

    // Shape the pooler a little first.
    for _ in 0..10 {
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
    }

    let duty_before = c.active_duty_cycles().to_vec();
    let overlap_duty_before = c.overlap_duty_cycles().to_vec();
    let perms_before: Vec<Vec<f64>> = (0..c.num_columns())
        .map(|col| c.column_permanences(col).to_vec())
        .collect();
    let iterations_before = c.iteration_num();
    let learn_iterations_before = c.iteration_learn_num();

    let mut first = vec![0u8; c.num_columns()];
    let mut second = vec![0u8; c.num_columns()];
    pooler
        .compute(&mut c, &input, &mut first, false, false)
        .unwrap();
    pooler
        .compute(&mut c, &input, &mut second, false, false)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(c.active_duty_cycles(), &duty_before[..]);
    assert_eq!(c.overlap_duty_cycles(), &overlap_duty_before[..]);
    for (column, before) in perms_before.iter().enumerate() {
        assert_eq!(c.column_permanences(column), &before[..]);
    }
    // Only the iteration counter advances.
    assert_eq!(c.iteration_num(), iterations_before + 2);
    assert_eq!(c.iteration_learn_num(), learn_iterations_before);
}

#[test]
fn repeated_input_converges() {
    let (pooler, mut c) = build(SpatialPoolerParams {
        input_dimensions: vec![50],
        column_dimensions: vec![50],
        global_inhibition: true,
        local_area_density: 0.0,
        num_active_columns_per_inh_area: 3,
        seed: 42,
        ..Default::default()
    });

    let mut inputs = Random::new(42);
    let input = random_input(&mut inputs, c.num_inputs(), 0.2);
    let mut active = vec![0u8; c.num_columns()];

    let mut stable_winners: Option<Vec<usize>> = None;
    for iteration in 1..=200 {
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
        if iteration >= 100 {
            let winners = active_set(&active);
            match &stable_winners {
                None => stable_winners = Some(winners),
                Some(expected) => {
                    assert_eq!(&winners, expected, "winners moved at iteration {iteration}")
                }
            }
        }
    }

    assert_eq!(stable_winners.unwrap().len(), 3);
}

#[test]
fn sparsity_never_exceeds_target() {
    let (pooler, mut c) = build(SpatialPoolerParams {
        input_dimensions: vec![64],
        column_dimensions: vec![256],
        potential_radius: 31,
        global_inhibition: true,
        local_area_density: 0.1,
        num_active_columns_per_inh_area: 0,
        seed: 42,
        ..Default::default()
    });

    let limit = (0.1_f64 * 256.0).ceil() as usize + 1;
    let mut inputs = Random::new(5);
    let mut active = vec![0u8; c.num_columns()];

    for _ in 0..100 {
        let input = random_input(&mut inputs, c.num_inputs(), 0.25);
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
        let count = active.iter().filter(|&&a| a > 0).count();
        assert!(count <= limit);
    }
}

#[test]
fn state_invariants_hold_under_local_inhibition() {
    let (pooler, mut c) = build(SpatialPoolerParams {
        input_dimensions: vec![8, 8],
        column_dimensions: vec![8, 8],
        potential_radius: 3,
        potential_pct: 0.8,
        global_inhibition: false,
        local_area_density: 0.3,
        num_active_columns_per_inh_area: 0,
        seed: 42,
        ..Default::default()
    });

    let trim = 0.025;
    let connected_threshold = c.syn_perm_connected();
    let mut inputs = Random::new(17);
    let mut active = vec![0u8; c.num_columns()];

    for _ in 0..100 {
        let input = random_input(&mut inputs, c.num_inputs(), 0.3);
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
    }

    for column in 0..c.num_columns() {
        let pool = c.potential_pool(column);
        let perms = c.column_permanences(column);
        assert_eq!(pool.len(), perms.len());

        let mut connected = 0;
        for &p in perms {
            assert!((0.0..=1.0).contains(&p), "permanence {p} out of bounds");
            assert!(
                p == 0.0 || p > trim,
                "permanence {p} survived inside the trim gap"
            );
            if p >= connected_threshold {
                connected += 1;
            }
        }
        assert_eq!(connected, c.connected_count(column) as usize);
        assert_eq!(
            c.column_connected_indices(column).len(),
            c.connected_count(column) as usize
        );
    }

    assert!(c.inhibition_radius() >= 1);
}

#[test]
fn pool_sizes_are_fixed_after_init() {
    let (pooler, mut c) = build(one_d_params(42));
    let sizes: Vec<usize> = (0..c.num_columns())
        .map(|col| c.potential_pool(col).len())
        .collect();

    let mut inputs = Random::new(11);
    let mut active = vec![0u8; c.num_columns()];
    for _ in 0..50 {
        let input = random_input(&mut inputs, c.num_inputs(), 0.5);
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
    }

    for column in 0..c.num_columns() {
        assert_eq!(c.potential_pool(column).len(), sizes[column]);
    }
}

#[test]
fn wrong_sized_buffers_leave_state_untouched() {
    let (pooler, mut c) = build(one_d_params(42));
    let perms_before = c.column_permanences(0).to_vec();

    let mut active = vec![0u8; c.num_columns()];
    let err = pooler
        .compute(&mut c, &vec![1u8; 31], &mut active, true, false)
        .unwrap_err();
    assert!(matches!(err, PoolerError::DimensionMismatch { .. }));

    assert_eq!(c.iteration_num(), 0);
    assert_eq!(c.iteration_learn_num(), 0);
    assert_eq!(c.column_permanences(0), &perms_before[..]);
}

#[test]
fn output_sum_matches_winner_count() {
    let (pooler, mut c) = build(one_d_params(42));
    let mut inputs = Random::new(2);
    let mut active = vec![0u8; c.num_columns()];

    for _ in 0..20 {
        let input = random_input(&mut inputs, c.num_inputs(), 0.5);
        pooler
            .compute(&mut c, &input, &mut active, true, false)
            .unwrap();
        let sum: u32 = active.iter().map(|&a| u32::from(a)).sum();
        assert_eq!(sum as usize, active_set(&active).len());
        assert!(active.iter().all(|&a| a <= 1));
    }
}
