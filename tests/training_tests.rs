//! End-to-end tests for the training loop on the reference graph

use bellman::{
    mdp::RewardModel,
    pipeline::{MetricsObserver, TrainingConfig, TrainingLoop, train},
    q_learning::{ActionSampler, BellmanUpdater, DiscountFactor, FallbackRange, ValueTable},
};
use rand::{SeedableRng, rngs::StdRng};

fn reference_config(seed: u64) -> TrainingConfig {
    TrainingConfig {
        seed: Some(seed),
        ..TrainingConfig::default()
    }
}

/// Converged values for the reference graph with γ = 0.8
///
/// V(2) = 500, and every other entry follows Q(s,a) = R(s,a) + 0.8 V(a).
fn expected_reference_values() -> Vec<(usize, usize, f64)> {
    let v2 = 500.0;
    let v3 = 1.0 + 0.8 * v2;
    let v1 = 1.0 + 0.8 * v3;
    let v4 = v1;
    let v0 = 1.0 + 0.8 * v4;
    let v5 = 1.0 + 0.8 * v1;
    vec![
        (0, 4, 1.0 + 0.8 * v4),
        (1, 3, 1.0 + 0.8 * v3),
        (1, 5, 1.0 + 0.8 * v5),
        (2, 2, 100.0 + 0.8 * v2),
        (2, 3, 1.0 + 0.8 * v3),
        (3, 1, 1.0 + 0.8 * v1),
        (3, 2, 1.0 + 0.8 * v2),
        (3, 4, 1.0 + 0.8 * v4),
        (4, 0, 1.0 + 0.8 * v0),
        (4, 3, 1.0 + 0.8 * v3),
        (5, 1, 1.0 + 0.8 * v1),
    ]
}

#[test]
fn test_reference_run_converges() {
    let model = RewardModel::reference();
    let (table, result) = train(&model, reference_config(42)).unwrap();

    assert_eq!(result.total_updates, 50_001);
    assert_eq!(result.fallback_draws, 0);

    for (state, action, expected) in expected_reference_values() {
        let learned = table.get(state, action);
        assert!(
            (learned - expected).abs() < 1e-6,
            "Q({state}, {action}) = {learned}, expected {expected}"
        );
    }

    // Illegal moves are never sampled, so they keep their initial value.
    for state in 0..6 {
        for action in 0..6 {
            if !model.is_legal(state, action) {
                assert_eq!(table.get(state, action), 0.0);
            }
        }
    }
}

#[test]
fn test_normalized_table_peaks_at_goal() {
    let model = RewardModel::reference();
    let (table, _) = train(&model, reference_config(7)).unwrap();
    let normed = table.normalized();

    assert_eq!(normed.get(2, 2), 100.0);
    assert_eq!(normed.max_actions(2), vec![2]);
    assert_eq!(normed.max_actions(3), vec![2]);
    assert!(
        normed
            .rows()
            .flatten()
            .all(|&v| (0.0..=100.0).contains(&v))
    );
}

#[test]
fn test_greedy_actions_follow_shortest_path_to_goal() {
    let model = RewardModel::reference();
    let (table, _) = train(&model, reference_config(99)).unwrap();

    // 0 -> 4 -> 3 -> 2 and 5 -> 1 -> 3 -> 2
    let expected_best = [4, 3, 2, 2, 3, 1];
    for (state, &best) in expected_best.iter().enumerate() {
        assert_eq!(table.max_actions(state), vec![best], "state {state}");
    }
}

#[test]
fn test_same_seed_is_bit_identical() {
    let model = RewardModel::reference();
    let config = TrainingConfig {
        iterations: 2_000,
        ..reference_config(1234)
    };
    let (first, _) = train(&model, config.clone()).unwrap();
    let (second, _) = train(&model, config).unwrap();

    assert_eq!(first, second);
    let first_bits: Vec<u64> = first.rows().flatten().map(|v| v.to_bits()).collect();
    let second_bits: Vec<u64> = second.rows().flatten().map(|v| v.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
}

#[test]
fn test_single_step_from_state_one() {
    let model = RewardModel::reference();
    let config = TrainingConfig {
        iterations: 0,
        ..reference_config(5)
    };
    let (table, result) = train(&model, config).unwrap();
    assert_eq!(result.total_updates, 1);

    let written: Vec<usize> = (0..6).filter(|&a| table.get(1, a) != 0.0).collect();
    assert_eq!(written.len(), 1);
    let action = written[0];
    assert!([3, 5].contains(&action));
    assert_eq!(table.get(1, action), model.reward(1, action));
    for state in [0, 2, 3, 4, 5] {
        assert!(table.row(state).iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_backup_matches_bellman_equation_at_every_step() {
    let model = RewardModel::reference();
    let sampler = ActionSampler::new(&model);
    let updater = BellmanUpdater::new(DiscountFactor::new(0.8).unwrap());
    let mut table = ValueTable::new(6);
    let mut rng = StdRng::seed_from_u64(77);

    for step in 0..3_000 {
        let state = step % 6;
        let action = sampler.choose_action(state, &mut rng);
        let prior = table.clone();
        let best_next = prior.row(action).iter().copied().fold(f64::MIN, f64::max);

        updater.update(&mut table, &model, state, action, &mut rng);

        assert_eq!(
            table.get(state, action),
            model.reward(state, action) + 0.8 * best_next
        );
        for s in 0..6 {
            for a in 0..6 {
                if (s, a) != (state, action) {
                    assert_eq!(table.get(s, a), prior.get(s, a));
                }
            }
        }
    }
}

#[test]
fn test_dead_end_uses_fallback_range() {
    // State 2 has no rewarded move; the reference range never draws state 3.
    let model = RewardModel::from_rows(vec![
        vec![0.0, 1.0, 0.0, 0.0],
        vec![1.0, 0.0, 0.0, 10.0],
        vec![0.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 0.0, 0.0],
    ])
    .unwrap();
    let config = TrainingConfig {
        iterations: 4_000,
        seed: Some(21),
        start_state: None,
        fallback: FallbackRange::Reference,
        ..TrainingConfig::default()
    };

    let mut table = ValueTable::new(4);
    let mut metrics = MetricsObserver::new(4);
    let result = TrainingLoop::new(&model, config)
        .unwrap()
        .with_observer(Box::new(&mut metrics))
        .run(&mut table)
        .unwrap();

    assert!(!result.demonstration);
    assert_eq!(result.total_updates, 4_000);
    assert_eq!(result.fallback_draws, metrics.state_visits(2));
    assert!(result.fallback_draws > 0);
    assert_eq!(metrics.action_visits(2, 3), 0);
    assert!((0..3).all(|a| metrics.action_visits(2, a) > 0));
}

#[test]
fn test_all_negative_table_normalizes_against_its_maximum() {
    // No move is rewarded, so every value ends up negative.
    let model = RewardModel::from_rows(vec![vec![-1.0, -3.0], vec![-2.0, -5.0]]).unwrap();
    let config = TrainingConfig {
        iterations: 2_000,
        seed: Some(5),
        ..TrainingConfig::default()
    };
    let (table, result) = train(&model, config).unwrap();
    assert_eq!(result.fallback_draws, result.total_updates);
    assert!(table.rows().flatten().all(|&v| v < 0.0));

    let max = table.max_value();
    let normed = table.normalized();
    for state in 0..2 {
        for action in 0..2 {
            let expected = table.get(state, action) / max * 100.0;
            assert_eq!(normed.get(state, action), expected);
            assert!(normed.get(state, action) >= 100.0);
        }
    }
}
