use crate::{
    model::Bounds,
    tree::{
        snapshot::NodeSnapshot,
        solver::{Solver, SolverConfig, SolverConfigError},
    },
};

use super::support::{ChainAction, ChainBelief, ChainModel, DoorBelief, DoorModel};

fn chain_config() -> SolverConfig {
    SolverConfig {
        iterations: 50,
        num_particles: 1,
        branching_factor: 1,
        num_state: 1,
        num_prune_obs: 8,
        num_eval_belief: 1,
        num_obs: 4,
        max_steps: 128,
        max_depth: 64,
        expansions_per_search: Some(1),
        convergence_gap: 0.1,
        bound_tolerance: Some(1e-6),
        seed: 0,
    }
}

#[test]
fn default_yaml_matches_default_config() {
    let parsed = SolverConfig::from_default_yaml().expect("default yaml should parse");
    let default = SolverConfig::default();

    assert_eq!(parsed.iterations, default.iterations);
    assert_eq!(parsed.num_particles, default.num_particles);
    assert_eq!(parsed.branching_factor, default.branching_factor);
    assert_eq!(parsed.num_state, default.num_state);
    assert_eq!(parsed.num_prune_obs, default.num_prune_obs);
    assert_eq!(parsed.num_eval_belief, default.num_eval_belief);
    assert_eq!(parsed.num_obs, default.num_obs);
    assert_eq!(parsed.max_steps, default.max_steps);
    assert_eq!(parsed.max_depth, default.max_depth);
    assert_eq!(parsed.expansions_per_search, default.expansions_per_search);
    assert_eq!(parsed.convergence_gap, default.convergence_gap);
    assert_eq!(parsed.bound_tolerance, default.bound_tolerance);
    assert_eq!(parsed.seed, default.seed);
}

#[test]
fn partial_yaml_falls_back_to_defaults() {
    let config = SolverConfig::from_yaml_str("iterations: 7\nexpansions_per_search: 3\n")
        .expect("partial yaml should parse");
    assert_eq!(config.iterations, 7);
    assert_eq!(config.expansions_per_search, Some(3));
    assert_eq!(config.branching_factor, SolverConfig::default().branching_factor);
}

#[test]
fn invalid_config_values_are_rejected() {
    for yaml in [
        "branching_factor: 0",
        "num_particles: 0",
        "expansions_per_search: 0",
        "convergence_gap: -1.0",
        "bound_tolerance: .nan",
    ] {
        let err = SolverConfig::from_yaml_str(yaml).expect_err(yaml);
        assert!(matches!(err, SolverConfigError::Invalid(_)), "{yaml}: {err}");
    }

    let err = SolverConfig::from_yaml_str("iterations: [1, 2]").expect_err("wrong type");
    assert!(matches!(err, SolverConfigError::Yaml(_)));
}

#[test]
fn tight_bounds_converge_after_one_iteration() {
    let model = ChainModel::new(5.0, 0.0, 0.5);
    let mut solver: Solver<ChainModel, ChainBelief> =
        Solver::new(chain_config(), Bounds::constant(5.0, 5.0)).expect("config should be valid");

    let metrics = solver.run(&model).expect("solve should succeed");

    assert_eq!(metrics.iterations_completed, 1);
    assert!(metrics.converged);
    assert_eq!(metrics.gap(), 0.0);
    assert_eq!(solver.tree().expect("tree exists").node_count(), 1);
    // Nothing beat the supplied lower bound.
    assert_eq!(solver.policy().entry(), None);
    assert_eq!(solver.policy().root_belief(), Some(&[((), 1.0)][..]));
}

#[test]
fn loose_bounds_tighten_monotonically_until_convergence() {
    let model = ChainModel::new(5.0, 0.0, 0.5);
    let mut solver: Solver<ChainModel, ChainBelief> =
        Solver::new(chain_config(), Bounds::constant(100.0, -100.0))
            .expect("config should be valid");

    let mut history = Vec::new();
    let metrics = solver
        .run_with_hook(&model, |m| history.push((m.root_upper, m.root_lower)))
        .expect("solve should succeed");

    assert!(metrics.converged);
    assert_eq!(metrics.iterations_completed, 10);
    assert!(metrics.iterations_completed < metrics.iterations_requested);
    assert_eq!(history.len(), 10);
    assert_eq!(history[0], (52.5, 3.75));

    for pair in history.windows(2) {
        assert!(pair[1].0 < pair[0].0, "upper must strictly decrease: {pair:?}");
        assert!(pair[1].1 >= pair[0].1, "lower must not decrease: {pair:?}");
    }
    for pair in history[..6].windows(2) {
        assert!(pair[1].1 > pair[0].1, "lower must strictly increase early: {pair:?}");
    }

    let (upper, lower) = history[history.len() - 1];
    assert!(upper >= 5.0 && lower <= 5.0);
    assert_eq!(solver.policy().entry_action(), Some(&ChainAction::Go));
}

#[test]
fn stopping_model_converges_to_the_terminal_action() {
    let model = ChainModel::new(1.0, 10.0, 0.5);
    let mut solver: Solver<ChainModel, ChainBelief> =
        Solver::new(chain_config(), Bounds::constant(5.0, -1.0)).expect("config should be valid");

    let policy = solver.solve(&model).expect("solve should succeed");
    assert_eq!(policy.entry_action(), Some(&ChainAction::Stop));

    let entry = policy.entry().expect("entry exists");
    assert_eq!(policy.transition(entry, &()), Ok(None));
}

#[test]
fn cancelled_solve_stops_after_the_current_iteration() {
    let model = ChainModel::new(5.0, 0.0, 0.5);
    let mut solver: Solver<ChainModel, ChainBelief> =
        Solver::new(chain_config(), Bounds::constant(100.0, -100.0))
            .expect("config should be valid");
    solver.cancel_token().cancel();

    let metrics = solver.run(&model).expect("solve should succeed");

    assert!(metrics.cancelled);
    assert!(!metrics.converged);
    assert_eq!(metrics.iterations_completed, 1);
}

#[test]
fn noisy_model_solve_produces_a_policy() {
    let model = DoorModel::new(0.85);
    let config = SolverConfig {
        iterations: 5,
        num_particles: 32,
        branching_factor: 2,
        num_state: 8,
        num_eval_belief: 1,
        num_obs: 4,
        max_steps: 10,
        max_depth: 6,
        expansions_per_search: Some(2),
        seed: 11,
        ..SolverConfig::default()
    };
    let mut solver: Solver<DoorModel, DoorBelief> =
        Solver::new(config, Bounds::constant(100.0, -100.0)).expect("config should be valid");

    let mut iterations = 0;
    let metrics = solver
        .run_with_hook(&model, |_| iterations += 1)
        .expect("solve should succeed");

    assert_eq!(metrics.iterations_completed, iterations);
    assert!(!metrics.converged);
    assert!(solver.policy().entry_action().is_some());
    assert!(!solver.policy().graph().is_empty());
    assert_eq!(solver.policy().root_belief().map(<[_]>::len), Some(2));
}

#[test]
fn snapshot_mirrors_the_tree() {
    let model = ChainModel::new(5.0, 0.0, 0.5);
    let mut solver: Solver<ChainModel, ChainBelief> =
        Solver::new(chain_config(), Bounds::constant(100.0, -100.0))
            .expect("config should be valid");
    solver.iterate(&model, 0).expect("iteration should succeed");

    let tree = solver.tree().expect("tree exists");
    let snapshot = tree.snapshot();
    assert_eq!(snapshot.node_count, tree.node_count());
    assert_eq!(snapshot.nodes.len(), tree.node_count());
    match &snapshot.nodes[0] {
        NodeSnapshot::Belief {
            node_id,
            upper,
            lower,
            best_controller_id,
            ..
        } => {
            assert_eq!(*node_id, 0);
            assert_eq!(*upper, 52.5);
            assert_eq!(*lower, 3.75);
            assert!(best_controller_id.is_some());
        }
        other => panic!("root should be a belief node, got {other:?}"),
    }
    match &snapshot.nodes[2] {
        NodeSnapshot::Action {
            action,
            is_terminal,
            ..
        } => {
            assert_eq!(action, "Stop");
            assert!(*is_terminal);
        }
        other => panic!("expected the stop action, got {other:?}"),
    }

    let json = snapshot.to_json().expect("snapshot serializes");
    assert!(json.contains("\"kind\": \"belief\""));
    assert!(json.contains("\"kind\": \"action\""));
}
