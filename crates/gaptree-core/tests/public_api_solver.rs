mod support;

use gaptree_core::{
    BackupCandidate, BackupParams, BackupScratch, Belief, Bounds, ConstantBound, ControllerNode,
    PolicyBackup, PolicyGraph, Pomdp, Solver, SolverConfig, TreeError,
};
use rand::Rng;
use support::{CoinBelief, CoinModel, GuessAction, oracle_upper};

fn config() -> SolverConfig {
    SolverConfig {
        iterations: 20,
        num_particles: 1,
        branching_factor: 16,
        num_state: 256,
        num_prune_obs: 4,
        num_eval_belief: 1,
        num_obs: 2,
        max_steps: 8,
        max_depth: 8,
        expansions_per_search: None,
        convergence_gap: 0.1,
        bound_tolerance: None,
        seed: 3,
    }
}

fn bounds() -> Bounds<CoinModel, CoinBelief> {
    Bounds::new(oracle_upper, ConstantBound(-1.0))
}

#[test]
fn public_solve_learns_to_peek_before_guessing() {
    let model = CoinModel::new();
    let mut solver = Solver::new(config(), bounds()).expect("config should be valid");

    let metrics = solver.run(&model).expect("solve should succeed");
    assert!(metrics.converged);
    assert!(metrics.iterations_completed < metrics.iterations_requested);
    // 0.9 * (peek cost + 0.9 * correct guess)
    assert!((metrics.root_lower - 0.36).abs() < 1e-9);

    let policy = solver.policy();
    assert_eq!(policy.entry_action(), Some(&GuessAction::Peek));

    let entry = policy.entry().expect("entry exists");
    for heads in [true, false] {
        let next = policy
            .transition(entry, &heads)
            .expect("entry exists")
            .expect("peek continues");
        assert_eq!(policy.action(next), Ok(&GuessAction::Guess(heads)));
        assert_eq!(policy.transition(next, &false), Ok(None));
    }
}

#[test]
fn public_policy_graph_can_be_replayed() {
    let model = CoinModel::new();
    let mut solver = Solver::new(config(), bounds()).expect("config should be valid");
    let policy = solver.solve(&model).expect("solve should succeed");
    let entry = policy.entry().expect("entry exists");

    let mut rng = rand::thread_rng();
    for heads in [true, false] {
        let value = policy
            .graph()
            .simulate(entry, &heads, &model, 8, &mut rng)
            .expect("policy replays");
        assert!((value - 0.36).abs() < 1e-9);
    }
}

#[test]
fn public_snapshot_serializes_the_tree() {
    let model = CoinModel::new();
    let mut solver = Solver::new(config(), bounds()).expect("config should be valid");
    solver.iterate(&model, 0).expect("iteration should succeed");

    let tree = solver.tree().expect("tree exists");
    let json = tree
        .snapshot()
        .to_json()
        .expect("snapshot should serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

    assert_eq!(value["schema_version"], 1);
    assert_eq!(value["node_count"], tree.node_count());
    assert_eq!(value["nodes"][1]["action"], "Guess(true)");
}

/// Backup that only ever proposes single-step controllers.
struct GreedyBackup;

impl PolicyBackup<CoinModel, CoinBelief> for GreedyBackup {
    fn backup<R: Rng + ?Sized>(
        &self,
        belief: &CoinBelief,
        _graph: &PolicyGraph<GuessAction, bool>,
        model: &CoinModel,
        _params: &BackupParams,
        _scratch: &mut BackupScratch<bool>,
        rng: &mut R,
    ) -> Result<Option<BackupCandidate<GuessAction, bool>>, TreeError> {
        let mut best: Option<BackupCandidate<GuessAction, bool>> = None;
        for action in model.actions() {
            let value = model.discount() * belief.update_action(model, action, rng).reward;
            if best.as_ref().is_none_or(|current| value > current.value) {
                best = Some(BackupCandidate {
                    node: ControllerNode::leaf(*action),
                    value,
                });
            }
        }
        Ok(best)
    }
}

#[test]
fn public_custom_backup_drives_the_lower_bound() {
    let model = CoinModel::new();
    let config = SolverConfig {
        iterations: 4,
        ..config()
    };
    let mut solver =
        Solver::with_backup(config, bounds(), GreedyBackup).expect("config should be valid");

    let metrics = solver.run(&model).expect("solve should succeed");

    // Single-step controllers cannot use what peeking reveals.
    assert!(!metrics.converged);
    assert_eq!(metrics.iterations_completed, 4);
    assert_eq!(metrics.root_lower, 0.0);
    assert!((metrics.root_upper - 0.36).abs() < 1e-9);
    assert_eq!(solver.policy().entry_action(), Some(&GuessAction::Guess(true)));
}

#[test]
fn public_cancel_token_works_across_threads() {
    let model = CoinModel::new();
    let mut solver = Solver::new(config(), bounds()).expect("config should be valid");
    let token = solver.cancel_token();

    std::thread::spawn(move || token.cancel())
        .join()
        .expect("cancelling thread should finish");

    let metrics = solver.run(&model).expect("solve should succeed");
    assert!(metrics.cancelled);
    assert_eq!(metrics.iterations_completed, 1);
    assert_eq!(solver.tree().expect("tree exists").node_count(), 1);

    solver.cancel_token().reset();
    let metrics = solver.run(&model).expect("solve should succeed");
    assert!(!metrics.cancelled);
    assert!(metrics.converged);
}
