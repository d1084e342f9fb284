use std::path::PathBuf;

use gaptree_core::{Bounds, Solver, SolverConfig};
use gaptree_pomdp::{
    BlindLowerBound, CompiledPomdp, DiscreteBelief, MdpUpperBound, PomdpSimulator, compile_yaml,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gaptree_core=info".parse().expect("static directive")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let model_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("crates/gaptree-pomdp/models/tiger.pomdp.yaml"));
    let config = match args.next() {
        Some(path) => SolverConfig::from_yaml_path(path).expect("failed to load solver config"),
        None => SolverConfig {
                ..SolverConfig::default()
        },
    };

    let model = compile_yaml(&model_path).expect("failed to compile POMDP YAML");
    let bounds = Bounds::new(MdpUpperBound::new(&model), BlindLowerBound::new(&model));
    let max_steps = config.max_steps;
    let mut solver: Solver<CompiledPomdp, DiscreteBelief> =
        Solver::new(config, bounds).expect("invalid solver config");

    let run = solver
        .run_with_hook(&model, |m| {
            println!(
                "iteration={} upper={:.4} lower={:.4} nodes={} controllers={}",
                m.iteration, m.root_upper, m.root_lower, m.node_count, m.controller_count
            );
        })
        .expect("solve failed");

    let first_action = solver
        .policy()
        .entry_action()
        .and_then(|action| model.action_id(*action))
        .unwrap_or("<none>");
    println!(
        "converged={} iterations={} gap={:.6} first_action={first_action}",
        run.converged,
        run.iterations_completed,
        run.gap()
    );

    if solver.policy().entry().is_some() {
        let mut simulator = PomdpSimulator::new(model, 12345);
        let value = simulator
            .evaluate(solver.policy(), 1000, max_steps)
            .expect("policy evaluation failed");
        println!("average_discounted_return={value:.6}");
    }
}
