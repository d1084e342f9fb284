use gaptree_core::{Bounds, Solver, SolverConfig};
use gaptree_pomdp::{BlindLowerBound, CompiledPomdp, DiscreteBelief, MdpUpperBound, compile_yaml};

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "crates/gaptree-pomdp/models/tiger.pomdp.yaml".to_string());
    let model = compile_yaml(&path).expect("failed to compile POMDP YAML");
    let config = SolverConfig {
        iterations: 40,
        max_depth: 6,
        ..SolverConfig::default()
    };
    let bounds = Bounds::new(MdpUpperBound::new(&model), BlindLowerBound::new(&model));
    let mut solver: Solver<CompiledPomdp, DiscreteBelief> =
        Solver::new(config, bounds).expect("invalid solver config");
    let policy = solver.solve(&model).expect("solve failed");

    let name = |action| model.action_id(action).unwrap_or("?");
    for id in policy.graph().ids() {
        let node = policy.graph().node(id).expect("id came from the graph");
        let marker = if policy.entry() == Some(id) { "*" } else { " " };
        print!("{marker}{:>4} {:<12}", id.index(), name(*node.action()));
        for (observation, target) in node.edges() {
            let label = model.observation_id(*observation).unwrap_or("?");
            print!(" {label}->{}", target.index());
        }
        if let Some(default) = node.default_edge() {
            print!(" _->{}", default.index());
        }
        println!();
    }

    if let Some(tree) = solver.tree() {
        let snapshot = tree.snapshot();
        println!("search tree: {} nodes", snapshot.node_count);
    }
}
