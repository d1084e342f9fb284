mod belief;
mod model;
mod policy;
mod tree;

pub use belief::ParticleBelief;
pub use model::{Belief, Bounds, ConstantBound, Pomdp, Step, ValueBound};
pub use policy::backup::{
    BackupCandidate, BackupParams, BackupScratch, MonteCarloBackup, PolicyBackup,
};
pub use policy::graph::{ControllerNode, Policy, PolicyGraph};
pub use tree::context::{CancelToken, SearchContext, SearchSettings};
pub use tree::error::TreeError;
pub use tree::ids::{ControllerId, NodeId};
pub use tree::node::{ActionNode, BeliefNode, NodeKind, SearchNode};
pub use tree::search::SearchOutcome;
pub use tree::search_tree::SearchTree;
pub use tree::snapshot::{NodeSnapshot, TreeSnapshot};
pub use tree::solver::{
    IterationMetrics, PolicyOf, RunMetrics, Solver, SolverConfig, SolverConfigError, TreeOf,
};
