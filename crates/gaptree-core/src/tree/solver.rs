use std::{fmt, fs, path::Path};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    model::{Belief, Bounds, Pomdp},
    policy::{
        backup::{BackupParams, BackupScratch, MonteCarloBackup, PolicyBackup},
        graph::Policy,
    },
    tree::{
        context::{CancelToken, SearchContext, SearchSettings},
        error::TreeError,
        search::SearchOutcome,
        search_tree::SearchTree,
    },
};

const DEFAULT_SOLVER_CONFIG_YAML: &str = include_str!("../../config/solver.default.yaml");

/// Hyperparameters of a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Upper limit on search passes.
    pub iterations: usize,
    /// Particles drawn for the root belief.
    pub num_particles: usize,
    /// Observation branches sampled per action node.
    pub branching_factor: usize,
    /// States drawn per action during a policy backup.
    pub num_state: usize,
    /// Observations that keep an explicit controller edge after a backup.
    pub num_prune_obs: usize,
    /// Controller executions averaged per evaluation.
    pub num_eval_belief: usize,
    /// Distinct observations the backup scratch buffer is sized for.
    pub num_obs: usize,
    /// Step cap for one controller execution.
    pub max_steps: usize,
    /// Belief nodes at this depth are not expanded.
    pub max_depth: usize,
    /// Unexpanded action nodes one pass may expand; `None` means no limit.
    pub expansions_per_search: Option<usize>,
    /// The solve stops once the root gap falls below this.
    pub convergence_gap: f64,
    /// Slack allowed between lower and upper bound before a backup fails.
    /// `None` disables the check, which suits sampled lower bounds.
    pub bound_tolerance: Option<f64>,
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            iterations: 100,
            num_particles: 64,
            branching_factor: 4,
            num_state: 32,
            num_prune_obs: 8,
            num_eval_belief: 4,
            num_obs: 16,
            max_steps: 64,
            max_depth: 32,
            expansions_per_search: None,
            convergence_gap: 0.1,
            bound_tolerance: None,
            seed: 0,
        }
    }
}

impl SolverConfig {
    /// Parse a solver config from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SolverConfigError> {
        let config: SolverConfig = serde_yaml::from_str(yaml).map_err(SolverConfigError::Yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a solver config from a YAML file path.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self, SolverConfigError> {
        let yaml = fs::read_to_string(path).map_err(SolverConfigError::Io)?;
        Self::from_yaml_str(&yaml)
    }

    /// Return the default YAML config included with this crate.
    pub fn default_yaml() -> &'static str {
        DEFAULT_SOLVER_CONFIG_YAML
    }

    /// Parse the default YAML config included with this crate.
    pub fn from_default_yaml() -> Result<Self, SolverConfigError> {
        Self::from_yaml_str(Self::default_yaml())
    }

    pub fn validate(&self) -> Result<(), SolverConfigError> {
        let counts = [
            ("iterations", self.iterations),
            ("num_particles", self.num_particles),
            ("branching_factor", self.branching_factor),
            ("num_state", self.num_state),
            ("num_prune_obs", self.num_prune_obs),
            ("num_eval_belief", self.num_eval_belief),
            ("num_obs", self.num_obs),
            ("max_steps", self.max_steps),
            ("max_depth", self.max_depth),
        ];
        for (name, value) in counts {
            if value == 0 {
                return Err(SolverConfigError::Invalid(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if self.expansions_per_search == Some(0) {
            return Err(SolverConfigError::Invalid(
                "expansions_per_search must be greater than 0 when set".to_string(),
            ));
        }
        if !self.convergence_gap.is_finite() || self.convergence_gap < 0.0 {
            return Err(SolverConfigError::Invalid(
                "convergence_gap must be finite and >= 0".to_string(),
            ));
        }
        if self
            .bound_tolerance
            .is_some_and(|tolerance| !tolerance.is_finite() || tolerance < 0.0)
        {
            return Err(SolverConfigError::Invalid(
                "bound_tolerance must be finite and >= 0 when set".to_string(),
            ));
        }
        Ok(())
    }

    fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            branching_factor: self.branching_factor,
            max_depth: self.max_depth,
            expansions_per_search: self.expansions_per_search,
            bound_tolerance: self.bound_tolerance,
            backup: BackupParams {
                num_state: self.num_state,
                num_prune_obs: self.num_prune_obs,
                num_eval_belief: self.num_eval_belief,
                max_steps: self.max_steps,
            },
        }
    }
}

/// Error type for loading and validating `SolverConfig`.
#[derive(Debug)]
pub enum SolverConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Invalid(String),
}

impl fmt::Display for SolverConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverConfigError::Io(err) => write!(f, "failed to read config file: {err}"),
            SolverConfigError::Yaml(err) => write!(f, "failed to parse config YAML: {err}"),
            SolverConfigError::Invalid(err) => write!(f, "invalid solver config: {err}"),
        }
    }
}

impl std::error::Error for SolverConfigError {}

/// Per-iteration metrics emitted by the solver.
#[derive(Debug, Clone, Copy)]
pub struct IterationMetrics {
    /// Zero-based iteration index.
    pub iteration: usize,
    pub root_upper: f64,
    pub root_lower: f64,
    pub node_count: usize,
    pub controller_count: usize,
    pub search: SearchOutcome,
}

impl IterationMetrics {
    pub fn gap(&self) -> f64 {
        self.root_upper - self.root_lower
    }
}

/// Aggregate metrics for a complete solve.
#[derive(Debug, Clone)]
pub struct RunMetrics {
    pub iterations_requested: usize,
    pub iterations_completed: usize,
    pub converged: bool,
    pub cancelled: bool,
    pub root_upper: f64,
    pub root_lower: f64,
}

impl RunMetrics {
    fn new(iterations_requested: usize) -> Self {
        RunMetrics {
            iterations_requested,
            iterations_completed: 0,
            converged: false,
            cancelled: false,
            root_upper: f64::INFINITY,
            root_lower: f64::NEG_INFINITY,
        }
    }

    fn record(&mut self, metrics: &IterationMetrics) {
        self.iterations_completed += 1;
        self.root_upper = metrics.root_upper;
        self.root_lower = metrics.root_lower;
        self.cancelled |= metrics.search.cancelled;
    }

    pub fn gap(&self) -> f64 {
        self.root_upper - self.root_lower
    }
}

pub type TreeOf<M, B> = SearchTree<B, <M as Pomdp>::Action, <M as Pomdp>::Observation>;
pub type PolicyOf<M> = Policy<<M as Pomdp>::Action, <M as Pomdp>::Observation, <M as Pomdp>::State>;

/// Anytime solver: repeatedly searches the same tree and keeps the best policy found.
pub struct Solver<M: Pomdp, B, P = MonteCarloBackup> {
    config: SolverConfig,
    bounds: Bounds<M, B>,
    backup: P,
    tree: Option<TreeOf<M, B>>,
    policy: PolicyOf<M>,
    scratch: Option<BackupScratch<M::Observation>>,
    rng: ChaCha8Rng,
    cancel: CancelToken,
}

impl<M, B> Solver<M, B, MonteCarloBackup>
where
    M: Pomdp,
    B: Belief<M>,
{
    /// Create a solver that uses the Monte Carlo policy backup.
    pub fn new(config: SolverConfig, bounds: Bounds<M, B>) -> Result<Self, SolverConfigError> {
        Self::with_backup(config, bounds, MonteCarloBackup)
    }
}

impl<M, B, P> Solver<M, B, P>
where
    M: Pomdp,
    B: Belief<M>,
    P: PolicyBackup<M, B>,
{
    /// Create a solver with a custom policy backup. The config is validated first.
    pub fn with_backup(
        config: SolverConfig,
        bounds: Bounds<M, B>,
        backup: P,
    ) -> Result<Self, SolverConfigError> {
        config.validate()?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Solver {
            config,
            bounds,
            backup,
            tree: None,
            policy: Policy::new(),
            scratch: None,
            rng,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// The search tree, once the first iteration has created it.
    pub fn tree(&self) -> Option<&TreeOf<M, B>> {
        self.tree.as_ref()
    }

    pub fn policy(&self) -> &PolicyOf<M> {
        &self.policy
    }

    /// Token that stops the running solve at the next belief-node visit.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the solve to convergence or the iteration limit and return the policy.
    pub fn solve(&mut self, model: &M) -> Result<&PolicyOf<M>, TreeError> {
        self.run(model)?;
        Ok(&self.policy)
    }

    /// Run the solve and return aggregate metrics.
    pub fn run(&mut self, model: &M) -> Result<RunMetrics, TreeError> {
        self.run_with_hook(model, |_| {})
    }

    /// Run the solve and invoke a callback after each completed iteration.
    pub fn run_with_hook<FHook>(
        &mut self,
        model: &M,
        mut on_iteration: FHook,
    ) -> Result<RunMetrics, TreeError>
    where
        FHook: FnMut(&IterationMetrics),
    {
        let mut metrics = RunMetrics::new(self.config.iterations);

        for iteration in 0..self.config.iterations {
            let iteration_metrics = self.iterate(model, iteration)?;
            on_iteration(&iteration_metrics);
            metrics.record(&iteration_metrics);

            if iteration_metrics.search.cancelled {
                info!(iteration, "solve cancelled");
                break;
            }
            if iteration_metrics.gap() < self.config.convergence_gap {
                metrics.converged = true;
                info!(
                    iteration,
                    upper = iteration_metrics.root_upper,
                    lower = iteration_metrics.root_lower,
                    "solve converged"
                );
                break;
            }
        }

        Ok(metrics)
    }

    /// Run one search pass from the root with a zero target gap.
    pub fn iterate(&mut self, model: &M, iteration: usize) -> Result<IterationMetrics, TreeError> {
        let Solver {
            config,
            bounds,
            backup,
            tree,
            policy,
            scratch,
            rng,
            cancel,
        } = self;

        let tree = tree.get_or_insert_with(|| {
            SearchTree::from_model(model, bounds, config.num_particles, &mut *rng)
        });
        let scratch = scratch.get_or_insert_with(|| BackupScratch::with_capacity(config.num_obs));

        let mut ctx = SearchContext {
            model,
            bounds: &*bounds,
            backup: &*backup,
            policy: &mut *policy,
            scratch,
            rng: &mut *rng,
            settings: config.search_settings(),
            cancel: Some(&*cancel),
        };
        let root_id = tree.root_id();
        let search = tree.search(root_id, 0.0, &mut ctx)?;

        let root = tree.root()?;
        policy.set_entry(root.best_controller());
        policy.set_root_belief(model.initial_state_distribution());

        let metrics = IterationMetrics {
            iteration,
            root_upper: root.upper(),
            root_lower: root.lower(),
            node_count: tree.node_count(),
            controller_count: policy.graph().len(),
            search,
        };
        debug!(
            iteration,
            upper = metrics.root_upper,
            lower = metrics.root_lower,
            gap = metrics.gap(),
            nodes = metrics.node_count,
            controllers = metrics.controller_count,
            depth = search.depth_reached,
            "search iteration complete"
        );
        Ok(metrics)
    }
}
