use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    belief::unit_sample,
    model::{Belief, Bounds, Pomdp, Step},
    policy::backup::{BackupParams, BackupScratch, MonteCarloBackup},
    tree::{
        context::{CancelToken, SearchContext, SearchSettings},
        search_tree::SearchTree,
        solver::PolicyOf,
    },
    ParticleBelief, Policy,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChainAction {
    Go,
    Stop,
}

/// Single hidden state, single observation. `Go` pays `go_reward` and
/// continues, `Stop` pays `stop_reward` and ends the episode.
#[derive(Debug, Clone)]
pub(crate) struct ChainModel {
    pub go_reward: f64,
    pub stop_reward: f64,
    pub discount: f64,
    actions: Vec<ChainAction>,
}

impl ChainModel {
    pub fn new(go_reward: f64, stop_reward: f64, discount: f64) -> Self {
        ChainModel {
            go_reward,
            stop_reward,
            discount,
            actions: vec![ChainAction::Go, ChainAction::Stop],
        }
    }

    pub fn without_actions(discount: f64) -> Self {
        ChainModel {
            go_reward: 0.0,
            stop_reward: 0.0,
            discount,
            actions: Vec::new(),
        }
    }
}

impl Pomdp for ChainModel {
    type State = ();
    type Action = ChainAction;
    type Observation = ();

    fn actions(&self) -> &[ChainAction] {
        &self.actions
    }

    fn is_terminal_action(&self, action: &ChainAction) -> bool {
        *action == ChainAction::Stop
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn sample_initial_state<R: Rng + ?Sized>(&self, _rng: &mut R) {}

    fn initial_state_distribution(&self) -> Option<Vec<((), f64)>> {
        Some(vec![((), 1.0)])
    }

    fn step<R: Rng + ?Sized>(
        &self,
        _state: &(),
        action: &ChainAction,
        _rng: &mut R,
    ) -> Step<(), ()> {
        let reward = match action {
            ChainAction::Go => self.go_reward,
            ChainAction::Stop => self.stop_reward,
        };
        Step {
            next_state: (),
            observation: (),
            reward,
        }
    }

    fn generate_observation<R: Rng + ?Sized>(
        &self,
        _action: &ChainAction,
        _state: &(),
        _rng: &mut R,
    ) {
    }

    fn observation_likelihood(&self, _action: &ChainAction, _state: &(), _observation: &()) -> f64 {
        1.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DoorAction {
    Listen,
    OpenLeft,
    OpenRight,
}

/// Two doors, a tiger behind one. Listening is noisy; opening ends the episode.
#[derive(Debug, Clone)]
pub(crate) struct DoorModel {
    pub accuracy: f64,
    actions: Vec<DoorAction>,
}

impl DoorModel {
    pub fn new(accuracy: f64) -> Self {
        DoorModel {
            accuracy,
            actions: vec![DoorAction::Listen, DoorAction::OpenLeft, DoorAction::OpenRight],
        }
    }
}

impl Pomdp for DoorModel {
    /// `true` when the tiger is behind the left door.
    type State = bool;
    type Action = DoorAction;
    /// `true` when the tiger was heard on the left.
    type Observation = bool;

    fn actions(&self) -> &[DoorAction] {
        &self.actions
    }

    fn is_terminal_action(&self, action: &DoorAction) -> bool {
        *action != DoorAction::Listen
    }

    fn discount(&self) -> f64 {
        0.95
    }

    fn sample_initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        unit_sample(rng) < 0.5
    }

    fn initial_state_distribution(&self) -> Option<Vec<(bool, f64)>> {
        Some(vec![(true, 0.5), (false, 0.5)])
    }

    fn step<R: Rng + ?Sized>(
        &self,
        state: &bool,
        action: &DoorAction,
        rng: &mut R,
    ) -> Step<bool, bool> {
        let reward = match (action, *state) {
            (DoorAction::Listen, _) => -1.0,
            (DoorAction::OpenLeft, true) | (DoorAction::OpenRight, false) => -100.0,
            (DoorAction::OpenLeft, false) | (DoorAction::OpenRight, true) => 10.0,
        };
        let observation = self.generate_observation(action, state, rng);
        Step {
            next_state: *state,
            observation,
            reward,
        }
    }

    fn generate_observation<R: Rng + ?Sized>(
        &self,
        action: &DoorAction,
        state: &bool,
        rng: &mut R,
    ) -> bool {
        match action {
            DoorAction::Listen => {
                if unit_sample(rng) < self.accuracy {
                    *state
                } else {
                    !*state
                }
            }
            _ => false,
        }
    }

    fn observation_likelihood(&self, action: &DoorAction, state: &bool, observation: &bool) -> f64 {
        match action {
            DoorAction::Listen if observation == state => self.accuracy,
            DoorAction::Listen => 1.0 - self.accuracy,
            _ if !*observation => 1.0,
            _ => 0.0,
        }
    }
}

pub(crate) type ChainBelief = ParticleBelief<()>;
pub(crate) type DoorBelief = ParticleBelief<bool>;

pub(crate) fn settings(branching_factor: usize) -> SearchSettings {
    SearchSettings {
        branching_factor,
        max_depth: 64,
        expansions_per_search: None,
        bound_tolerance: Some(1e-6),
        backup: BackupParams {
            num_state: 1,
            num_prune_obs: 8,
            num_eval_belief: 1,
            max_steps: 128,
        },
    }
}

/// Owns every collaborator a tree operation borrows.
pub(crate) struct Harness<M: Pomdp, B> {
    pub model: M,
    pub bounds: Bounds<M, B>,
    pub policy: PolicyOf<M>,
    pub scratch: BackupScratch<M::Observation>,
    pub rng: ChaCha8Rng,
    pub settings: SearchSettings,
    pub cancel: CancelToken,
}

impl<M, B> Harness<M, B>
where
    M: Pomdp,
    B: Belief<M>,
{
    pub fn new(model: M, bounds: Bounds<M, B>, settings: SearchSettings) -> Self {
        Harness {
            model,
            bounds,
            policy: Policy::new(),
            scratch: BackupScratch::with_capacity(4),
            rng: ChaCha8Rng::seed_from_u64(7),
            settings,
            cancel: CancelToken::new(),
        }
    }

    pub fn tree(&mut self, num_particles: usize) -> SearchTree<B, M::Action, M::Observation> {
        SearchTree::from_model(&self.model, &self.bounds, num_particles, &mut self.rng)
    }

    pub fn ctx(&mut self) -> SearchContext<'_, M, B, MonteCarloBackup, ChaCha8Rng> {
        SearchContext {
            model: &self.model,
            bounds: &self.bounds,
            backup: &MonteCarloBackup,
            policy: &mut self.policy,
            scratch: &mut self.scratch,
            rng: &mut self.rng,
            settings: self.settings,
            cancel: Some(&self.cancel),
        }
    }
}

pub(crate) fn chain_harness(
    go_reward: f64,
    upper: f64,
    lower: f64,
    branching_factor: usize,
) -> Harness<ChainModel, ChainBelief> {
    Harness::new(
        ChainModel::new(go_reward, 0.0, 0.5),
        Bounds::constant(upper, lower),
        settings(branching_factor),
    )
}
