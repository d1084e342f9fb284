use std::collections::HashMap;

use gaptree_core::{Pomdp, Step};
use rand::Rng;

use crate::{PomdpError, PomdpSpec};

/// Floating point tolerance used when validating probability sums.
pub(crate) const PROB_TOLERANCE: f64 = 1e-9;

macro_rules! dense_key {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Return the underlying dense index.
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }
    };
}

dense_key!(
    /// Dense index for states in a compiled POMDP.
    StateKey
);
dense_key!(
    /// Dense index for actions in a compiled POMDP.
    ActionKey
);
dense_key!(
    /// Dense index for observations in a compiled POMDP.
    ObservationKey
);

/// Map one raw `u64` draw onto `[0, 1)`.
pub(crate) fn uniform<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (rng.next_u64() as f64) / ((u64::MAX as f64) + 1.0)
}

/// Index of the first CDF entry above `sample`. Zero-mass entries are never picked.
pub(crate) fn pick_from_cdf(cdf: &[f64], sample: f64) -> usize {
    let idx = cdf.partition_point(|p| *p <= sample);
    if idx < cdf.len() {
        return idx;
    }
    // Rounding left the total a hair below the sample.
    (1..cdf.len())
        .rev()
        .find(|&i| cdf[i] > cdf[i - 1])
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
/// Runtime form of a POMDP with resolved references and precomputed CDFs.
pub struct CompiledPomdp {
    discount: f64,
    initial: Vec<(StateKey, f64)>,
    initial_cdf: Vec<f64>,
    state_ids: Vec<String>,
    observation_ids: Vec<String>,
    action_ids: Vec<String>,
    state_id_to_key: HashMap<String, StateKey>,
    observation_id_to_key: HashMap<String, ObservationKey>,
    action_id_to_key: HashMap<String, ActionKey>,
    action_keys: Vec<ActionKey>,
    actions: Vec<ActionRec>,
}

#[derive(Debug, Clone)]
struct ActionRec {
    terminal: bool,
    // Indexed by source state.
    transitions: Vec<TransitionRec>,
    // Indexed by landing state, dense over observations.
    emissions: Vec<EmissionRec>,
}

#[derive(Debug, Clone)]
struct TransitionRec {
    outcomes: Vec<OutcomeRec>,
    cdf: Vec<f64>,
    expected_reward: f64,
}

#[derive(Debug, Clone)]
struct OutcomeRec {
    next: StateKey,
    prob: f64,
    reward: f64,
}

#[derive(Debug, Clone)]
struct EmissionRec {
    probs: Vec<f64>,
    cdf: Vec<f64>,
}

impl CompiledPomdp {
    /// Compile and validate a spec into a fast runtime representation.
    pub(crate) fn from_spec(spec: &PomdpSpec) -> Result<Self, PomdpError> {
        spec.validate_with_tolerance(PROB_TOLERANCE)?;

        let state_id_to_key: HashMap<String, StateKey> = spec
            .states
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), StateKey::from(idx)))
            .collect();
        let observation_id_to_key: HashMap<String, ObservationKey> = spec
            .observations
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), ObservationKey::from(idx)))
            .collect();
        let action_id_to_key: HashMap<String, ActionKey> = spec
            .actions
            .iter()
            .enumerate()
            .map(|(idx, action)| (action.id.clone(), ActionKey::from(idx)))
            .collect();

        let state = |context: &str, id: &str| {
            state_id_to_key
                .get(id)
                .copied()
                .ok_or_else(|| PomdpError::UnknownState {
                    context: context.to_string(),
                    state: id.to_string(),
                })
        };

        let mut initial = vec![0.0; spec.states.len()];
        for entry in &spec.initial {
            initial[state("initial distribution", &entry.state)?.index()] += entry.prob;
        }
        let initial: Vec<(StateKey, f64)> = initial
            .into_iter()
            .enumerate()
            .filter(|(_, prob)| *prob > 0.0)
            .map(|(idx, prob)| (StateKey::from(idx), prob))
            .collect();
        let initial_cdf = cumulative(initial.iter().map(|(_, prob)| *prob));

        let mut actions = Vec::with_capacity(spec.actions.len());
        for action in &spec.actions {
            let mut transitions: Vec<Option<TransitionRec>> = vec![None; spec.states.len()];
            for transition in &action.transitions {
                let context = format!("action '{}' from '{}'", action.id, transition.from);
                let from = state(&context, &transition.from)?;
                let mut outcomes = Vec::with_capacity(transition.outcomes.len());
                for outcome in &transition.outcomes {
                    outcomes.push(OutcomeRec {
                        next: state(&context, &outcome.next)?,
                        prob: outcome.prob,
                        reward: outcome.reward,
                    });
                }
                let cdf = cumulative(outcomes.iter().map(|o| o.prob));
                let expected_reward = outcomes.iter().map(|o| o.prob * o.reward).sum();
                transitions[from.index()] = Some(TransitionRec {
                    outcomes,
                    cdf,
                    expected_reward,
                });
            }

            let mut emissions: Vec<Option<EmissionRec>> = vec![None; spec.states.len()];
            for emission in &action.observations {
                let context = format!("action '{}' observed in '{}'", action.id, emission.state);
                let landed = state(&context, &emission.state)?;
                let mut probs = vec![0.0; spec.observations.len()];
                for outcome in &emission.outcomes {
                    let key = observation_id_to_key.get(&outcome.obs).copied().ok_or_else(|| {
                        PomdpError::UnknownObservation {
                            context: context.clone(),
                            observation: outcome.obs.clone(),
                        }
                    })?;
                    probs[key.index()] += outcome.prob;
                }
                let cdf = cumulative(probs.iter().copied());
                emissions[landed.index()] = Some(EmissionRec { probs, cdf });
            }

            let transitions = transitions
                .into_iter()
                .zip(&spec.states)
                .map(|(rec, id)| {
                    rec.ok_or_else(|| PomdpError::MissingTransitions {
                        action: action.id.clone(),
                        state: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let emissions = emissions
                .into_iter()
                .zip(&spec.states)
                .map(|(rec, id)| {
                    rec.ok_or_else(|| PomdpError::MissingObservations {
                        action: action.id.clone(),
                        state: id.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            actions.push(ActionRec {
                terminal: action.terminal.unwrap_or(false),
                transitions,
                emissions,
            });
        }

        Ok(Self {
            discount: spec.discount,
            initial,
            initial_cdf,
            state_ids: spec.states.clone(),
            observation_ids: spec.observations.clone(),
            action_ids: spec.actions.iter().map(|a| a.id.clone()).collect(),
            state_id_to_key,
            observation_id_to_key,
            action_id_to_key,
            action_keys: (0..spec.actions.len()).map(ActionKey::from).collect(),
            actions,
        })
    }

    /// Return the number of compiled states.
    pub fn state_count(&self) -> usize {
        self.state_ids.len()
    }

    pub fn observation_count(&self) -> usize {
        self.observation_ids.len()
    }

    pub fn action_count(&self) -> usize {
        self.action_ids.len()
    }

    /// Convert a state key back to its original string id.
    pub fn state_id(&self, key: StateKey) -> Option<&str> {
        self.state_ids.get(key.index()).map(String::as_str)
    }

    /// Convert a string id into a compiled state key.
    pub fn state_key(&self, id: &str) -> Option<StateKey> {
        self.state_id_to_key.get(id).copied()
    }

    pub fn observation_id(&self, key: ObservationKey) -> Option<&str> {
        self.observation_ids.get(key.index()).map(String::as_str)
    }

    pub fn observation_key(&self, id: &str) -> Option<ObservationKey> {
        self.observation_id_to_key.get(id).copied()
    }

    pub fn action_id(&self, key: ActionKey) -> Option<&str> {
        self.action_ids.get(key.index()).map(String::as_str)
    }

    pub fn action_key(&self, id: &str) -> Option<ActionKey> {
        self.action_id_to_key.get(id).copied()
    }

    /// Initial-state distribution, restricted to states with positive mass.
    pub fn initial(&self) -> &[(StateKey, f64)] {
        &self.initial
    }

    /// Iterate `(next_state, probability, reward)` for `action` taken in `state`.
    pub fn transitions(
        &self,
        action: ActionKey,
        state: StateKey,
    ) -> impl Iterator<Item = (StateKey, f64, f64)> + '_ {
        self.transition(action, state)
            .into_iter()
            .flat_map(|rec| rec.outcomes.iter().map(|o| (o.next, o.prob, o.reward)))
    }

    /// Expected immediate reward of `action` in `state`; zero for unknown keys.
    pub fn expected_reward(&self, action: ActionKey, state: StateKey) -> f64 {
        self.transition(action, state)
            .map_or(0.0, |rec| rec.expected_reward)
    }

    /// Probability of `observation` after `action` lands in `state`; zero for unknown keys.
    pub fn observation_probability(
        &self,
        action: ActionKey,
        state: StateKey,
        observation: ObservationKey,
    ) -> f64 {
        self.emission(action, state)
            .and_then(|rec| rec.probs.get(observation.index()).copied())
            .unwrap_or(0.0)
    }

    fn transition(&self, action: ActionKey, state: StateKey) -> Option<&TransitionRec> {
        self.actions.get(action.index())?.transitions.get(state.index())
    }

    fn emission(&self, action: ActionKey, state: StateKey) -> Option<&EmissionRec> {
        self.actions.get(action.index())?.emissions.get(state.index())
    }
}

fn cumulative(probs: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut total = 0.0_f64;
    probs
        .map(|p| {
            total += p;
            total
        })
        .collect()
}

impl Pomdp for CompiledPomdp {
    type State = StateKey;
    type Action = ActionKey;
    type Observation = ObservationKey;

    fn actions(&self) -> &[ActionKey] {
        &self.action_keys
    }

    fn is_terminal_action(&self, action: &ActionKey) -> bool {
        self.actions
            .get(action.index())
            .is_some_and(|rec| rec.terminal)
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    fn sample_initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> StateKey {
        let idx = pick_from_cdf(&self.initial_cdf, uniform(rng));
        self.initial
            .get(idx)
            .map_or(StateKey::from(0), |(state, _)| *state)
    }

    fn initial_state_distribution(&self) -> Option<Vec<(StateKey, f64)>> {
        Some(self.initial.clone())
    }

    /// Invalid state/action inputs are treated as a no-op transition.
    fn step<R: Rng + ?Sized>(
        &self,
        state: &StateKey,
        action: &ActionKey,
        rng: &mut R,
    ) -> Step<StateKey, ObservationKey> {
        let (next_state, reward) = match self.transition(*action, *state) {
            Some(rec) => {
                let outcome = &rec.outcomes[pick_from_cdf(&rec.cdf, uniform(rng))];
                (outcome.next, outcome.reward)
            }
            None => (*state, 0.0),
        };
        Step {
            next_state,
            observation: self.generate_observation(action, &next_state, rng),
            reward,
        }
    }

    fn generate_observation<R: Rng + ?Sized>(
        &self,
        action: &ActionKey,
        state: &StateKey,
        rng: &mut R,
    ) -> ObservationKey {
        self.emission(*action, *state)
            .map_or(ObservationKey::from(0), |rec| {
                ObservationKey::from(pick_from_cdf(&rec.cdf, uniform(rng)))
            })
    }

    fn observation_likelihood(
        &self,
        action: &ActionKey,
        state: &StateKey,
        observation: &ObservationKey,
    ) -> f64 {
        self.observation_probability(*action, *state, *observation)
    }
}
