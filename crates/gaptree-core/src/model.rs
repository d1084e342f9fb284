use std::fmt::Debug;

use rand::Rng;

/// One sampled transition of the decision process.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<S, O> {
    pub next_state: S,
    pub observation: O,
    pub reward: f64,
}

/// Generic interface for a partially observable decision process.
///
/// The search never looks inside states, actions, or observations; it only
/// clones them, compares observations, and hands them back to the model.
pub trait Pomdp {
    type State: Clone + Debug;
    type Action: Clone + PartialEq + Debug;
    type Observation: Clone + PartialEq + Debug;

    /// Enumerate the action space. The order is the order of expansion.
    fn actions(&self) -> &[Self::Action];

    /// Return whether taking `action` ends the episode.
    ///
    /// This is decided on the action label alone, independent of the belief.
    fn is_terminal_action(&self, action: &Self::Action) -> bool;

    /// Return whether a concrete state ends the episode.
    fn is_terminal_state(&self, _state: &Self::State) -> bool {
        false
    }

    /// Per-step discount factor in `[0, 1)`.
    fn discount(&self) -> f64;

    /// Draw one state from the initial-state distribution.
    fn sample_initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::State;

    /// Explicit initial-state distribution, when the model can enumerate it.
    fn initial_state_distribution(&self) -> Option<Vec<(Self::State, f64)>> {
        None
    }

    /// Sample one `(next_state, observation, reward)` transition.
    fn step<R: Rng + ?Sized>(
        &self,
        state: &Self::State,
        action: &Self::Action,
        rng: &mut R,
    ) -> Step<Self::State, Self::Observation>;

    /// Sample an observation emitted when `action` lands in `state`.
    fn generate_observation<R: Rng + ?Sized>(
        &self,
        action: &Self::Action,
        state: &Self::State,
        rng: &mut R,
    ) -> Self::Observation;

    /// Likelihood of seeing `observation` when `action` lands in `state`.
    fn observation_likelihood(
        &self,
        action: &Self::Action,
        state: &Self::State,
        observation: &Self::Observation,
    ) -> f64;
}

/// Belief-state contract consumed by the search tree.
pub trait Belief<M: Pomdp>: Clone {
    /// Build the root belief from the model's initial-state distribution.
    fn initial<R: Rng + ?Sized>(model: &M, num_particles: usize, rng: &mut R) -> Self;

    /// Predict the belief right after taking `action`, before any observation.
    fn update_action<R: Rng + ?Sized>(&self, model: &M, action: &M::Action, rng: &mut R) -> Self;

    /// Condition a post-action belief on an observation.
    fn update_observation(&self, model: &M, action: &M::Action, observation: &M::Observation)
    -> Self;

    /// Draw one concrete state.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> M::State;

    /// Expected reward of the action that produced this belief.
    fn expected_reward(&self, model: &M) -> f64;
}

/// A scalar value estimate for a belief, used as either an upper or a lower bound.
pub trait ValueBound<M, B> {
    fn value(&self, model: &M, belief: &B) -> f64;
}

impl<M, B, F> ValueBound<M, B> for F
where
    F: Fn(&M, &B) -> f64,
{
    fn value(&self, model: &M, belief: &B) -> f64 {
        self(model, belief)
    }
}

/// Bound that ignores the belief and always returns the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantBound(pub f64);

impl<M, B> ValueBound<M, B> for ConstantBound {
    fn value(&self, _model: &M, _belief: &B) -> f64 {
        self.0
    }
}

/// The optimistic and pessimistic estimators used to seed new belief nodes.
pub struct Bounds<M, B> {
    upper: Box<dyn ValueBound<M, B>>,
    lower: Box<dyn ValueBound<M, B>>,
}

impl<M, B> Bounds<M, B> {
    pub fn new(
        upper: impl ValueBound<M, B> + 'static,
        lower: impl ValueBound<M, B> + 'static,
    ) -> Self {
        Bounds {
            upper: Box::new(upper),
            lower: Box::new(lower),
        }
    }

    /// Shorthand for a pair of constant bounds.
    pub fn constant(upper: f64, lower: f64) -> Self {
        Bounds::new(ConstantBound(upper), ConstantBound(lower))
    }

    pub fn upper(&self, model: &M, belief: &B) -> f64 {
        self.upper.value(model, belief)
    }

    pub fn lower(&self, model: &M, belief: &B) -> f64 {
        self.lower.value(model, belief)
    }
}
