use gaptree_core::{Belief, Pomdp};
use rand::Rng;
use tracing::trace;

use crate::{
    ActionKey, CompiledPomdp, ObservationKey, StateKey,
    compiled::{pick_from_cdf, uniform},
};

/// Exact probability vector over the states of a compiled POMDP.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteBelief {
    probs: Vec<f64>,
    reward: f64,
}

impl DiscreteBelief {
    /// Normalize a probability vector. Returns `None` when it has no positive finite mass.
    pub fn from_probabilities(probs: Vec<f64>) -> Option<Self> {
        let total: f64 = probs.iter().sum();
        if !(total.is_finite() && total > 0.0) || probs.iter().any(|p| *p < 0.0) {
            return None;
        }
        Some(DiscreteBelief {
            probs: probs.into_iter().map(|p| p / total).collect(),
            reward: 0.0,
        })
    }

    /// A belief that puts all mass on one state.
    pub fn point(model: &CompiledPomdp, state: StateKey) -> Self {
        let mut probs = vec![0.0; model.state_count()];
        if let Some(p) = probs.get_mut(state.index()) {
            *p = 1.0;
        }
        DiscreteBelief { probs, reward: 0.0 }
    }

    pub fn probabilities(&self) -> &[f64] {
        &self.probs
    }

    pub fn probability(&self, state: StateKey) -> f64 {
        self.probs.get(state.index()).copied().unwrap_or(0.0)
    }

    /// Iterate states with positive mass.
    pub fn support(&self) -> impl Iterator<Item = (StateKey, f64)> + '_ {
        self.probs
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(|(idx, p)| (StateKey::from(idx), *p))
    }
}

impl Belief<CompiledPomdp> for DiscreteBelief {
    fn initial<R: Rng + ?Sized>(model: &CompiledPomdp, _num_particles: usize, _rng: &mut R) -> Self {
        let mut probs = vec![0.0; model.state_count()];
        for (state, prob) in model.initial() {
            probs[state.index()] += prob;
        }
        DiscreteBelief { probs, reward: 0.0 }
    }

    fn update_action<R: Rng + ?Sized>(
        &self,
        model: &CompiledPomdp,
        action: &ActionKey,
        _rng: &mut R,
    ) -> Self {
        let mut probs = vec![0.0; self.probs.len()];
        let mut reward = 0.0;
        for (state, weight) in self.support() {
            reward += weight * model.expected_reward(*action, state);
            for (next, prob, _) in model.transitions(*action, state) {
                probs[next.index()] += weight * prob;
            }
        }
        DiscreteBelief { probs, reward }
    }

    fn update_observation(
        &self,
        model: &CompiledPomdp,
        action: &ActionKey,
        observation: &ObservationKey,
    ) -> Self {
        let mut probs: Vec<f64> = self
            .probs
            .iter()
            .enumerate()
            .map(|(idx, p)| {
                p * model.observation_likelihood(action, &StateKey::from(idx), observation)
            })
            .collect();
        let total: f64 = probs.iter().sum();

        if total > 0.0 && total.is_finite() {
            probs.iter_mut().for_each(|p| *p /= total);
        } else {
            trace!(
                observation = observation.index(),
                "observation has zero likelihood under the belief"
            );
            probs = self.probs.clone();
        }

        DiscreteBelief {
            probs,
            reward: self.reward,
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> StateKey {
        let mut total = 0.0;
        let cdf: Vec<f64> = self
            .probs
            .iter()
            .map(|p| {
                total += p;
                total
            })
            .collect();
        StateKey::from(pick_from_cdf(&cdf, uniform(rng) * total))
    }

    fn expected_reward(&self, _model: &CompiledPomdp) -> f64 {
        self.reward
    }
}
