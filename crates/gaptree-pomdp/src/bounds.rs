use gaptree_core::{Pomdp, ValueBound};
use tracing::debug;

use crate::{ActionKey, CompiledPomdp, DiscreteBelief, StateKey};

/// Sweep limits for the value-iteration based bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepLimits {
    /// Stop once no state value moves by more than this.
    pub tolerance: f64,
    pub max_sweeps: usize,
}

impl Default for SweepLimits {
    fn default() -> Self {
        SweepLimits {
            tolerance: 1e-6,
            max_sweeps: 10_000,
        }
    }
}

/// Extreme immediate rewards over every outcome of the model.
fn reward_range(model: &CompiledPomdp) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for action in model.actions() {
        for state in (0..model.state_count()).map(StateKey::from) {
            for (_, _, reward) in model.transitions(*action, state) {
                min = min.min(reward);
                max = max.max(reward);
            }
        }
    }
    (min, max)
}

/// `discount * (r + V(next))` averaged over outcomes; the continuation is dropped for terminal actions.
fn backed_up(model: &CompiledPomdp, action: ActionKey, state: StateKey, values: &[f64]) -> f64 {
    let continues = !model.is_terminal_action(&action);
    let mut total = 0.0;
    for (next, prob, reward) in model.transitions(action, state) {
        let future = if continues { values[next.index()] } else { 0.0 };
        total += prob * (reward + future);
    }
    model.discount() * total
}

/// Upper bound from the fully observable MDP: every state value assumes the state is known.
///
/// Value iteration starts above the fixed point and only moves down, so the
/// values are a valid bound after any number of sweeps.
#[derive(Debug, Clone)]
pub struct MdpUpperBound {
    values: Vec<f64>,
}

impl MdpUpperBound {
    pub fn new(model: &CompiledPomdp) -> Self {
        Self::with_limits(model, SweepLimits::default())
    }

    pub fn with_limits(model: &CompiledPomdp, limits: SweepLimits) -> Self {
        let discount = model.discount();
        let (_, max_reward) = reward_range(model);
        let start = (discount * max_reward / (1.0 - discount)).max(discount * max_reward);
        let mut values = vec![start; model.state_count()];

        let mut sweeps = 0;
        let mut residual = f64::INFINITY;
        while sweeps < limits.max_sweeps && residual > limits.tolerance {
            residual = 0.0;
            for idx in 0..values.len() {
                let state = StateKey::from(idx);
                let best = model
                    .actions()
                    .iter()
                    .map(|action| backed_up(model, *action, state, &values))
                    .fold(f64::NEG_INFINITY, f64::max);
                // Keep the sequence monotone even under rounding.
                let next = best.min(values[idx]);
                residual = residual.max(values[idx] - next);
                values[idx] = next;
            }
            sweeps += 1;
        }
        debug!(sweeps, residual, "MDP upper bound converged");

        MdpUpperBound { values }
    }

    /// Per-state optimal values of the fully observable model.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

impl ValueBound<CompiledPomdp, DiscreteBelief> for MdpUpperBound {
    fn value(&self, _model: &CompiledPomdp, belief: &DiscreteBelief) -> f64 {
        belief
            .support()
            .map(|(state, prob)| prob * self.values[state.index()])
            .sum()
    }
}

/// Lower bound from blind policies: the best single action repeated forever, ignoring observations.
///
/// Each action's values start below the fixed point and only move up, so the
/// bound is achievable after any number of sweeps.
#[derive(Debug, Clone)]
pub struct BlindLowerBound {
    // One value vector per action.
    alphas: Vec<Vec<f64>>,
}

impl BlindLowerBound {
    pub fn new(model: &CompiledPomdp) -> Self {
        Self::with_limits(model, SweepLimits::default())
    }

    pub fn with_limits(model: &CompiledPomdp, limits: SweepLimits) -> Self {
        let discount = model.discount();
        let (min_reward, _) = reward_range(model);
        let start = (discount * min_reward / (1.0 - discount)).min(discount * min_reward);

        let mut alphas = Vec::with_capacity(model.action_count());
        for action in model.actions() {
            let mut values = vec![start; model.state_count()];
            let mut sweeps = 0;
            let mut residual = f64::INFINITY;
            while sweeps < limits.max_sweeps && residual > limits.tolerance {
                residual = 0.0;
                for idx in 0..values.len() {
                    let next = backed_up(model, *action, StateKey::from(idx), &values)
                        .max(values[idx]);
                    residual = residual.max(next - values[idx]);
                    values[idx] = next;
                }
                sweeps += 1;
            }
            debug!(action = action.index(), sweeps, residual, "blind policy evaluated");
            alphas.push(values);
        }

        BlindLowerBound { alphas }
    }

    /// Value vector of repeating `action` forever.
    pub fn alpha(&self, action: ActionKey) -> Option<&[f64]> {
        self.alphas.get(action.index()).map(Vec::as_slice)
    }
}

impl ValueBound<CompiledPomdp, DiscreteBelief> for BlindLowerBound {
    fn value(&self, _model: &CompiledPomdp, belief: &DiscreteBelief) -> f64 {
        self.alphas
            .iter()
            .map(|alpha| {
                belief
                    .support()
                    .map(|(state, prob)| prob * alpha[state.index()])
                    .sum::<f64>()
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }
}
