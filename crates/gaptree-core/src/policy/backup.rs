use rand::Rng;

use crate::{
    model::{Belief, Pomdp},
    policy::graph::{ControllerNode, PolicyGraph},
    tree::{error::TreeError, ids::ControllerId},
};

/// Sample counts controlling one Monte Carlo backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupParams {
    /// States drawn from the belief per action.
    pub num_state: usize,
    /// Observations that get an explicit edge; the rest follow the default edge.
    pub num_prune_obs: usize,
    /// Controller executions averaged per (state, candidate) pair.
    pub num_eval_belief: usize,
    /// Step cap for one controller execution.
    pub max_steps: usize,
}

/// A controller node proposed by a backup, together with its estimated value.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupCandidate<A, O> {
    pub node: ControllerNode<A, O>,
    pub value: f64,
}

/// Reusable accumulators for Monte Carlo backups.
///
/// Allocated once per solve and handed to every backup by `&mut`, so only one
/// backup can use it at a time.
#[derive(Debug, Clone)]
pub struct BackupScratch<O> {
    observations: Vec<O>,
    counts: Vec<usize>,
    // Row-major: one row per observation slot, one column per candidate successor.
    totals: Vec<f64>,
    width: usize,
    column_totals: Vec<f64>,
    order: Vec<usize>,
}

impl<O> BackupScratch<O>
where
    O: Clone + PartialEq,
{
    /// Reserve room for `num_obs` distinct observations. More are accepted, at the cost of growing.
    pub fn with_capacity(num_obs: usize) -> Self {
        BackupScratch {
            observations: Vec::with_capacity(num_obs),
            counts: Vec::with_capacity(num_obs),
            totals: Vec::new(),
            width: 0,
            column_totals: Vec::new(),
            order: Vec::with_capacity(num_obs),
        }
    }

    /// Number of distinct observations this buffer holds without reallocating.
    pub fn capacity(&self) -> usize {
        self.observations.capacity()
    }

    /// Distinct observations recorded since the last reset.
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    fn reset(&mut self, width: usize) {
        self.observations.clear();
        self.counts.clear();
        self.totals.clear();
        self.width = width;
    }

    fn slot_for(&mut self, observation: &O) -> usize {
        if let Some(slot) = self.observations.iter().position(|o| o == observation) {
            self.counts[slot] += 1;
            return slot;
        }
        self.observations.push(observation.clone());
        self.counts.push(1);
        self.totals.resize(self.totals.len() + self.width, 0.0);
        self.observations.len() - 1
    }

    fn add(&mut self, slot: usize, column: usize, value: f64) {
        self.totals[slot * self.width + column] += value;
    }

    fn row(&self, slot: usize) -> &[f64] {
        &self.totals[slot * self.width..(slot + 1) * self.width]
    }

    /// Pick a successor per observation and return `(edges, default, successor_value_sum)`.
    fn choose_successors(
        &mut self,
        candidates: &[ControllerId],
        num_prune_obs: usize,
    ) -> (Vec<(O, ControllerId)>, Option<ControllerId>, f64) {
        if self.observations.is_empty() || self.width == 0 {
            return (Vec::new(), None, 0.0);
        }

        self.column_totals.clear();
        self.column_totals.resize(self.width, 0.0);
        for slot in 0..self.observations.len() {
            for column in 0..self.width {
                self.column_totals[column] += self.totals[slot * self.width + column];
            }
        }
        let default_column = argmax(&self.column_totals);

        // Stable sort keeps first-seen order among equally frequent observations.
        self.order.clear();
        self.order.extend(0..self.observations.len());
        let counts = &self.counts;
        self.order.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

        let mut edges = Vec::new();
        let mut successor_sum = 0.0;
        for (rank, &slot) in self.order.iter().enumerate() {
            let row = self.row(slot);
            if rank < num_prune_obs {
                let column = argmax(row);
                successor_sum += row[column];
                if column != default_column {
                    edges.push((self.observations[slot].clone(), candidates[column]));
                }
            } else {
                successor_sum += row[default_column];
            }
        }

        (edges, Some(candidates[default_column]), successor_sum)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best
}

/// Builds a candidate controller node for a belief.
pub trait PolicyBackup<M: Pomdp, B> {
    /// Return the best controller node for `belief` given the current graph, or
    /// `None` when the model has no actions.
    fn backup<R: Rng + ?Sized>(
        &self,
        belief: &B,
        graph: &PolicyGraph<M::Action, M::Observation>,
        model: &M,
        params: &BackupParams,
        scratch: &mut BackupScratch<M::Observation>,
        rng: &mut R,
    ) -> Result<Option<BackupCandidate<M::Action, M::Observation>>, TreeError>;
}

/// Monte Carlo backup over the existing policy graph.
///
/// For every action, sampled successor states are scored against every
/// controller node already in the graph, and each observation is routed to the
/// node that did best for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarloBackup;

impl<M, B> PolicyBackup<M, B> for MonteCarloBackup
where
    M: Pomdp,
    B: Belief<M>,
{
    fn backup<R: Rng + ?Sized>(
        &self,
        belief: &B,
        graph: &PolicyGraph<M::Action, M::Observation>,
        model: &M,
        params: &BackupParams,
        scratch: &mut BackupScratch<M::Observation>,
        rng: &mut R,
    ) -> Result<Option<BackupCandidate<M::Action, M::Observation>>, TreeError> {
        let candidates = graph.ids();
        let num_state = params.num_state.max(1);
        let num_eval = params.num_eval_belief.max(1);
        let mut best: Option<BackupCandidate<M::Action, M::Observation>> = None;

        for action in model.actions() {
            scratch.reset(candidates.len());
            let terminal_action = model.is_terminal_action(action);
            let mut reward_sum = 0.0;

            for _ in 0..num_state {
                let state = belief.sample(rng);
                let step = model.step(&state, action, rng);
                reward_sum += step.reward;

                if terminal_action
                    || candidates.is_empty()
                    || model.is_terminal_state(&step.next_state)
                {
                    continue;
                }

                let slot = scratch.slot_for(&step.observation);
                for (column, candidate) in candidates.iter().enumerate() {
                    let mut value = 0.0;
                    for _ in 0..num_eval {
                        value += graph.simulate(
                            *candidate,
                            &step.next_state,
                            model,
                            params.max_steps,
                            rng,
                        )?;
                    }
                    scratch.add(slot, column, value / num_eval as f64);
                }
            }

            let (edges, default, successor_sum) =
                scratch.choose_successors(&candidates, params.num_prune_obs);
            let value = model.discount() * (reward_sum + successor_sum) / num_state as f64;

            if best.as_ref().is_none_or(|current| value > current.value) {
                best = Some(BackupCandidate {
                    node: ControllerNode::new(action.clone(), edges, default),
                    value,
                });
            }
        }

        Ok(best)
    }
}
