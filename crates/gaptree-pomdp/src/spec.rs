use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{CompiledPomdp, PomdpError, compiled::PROB_TOLERANCE};

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Serializable POMDP schema used for YAML IO and validation.
pub struct PomdpSpec {
    /// Schema version for future compatibility checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Per-step discount factor in `[0, 1)`.
    pub discount: f64,
    /// Hidden state ids.
    pub states: Vec<String>,
    /// Observation ids.
    pub observations: Vec<String>,
    /// Initial-state distribution.
    pub initial: Vec<InitialSpec>,
    pub actions: Vec<ActionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Probability mass of one state in the initial distribution.
pub struct InitialSpec {
    pub state: String,
    pub prob: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A named action with its dynamics and its observation model.
pub struct ActionSpec {
    pub id: String,
    /// Whether taking this action ends the episode (defaults to `false` if omitted).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<bool>,
    /// One entry per source state.
    pub transitions: Vec<TransitionSpec>,
    /// One entry per state the action can land in.
    pub observations: Vec<EmissionSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Stochastic outcomes of an action taken in `from`.
pub struct TransitionSpec {
    pub from: String,
    pub outcomes: Vec<OutcomeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One probabilistic transition for an action.
pub struct OutcomeSpec {
    pub next: String,
    pub prob: f64,
    pub reward: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Observation distribution after an action lands in `state`.
pub struct EmissionSpec {
    pub state: String,
    pub outcomes: Vec<ObservationOutcomeSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationOutcomeSpec {
    pub obs: String,
    pub prob: f64,
}

fn unique_ids<'a>(
    ids: impl Iterator<Item = &'a String>,
    duplicate: impl Fn(String) -> PomdpError,
) -> Result<HashSet<&'a str>, PomdpError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(duplicate(id.clone()));
        }
    }
    Ok(seen)
}

fn check_probability(context: &str, outcome_index: usize, value: f64) -> Result<(), PomdpError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PomdpError::InvalidProbability {
            context: context.to_string(),
            outcome_index,
            value,
        });
    }
    Ok(())
}

fn check_sum(context: &str, sum: f64, tolerance: f64) -> Result<(), PomdpError> {
    if (sum - 1.0).abs() > tolerance {
        return Err(PomdpError::ProbabilitySum {
            context: context.to_string(),
            sum,
            tolerance,
        });
    }
    Ok(())
}

impl PomdpSpec {
    /// Validate schema invariants using the crate default tolerance.
    pub fn validate(&self) -> Result<(), PomdpError> {
        self.validate_with_tolerance(PROB_TOLERANCE)
    }

    /// Validate ids, references, coverage, and probability constraints.
    pub fn validate_with_tolerance(&self, tolerance: f64) -> Result<(), PomdpError> {
        if !self.discount.is_finite() || !(0.0..1.0).contains(&self.discount) {
            return Err(PomdpError::InvalidDiscount {
                value: self.discount,
            });
        }
        if self.states.is_empty() {
            return Err(PomdpError::EmptyStates);
        }
        if self.observations.is_empty() {
            return Err(PomdpError::EmptyObservations);
        }
        if self.actions.is_empty() {
            return Err(PomdpError::EmptyActions);
        }

        let states = unique_ids(self.states.iter(), |id| PomdpError::DuplicateStateId { id })?;
        let observations = unique_ids(self.observations.iter(), |id| {
            PomdpError::DuplicateObservationId { id }
        })?;
        unique_ids(self.actions.iter().map(|a| &a.id), |action| {
            PomdpError::DuplicateActionId { action }
        })?;

        let known_state = |context: &str, state: &str| {
            if states.contains(state) {
                Ok(())
            } else {
                Err(PomdpError::UnknownState {
                    context: context.to_string(),
                    state: state.to_string(),
                })
            }
        };

        // Initial distribution.
        let context = "initial distribution";
        if self.initial.is_empty() {
            return Err(PomdpError::EmptyOutcomes {
                context: context.to_string(),
            });
        }
        let mut sum = 0.0_f64;
        for (i, entry) in self.initial.iter().enumerate() {
            known_state(context, &entry.state)?;
            check_probability(context, i, entry.prob)?;
            sum += entry.prob;
        }
        check_sum(context, sum, tolerance)?;

        for action in &self.actions {
            // Every state needs exactly one transition entry.
            let mut covered = HashSet::with_capacity(self.states.len());
            for transition in &action.transitions {
                let context = format!("action '{}' from '{}'", action.id, transition.from);
                known_state(&context, &transition.from)?;
                if !covered.insert(transition.from.as_str()) {
                    return Err(PomdpError::DuplicateTransitions {
                        action: action.id.clone(),
                        state: transition.from.clone(),
                    });
                }
                if transition.outcomes.is_empty() {
                    return Err(PomdpError::EmptyOutcomes { context });
                }

                let mut sum = 0.0_f64;
                for (i, outcome) in transition.outcomes.iter().enumerate() {
                    check_probability(&context, i, outcome.prob)?;
                    if !outcome.reward.is_finite() {
                        return Err(PomdpError::InvalidReward {
                            context,
                            outcome_index: i,
                            value: outcome.reward,
                        });
                    }
                    known_state(&context, &outcome.next)?;
                    sum += outcome.prob;
                }
                check_sum(&context, sum, tolerance)?;
            }
            if let Some(missing) = self.states.iter().find(|s| !covered.contains(s.as_str())) {
                return Err(PomdpError::MissingTransitions {
                    action: action.id.clone(),
                    state: missing.clone(),
                });
            }

            // Every state needs exactly one observation entry.
            let mut covered = HashSet::with_capacity(self.states.len());
            for emission in &action.observations {
                let context = format!("action '{}' observed in '{}'", action.id, emission.state);
                known_state(&context, &emission.state)?;
                if !covered.insert(emission.state.as_str()) {
                    return Err(PomdpError::DuplicateObservations {
                        action: action.id.clone(),
                        state: emission.state.clone(),
                    });
                }
                if emission.outcomes.is_empty() {
                    return Err(PomdpError::EmptyOutcomes { context });
                }

                let mut sum = 0.0_f64;
                for (i, outcome) in emission.outcomes.iter().enumerate() {
                    check_probability(&context, i, outcome.prob)?;
                    if !observations.contains(outcome.obs.as_str()) {
                        return Err(PomdpError::UnknownObservation {
                            context,
                            observation: outcome.obs.clone(),
                        });
                    }
                    sum += outcome.prob;
                }
                check_sum(&context, sum, tolerance)?;
            }
            if let Some(missing) = self.states.iter().find(|s| !covered.contains(s.as_str())) {
                return Err(PomdpError::MissingObservations {
                    action: action.id.clone(),
                    state: missing.clone(),
                });
            }
        }

        Ok(())
    }

    /// Compile this spec into the runtime representation.
    pub fn compile(&self) -> Result<CompiledPomdp, PomdpError> {
        CompiledPomdp::from_spec(self)
    }
}
