use gaptree_core::TreeError;
use thiserror::Error;

#[derive(Debug, Error)]
/// Error type for POMDP loading, validation, compilation, builder, and evaluation operations.
pub enum PomdpError {
    #[error("failed to read YAML file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("discount must be finite and in [0, 1), got {value}")]
    InvalidDiscount { value: f64 },

    #[error("model must declare at least one state")]
    EmptyStates,

    #[error("model must declare at least one observation")]
    EmptyObservations,

    #[error("model must declare at least one action")]
    EmptyActions,

    #[error("duplicate state id '{id}'")]
    DuplicateStateId { id: String },

    #[error("duplicate observation id '{id}'")]
    DuplicateObservationId { id: String },

    #[error("duplicate action id '{action}'")]
    DuplicateActionId { action: String },

    #[error("{context} references unknown state '{state}'")]
    UnknownState { context: String, state: String },

    #[error("{context} references unknown observation '{observation}'")]
    UnknownObservation { context: String, observation: String },

    #[error("{context} must contain at least one outcome")]
    EmptyOutcomes { context: String },

    #[error("invalid probability in {context}, outcome {outcome_index}: {value}")]
    InvalidProbability {
        context: String,
        outcome_index: usize,
        value: f64,
    },

    #[error("invalid reward in {context}, outcome {outcome_index}: {value}")]
    InvalidReward {
        context: String,
        outcome_index: usize,
        value: f64,
    },

    #[error("probability sum for {context} must be within {tolerance} of 1.0, got {sum}")]
    ProbabilitySum {
        context: String,
        sum: f64,
        tolerance: f64,
    },

    #[error("action '{action}' declares no transitions from state '{state}'")]
    MissingTransitions { action: String, state: String },

    #[error("action '{action}' declares transitions from state '{state}' more than once")]
    DuplicateTransitions { action: String, state: String },

    #[error("action '{action}' declares no observations for state '{state}'")]
    MissingObservations { action: String, state: String },

    #[error("action '{action}' declares observations for state '{state}' more than once")]
    DuplicateObservations { action: String, state: String },

    #[error("builder referenced unknown action '{action}'")]
    BuilderUnknownAction { action: String },

    #[error("policy has no entry controller")]
    MissingPolicyEntry,

    #[error("policy execution failed: {0}")]
    Policy(#[from] TreeError),
}
