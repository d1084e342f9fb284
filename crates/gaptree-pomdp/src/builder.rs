use crate::{
    ActionSpec, CompiledPomdp, EmissionSpec, InitialSpec, ObservationOutcomeSpec, OutcomeSpec,
    PomdpError, PomdpSpec, TransitionSpec,
};

#[derive(Debug, Clone, Default)]
/// Struct to build POMDPs in code, mirroring the YAML schema
pub struct PomdpBuilder {
    discount: f64,
    states: Vec<String>,
    observations: Vec<String>,
    initial: Vec<InitialSpec>,
    actions: Vec<ActionSpec>,
}

impl PomdpBuilder {
    /// Create a new builder with the given discount factor
    pub fn new(discount: f64) -> Self {
        Self {
            discount,
            ..Self::default()
        }
    }

    /// Add a hidden state
    pub fn add_state(&mut self, id: impl Into<String>) -> &mut Self {
        self.states.push(id.into());
        self
    }

    /// Add an observation symbol
    pub fn add_observation(&mut self, id: impl Into<String>) -> &mut Self {
        self.observations.push(id.into());
        self
    }

    /// Put probability mass on a state in the initial distribution
    pub fn add_initial(&mut self, state: impl Into<String>, prob: f64) -> &mut Self {
        self.initial.push(InitialSpec {
            state: state.into(),
            prob,
        });
        self
    }

    /// Add an action
    /// Terminal flag if taking it ends the episode
    pub fn add_action(&mut self, id: impl Into<String>, terminal: bool) -> &mut Self {
        self.actions.push(ActionSpec {
            id: id.into(),
            terminal: Some(terminal),
            transitions: Vec::new(),
            observations: Vec::new(),
        });
        self
    }

    fn action_mut(&mut self, action_id: &str) -> Result<&mut ActionSpec, PomdpError> {
        self.actions
            .iter_mut()
            .find(|a| a.id == action_id)
            .ok_or_else(|| PomdpError::BuilderUnknownAction {
                action: action_id.to_string(),
            })
    }

    /// Add one outcome of taking `action_id` in `from`
    /// Outcomes for the same source state are grouped into one transition entry
    pub fn add_transition(
        &mut self,
        action_id: impl AsRef<str>,
        from: impl Into<String>,
        next: impl Into<String>,
        prob: f64,
        reward: f64,
    ) -> Result<&mut Self, PomdpError> {
        let from = from.into();
        let action = self.action_mut(action_id.as_ref())?;
        let outcome = OutcomeSpec {
            next: next.into(),
            prob,
            reward,
        };

        match action.transitions.iter_mut().find(|t| t.from == from) {
            Some(transition) => transition.outcomes.push(outcome),
            None => action.transitions.push(TransitionSpec {
                from,
                outcomes: vec![outcome],
            }),
        }
        Ok(self)
    }

    /// Add one observation outcome for `action_id` landing in `state`
    pub fn add_emission(
        &mut self,
        action_id: impl AsRef<str>,
        state: impl Into<String>,
        obs: impl Into<String>,
        prob: f64,
    ) -> Result<&mut Self, PomdpError> {
        let state = state.into();
        let action = self.action_mut(action_id.as_ref())?;
        let outcome = ObservationOutcomeSpec {
            obs: obs.into(),
            prob,
        };

        match action.observations.iter_mut().find(|e| e.state == state) {
            Some(emission) => emission.outcomes.push(outcome),
            None => action.observations.push(EmissionSpec {
                state,
                outcomes: vec![outcome],
            }),
        }
        Ok(self)
    }

    pub fn build_spec(self) -> Result<PomdpSpec, PomdpError> {
        let spec = PomdpSpec {
            version: Some(1),
            discount: self.discount,
            states: self.states,
            observations: self.observations,
            initial: self.initial,
            actions: self.actions,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn compile(self) -> Result<CompiledPomdp, PomdpError> {
        let spec = self.build_spec()?;
        spec.compile()
    }
}
