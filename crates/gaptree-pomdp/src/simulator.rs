use gaptree_core::{PolicyOf, Pomdp, Step};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::{ActionKey, CompiledPomdp, ObservationKey, PomdpError, StateKey};

#[derive(Debug, Clone)]
/// Seeded simulator over a compiled POMDP.
pub struct PomdpSimulator {
    model: CompiledPomdp,
    rng: ChaCha8Rng,
}

impl PomdpSimulator {
    /// Create a simulator with deterministic RNG seed.
    pub fn new(model: CompiledPomdp, seed: u64) -> Self {
        Self {
            model,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn model(&self) -> &CompiledPomdp {
        &self.model
    }

    /// Draw a hidden start state.
    pub fn initial_state(&mut self) -> StateKey {
        self.model.sample_initial_state(&mut self.rng)
    }

    /// Sample one transition. Invalid keys leave the state unchanged with zero reward.
    pub fn step(&mut self, state: StateKey, action: ActionKey) -> Step<StateKey, ObservationKey> {
        self.model.step(&state, &action, &mut self.rng)
    }

    /// Mean discounted return of `policy` over `episodes` runs from fresh initial states.
    pub fn evaluate(
        &mut self,
        policy: &PolicyOf<CompiledPomdp>,
        episodes: usize,
        max_steps: usize,
    ) -> Result<f64, PomdpError> {
        let entry = policy.entry().ok_or(PomdpError::MissingPolicyEntry)?;
        if episodes == 0 {
            return Ok(0.0);
        }

        let mut total = 0.0;
        for _ in 0..episodes {
            let state = self.model.sample_initial_state(&mut self.rng);
            total += policy
                .graph()
                .simulate(entry, &state, &self.model, max_steps, &mut self.rng)?;
        }
        let mean = total / episodes as f64;
        debug!(episodes, mean, "policy evaluated");
        Ok(mean)
    }
}
