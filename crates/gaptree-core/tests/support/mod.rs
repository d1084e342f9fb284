#![allow(dead_code)]

use gaptree_core::{Belief, Pomdp, Step};
use rand::Rng;

pub const CORRECT: f64 = 1.0;
pub const WRONG: f64 = -1.0;
pub const PEEK_COST: f64 = -0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessAction {
    Guess(bool),
    Peek,
}

/// A hidden coin. Peeking reveals the face for a fee; guessing ends the game.
#[derive(Debug, Clone)]
pub struct CoinModel {
    actions: Vec<GuessAction>,
}

impl CoinModel {
    pub fn new() -> Self {
        CoinModel {
            actions: vec![
                GuessAction::Guess(true),
                GuessAction::Guess(false),
                GuessAction::Peek,
            ],
        }
    }

    pub fn without_actions() -> Self {
        CoinModel {
            actions: Vec::new(),
        }
    }

    fn reward(action: &GuessAction, heads: bool) -> f64 {
        match action {
            GuessAction::Guess(guess) if *guess == heads => CORRECT,
            GuessAction::Guess(_) => WRONG,
            GuessAction::Peek => PEEK_COST,
        }
    }
}

impl Pomdp for CoinModel {
    type State = bool;
    type Action = GuessAction;
    type Observation = bool;

    fn actions(&self) -> &[GuessAction] {
        &self.actions
    }

    fn is_terminal_action(&self, action: &GuessAction) -> bool {
        matches!(action, GuessAction::Guess(_))
    }

    fn discount(&self) -> f64 {
        0.9
    }

    fn sample_initial_state<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(0.5)
    }

    fn initial_state_distribution(&self) -> Option<Vec<(bool, f64)>> {
        Some(vec![(true, 0.5), (false, 0.5)])
    }

    fn step<R: Rng + ?Sized>(
        &self,
        state: &bool,
        action: &GuessAction,
        rng: &mut R,
    ) -> Step<bool, bool> {
        Step {
            next_state: *state,
            observation: self.generate_observation(action, state, rng),
            reward: Self::reward(action, *state),
        }
    }

    fn generate_observation<R: Rng + ?Sized>(
        &self,
        action: &GuessAction,
        state: &bool,
        _rng: &mut R,
    ) -> bool {
        match action {
            GuessAction::Peek => *state,
            GuessAction::Guess(_) => false,
        }
    }

    fn observation_likelihood(&self, action: &GuessAction, state: &bool, observation: &bool) -> f64 {
        let expected = match action {
            GuessAction::Peek => *state,
            GuessAction::Guess(_) => false,
        };
        if *observation == expected { 1.0 } else { 0.0 }
    }
}

/// Exact belief over the coin face.
#[derive(Debug, Clone, PartialEq)]
pub struct CoinBelief {
    pub heads: f64,
    pub reward: f64,
}

impl Belief<CoinModel> for CoinBelief {
    fn initial<R: Rng + ?Sized>(_model: &CoinModel, _num_particles: usize, _rng: &mut R) -> Self {
        CoinBelief {
            heads: 0.5,
            reward: 0.0,
        }
    }

    fn update_action<R: Rng + ?Sized>(
        &self,
        _model: &CoinModel,
        action: &GuessAction,
        _rng: &mut R,
    ) -> Self {
        let reward = self.heads * CoinModel::reward(action, true)
            + (1.0 - self.heads) * CoinModel::reward(action, false);
        CoinBelief {
            heads: self.heads,
            reward,
        }
    }

    fn update_observation(&self, model: &CoinModel, action: &GuessAction, observation: &bool) -> Self {
        let heads = self.heads * model.observation_likelihood(action, &true, observation);
        let tails = (1.0 - self.heads) * model.observation_likelihood(action, &false, observation);
        let total = heads + tails;
        CoinBelief {
            heads: if total > 0.0 { heads / total } else { self.heads },
            reward: self.reward,
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen_bool(self.heads)
    }

    fn expected_reward(&self, _model: &CoinModel) -> f64 {
        self.reward
    }
}

/// Perfect-information bound: the best any belief can do is guess right immediately.
pub fn oracle_upper(model: &CoinModel, _belief: &CoinBelief) -> f64 {
    model.discount() * CORRECT
}
