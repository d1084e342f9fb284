use rand::Rng;

use crate::model::{Belief, Pomdp};

/// Map one raw `u64` draw onto `[0, 1)`.
pub(crate) fn unit_sample<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (rng.next_u64() as f64) / ((u64::MAX as f64) + 1.0)
}

/// Weighted particle approximation of a belief.
///
/// Works with any model, at the cost of sampling noise. The particle set is
/// never empty, and the weights always sum to one.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBelief<S> {
    particles: Vec<S>,
    weights: Vec<f64>,
    reward: f64,
}

impl<S> ParticleBelief<S> {
    /// Build an equally weighted belief. Returns `None` for an empty particle set.
    pub fn from_particles(particles: Vec<S>) -> Option<Self> {
        if particles.is_empty() {
            return None;
        }
        let weight = 1.0 / particles.len() as f64;
        let weights = vec![weight; particles.len()];
        Some(ParticleBelief {
            particles,
            weights,
            reward: 0.0,
        })
    }

    pub fn particles(&self) -> &[S] {
        &self.particles
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Kish effective sample size, `1 / sum(w^2)`.
    pub fn effective_sample_size(&self) -> f64 {
        let sum_sq: f64 = self.weights.iter().map(|w| w * w).sum();
        if sum_sq > 0.0 { 1.0 / sum_sq } else { 0.0 }
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &S {
        let target = unit_sample(rng);
        let mut cumulative = 0.0;
        for (particle, weight) in self.particles.iter().zip(&self.weights) {
            cumulative += weight;
            if target < cumulative {
                return particle;
            }
        }
        // Rounding can leave the cumulative sum a hair below one.
        &self.particles[self.particles.len() - 1]
    }
}

impl<M> Belief<M> for ParticleBelief<M::State>
where
    M: Pomdp,
{
    fn initial<R: Rng + ?Sized>(model: &M, num_particles: usize, rng: &mut R) -> Self {
        let count = num_particles.max(1);
        let particles = (0..count).map(|_| model.sample_initial_state(rng)).collect();
        ParticleBelief {
            particles,
            weights: vec![1.0 / count as f64; count],
            reward: 0.0,
        }
    }

    fn update_action<R: Rng + ?Sized>(&self, model: &M, action: &M::Action, rng: &mut R) -> Self {
        let mut particles = Vec::with_capacity(self.particles.len());
        let mut reward = 0.0;
        for (particle, weight) in self.particles.iter().zip(&self.weights) {
            let step = model.step(particle, action, rng);
            reward += weight * step.reward;
            particles.push(step.next_state);
        }
        ParticleBelief {
            particles,
            weights: self.weights.clone(),
            reward,
        }
    }

    fn update_observation(
        &self,
        model: &M,
        action: &M::Action,
        observation: &M::Observation,
    ) -> Self {
        let mut weights: Vec<f64> = self
            .particles
            .iter()
            .zip(&self.weights)
            .map(|(particle, weight)| {
                weight * model.observation_likelihood(action, particle, observation)
            })
            .collect();
        let total: f64 = weights.iter().sum();

        if total > 0.0 && total.is_finite() {
            weights.iter_mut().for_each(|w| *w /= total);
        } else {
            tracing::trace!("observation has zero likelihood under every particle");
            weights = self.weights.clone();
        }

        ParticleBelief {
            particles: self.particles.clone(),
            weights,
            reward: self.reward,
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> M::State {
        self.pick(rng).clone()
    }

    fn expected_reward(&self, _model: &M) -> f64 {
        self.reward
    }
}
