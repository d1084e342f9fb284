use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    model::{Bounds, Pomdp},
    policy::{
        backup::{BackupParams, BackupScratch},
        graph::Policy,
    },
};

/// Shared stop flag checked at every belief-node visit.
///
/// Clones observe the same flag, so a token can be handed to another thread
/// and used to stop a solve from outside.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag so the token can be reused for another solve.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Numeric knobs of a search pass, copied out of the solver configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSettings {
    pub branching_factor: usize,
    pub max_depth: usize,
    pub expansions_per_search: Option<usize>,
    /// `None` skips the crossed-bounds check.
    pub bound_tolerance: Option<f64>,
    pub backup: BackupParams,
}

/// Everything a tree operation needs besides the tree itself.
pub struct SearchContext<'a, M: Pomdp, B, P, R: ?Sized> {
    pub model: &'a M,
    pub bounds: &'a Bounds<M, B>,
    pub backup: &'a P,
    pub policy: &'a mut Policy<M::Action, M::Observation, M::State>,
    pub scratch: &'a mut BackupScratch<M::Observation>,
    pub rng: &'a mut R,
    pub settings: SearchSettings,
    pub cancel: Option<&'a CancelToken>,
}

impl<M: Pomdp, B, P, R: ?Sized> SearchContext<'_, M, B, P, R> {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}
