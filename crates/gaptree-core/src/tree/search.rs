use std::fmt::Debug;

use rand::Rng;
use tracing::debug;

use crate::{
    model::{Belief, Pomdp},
    policy::backup::PolicyBackup,
    tree::{
        context::SearchContext,
        error::TreeError,
        ids::NodeId,
        node::NodeKind,
        search_tree::SearchTree,
    },
};

/// What a single search pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Nodes whose backup ran on the way back up.
    pub visited: usize,
    pub belief_expansions: usize,
    pub action_expansions: usize,
    /// Deepest belief depth reached.
    pub depth_reached: usize,
    /// Descent ended at a node whose children all have a closed bound gap.
    pub gap_closed: bool,
    /// Descent ended at `max_depth`.
    pub depth_limited: bool,
    /// Descent ended because the per-pass expansion budget ran out.
    pub budget_exhausted: bool,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Belief(NodeId),
    Action(NodeId),
}

impl<B, A, O> SearchTree<B, A, O> {
    /// Run one gap-driven search pass from `start`, which may be a belief or an action node.
    ///
    /// The pass descends while the bound gap at the current belief exceeds
    /// `target_gap`, following the action with the greatest upper bound and
    /// then the observation branch with the widest gap. The target is divided
    /// by the discount at every level, and becomes unbounded when the discount
    /// is zero. Visited nodes are then backed up from the deepest one to `start`.
    pub fn search<M, P, R>(
        &mut self,
        start: NodeId,
        target_gap: f64,
        ctx: &mut SearchContext<'_, M, B, P, R>,
    ) -> Result<SearchOutcome, TreeError>
    where
        M: Pomdp<Action = A, Observation = O>,
        A: Clone + PartialEq + Debug,
        O: Clone + PartialEq + Debug,
        B: Belief<M>,
        P: PolicyBackup<M, B>,
        R: Rng + ?Sized,
    {
        let discount = ctx.model.discount();
        let settings = ctx.settings;
        let mut budget = settings.expansions_per_search;
        let mut target_gap = target_gap;
        let mut outcome = SearchOutcome::default();
        let mut path: Vec<Frame> = Vec::new();

        let mut cursor = match self.node(start)?.kind() {
            NodeKind::Belief => Frame::Belief(start),
            NodeKind::Action => Frame::Action(start),
        };

        loop {
            match cursor {
                Frame::Belief(id) => {
                    path.push(Frame::Belief(id));
                    let (gap, depth) = {
                        let node = self.belief_node(id)?;
                        (node.gap(), node.depth())
                    };
                    outcome.depth_reached = outcome.depth_reached.max(depth);

                    if ctx.is_cancelled() {
                        debug!(node = id.index(), "search cancelled");
                        outcome.cancelled = true;
                        break;
                    }
                    if gap <= target_gap {
                        break;
                    }
                    if depth >= settings.max_depth {
                        debug!(node = id.index(), depth, "search reached max depth");
                        outcome.depth_limited = true;
                        break;
                    }

                    if self.expand_belief(id, ctx)? {
                        outcome.belief_expansions += 1;
                    }
                    let children = self.belief_node(id)?.children().to_vec();
                    for child in &children {
                        self.backup_action(*child, discount)?;
                    }

                    match self.select_by_upper(&children)? {
                        Some(action) => cursor = Frame::Action(action),
                        None => break,
                    }
                }
                Frame::Action(id) => {
                    let (is_terminal, is_expanded) = {
                        let node = self.action_node(id)?;
                        (node.is_terminal(), node.is_expanded())
                    };
                    // A terminal action ends the episode, so there is nothing below it.
                    if is_terminal {
                        break;
                    }
                    path.push(Frame::Action(id));

                    if !is_expanded {
                        if budget == Some(0) {
                            debug!(node = id.index(), "search expansion budget exhausted");
                            outcome.budget_exhausted = true;
                            break;
                        }
                        if self.expand_action(id, ctx)? {
                            outcome.action_expansions += 1;
                            budget = budget.map(|remaining| remaining - 1);
                        }
                    }

                    match self.select_by_gap(id)? {
                        Some(belief) => {
                            cursor = Frame::Belief(belief);
                            // With a zero discount nothing below the first action matters.
                            target_gap = if discount > 0.0 {
                                target_gap / discount
                            } else {
                                f64::INFINITY
                            };
                        }
                        None => {
                            outcome.gap_closed = true;
                            break;
                        }
                    }
                }
            }
        }

        outcome.visited = path.len();
        for frame in path.into_iter().rev() {
            match frame {
                Frame::Belief(id) => self.backup_belief(id, ctx)?,
                Frame::Action(id) => {
                    self.backup_action(id, discount)?;
                }
            }
        }

        Ok(outcome)
    }

    /// Action child with the strictly greatest upper bound; the first one wins ties.
    fn select_by_upper(&self, children: &[NodeId]) -> Result<Option<NodeId>, TreeError> {
        let mut best: Option<(NodeId, f64)> = None;
        for child in children {
            let upper = self.action_node(*child)?.upper();
            if best.is_none_or(|(_, best_upper)| best_upper < upper) {
                best = Some((*child, upper));
            }
        }
        Ok(best.map(|(id, _)| id))
    }

    /// Belief child with the strictly greatest positive bound gap.
    fn select_by_gap(&self, action_id: NodeId) -> Result<Option<NodeId>, TreeError> {
        let mut best: Option<NodeId> = None;
        let mut best_gap = 0.0;
        for child in self.action_node(action_id)?.children() {
            let gap = self.belief_node(*child)?.gap();
            if gap > best_gap {
                best_gap = gap;
                best = Some(*child);
            }
        }
        Ok(best)
    }
}
