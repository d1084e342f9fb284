use std::fmt::Debug;

use rand::Rng;
use tracing::{debug, warn};

use crate::{
    model::{Belief, Bounds, Pomdp},
    policy::backup::PolicyBackup,
    tree::{
        arena::Arena,
        context::SearchContext,
        error::TreeError,
        ids::NodeId,
        node::{ActionNode, BeliefNode, NodeKind, SearchNode},
    },
};

#[derive(Debug, Clone)]
/// owns the arena (root is always at index 0)
/// Nodes are only ever appended, so the same tree is deepened across search passes.
pub struct SearchTree<B, A, O> {
    arena: Arena<NodeId, SearchNode<B, A, O>>,
}

impl<B, A, O> SearchTree<B, A, O> {
    /// Create a tree with a single root belief node.
    pub fn new(root_belief: B, upper: f64, lower: f64) -> Self {
        let mut arena = Arena::new();
        let root = BeliefNode::new(None, root_belief, upper, lower, 0, None);
        let _ = arena.allocate(SearchNode::Belief(root));
        SearchTree { arena }
    }

    /// Create a tree rooted at the model's initial belief, seeded by the bound estimators.
    pub fn from_model<M, R>(
        model: &M,
        bounds: &Bounds<M, B>,
        num_particles: usize,
        rng: &mut R,
    ) -> Self
    where
        M: Pomdp<Action = A, Observation = O>,
        B: Belief<M>,
        R: Rng + ?Sized,
    {
        let belief = B::initial(model, num_particles, rng);
        let upper = bounds.upper(model, &belief);
        let lower = bounds.lower(model, &belief);
        SearchTree::new(belief, upper, lower)
    }

    /// Return the root node id.
    pub fn root_id(&self) -> NodeId {
        NodeId::from(0)
    }

    /// Return how many nodes exist in the tree arena.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn node(&self, node_id: NodeId) -> Result<&SearchNode<B, A, O>, TreeError> {
        self.arena
            .get(node_id.index())
            .ok_or(TreeError::MissingNode { node_id })
    }

    fn node_mut(&mut self, node_id: NodeId) -> Result<&mut SearchNode<B, A, O>, TreeError> {
        self.arena
            .get_mut(node_id.index())
            .ok_or(TreeError::MissingNode { node_id })
    }

    pub fn belief_node(&self, node_id: NodeId) -> Result<&BeliefNode<B, O>, TreeError> {
        match self.node(node_id)? {
            SearchNode::Belief(node) => Ok(node),
            SearchNode::Action(_) => Err(TreeError::UnexpectedNodeKind {
                node_id,
                expected: NodeKind::Belief,
            }),
        }
    }

    pub fn action_node(&self, node_id: NodeId) -> Result<&ActionNode<B, A>, TreeError> {
        match self.node(node_id)? {
            SearchNode::Action(node) => Ok(node),
            SearchNode::Belief(_) => Err(TreeError::UnexpectedNodeKind {
                node_id,
                expected: NodeKind::Action,
            }),
        }
    }

    fn belief_node_mut(&mut self, node_id: NodeId) -> Result<&mut BeliefNode<B, O>, TreeError> {
        match self.node_mut(node_id)? {
            SearchNode::Belief(node) => Ok(node),
            SearchNode::Action(_) => Err(TreeError::UnexpectedNodeKind {
                node_id,
                expected: NodeKind::Belief,
            }),
        }
    }

    fn action_node_mut(&mut self, node_id: NodeId) -> Result<&mut ActionNode<B, A>, TreeError> {
        match self.node_mut(node_id)? {
            SearchNode::Action(node) => Ok(node),
            SearchNode::Belief(_) => Err(TreeError::UnexpectedNodeKind {
                node_id,
                expected: NodeKind::Action,
            }),
        }
    }

    pub fn root(&self) -> Result<&BeliefNode<B, O>, TreeError> {
        self.belief_node(self.root_id())
    }

    /// Iterate every node with its id, in allocation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SearchNode<B, A, O>)> + '_ {
        self.arena.iter_with_ids()
    }

    /// Expand a belief node with one action child per legal action, in action-space order.
    ///
    /// Returns `false` when the node was already expanded.
    pub fn expand_belief<M, P, R>(
        &mut self,
        node_id: NodeId,
        ctx: &mut SearchContext<'_, M, B, P, R>,
    ) -> Result<bool, TreeError>
    where
        M: Pomdp<Action = A, Observation = O>,
        A: Clone + PartialEq + Debug,
        O: Clone + PartialEq + Debug,
        B: Belief<M>,
        R: Rng + ?Sized,
    {
        let actions = ctx.model.actions();
        let pending = {
            let node = self.belief_node(node_id)?;
            if node.is_expanded() {
                return Ok(false);
            }
            if actions.is_empty() {
                return Err(TreeError::EmptyActionSpace { node_id });
            }

            let discount = ctx.model.discount();
            let mut pending = Vec::with_capacity(actions.len());
            for action in actions {
                let next = node.belief().update_action(ctx.model, action, &mut *ctx.rng);
                let reward = next.expected_reward(ctx.model);
                let is_terminal = ctx.model.is_terminal_action(action);
                // No reward follows a terminal action, so the general estimator is not needed.
                let upper = if is_terminal {
                    reward * discount
                } else {
                    ctx.bounds.upper(ctx.model, &next)
                };
                pending.push(ActionNode::new(
                    action.clone(),
                    next,
                    upper,
                    reward,
                    is_terminal,
                    node.depth(),
                    node_id,
                ));
            }
            pending
        };

        if pending.len() != actions.len() {
            return Err(TreeError::ChildCountMismatch {
                node_id,
                expected: actions.len(),
                actual: pending.len(),
            });
        }
        let children: Vec<NodeId> = pending
            .into_iter()
            .map(|child| self.arena.allocate(SearchNode::Action(child)))
            .collect();

        self.belief_node_mut(node_id)?.set_children(children);
        Ok(true)
    }

    /// Expand an action node with `branching_factor` independently sampled observation branches.
    ///
    /// Returns `false` when the node was already expanded.
    pub fn expand_action<M, P, R>(
        &mut self,
        node_id: NodeId,
        ctx: &mut SearchContext<'_, M, B, P, R>,
    ) -> Result<bool, TreeError>
    where
        M: Pomdp<Action = A, Observation = O>,
        A: Clone + PartialEq + Debug,
        O: Clone + PartialEq + Debug,
        B: Belief<M>,
        R: Rng + ?Sized,
    {
        let branching_factor = ctx.settings.branching_factor;
        let pending = {
            let node = self.action_node(node_id)?;
            if node.is_expanded() {
                return Ok(false);
            }

            let mut pending = Vec::with_capacity(branching_factor);
            for _ in 0..branching_factor {
                let state = node.belief().sample(&mut *ctx.rng);
                let observation =
                    ctx.model
                        .generate_observation(node.action(), &state, &mut *ctx.rng);
                let next = node
                    .belief()
                    .update_observation(ctx.model, node.action(), &observation);
                let upper = ctx.bounds.upper(ctx.model, &next);
                let lower = ctx.bounds.lower(ctx.model, &next);
                pending.push(BeliefNode::new(
                    Some(observation),
                    next,
                    upper,
                    lower,
                    node.depth() + 1,
                    Some(node_id),
                ));
            }
            pending
        };

        if pending.len() != branching_factor {
            return Err(TreeError::ChildCountMismatch {
                node_id,
                expected: branching_factor,
                actual: pending.len(),
            });
        }
        let children: Vec<NodeId> = pending
            .into_iter()
            .map(|child| self.arena.allocate(SearchNode::Belief(child)))
            .collect();

        self.action_node_mut(node_id)?.set_children(children);
        Ok(true)
    }

    /// Tighten an action node's upper bound from the mean of its children's upper bounds.
    ///
    /// An unexpanded node keeps the bound it was created with. Returns whether the bound moved.
    pub fn backup_action(&mut self, node_id: NodeId, discount: f64) -> Result<bool, TreeError> {
        let candidate = {
            let node = self.action_node(node_id)?;
            if !node.is_expanded() {
                return Ok(false);
            }
            let mut sum = 0.0;
            for child in node.children() {
                sum += self.belief_node(*child)?.upper();
            }
            let mean = sum / node.children().len() as f64;
            (mean + node.immediate_reward()) * discount
        };

        Ok(self.action_node_mut(node_id)?.tighten_upper(candidate))
    }

    /// Tighten a belief node's upper bound from its best action child, then ask the
    /// policy backup for a better lower bound.
    ///
    /// When the backup beats the current lower bound, its controller node is
    /// registered in the policy graph and becomes this node's best controller.
    pub fn backup_belief<M, P, R>(
        &mut self,
        node_id: NodeId,
        ctx: &mut SearchContext<'_, M, B, P, R>,
    ) -> Result<(), TreeError>
    where
        M: Pomdp<Action = A, Observation = O>,
        A: Clone + PartialEq + Debug,
        O: Clone + PartialEq + Debug,
        B: Belief<M>,
        P: PolicyBackup<M, B>,
        R: Rng + ?Sized,
    {
        let best_child_upper = {
            let node = self.belief_node(node_id)?;
            let mut best: Option<f64> = None;
            for child in node.children() {
                let upper = self.action_node(*child)?.upper();
                best = Some(best.map_or(upper, |current| current.max(upper)));
            }
            best
        };
        if let Some(upper) = best_child_upper {
            self.belief_node_mut(node_id)?.tighten_upper(upper);
        }

        let candidate = {
            let node = self.belief_node(node_id)?;
            ctx.backup.backup(
                node.belief(),
                ctx.policy.graph(),
                ctx.model,
                &ctx.settings.backup,
                &mut *ctx.scratch,
                &mut *ctx.rng,
            )?
        };

        let node_lower = self.belief_node(node_id)?.lower();
        match candidate {
            Some(candidate) if candidate.value > node_lower => {
                let controller = ctx.policy.graph_mut().add_node(candidate.node);
                self.belief_node_mut(node_id)?
                    .raise_lower(candidate.value, controller);
            }
            Some(_) => {}
            None => warn!(node = node_id.index(), "belief backup produced no candidate"),
        }

        let node = self.belief_node(node_id)?;
        if node.lower() > node.upper() {
            let Some(tolerance) = ctx.settings.bound_tolerance else {
                debug!(
                    node = node_id.index(),
                    upper = node.upper(),
                    lower = node.lower(),
                    "lower bound passed upper bound"
                );
                return Ok(());
            };
            if node.lower() > node.upper() + tolerance {
                return Err(TreeError::BoundsCrossed {
                    node_id,
                    upper: node.upper(),
                    lower: node.lower(),
                });
            }
        }
        Ok(())
    }
}
