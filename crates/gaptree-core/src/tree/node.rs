use std::fmt;

use crate::tree::ids::{ControllerId, NodeId};

/// Which of the two node shapes an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Belief,
    Action,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Belief => write!(f, "belief"),
            NodeKind::Action => write!(f, "action"),
        }
    }
}

#[derive(Debug, Clone)]
/// A belief reached by an observation, with its current bound estimates.
/// Children are one action node per legal action, created once.
pub struct BeliefNode<B, O> {
    observation: Option<O>,
    belief: B,
    upper: f64,
    lower: f64,
    best_controller: Option<ControllerId>,
    children: Vec<NodeId>,
    depth: usize,
    parent: Option<NodeId>,
}

impl<B, O> BeliefNode<B, O> {
    /// Create a new unexpanded belief node. `observation` is `None` only for the root.
    pub fn new(
        observation: Option<O>,
        belief: B,
        upper: f64,
        lower: f64,
        depth: usize,
        parent: Option<NodeId>,
    ) -> Self {
        BeliefNode {
            observation,
            belief,
            upper,
            lower,
            best_controller: None,
            children: Vec::new(),
            depth,
            parent,
        }
    }

    pub fn observation(&self) -> Option<&O> {
        self.observation.as_ref()
    }

    pub fn belief(&self) -> &B {
        &self.belief
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Width of the bound interval, `upper - lower`.
    pub fn gap(&self) -> f64 {
        self.upper - self.lower
    }

    /// Controller node currently realising `lower`.
    pub fn best_controller(&self) -> Option<ControllerId> {
        self.best_controller
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attach children. Has no effect once children exist.
    pub(crate) fn set_children(&mut self, children: Vec<NodeId>) {
        if self.children.is_empty() {
            self.children = children;
        }
    }

    /// Lower `upper` to `candidate` if that is tighter. Returns whether it changed.
    pub(crate) fn tighten_upper(&mut self, candidate: f64) -> bool {
        if candidate < self.upper {
            self.upper = candidate;
            true
        } else {
            false
        }
    }

    /// Raise `lower` to `candidate` if that is tighter and record the controller realising it.
    pub(crate) fn raise_lower(&mut self, candidate: f64, controller: ControllerId) -> bool {
        if candidate > self.lower {
            self.lower = candidate;
            self.best_controller = Some(controller);
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
/// Taking one action from the parent belief, before the observation arrives.
/// Children are a fixed number of sampled observation branches, created once.
pub struct ActionNode<B, A> {
    action: A,
    belief: B,
    upper: f64,
    immediate_reward: f64,
    is_terminal: bool,
    children: Vec<NodeId>,
    depth: usize,
    parent: NodeId,
}

impl<B, A> ActionNode<B, A> {
    pub fn new(
        action: A,
        belief: B,
        upper: f64,
        immediate_reward: f64,
        is_terminal: bool,
        depth: usize,
        parent: NodeId,
    ) -> Self {
        ActionNode {
            action,
            belief,
            upper,
            immediate_reward,
            is_terminal,
            children: Vec::new(),
            depth,
            parent,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    /// Belief predicted right after the action, before any observation.
    pub fn belief(&self) -> &B {
        &self.belief
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn immediate_reward(&self) -> f64 {
        self.immediate_reward
    }

    /// Whether the model marks this action as ending the episode.
    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_expanded(&self) -> bool {
        !self.children.is_empty()
    }

    /// Depth of the parent belief node.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub(crate) fn set_children(&mut self, children: Vec<NodeId>) {
        if self.children.is_empty() {
            self.children = children;
        }
    }

    pub(crate) fn tighten_upper(&mut self, candidate: f64) -> bool {
        if candidate < self.upper {
            self.upper = candidate;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone)]
/// Entry of the search tree arena.
pub enum SearchNode<B, A, O> {
    Belief(BeliefNode<B, O>),
    Action(ActionNode<B, A>),
}

impl<B, A, O> SearchNode<B, A, O> {
    pub fn kind(&self) -> NodeKind {
        match self {
            SearchNode::Belief(_) => NodeKind::Belief,
            SearchNode::Action(_) => NodeKind::Action,
        }
    }

    pub fn upper(&self) -> f64 {
        match self {
            SearchNode::Belief(node) => node.upper(),
            SearchNode::Action(node) => node.upper(),
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match self {
            SearchNode::Belief(node) => node.children(),
            SearchNode::Action(node) => node.children(),
        }
    }
}
