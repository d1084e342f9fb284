use rand::Rng;

use crate::{
    model::Pomdp,
    tree::{arena::Arena, error::TreeError, ids::ControllerId},
};

/// One state of the finite-state controller: an action plus observation-indexed transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerNode<A, O> {
    action: A,
    edges: Vec<(O, ControllerId)>,
    default: Option<ControllerId>,
}

impl<A, O> ControllerNode<A, O>
where
    O: PartialEq,
{
    pub fn new(action: A, edges: Vec<(O, ControllerId)>, default: Option<ControllerId>) -> Self {
        ControllerNode {
            action,
            edges,
            default,
        }
    }

    /// A controller node that halts after acting.
    pub fn leaf(action: A) -> Self {
        ControllerNode::new(action, Vec::new(), None)
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn edges(&self) -> &[(O, ControllerId)] {
        &self.edges
    }

    pub fn default_edge(&self) -> Option<ControllerId> {
        self.default
    }

    /// Follow the edge for `observation`, falling back to the default edge.
    /// `None` means execution halts here.
    pub fn next(&self, observation: &O) -> Option<ControllerId> {
        self.edges
            .iter()
            .find(|(edge_observation, _)| edge_observation == observation)
            .map(|(_, target)| *target)
            .or(self.default)
    }
}

/// Append-only graph of controller nodes discovered by belief backups.
#[derive(Debug, Clone)]
pub struct PolicyGraph<A, O> {
    nodes: Arena<ControllerId, ControllerNode<A, O>>,
}

impl<A, O> Default for PolicyGraph<A, O> {
    fn default() -> Self {
        PolicyGraph {
            nodes: Arena::new(),
        }
    }
}

impl<A, O> PolicyGraph<A, O>
where
    O: PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a controller node and return its handle.
    pub fn add_node(&mut self, node: ControllerNode<A, O>) -> ControllerId {
        self.nodes.allocate(node)
    }

    pub fn node(&self, id: ControllerId) -> Result<&ControllerNode<A, O>, TreeError> {
        self.nodes
            .get(id.index())
            .ok_or(TreeError::MissingController { controller_id: id })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All controller ids in registration order.
    pub fn ids(&self) -> Vec<ControllerId> {
        self.nodes.iter_with_ids().map(|(id, _)| id).collect()
    }

    /// Execute the controller from `start` in a concrete state and return the discounted return.
    ///
    /// The k-th reward is weighted by `discount^(k + 1)`, the same convention the
    /// search tree uses for action-node backups.
    pub fn simulate<M, R>(
        &self,
        start: ControllerId,
        state: &M::State,
        model: &M,
        max_steps: usize,
        rng: &mut R,
    ) -> Result<f64, TreeError>
    where
        M: Pomdp<Action = A, Observation = O>,
        R: Rng + ?Sized,
    {
        let discount = model.discount();
        let mut weight = discount;
        let mut total = 0.0;
        let mut current = Some(start);
        let mut state = state.clone();

        for _ in 0..max_steps {
            let Some(id) = current else {
                break;
            };
            if model.is_terminal_state(&state) {
                break;
            }

            let node = self.node(id)?;
            let step = model.step(&state, node.action(), rng);
            total += weight * step.reward;
            weight *= discount;

            if model.is_terminal_action(node.action()) {
                break;
            }
            current = node.next(&step.observation);
            state = step.next_state;
        }

        Ok(total)
    }
}

/// The solver's output: a policy graph plus its entry point.
#[derive(Debug, Clone)]
pub struct Policy<A, O, S> {
    graph: PolicyGraph<A, O>,
    entry: Option<ControllerId>,
    root_belief: Option<Vec<(S, f64)>>,
}

impl<A, O, S> Default for Policy<A, O, S> {
    fn default() -> Self {
        Policy {
            graph: PolicyGraph::default(),
            entry: None,
            root_belief: None,
        }
    }
}

impl<A, O, S> Policy<A, O, S>
where
    O: PartialEq,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &PolicyGraph<A, O> {
        &self.graph
    }

    pub(crate) fn graph_mut(&mut self) -> &mut PolicyGraph<A, O> {
        &mut self.graph
    }

    /// Controller node to start executing from.
    pub fn entry(&self) -> Option<ControllerId> {
        self.entry
    }

    pub(crate) fn set_entry(&mut self, entry: Option<ControllerId>) {
        self.entry = entry;
    }

    /// Snapshot of the initial-state distribution the policy was planned for.
    pub fn root_belief(&self) -> Option<&[(S, f64)]> {
        self.root_belief.as_deref()
    }

    pub(crate) fn set_root_belief(&mut self, root_belief: Option<Vec<(S, f64)>>) {
        self.root_belief = root_belief;
    }

    /// Action of a controller node. The choice depends on the node only.
    pub fn action(&self, node: ControllerId) -> Result<&A, TreeError> {
        Ok(self.graph.node(node)?.action())
    }

    /// Controller node reached from `node` after seeing `observation`.
    pub fn transition(
        &self,
        node: ControllerId,
        observation: &O,
    ) -> Result<Option<ControllerId>, TreeError> {
        Ok(self.graph.node(node)?.next(observation))
    }

    /// Action taken at the entry point, if search has found one.
    pub fn entry_action(&self) -> Option<&A> {
        let entry = self.entry?;
        self.graph.node(entry).ok().map(ControllerNode::action)
    }
}
