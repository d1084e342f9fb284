use std::fmt;

use crate::tree::{
    ids::{ControllerId, NodeId},
    node::NodeKind,
};

/// Error type for search tree construction, backup, and search operations.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeError {
    /// Attempted to access a node id that does not exist in the arena.
    MissingNode { node_id: NodeId },
    /// A node id resolved to the other node variant.
    UnexpectedNodeKind { node_id: NodeId, expected: NodeKind },
    /// The model reported no actions, so a belief node cannot be expanded.
    EmptyActionSpace { node_id: NodeId },
    /// Expansion produced a different number of children than required.
    ChildCountMismatch {
        node_id: NodeId,
        expected: usize,
        actual: usize,
    },
    /// After a backup the lower bound exceeds the upper bound beyond tolerance.
    BoundsCrossed {
        node_id: NodeId,
        upper: f64,
        lower: f64,
    },
    /// A controller id does not exist in the policy graph.
    MissingController { controller_id: ControllerId },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::MissingNode { node_id } => {
                write!(f, "missing node with id {}", node_id.index())
            }
            TreeError::UnexpectedNodeKind { node_id, expected } => write!(
                f,
                "node {} is not a {} node",
                node_id.index(),
                expected
            ),
            TreeError::EmptyActionSpace { node_id } => write!(
                f,
                "cannot expand belief node {}: the model has no actions",
                node_id.index()
            ),
            TreeError::ChildCountMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "expansion of node {} produced {} children, expected {}",
                node_id.index(),
                actual,
                expected
            ),
            TreeError::BoundsCrossed {
                node_id,
                upper,
                lower,
            } => write!(
                f,
                "lower bound {} exceeds upper bound {} on node {}",
                lower,
                upper,
                node_id.index()
            ),
            TreeError::MissingController { controller_id } => write!(
                f,
                "missing controller node with id {}",
                controller_id.index()
            ),
        }
    }
}

impl std::error::Error for TreeError {}
