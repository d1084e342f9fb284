/// A wrapper for an integer index used to address belief and action nodes in the search tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Get the value of the actual node without having to access and risk overriding the internal value
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    /// Allow for explicit conversion from usize to NodeId
    fn from(value: usize) -> Self {
        NodeId(value)
    }
}

/// A wrapper for an integer index used to address controller nodes in the policy graph.
/// Belief nodes only hold this as a non-owning reference.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ControllerId(usize);

impl ControllerId {
    /// Return the position of this controller node inside the policy graph.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for ControllerId {
    fn from(value: usize) -> Self {
        ControllerId(value)
    }
}
