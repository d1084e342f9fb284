use std::fmt::Debug;

use serde::Serialize;

use crate::tree::{node::SearchNode, search_tree::SearchTree};

const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct TreeSnapshot {
    pub schema_version: u32,
    pub root_node_id: usize,
    pub node_count: usize,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSnapshot {
    Belief {
        node_id: usize,
        depth: usize,
        parent_node_id: Option<usize>,
        observation: Option<String>,
        upper: f64,
        lower: f64,
        best_controller_id: Option<usize>,
        children: Vec<usize>,
    },
    Action {
        node_id: usize,
        depth: usize,
        parent_node_id: usize,
        action: String,
        upper: f64,
        immediate_reward: f64,
        is_terminal: bool,
        children: Vec<usize>,
    },
}

impl TreeSnapshot {
    /// Render the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<B, A, O> SearchTree<B, A, O>
where
    A: Debug,
    O: Debug,
{
    /// Capture the tree structure and bounds. Beliefs are left out; labels use their `Debug` form.
    pub fn snapshot(&self) -> TreeSnapshot {
        let nodes = self
            .nodes()
            .map(|(node_id, node)| {
                let children = node.children().iter().map(|c| c.index()).collect();
                match node {
                    SearchNode::Belief(belief) => NodeSnapshot::Belief {
                        node_id: node_id.index(),
                        depth: belief.depth(),
                        parent_node_id: belief.parent().map(|p| p.index()),
                        observation: belief.observation().map(|o| format!("{o:?}")),
                        upper: belief.upper(),
                        lower: belief.lower(),
                        best_controller_id: belief.best_controller().map(|c| c.index()),
                        children,
                    },
                    SearchNode::Action(action) => NodeSnapshot::Action {
                        node_id: node_id.index(),
                        depth: action.depth(),
                        parent_node_id: action.parent().index(),
                        action: format!("{:?}", action.action()),
                        upper: action.upper(),
                        immediate_reward: action.immediate_reward(),
                        is_terminal: action.is_terminal(),
                        children,
                    },
                }
            })
            .collect();

        TreeSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            root_node_id: self.root_id().index(),
            node_count: self.node_count(),
            nodes,
        }
    }
}
