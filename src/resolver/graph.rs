//! Arena-backed dependency graph
//!
//! Nodes are bundle keys stored in a vector and addressed by index; edges
//! are adjacency lists of indices in declared dependency order.
//!
//! ```text
//! nodes: [ex/a@1, ex/b@2, ex/c@1]
//! edges: [[1, 2],  [2],    []    ]
//! ```

use std::collections::HashMap;

use crate::domain::BundleKey;

/// Index of a node in a [`DependencyGraph`]
pub type NodeId = usize;

#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    nodes: Vec<BundleKey>,
    index: HashMap<BundleKey, NodeId>,
    edges: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning the existing id if the key is known
    pub fn add_node(&mut self, key: BundleKey) -> NodeId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = self.nodes.len();
        self.index.insert(key.clone(), id);
        self.nodes.push(key);
        self.edges.push(Vec::new());
        id
    }

    /// Record that `from` depends on `to`
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if !self.edges[from].contains(&to) {
            self.edges[from].push(to);
        }
    }

    pub fn node_id(&self, key: &BundleKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn key(&self, id: NodeId) -> &BundleKey {
        &self.nodes[id]
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.edges[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
