//! In-memory primary tables for nodes and edges.
//!
//! The store owns every live [`Node`] and [`Edge`] keyed by id. It offers
//! no isolation of its own; the transaction coordinator serializes writers
//! and the engine wraps the store in a read-write lock so queries can run
//! alongside at most one writer.

mod index;

pub use index::{Indexes, ValueKey};

use rustc_hash::FxHashMap;

use crate::model::{Edge, EdgeId, Node, NodeId};

/// Primary node and edge tables with constant-time id lookups.
#[derive(Debug, Default)]
pub struct Store {
    nodes: FxHashMap<NodeId, Node>,
    edges: FxHashMap<EdgeId, Edge>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a node, returning the previous image if any.
    pub fn put_node(&mut self, node: Node) -> Option<Node> {
        self.nodes.insert(node.id.clone(), node)
    }

    /// Looks up a node by id.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Removes a node, returning its last image if it existed.
    pub fn delete_node(&mut self, id: &str) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Iterates over all live nodes in no particular order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts or replaces an edge, returning the previous image if any.
    pub fn put_edge(&mut self, edge: Edge) -> Option<Edge> {
        self.edges.insert(edge.id.clone(), edge)
    }

    /// Looks up an edge by id.
    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Removes an edge, returning its last image if it existed.
    pub fn delete_edge(&mut self, id: &str) -> Option<Edge> {
        self.edges.remove(id)
    }

    /// Iterates over all live edges in no particular order.
    pub fn all_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges whose source is `node_id`. Linear scan; snapshot and
    /// diagnostics only, hot paths go through [`Indexes`].
    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .filter(move |edge| edge.source_node_id == node_id)
    }

    /// Edges whose target is `node_id`. Linear scan; snapshot and
    /// diagnostics only, hot paths go through [`Indexes`].
    pub fn edges_to<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .values()
            .filter(move |edge| edge.target_node_id == node_id)
    }

    /// Erases every node and edge.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }
}
