//! Secondary indexes over the primary tables.
//!
//! Four structures are maintained: out-edges and in-edges per node, node
//! ids per label, and node ids per (property key, value) pair. The
//! transaction coordinator deindexes the pre-image before indexing the
//! post-image, so after every mutation each index exactly reflects the
//! store.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::model::{Edge, EdgeId, Node, NodeId, PropertyValue};

/// Hashable, totally ordered key form of a [`PropertyValue`].
///
/// Floats are keyed by their bit pattern so structurally equal values
/// land in the same bucket.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKey {
    /// Null literal.
    Null,
    /// Boolean key.
    Bool(bool),
    /// Integer key.
    Int(i64),
    /// Float key, encoded as raw bits.
    Float(u64),
    /// String key.
    String(String),
}

impl From<&PropertyValue> for ValueKey {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::Null => ValueKey::Null,
            PropertyValue::Bool(v) => ValueKey::Bool(*v),
            PropertyValue::Int(v) => ValueKey::Int(*v),
            PropertyValue::Float(v) => ValueKey::Float(v.to_bits()),
            PropertyValue::String(v) => ValueKey::String(v.clone()),
        }
    }
}

/// Secondary index tables. All entries refer to ids owned by the store.
#[derive(Debug, Default)]
pub struct Indexes {
    out_edges: FxHashMap<NodeId, BTreeSet<EdgeId>>,
    in_edges: FxHashMap<NodeId, BTreeSet<EdgeId>>,
    labels: FxHashMap<String, BTreeSet<NodeId>>,
    props: FxHashMap<(String, ValueKey), BTreeSet<NodeId>>,
}

impl Indexes {
    /// Creates empty index tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node's labels and properties to the label and property indexes.
    pub fn index_node(&mut self, node: &Node) {
        for label in &node.labels {
            self.labels
                .entry(label.clone())
                .or_default()
                .insert(node.id.clone());
        }
        for (key, value) in &node.properties {
            self.props
                .entry((key.clone(), ValueKey::from(value)))
                .or_default()
                .insert(node.id.clone());
        }
    }

    /// Removes exactly the pairings previously added for `node`.
    pub fn deindex_node(&mut self, node: &Node) {
        for label in &node.labels {
            if let Some(ids) = self.labels.get_mut(label) {
                ids.remove(&node.id);
                if ids.is_empty() {
                    self.labels.remove(label);
                }
            }
        }
        for (key, value) in &node.properties {
            let entry = (key.clone(), ValueKey::from(value));
            if let Some(ids) = self.props.get_mut(&entry) {
                ids.remove(&node.id);
                if ids.is_empty() {
                    self.props.remove(&entry);
                }
            }
        }
    }

    /// Adds an edge to the adjacency indexes of both endpoints.
    pub fn index_edge(&mut self, edge: &Edge) {
        self.out_edges
            .entry(edge.source_node_id.clone())
            .or_default()
            .insert(edge.id.clone());
        self.in_edges
            .entry(edge.target_node_id.clone())
            .or_default()
            .insert(edge.id.clone());
    }

    /// Removes an edge from the adjacency indexes of both endpoints.
    pub fn deindex_edge(&mut self, edge: &Edge) {
        if let Some(ids) = self.out_edges.get_mut(&edge.source_node_id) {
            ids.remove(&edge.id);
            if ids.is_empty() {
                self.out_edges.remove(&edge.source_node_id);
            }
        }
        if let Some(ids) = self.in_edges.get_mut(&edge.target_node_id) {
            ids.remove(&edge.id);
            if ids.is_empty() {
                self.in_edges.remove(&edge.target_node_id);
            }
        }
    }

    /// Ids of edges whose source is `node_id`.
    pub fn out_edges_of(&self, node_id: &str) -> Vec<EdgeId> {
        self.out_edges
            .get(node_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of edges whose target is `node_id`.
    pub fn in_edges_of(&self, node_id: &str) -> Vec<EdgeId> {
        self.in_edges
            .get(node_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of nodes carrying `label`.
    pub fn nodes_with_label(&self, label: &str) -> Vec<NodeId> {
        self.labels
            .get(label)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids of nodes whose properties contain the exact (key, value) pair.
    pub fn nodes_with_property(&self, key: &str, value: &PropertyValue) -> Vec<NodeId> {
        self.props
            .get(&(key.to_string(), ValueKey::from(value)))
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of distinct labels currently indexed.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Iterates labels and the nodes carrying them.
    pub fn labels(&self) -> impl Iterator<Item = (&String, &BTreeSet<NodeId>)> {
        self.labels.iter()
    }

    /// Erases every index entry.
    pub fn clear(&mut self) {
        self.out_edges.clear();
        self.in_edges.clear();
        self.labels.clear();
        self.props.clear();
    }
}
