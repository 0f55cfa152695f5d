//! Counts and summary statistics over the live graph.

use std::collections::HashMap;

use crate::db::GraphDB;

/// Point-in-time summary of the graph's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphStats {
    /// Number of live nodes.
    pub node_count: usize,
    /// Number of live edges.
    pub edge_count: usize,
    /// Nodes per label.
    pub label_counts: HashMap<String, usize>,
    /// Edges per relationship type.
    pub edge_type_counts: HashMap<String, usize>,
}

impl GraphDB {
    /// Nodes per label, from the label index.
    pub fn count_nodes_by_label(&self) -> HashMap<String, usize> {
        self.indexes
            .read()
            .labels()
            .map(|(label, nodes)| (label.clone(), nodes.len()))
            .collect()
    }

    /// Edges per relationship type.
    pub fn count_edges_by_type(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for edge in self.store.read().all_edges() {
            *counts.entry(edge.type_name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Number of nodes carrying `label`.
    pub fn count_nodes_with_label(&self, label: &str) -> usize {
        self.indexes.read().nodes_with_label(label).len()
    }

    /// Full summary of counts by label and edge type.
    pub fn stats(&self) -> GraphStats {
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            label_counts: self.count_nodes_by_label(),
            edge_type_counts: self.count_edges_by_type(),
        }
    }
}
