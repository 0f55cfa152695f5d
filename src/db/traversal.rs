//! Graph traversal helpers over the adjacency indexes.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::db::GraphDB;
use crate::error::{GraphError, Result};
use crate::model::{Direction, NodeId};

impl GraphDB {
    /// Distinct targets of the node's outgoing edges, in sorted order.
    pub fn neighbors(&self, node_id: &str) -> Result<Vec<NodeId>> {
        let mut out: Vec<NodeId> = self
            .expand(node_id, Direction::Outgoing, None)?
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        out.sort();
        Ok(out)
    }

    /// Distinct sources of the node's incoming edges, in sorted order.
    pub fn incoming_neighbors(&self, node_id: &str) -> Result<Vec<NodeId>> {
        let mut out: Vec<NodeId> = self
            .expand(node_id, Direction::Incoming, None)?
            .into_iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        out.sort();
        Ok(out)
    }

    /// One reachable endpoint per matching edge, duplicates preserved.
    ///
    /// Follows outgoing or incoming edges of `node_id`, optionally limited
    /// to a single edge type.
    pub fn expand(
        &self,
        node_id: &str,
        direction: Direction,
        edge_type: Option<&str>,
    ) -> Result<Vec<NodeId>> {
        let store = self.store.read();
        if store.get_node(node_id).is_none() {
            return Err(GraphError::not_found("node", node_id));
        }
        let indexes = self.indexes.read();
        let edge_ids = match direction {
            Direction::Outgoing => indexes.out_edges_of(node_id),
            Direction::Incoming => indexes.in_edges_of(node_id),
        };

        let mut endpoints = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            let Some(edge) = store.get_edge(&edge_id) else {
                continue;
            };
            if let Some(wanted) = edge_type {
                if edge.type_name != wanted {
                    continue;
                }
            }
            let endpoint = match direction {
                Direction::Outgoing => edge.target_node_id.clone(),
                Direction::Incoming => edge.source_node_id.clone(),
            };
            endpoints.push(endpoint);
        }
        Ok(endpoints)
    }

    /// Nodes reachable from `start` over outgoing edges, in breadth-first
    /// visit order, `start` included. `max_depth` bounds the hop count.
    pub fn bfs(&self, start: &str, max_depth: Option<usize>) -> Result<Vec<NodeId>> {
        if self.store.read().get_node(start).is_none() {
            return Err(GraphError::not_found("node", start));
        }

        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        visited.insert(start.to_string());
        queue.push_back((start.to_string(), 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            order.push(current.clone());
            if let Some(limit) = max_depth {
                if depth >= limit {
                    continue;
                }
            }
            for next in self.neighbors(&current)? {
                if visited.insert(next.clone()) {
                    queue.push_back((next, depth + 1));
                }
            }
        }
        Ok(order)
    }

    /// Fewest-hop path from `from` to `to` over outgoing edges.
    ///
    /// Returns the node sequence including both endpoints, or `None` when
    /// `to` is unreachable.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Option<Vec<NodeId>>> {
        {
            let store = self.store.read();
            for id in [from, to] {
                if store.get_node(id).is_none() {
                    return Err(GraphError::not_found("node", id));
                }
            }
        }
        if from == to {
            return Ok(Some(vec![from.to_string()]));
        }

        let mut predecessor: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from.to_string());

        while let Some(current) = queue.pop_front() {
            for next in self.neighbors(&current)? {
                if next == from || predecessor.contains_key(&next) {
                    continue;
                }
                predecessor.insert(next.clone(), current.clone());
                if next == to {
                    let mut path = vec![to.to_string()];
                    let mut cursor = to.to_string();
                    while let Some(prev) = predecessor.get(&cursor) {
                        path.push(prev.clone());
                        cursor = prev.clone();
                    }
                    path.reverse();
                    return Ok(Some(path));
                }
                queue.push_back(next);
            }
        }
        Ok(None)
    }
}
