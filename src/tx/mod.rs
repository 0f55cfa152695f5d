//! Transaction building and the serialized commit path.
//!
//! A [`Transaction`] buffers forward operations and their inverses; nothing
//! touches the store until commit. The [`Coordinator`] owns the WAL handle
//! and applies committed operations under an exclusive critical section,
//! so the log order, the commit order, and the replay order are all the
//! same sequence.

mod coordinator;

pub use coordinator::Coordinator;
pub(crate) use coordinator::apply_op;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::db::GraphDB;
use crate::error::{GraphError, Result};
use crate::ident::fresh_id;
use crate::model::{Edge, EdgeId, Node, NodeId, PropertyValue};

/// Coordinator-issued transaction identifier.
///
/// Ids are allocated inside the commit critical section, so they are
/// strictly increasing in WAL order and comparable for truncation.
pub type TxId = u64;

/// Lifecycle state of a transaction handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    /// Operations may still be added; the store is untouched.
    Open,
    /// Durably logged and applied; the handle is immutable.
    Committed,
    /// Abandoned before commit; the handle is immutable.
    RolledBack,
}

impl TxState {
    fn name(self) -> &'static str {
        match self {
            TxState::Open => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        }
    }
}

/// A single forward or inverse operation.
///
/// Four op kinds cover every mutation: node and edge upserts carry the
/// full post-image, deletes carry only the id. The same type serves as
/// the WAL record payload and the undo log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Op {
    /// Insert or replace a node.
    PutNode(Node),
    /// Remove a node by id.
    DeleteNode(NodeId),
    /// Insert or replace an edge.
    PutEdge(Edge),
    /// Remove an edge by id.
    DeleteEdge(EdgeId),
}

/// Changes applied by [`Transaction::update_node`].
///
/// A supplied label set replaces the node's labels outright; a supplied
/// property map is merged key-wise into the existing properties.
#[derive(Clone, Debug, Default)]
pub struct NodeChanges {
    /// Replacement label set, when present.
    pub labels: Option<BTreeSet<String>>,
    /// Properties to merge in, when present.
    pub properties: Option<BTreeMap<String, PropertyValue>>,
}

impl NodeChanges {
    /// Starts an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the node's labels with `labels`.
    pub fn labels(mut self, labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    /// Merges `properties` into the node's properties.
    pub fn properties(mut self, properties: BTreeMap<String, PropertyValue>) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// An in-flight unit of work against a [`GraphDB`].
///
/// Builder methods read the committed store to capture pre-images for the
/// undo log; they never mutate shared state. Handles may be dropped
/// silently before commit with no effect.
#[derive(Debug)]
pub struct Transaction<'db> {
    db: &'db GraphDB,
    ops: Vec<Op>,
    undo: Vec<Op>,
    state: TxState,
    id: Option<TxId>,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(db: &'db GraphDB) -> Self {
        Self {
            db,
            ops: Vec::new(),
            undo: Vec::new(),
            state: TxState::Open,
            id: None,
        }
    }

    /// The transaction id, present once committed.
    pub fn id(&self) -> Option<TxId> {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TxState {
        self.state
    }

    /// Forward operations buffered so far, in build order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Buffers creation of a new node and returns its allocated id.
    pub fn create_node(
        &mut self,
        labels: impl IntoIterator<Item = impl Into<String>>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<NodeId> {
        self.ensure_open()?;
        let mut node = Node::new(fresh_id());
        node.labels = labels.into_iter().map(Into::into).collect();
        node.properties = properties;
        let id = node.id.clone();
        self.ops.push(Op::PutNode(node));
        self.undo.push(Op::DeleteNode(id.clone()));
        Ok(id)
    }

    /// Buffers creation of a new edge and returns its allocated id.
    ///
    /// Endpoint existence is not checked here; referential integrity is
    /// enforced when the transaction commits, so an edge may target a node
    /// created earlier in the same transaction.
    pub fn create_edge(
        &mut self,
        type_name: impl Into<String>,
        from: impl Into<NodeId>,
        to: impl Into<NodeId>,
        properties: BTreeMap<String, PropertyValue>,
    ) -> Result<EdgeId> {
        self.ensure_open()?;
        let mut edge = Edge::new(fresh_id(), from.into(), to.into(), type_name);
        edge.properties = properties;
        let id = edge.id.clone();
        self.ops.push(Op::PutEdge(edge));
        self.undo.push(Op::DeleteEdge(id.clone()));
        Ok(id)
    }

    /// Buffers an update of an existing node.
    ///
    /// The pre-image is read from the committed store; a missing target is
    /// an error and leaves the transaction untouched.
    pub fn update_node(&mut self, id: &str, changes: NodeChanges) -> Result<()> {
        self.ensure_open()?;
        let old = self
            .db
            .store
            .read()
            .get_node(id)
            .cloned()
            .ok_or_else(|| GraphError::not_found("node", id))?;

        let mut merged = old.clone();
        if let Some(labels) = changes.labels {
            merged.labels = labels;
        }
        if let Some(properties) = changes.properties {
            for (key, value) in properties {
                merged.properties.insert(key, value);
            }
        }

        self.ops.push(Op::PutNode(merged));
        self.undo.push(Op::PutNode(old));
        Ok(())
    }

    /// Buffers deletion of a node together with every incident edge.
    ///
    /// Incident edges are collected through the adjacency indexes at build
    /// time; their pre-images join the undo log so rollback restores the
    /// node before its edges.
    pub fn delete_node(&mut self, id: &str) -> Result<()> {
        self.ensure_open()?;
        let (node, edges) = {
            let store = self.db.store.read();
            let indexes = self.db.indexes.read();
            let node = store
                .get_node(id)
                .cloned()
                .ok_or_else(|| GraphError::not_found("node", id))?;
            let mut edge_ids: BTreeSet<EdgeId> = indexes.out_edges_of(id).into_iter().collect();
            edge_ids.extend(indexes.in_edges_of(id));
            let mut edges = Vec::with_capacity(edge_ids.len());
            for edge_id in &edge_ids {
                let edge = store.get_edge(edge_id).cloned().ok_or_else(|| {
                    GraphError::Corruption(format!("indexed edge '{edge_id}' missing from store"))
                })?;
                edges.push(edge);
            }
            (node, edges)
        };

        for edge in &edges {
            self.ops.push(Op::DeleteEdge(edge.id.clone()));
            self.undo.push(Op::PutEdge(edge.clone()));
        }
        self.ops.push(Op::DeleteNode(id.to_string()));
        self.undo.push(Op::PutNode(node));
        Ok(())
    }

    /// Buffers deletion of an edge.
    pub fn delete_edge(&mut self, id: &str) -> Result<()> {
        self.ensure_open()?;
        let edge = self
            .db
            .store
            .read()
            .get_edge(id)
            .cloned()
            .ok_or_else(|| GraphError::not_found("edge", id))?;
        self.ops.push(Op::DeleteEdge(id.to_string()));
        self.undo.push(Op::PutEdge(edge));
        Ok(())
    }

    /// Commits through the coordinator: one WAL record, then apply.
    ///
    /// On a durability failure the transaction stays open so the caller
    /// may retry. Any other failure is reported before the log is touched.
    pub fn commit(&mut self) -> Result<TxId> {
        self.ensure_open()?;
        let tx_id =
            self.db
                .coordinator
                .commit(&self.db.store, &self.db.indexes, &self.ops)?;
        self.state = TxState::Committed;
        self.id = Some(tx_id);
        Ok(tx_id)
    }

    /// Rolls back by applying the undo log in reverse build order.
    ///
    /// Writes no WAL record. Since an open transaction has not touched the
    /// store, the undo application leaves state exactly as it found it.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.db
            .coordinator
            .rollback(&self.db.store, &self.db.indexes, &self.undo);
        self.state = TxState::RolledBack;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state != TxState::Open {
            return Err(GraphError::InvalidTransactionState {
                actual: self.state.name(),
            });
        }
        Ok(())
    }
}
