//! Serialized commit, rollback, and snapshot scheduling.
//!
//! Every state-changing path enters the coordinator's critical section one
//! at a time, which keeps WAL append order equal to commit order and lets
//! operations validate against a stable view of the store before any byte
//! reaches the log.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::model::{EdgeId, NodeId};
use crate::snapshot;
use crate::store::{Indexes, Store};
use crate::tx::{Op, TxId};
use crate::wal::{LogRecord, Wal};

/// Process-wide commit coordinator. One per [`crate::GraphDB`].
#[derive(Debug)]
pub struct Coordinator {
    inner: Mutex<Inner>,
    data_dir: PathBuf,
}

#[derive(Debug)]
struct Inner {
    wal: Wal,
    last_tx_id: TxId,
}

impl Coordinator {
    pub(crate) fn new(wal: Wal, last_tx_id: TxId, data_dir: PathBuf) -> Self {
        Self {
            inner: Mutex::new(Inner { wal, last_tx_id }),
            data_dir,
        }
    }

    /// Id of the most recently committed transaction.
    pub fn last_tx_id(&self) -> TxId {
        self.inner.lock().last_tx_id
    }

    pub(crate) fn set_last_tx_id(&self, tx_id: TxId) {
        self.inner.lock().last_tx_id = tx_id;
    }

    /// Commits a batch of forward operations as one transaction.
    ///
    /// Ops are validated against the live store (plus the transaction's own
    /// earlier effects) before the WAL append, so a record that reaches the
    /// log always applies cleanly. Durability failures surface without
    /// applying anything; validation failures surface without logging
    /// anything.
    pub(crate) fn commit(
        &self,
        store: &RwLock<Store>,
        indexes: &RwLock<Indexes>,
        ops: &[Op],
    ) -> Result<TxId> {
        let mut inner = self.inner.lock();

        {
            let store = store.read();
            let indexes = indexes.read();
            validate_ops(&store, &indexes, ops)?;
        }

        let tx_id = inner.last_tx_id + 1;
        let record = LogRecord {
            tx_id,
            timestamp: unix_now(),
            ops: ops.to_vec(),
        };
        inner.wal.append(&record)?;

        {
            let mut store = store.write();
            let mut indexes = indexes.write();
            for op in ops {
                // Validation ran under this same critical section; a failure
                // here means the engine state is undefined and must not be
                // written to further. Abort per the documented policy.
                if let Err(err) = apply_op(&mut store, &mut indexes, op) {
                    panic!("op failed to apply after durable WAL append: {err}");
                }
            }
        }

        inner.last_tx_id = tx_id;
        debug!(tx_id, ops = ops.len(), "transaction committed");
        Ok(tx_id)
    }

    /// Applies an undo log in reverse build order.
    ///
    /// Undo application is idempotent, so rolling back a transaction whose
    /// forward ops were never applied leaves the store bit-identical.
    pub(crate) fn rollback(&self, store: &RwLock<Store>, indexes: &RwLock<Indexes>, undo: &[Op]) {
        let _inner = self.inner.lock();
        let mut store = store.write();
        let mut indexes = indexes.write();
        for op in undo.iter().rev() {
            apply_undo_op(&mut store, &mut indexes, op);
        }
        debug!(undos = undo.len(), "transaction rolled back");
    }

    /// Dumps the store to a snapshot and truncates the WAL behind it.
    ///
    /// Runs inside the critical section so no commit can interleave
    /// between the dump and the truncation.
    pub(crate) fn snapshot(&self, store: &RwLock<Store>) -> Result<()> {
        let mut inner = self.inner.lock();
        let last_tx_id = inner.last_tx_id;
        {
            let store = store.read();
            snapshot::create(&self.data_dir, &store, last_tx_id)?;
        }
        inner.wal.truncate(last_tx_id)?;
        info!(last_tx_id, "snapshot created, wal truncated");
        Ok(())
    }

    /// Empties the WAL. Test and administrative use.
    pub fn reset_wal(&self) -> Result<()> {
        self.inner.lock().wal.reset()
    }

    /// Current WAL file length in bytes.
    pub fn wal_size(&self) -> Result<u64> {
        self.inner.lock().wal.size()
    }

    /// Data directory this coordinator snapshots into.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

/// Checks that `ops`, applied in order, would succeed against `store`.
///
/// An overlay tracks the transaction's own creations and deletions so an
/// edge may reference a node created earlier in the same batch, and a
/// node deletion sees which incident edges the batch itself removes.
fn validate_ops(store: &Store, indexes: &Indexes, ops: &[Op]) -> Result<()> {
    let mut node_overlay: FxHashMap<NodeId, bool> = FxHashMap::default();
    let mut edge_overlay: FxHashMap<EdgeId, bool> = FxHashMap::default();
    let mut overlay_edge_endpoints: FxHashMap<EdgeId, (NodeId, NodeId)> = FxHashMap::default();

    let node_alive = |overlay: &FxHashMap<NodeId, bool>, id: &str| {
        overlay
            .get(id)
            .copied()
            .unwrap_or_else(|| store.get_node(id).is_some())
    };
    let edge_alive = |overlay: &FxHashMap<EdgeId, bool>, id: &str| {
        overlay
            .get(id)
            .copied()
            .unwrap_or_else(|| store.get_edge(id).is_some())
    };

    for op in ops {
        match op {
            Op::PutNode(node) => {
                node_overlay.insert(node.id.clone(), true);
            }
            Op::DeleteNode(id) => {
                if !node_alive(&node_overlay, id) {
                    return Err(GraphError::not_found("node", id.clone()));
                }
                // Every edge still incident at apply time would dangle.
                for edge_id in indexes
                    .out_edges_of(id)
                    .into_iter()
                    .chain(indexes.in_edges_of(id))
                {
                    if edge_alive(&edge_overlay, &edge_id) {
                        return Err(GraphError::ReferentialIntegrity {
                            edge: edge_id,
                            node: id.clone(),
                        });
                    }
                }
                for (edge_id, (src, dst)) in &overlay_edge_endpoints {
                    if edge_alive(&edge_overlay, edge_id) && (src == id || dst == id) {
                        return Err(GraphError::ReferentialIntegrity {
                            edge: edge_id.clone(),
                            node: id.clone(),
                        });
                    }
                }
                node_overlay.insert(id.clone(), false);
            }
            Op::PutEdge(edge) => {
                for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                    if !node_alive(&node_overlay, endpoint) {
                        return Err(GraphError::ReferentialIntegrity {
                            edge: edge.id.clone(),
                            node: endpoint.clone(),
                        });
                    }
                }
                edge_overlay.insert(edge.id.clone(), true);
                overlay_edge_endpoints.insert(
                    edge.id.clone(),
                    (edge.source_node_id.clone(), edge.target_node_id.clone()),
                );
            }
            Op::DeleteEdge(id) => {
                if !edge_alive(&edge_overlay, id) {
                    return Err(GraphError::not_found("edge", id.clone()));
                }
                edge_overlay.insert(id.clone(), false);
            }
        }
    }
    Ok(())
}

/// Applies one forward op to the store and indexes, strictly.
///
/// Used by commit (pre-validated) and by WAL replay, where any failure is
/// escalated to corruption by the caller.
pub(crate) fn apply_op(store: &mut Store, indexes: &mut Indexes, op: &Op) -> Result<()> {
    match op {
        Op::PutNode(node) => {
            if let Some(old) = store.get_node(&node.id).cloned() {
                indexes.deindex_node(&old);
            }
            indexes.index_node(node);
            store.put_node(node.clone());
        }
        Op::DeleteNode(id) => {
            if !indexes.out_edges_of(id).is_empty() || !indexes.in_edges_of(id).is_empty() {
                return Err(GraphError::Corruption(format!(
                    "node '{id}' deleted while edges remain incident"
                )));
            }
            let node = store
                .delete_node(id)
                .ok_or_else(|| GraphError::not_found("node", id.clone()))?;
            indexes.deindex_node(&node);
        }
        Op::PutEdge(edge) => {
            for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                if store.get_node(endpoint).is_none() {
                    return Err(GraphError::ReferentialIntegrity {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }
            if let Some(old) = store.get_edge(&edge.id).cloned() {
                indexes.deindex_edge(&old);
            }
            indexes.index_edge(edge);
            store.put_edge(edge.clone());
        }
        Op::DeleteEdge(id) => {
            let edge = store
                .delete_edge(id)
                .ok_or_else(|| GraphError::not_found("edge", id.clone()))?;
            indexes.deindex_edge(&edge);
        }
    }
    Ok(())
}

/// Applies one undo op leniently: targets already in the desired state
/// are left alone, so undoing never-applied forwards is a no-op.
pub(crate) fn apply_undo_op(store: &mut Store, indexes: &mut Indexes, op: &Op) {
    match op {
        Op::PutNode(node) => {
            if let Some(old) = store.get_node(&node.id).cloned() {
                indexes.deindex_node(&old);
            }
            indexes.index_node(node);
            store.put_node(node.clone());
        }
        Op::DeleteNode(id) => {
            if let Some(node) = store.delete_node(id) {
                indexes.deindex_node(&node);
            }
        }
        Op::PutEdge(edge) => {
            if let Some(old) = store.get_edge(&edge.id).cloned() {
                indexes.deindex_edge(&old);
            }
            indexes.index_edge(edge);
            store.put_edge(edge.clone());
        }
        Op::DeleteEdge(id) => {
            if let Some(edge) = store.delete_edge(id) {
                indexes.deindex_edge(&edge);
            }
        }
    }
}
