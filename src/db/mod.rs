//! The embedded database facade.
//!
//! [`GraphDB`] wires the store, indexes, WAL, snapshot machinery, and
//! query pipeline together behind a single handle. Startup restores the
//! latest snapshot and replays every newer committed WAL record; at
//! runtime readers share the store through a read-write lock while the
//! coordinator serializes all writers.

mod analytics;
mod traversal;


pub use analytics::GraphStats;

use std::path::PathBuf;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::model::{Edge, Node, PropertyValue};
use crate::query;
use crate::snapshot;
use crate::store::{Indexes, Store};
use crate::tx::{apply_op, Coordinator, Transaction, TxId};
use crate::wal::Wal;

/// An embedded property-graph database rooted at a data directory.
///
/// The data directory path is the only configuration the engine honors;
/// everything else belongs to whatever wraps it.
///
/// # Example
///
/// ```rust,no_run
/// use grafito::{GraphDB, PropertyValue};
/// use std::collections::BTreeMap;
///
/// # fn main() -> grafito::Result<()> {
/// let db = GraphDB::open("graph-data")?;
///
/// let mut tx = db.begin();
/// let mut props = BTreeMap::new();
/// props.insert("name".to_string(), PropertyValue::String("Alice".into()));
/// let alice = tx.create_node(["User"], props)?;
/// tx.commit()?;
///
/// let rows = db.query("MATCH (u:User) RETURN u.name")?;
/// assert_eq!(rows.len(), 1);
/// let node = db.get_node(&alice)?;
/// assert!(node.labels.contains("User"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GraphDB {
    pub(crate) store: RwLock<Store>,
    pub(crate) indexes: RwLock<Indexes>,
    pub(crate) coordinator: Coordinator,
}

impl GraphDB {
    /// Opens the database under `data_dir`, creating the layout if needed.
    ///
    /// Recovery order: load the snapshot pair if present, then replay every
    /// WAL record with a transaction id newer than the snapshot's. A
    /// malformed complete record or a record that no longer applies aborts
    /// startup rather than proceeding with a partial graph.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let mut store = Store::new();
        let mut indexes = Indexes::new();
        let mut last_tx_id: TxId = 0;

        if let Some((data, meta)) = snapshot::load(&data_dir)? {
            for node in data.nodes {
                indexes.index_node(&node);
                store.put_node(node);
            }
            for edge in data.edges {
                for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                    if store.get_node(endpoint).is_none() {
                        return Err(GraphError::Corruption(format!(
                            "snapshot edge '{}' references missing node '{endpoint}'",
                            edge.id
                        )));
                    }
                }
                indexes.index_edge(&edge);
                store.put_edge(edge);
            }
            last_tx_id = meta.last_tx_id;
            info!(
                last_tx_id,
                nodes = store.node_count(),
                edges = store.edge_count(),
                "snapshot restored"
            );
        }

        let mut wal = Wal::open(&data_dir)?;
        let snapshot_tx_id = last_tx_id;
        let replayed = wal.replay(|record| {
            if record.tx_id <= snapshot_tx_id {
                return Ok(());
            }
            for op in &record.ops {
                apply_op(&mut store, &mut indexes, op).map_err(|err| {
                    GraphError::Corruption(format!(
                        "replay of transaction {} failed: {err}",
                        record.tx_id
                    ))
                })?;
            }
            last_tx_id = last_tx_id.max(record.tx_id);
            Ok(())
        })?;
        if replayed > 0 {
            info!(replayed, last_tx_id, "wal replay complete");
        }

        Ok(Self {
            store: RwLock::new(store),
            indexes: RwLock::new(indexes),
            coordinator: Coordinator::new(wal, last_tx_id, data_dir),
        })
    }

    /// Starts a new transaction against this database.
    pub fn begin(&self) -> Transaction<'_> {
        Transaction::new(self)
    }

    /// Id of the most recently committed transaction.
    pub fn last_tx_id(&self) -> TxId {
        self.coordinator.last_tx_id()
    }

    /// Fetches a node by id.
    pub fn get_node(&self, id: &str) -> Result<Node> {
        self.store
            .read()
            .get_node(id)
            .cloned()
            .ok_or_else(|| GraphError::not_found("node", id))
    }

    /// Fetches an edge by id.
    pub fn get_edge(&self, id: &str) -> Result<Edge> {
        self.store
            .read()
            .get_edge(id)
            .cloned()
            .ok_or_else(|| GraphError::not_found("edge", id))
    }

    /// Every live node, in no particular order.
    pub fn all_nodes(&self) -> Vec<Node> {
        self.store.read().all_nodes().cloned().collect()
    }

    /// Every live edge, in no particular order.
    pub fn all_edges(&self) -> Vec<Edge> {
        self.store.read().all_edges().cloned().collect()
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.store.read().node_count()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.store.read().edge_count()
    }

    /// Nodes carrying `label`, via the label index.
    pub fn nodes_by_label(&self, label: &str) -> Vec<Node> {
        let store = self.store.read();
        self.indexes
            .read()
            .nodes_with_label(label)
            .iter()
            .filter_map(|id| store.get_node(id).cloned())
            .collect()
    }

    /// Nodes whose properties contain the exact pair, via the property index.
    pub fn nodes_by_property(&self, key: &str, value: &PropertyValue) -> Vec<Node> {
        let store = self.store.read();
        self.indexes
            .read()
            .nodes_with_property(key, value)
            .iter()
            .filter_map(|id| store.get_node(id).cloned())
            .collect()
    }

    /// Outgoing edges of a node, via the adjacency index.
    pub fn out_edges(&self, node_id: &str) -> Result<Vec<Edge>> {
        let store = self.store.read();
        if store.get_node(node_id).is_none() {
            return Err(GraphError::not_found("node", node_id));
        }
        Ok(self
            .indexes
            .read()
            .out_edges_of(node_id)
            .iter()
            .filter_map(|id| store.get_edge(id).cloned())
            .collect())
    }

    /// Incoming edges of a node, via the adjacency index.
    pub fn in_edges(&self, node_id: &str) -> Result<Vec<Edge>> {
        let store = self.store.read();
        if store.get_node(node_id).is_none() {
            return Err(GraphError::not_found("node", node_id));
        }
        Ok(self
            .indexes
            .read()
            .in_edges_of(node_id)
            .iter()
            .filter_map(|id| store.get_edge(id).cloned())
            .collect())
    }

    /// Runs a read-only pattern query and materializes its rows.
    ///
    /// Queries see only committed data; errors return no partial results.
    pub fn query(&self, text: &str) -> Result<Vec<query::Row>> {
        let store = self.store.read();
        let indexes = self.indexes.read();
        query::run(&store, &indexes, text)
    }

    /// Dumps a snapshot and truncates the WAL behind it.
    pub fn create_snapshot(&self) -> Result<()> {
        self.coordinator.snapshot(&self.store)
    }

    /// Restores in-memory state from the snapshot pair on disk.
    ///
    /// Returns `false` when no snapshot exists. WAL records newer than the
    /// snapshot are not replayed here; [`GraphDB::open`] is the full
    /// recovery path.
    pub fn load_snapshot(&self) -> Result<bool> {
        let Some((data, meta)) = snapshot::load(self.coordinator.data_dir())? else {
            return Ok(false);
        };
        let mut store = self.store.write();
        let mut indexes = self.indexes.write();
        store.clear();
        indexes.clear();
        for node in data.nodes {
            indexes.index_node(&node);
            store.put_node(node);
        }
        for edge in data.edges {
            indexes.index_edge(&edge);
            store.put_edge(edge);
        }
        self.coordinator.set_last_tx_id(meta.last_tx_id);
        debug!(
            last_tx_id = meta.last_tx_id,
            nodes = store.node_count(),
            edges = store.edge_count(),
            "snapshot loaded"
        );
        Ok(true)
    }

    /// Erases all in-memory state, leaving files untouched. Test and
    /// administrative use, pairs with [`GraphDB::reset_wal`].
    pub fn clear_in_memory(&self) {
        self.store.write().clear();
        self.indexes.write().clear();
    }

    /// Empties the WAL file. Test and administrative use.
    pub fn reset_wal(&self) -> Result<()> {
        self.coordinator.reset_wal()
    }

    /// Current WAL file length in bytes.
    pub fn wal_size(&self) -> Result<u64> {
        self.coordinator.wal_size()
    }
}
