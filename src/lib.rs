//! # Grafito - Embedded Property-Graph Database
//!
//! Grafito is an embedded graph database written in Rust with ACID
//! transactions, WAL-based durability, snapshotting, and a small
//! pattern-matching query language.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grafito::{GraphDB, PropertyValue};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> grafito::Result<()> {
//! // Open a database rooted at a data directory (created if absent)
//! let db = GraphDB::open("my-graph")?;
//!
//! // Start a transaction and buffer some operations
//! let mut tx = db.begin();
//! let mut props = BTreeMap::new();
//! props.insert("name".to_string(), PropertyValue::String("Alice".into()));
//! let alice = tx.create_node(["User"], props)?;
//!
//! let mut props = BTreeMap::new();
//! props.insert("name".to_string(), PropertyValue::String("Bob".into()));
//! let bob = tx.create_node(["User"], props)?;
//!
//! tx.create_edge("KNOWS", alice.clone(), bob, BTreeMap::new())?;
//!
//! // Commit: one durable WAL record, then the ops apply
//! tx.commit()?;
//!
//! // Pattern queries over the live graph
//! let rows = db.query("MATCH (a:User)-[:KNOWS]->(b) RETURN a.name, b.name")?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Store**: in-memory primary tables, id to node and id to edge
//! - **Indexes**: out-edges, in-edges, label, and property secondaries
//! - **WAL**: append-only durable log of committed transactions
//! - **Snapshot**: atomic dump/load of the whole graph plus the last
//!   committed transaction id
//! - **Transactions**: operation buffering with undo logs, serialized
//!   commit through a single coordinator
//! - **Query pipeline**: lexer, parser, planner, optimizer, and a lazy
//!   streaming executor
//!
//! On startup the engine restores the latest snapshot and replays every
//! newer committed WAL record; everything after that happens in memory
//! with the WAL as the durability boundary.

pub mod db;
pub mod error;
pub mod ident;
pub mod logging;
pub mod model;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod tx;
pub mod wal;

// Re-export the main public API
pub use crate::db::{GraphDB, GraphStats};
pub use crate::error::{GraphError, Result};
pub use crate::model::{Direction, Edge, EdgeId, Node, NodeId, PropertyValue};
pub use crate::query::{Row, Value};
pub use crate::tx::{NodeChanges, Transaction, TxId, TxState};
