#![allow(missing_docs)]

//! WAL durability: record round-trips across restart, tolerance of a
//! truncated tail, and rejection of corrupt complete records.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;

use grafito::wal::{LogRecord, Wal};
use grafito::{GraphDB, Node, PropertyValue};
use tempfile::tempdir;

fn record(tx_id: u64) -> LogRecord {
    LogRecord {
        tx_id,
        timestamp: 1_700_000_000 + tx_id as i64,
        ops: vec![grafito::tx::Op::PutNode(Node::new(format!("node-{tx_id}")))],
    }
}

#[test]
fn records_survive_reopen_in_order() {
    let dir = tempdir().unwrap();
    {
        let mut wal = Wal::open(dir.path()).unwrap();
        for tx_id in 1..=3 {
            wal.append(&record(tx_id)).unwrap();
        }
    }

    let mut wal = Wal::open(dir.path()).unwrap();
    let replayed = wal.read_all().unwrap();
    assert_eq!(replayed, vec![record(1), record(2), record(3)]);
}

#[test]
fn truncated_tail_is_silently_dropped() {
    let dir = tempdir().unwrap();
    let wal_path = dir.path().join("wal").join("wal.log");
    {
        let mut wal = Wal::open(dir.path()).unwrap();
        for tx_id in 1..=3 {
            wal.append(&record(tx_id)).unwrap();
        }
    }

    // Chop the last 3 bytes, leaving record 3 incomplete.
    let len = std::fs::metadata(&wal_path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 3).unwrap();

    let mut wal = Wal::open(dir.path()).unwrap();
    let replayed = wal.read_all().unwrap();
    assert_eq!(replayed, vec![record(1), record(2)]);
}

#[test]
fn engine_restart_ignores_torn_final_commit() {
    let dir = tempdir().unwrap();
    {
        let db = GraphDB::open(dir.path()).unwrap();
        for name in ["Alice", "Bob"] {
            let mut tx = db.begin();
            let mut props = BTreeMap::new();
            props.insert("name".to_string(), PropertyValue::String(name.into()));
            tx.create_node(["User"], props).unwrap();
            tx.commit().unwrap();
        }
    }

    // Simulate a crash mid-append of a third transaction.
    let wal_path = dir.path().join("wal").join("wal.log");
    let len = std::fs::metadata(&wal_path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 5).unwrap();

    let db = GraphDB::open(dir.path()).unwrap();
    assert_eq!(db.node_count(), 1);
    assert_eq!(db.last_tx_id(), 1);
}

#[test]
fn corrupt_complete_record_aborts_startup() {
    let dir = tempdir().unwrap();
    {
        let db = GraphDB::open(dir.path()).unwrap();
        let mut tx = db.begin();
        tx.create_node(["User"], BTreeMap::new()).unwrap();
        tx.commit().unwrap();
    }

    // Append a well-framed record whose payload is garbage.
    let wal_path = dir.path().join("wal").join("wal.log");
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    let garbage = b"{\"broken";
    file.write_all(&(garbage.len() as u32).to_be_bytes()).unwrap();
    file.write_all(garbage).unwrap();
    drop(file);

    let err = GraphDB::open(dir.path()).unwrap_err();
    assert!(matches!(err, grafito::GraphError::Corruption(_)));
}

#[test]
fn replay_applies_only_records_newer_than_snapshot() {
    let dir = tempdir().unwrap();
    {
        let db = GraphDB::open(dir.path()).unwrap();
        for _ in 0..3 {
            let mut tx = db.begin();
            tx.create_node(["User"], BTreeMap::new()).unwrap();
            tx.commit().unwrap();
        }
        db.create_snapshot().unwrap();
        // Two more commits after the snapshot.
        for _ in 0..2 {
            let mut tx = db.begin();
            tx.create_node(["User"], BTreeMap::new()).unwrap();
            tx.commit().unwrap();
        }
    }

    let db = GraphDB::open(dir.path()).unwrap();
    assert_eq!(db.node_count(), 5);
    assert_eq!(db.last_tx_id(), 5);
}

#[test]
fn reset_empties_the_log_file() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    let mut tx = db.begin();
    tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.commit().unwrap();
    assert!(db.wal_size().unwrap() > 0);

    db.reset_wal().unwrap();
    assert_eq!(db.wal_size().unwrap(), 0);
}
