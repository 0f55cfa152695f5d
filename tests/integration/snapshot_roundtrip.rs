#![allow(missing_docs)]

//! Snapshot create/load round-trips and WAL truncation behind them.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use grafito::{GraphDB, PropertyValue};
use tempfile::tempdir;

#[test]
fn snapshot_then_clear_then_load_restores_everything() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    for i in 0..10 {
        let mut tx = db.begin();
        let mut props = BTreeMap::new();
        props.insert("n".to_string(), PropertyValue::Int(i));
        tx.create_node(["Item"], props).unwrap();
        tx.commit().unwrap();
    }

    db.create_snapshot().unwrap();
    db.clear_in_memory();
    assert_eq!(db.node_count(), 0);

    assert!(db.load_snapshot().unwrap());
    assert_eq!(db.all_nodes().len(), 10);
    assert_eq!(db.last_tx_id(), 10);
    // Everything up to the snapshot left the log.
    assert_eq!(db.wal_size().unwrap(), 0);
}

#[test]
fn snapshot_preserves_contents_as_multisets() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let mut tx = db.begin();
    let a = tx.create_node(["User"], BTreeMap::new()).unwrap();
    let b = tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.create_edge("KNOWS", a.clone(), b.clone(), BTreeMap::new())
        .unwrap();
    tx.create_edge("KNOWS", b, a, BTreeMap::new()).unwrap();
    tx.commit().unwrap();

    let nodes_before: BTreeSet<String> =
        db.all_nodes().into_iter().map(|node| node.id).collect();
    let edges_before: BTreeSet<String> =
        db.all_edges().into_iter().map(|edge| edge.id).collect();

    db.create_snapshot().unwrap();
    db.clear_in_memory();
    assert!(db.load_snapshot().unwrap());

    let nodes_after: BTreeSet<String> =
        db.all_nodes().into_iter().map(|node| node.id).collect();
    let edges_after: BTreeSet<String> =
        db.all_edges().into_iter().map(|edge| edge.id).collect();
    assert_eq!(nodes_before, nodes_after);
    assert_eq!(edges_before, edges_after);
}

#[test]
fn load_snapshot_reports_absence() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    assert!(!db.load_snapshot().unwrap());
}

#[test]
fn restart_after_snapshot_needs_no_wal() {
    let dir = tempdir().unwrap();
    {
        let db = GraphDB::open(dir.path()).unwrap();
        for _ in 0..4 {
            let mut tx = db.begin();
            tx.create_node(["Item"], BTreeMap::new()).unwrap();
            tx.commit().unwrap();
        }
        db.create_snapshot().unwrap();
    }

    let db = GraphDB::open(dir.path()).unwrap();
    assert_eq!(db.node_count(), 4);
    assert_eq!(db.last_tx_id(), 4);

    // New commits resume the id sequence past the snapshot.
    let mut tx = db.begin();
    tx.create_node(["Item"], BTreeMap::new()).unwrap();
    assert_eq!(tx.commit().unwrap(), 5);
}

#[test]
fn indexes_rebuild_from_snapshot() {
    let dir = tempdir().unwrap();
    {
        let db = GraphDB::open(dir.path()).unwrap();
        let mut tx = db.begin();
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), PropertyValue::String("Alice".into()));
        let alice = tx.create_node(["User"], props).unwrap();
        let bob = tx.create_node(["User"], BTreeMap::new()).unwrap();
        tx.create_edge("FRIEND", alice, bob, BTreeMap::new()).unwrap();
        tx.commit().unwrap();
        db.create_snapshot().unwrap();
    }

    let db = GraphDB::open(dir.path()).unwrap();
    assert_eq!(db.nodes_by_label("User").len(), 2);
    assert_eq!(
        db.nodes_by_property("name", &PropertyValue::String("Alice".into()))
            .len(),
        1
    );
    let rows = db
        .query("MATCH (a:User)-[:FRIEND]->(b) RETURN a.name")
        .unwrap();
    assert_eq!(rows.len(), 1);
}
