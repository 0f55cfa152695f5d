#![allow(missing_docs)]

//! Transaction engine behavior: commit visibility, rollback, and the
//! referential-integrity gate at commit time.

use std::collections::BTreeMap;

use grafito::{GraphDB, GraphError, NodeChanges, PropertyValue};
use tempfile::tempdir;

fn props(entries: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

#[test]
fn create_two_users_in_one_transaction() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let mut tx = db.begin();
    tx.create_node(
        ["User"],
        props(&[
            ("name", PropertyValue::String("Alice".into())),
            ("age", PropertyValue::Int(30)),
        ]),
    )
    .unwrap();
    tx.create_node(
        ["User"],
        props(&[
            ("name", PropertyValue::String("Bob".into())),
            ("age", PropertyValue::Int(25)),
        ]),
    )
    .unwrap();
    let tx_id = tx.commit().unwrap();
    assert_eq!(tx_id, 1);

    let mut names: Vec<String> = db
        .nodes_by_label("User")
        .into_iter()
        .map(|node| match &node.properties["name"] {
            PropertyValue::String(name) => name.clone(),
            other => panic!("unexpected name value {other:?}"),
        })
        .collect();
    names.sort();
    assert_eq!(names, vec!["Alice".to_string(), "Bob".to_string()]);
}

#[test]
fn node_and_edge_creation_in_one_transaction() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    // The edge references nodes created earlier in the same transaction;
    // integrity is checked at apply time, not build time.
    let mut tx = db.begin();
    let alice = tx.create_node(["User"], BTreeMap::new()).unwrap();
    let bob = tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.create_edge("FRIEND", alice.clone(), bob.clone(), BTreeMap::new())
        .unwrap();
    tx.commit().unwrap();

    assert_eq!(db.node_count(), 2);
    assert_eq!(db.edge_count(), 1);
    assert_eq!(db.neighbors(&alice).unwrap(), vec![bob]);
}

#[test]
fn rollback_of_update_keeps_original_value() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let mut tx = db.begin();
    let n1 = tx
        .create_node(["User"], props(&[("age", PropertyValue::Int(30))]))
        .unwrap();
    tx.commit().unwrap();

    let mut t2 = db.begin();
    t2.update_node(
        &n1,
        NodeChanges::new().properties(props(&[("age", PropertyValue::Int(99))])),
    )
    .unwrap();
    t2.rollback().unwrap();

    assert_eq!(
        db.get_node(&n1).unwrap().properties["age"],
        PropertyValue::Int(30)
    );
}

#[test]
fn rollback_writes_no_wal_record() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let before = db.wal_size().unwrap();
    let mut tx = db.begin();
    tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.rollback().unwrap();

    assert_eq!(db.wal_size().unwrap(), before);
    assert_eq!(db.node_count(), 0);
}

#[test]
fn abandoned_transactions_have_no_effect() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    {
        let mut tx = db.begin();
        tx.create_node(["User"], BTreeMap::new()).unwrap();
        // Dropped without commit or rollback.
    }
    assert_eq!(db.node_count(), 0);
    assert_eq!(db.last_tx_id(), 0);
}

#[test]
fn commit_failure_leaves_store_and_wal_untouched() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let mut tx = db.begin();
    let alice = tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.commit().unwrap();

    let wal_before = db.wal_size().unwrap();
    let mut tx = db.begin();
    tx.create_edge("FRIEND", alice, "nonexistent".to_string(), BTreeMap::new())
        .unwrap();
    let err = tx.commit().unwrap_err();
    assert!(matches!(err, GraphError::ReferentialIntegrity { .. }));

    assert_eq!(db.wal_size().unwrap(), wal_before);
    assert_eq!(db.node_count(), 1);
    assert_eq!(db.edge_count(), 0);
    assert_eq!(db.last_tx_id(), 1);
}

#[test]
fn deleting_a_node_rolls_back_with_its_edges() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    let mut tx = db.begin();
    let alice = tx.create_node(["User"], BTreeMap::new()).unwrap();
    let bob = tx.create_node(["User"], BTreeMap::new()).unwrap();
    tx.create_edge("FRIEND", alice.clone(), bob.clone(), BTreeMap::new())
        .unwrap();
    tx.create_edge("FRIEND", bob.clone(), alice.clone(), BTreeMap::new())
        .unwrap();
    tx.commit().unwrap();

    let mut tx = db.begin();
    tx.delete_node(&alice).unwrap();
    tx.rollback().unwrap();

    // The node and both incident edges survive the abandoned delete.
    assert!(db.get_node(&alice).is_ok());
    assert_eq!(db.edge_count(), 2);
    assert_eq!(db.out_edges(&alice).unwrap().len(), 1);
    assert_eq!(db.in_edges(&alice).unwrap().len(), 1);
}

#[test]
fn tx_ids_increase_in_commit_order() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    for expected in 1..=5u64 {
        let mut tx = db.begin();
        tx.create_node(["User"], BTreeMap::new()).unwrap();
        assert_eq!(tx.commit().unwrap(), expected);
    }
    assert_eq!(db.last_tx_id(), 5);
}
