#![allow(missing_docs)]

//! End-to-end query scenarios over a live engine.

use std::collections::BTreeMap;

use grafito::{GraphDB, GraphError, PropertyValue, Row, Value};
use tempfile::tempdir;

fn props(entries: &[(&str, PropertyValue)]) -> BTreeMap<String, PropertyValue> {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

fn user(db: &GraphDB, name: &str, age: i64) -> String {
    let mut tx = db.begin();
    let id = tx
        .create_node(
            ["User"],
            props(&[
                ("name", PropertyValue::String(name.into())),
                ("age", PropertyValue::Int(age)),
            ]),
        )
        .unwrap();
    tx.commit().unwrap();
    id
}

fn scalar_rows(rows: &[Row], key: &str) -> Vec<PropertyValue> {
    rows.iter()
        .map(|row| match row.get(key).expect("column present") {
            Value::Scalar(value) => value.clone(),
            Value::Node(node) => panic!("expected scalar, got node {}", node.id),
        })
        .collect()
}

#[test]
fn match_users_returns_their_names() {
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
    tx.commit().unwrap();

    let rows = db.query("MATCH (u:User) RETURN u.name").unwrap();
    let mut names = scalar_rows(&rows, "u.name");
    names.sort_by(|a, b| a.partial_cmp_value(b).unwrap());
    assert_eq!(
        names,
        vec![
            PropertyValue::String("Alice".into()),
            PropertyValue::String("Bob".into())
        ]
    );
}

#[test]
fn friend_edge_joins_both_names() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    let alice = user(&db, "Alice", 30);
    let bob = user(&db, "Bob", 25);

    let mut tx = db.begin();
    tx.create_edge("FRIEND", alice, bob, BTreeMap::new()).unwrap();
    tx.commit().unwrap();

    let rows = db
        .query("MATCH (a:User)-[:FRIEND]->(b) RETURN a.name, b.name")
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("a.name"),
        Some(&Value::Scalar(PropertyValue::String("Alice".into())))
    );
    assert_eq!(
        rows[0].get("b.name"),
        Some(&Value::Scalar(PropertyValue::String("Bob".into())))
    );
}

#[test]
fn filtered_expansion_orders_descending() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    let root = user(&db, "Root", 40);
    for (name, age) in [("A", 19), ("B", 20), ("C", 25)] {
        let friend = user(&db, name, age);
        let mut tx = db.begin();
        tx.create_edge("FRIEND", root.clone(), friend, BTreeMap::new())
            .unwrap();
        tx.commit().unwrap();
    }

    let rows = db
        .query("MATCH (u:User)-[:FRIEND]->(f) WHERE f.age >= 20 RETURN f.age ORDER BY f.age DESC")
        .unwrap();
    assert_eq!(
        scalar_rows(&rows, "f.age"),
        vec![PropertyValue::Int(25), PropertyValue::Int(20)]
    );
}

#[test]
fn empty_graph_matches_nothing() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    assert!(db.all_nodes().is_empty());
    assert!(db.nodes_by_label("User").is_empty());
    assert!(db.query("MATCH (n) RETURN n").unwrap().is_empty());
    assert!(db.query("MATCH (n:User) RETURN n").unwrap().is_empty());
}

#[test]
fn inline_property_map_narrows_matches() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    user(&db, "Alice", 30);
    user(&db, "Bob", 25);

    let rows = db
        .query("MATCH (u:User {name: \"Alice\", age: 30}) RETURN u.age")
        .unwrap();
    assert_eq!(scalar_rows(&rows, "u.age"), vec![PropertyValue::Int(30)]);

    // An empty map constrains nothing.
    let rows = db.query("MATCH (u:User {}) RETURN u").unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn self_loop_matches_in_both_directions() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    let alice = user(&db, "Alice", 30);

    let mut tx = db.begin();
    tx.create_edge("LIKES", alice.clone(), alice, BTreeMap::new())
        .unwrap();
    tx.commit().unwrap();

    let out = db
        .query("MATCH (a:User)-[:LIKES]->(b) RETURN b.name")
        .unwrap();
    let inbound = db
        .query("MATCH (a:User)<-[:LIKES]-(b) RETURN b.name")
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(inbound.len(), 1);
}

#[test]
fn query_determinism_across_runs() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    let root = user(&db, "Root", 40);
    for (name, age) in [("A", 19), ("B", 20), ("C", 25), ("D", 31)] {
        let friend = user(&db, name, age);
        let mut tx = db.begin();
        tx.create_edge("FRIEND", root.clone(), friend, BTreeMap::new())
            .unwrap();
        tx.commit().unwrap();
    }

    let text = "MATCH (u:User)-[:FRIEND]->(f) WHERE f.age > 19 RETURN f.name ORDER BY f.name";
    let first = db.query(text).unwrap();
    let second = db.query(text).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
}

#[test]
fn parse_errors_carry_positions() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();

    match db.query("MATCH (u RETURN u") {
        Err(GraphError::Parse { position, message }) => {
            assert!(position > 0);
            assert!(message.contains("expected"), "{message}");
        }
        other => panic!("expected parse error, got {other:?}"),
    }

    assert!(db.query("MATCH (u) WHERE RETURN u").is_err());
    assert!(db.query("MATCH (u) RETURN unknown_var").is_err());
}

#[test]
fn queries_see_only_committed_data() {
    let dir = tempdir().unwrap();
    let db = GraphDB::open(dir.path()).unwrap();
    user(&db, "Alice", 30);

    let mut tx = db.begin();
    tx.create_node(
        ["User"],
        props(&[("name", PropertyValue::String("Phantom".into()))]),
    )
    .unwrap();

    // The open transaction's node is invisible until commit.
    assert_eq!(db.query("MATCH (u:User) RETURN u.name").unwrap().len(), 1);
    tx.commit().unwrap();
    assert_eq!(db.query("MATCH (u:User) RETURN u.name").unwrap().len(), 2);
}
