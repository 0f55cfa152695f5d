//! Data models for graph entities.
//!
//! This module defines the core data structures used to represent
//! nodes, edges, and their properties in the Grafito graph database.
//!
//! # Key Types
//!
//! - [`Node`] - Represents a graph node with labels and properties
//! - [`Edge`] - Represents a directed edge between nodes
//! - [`PropertyValue`] - Enum for different property value types
//! - [`NodeId`] / [`EdgeId`] - Unique identifiers for nodes and edges
//!
//! # Examples
//!
//! ```rust
//! use grafito::model::{Node, Edge, PropertyValue};
//! use std::collections::BTreeMap;
//!
//! // Create a node with properties
//! let mut properties = BTreeMap::new();
//! properties.insert("name".to_string(), PropertyValue::String("Alice".to_string()));
//!
//! let mut node = Node::new("a1f0".to_string());
//! node.labels.insert("Person".to_string());
//! node.properties = properties;
//!
//! // Create an edge
//! let edge = Edge::new("e1".to_string(), "a1f0".to_string(), "b2c3".to_string(), "KNOWS");
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Unique identifier for nodes in the graph.
///
/// Identifiers are opaque lowercase hex strings issued by [`crate::ident::fresh_id`]
/// and stay stable for the lifetime of the node.
pub type NodeId = String;

/// Unique identifier for edges in the graph.
pub type EdgeId = String;

/// Direction selector for edge traversals.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// Outgoing edges from the source node.
    Outgoing,
    /// Incoming edges to the target node.
    Incoming,
}

/// Represents a property value that can be stored on nodes and edges.
///
/// Property values are tagged so the serialized form stays unambiguous
/// across the WAL and snapshot formats.
///
/// # Examples
///
/// ```rust
/// use grafito::model::PropertyValue;
///
/// let name = PropertyValue::String("Alice".to_string());
/// let age = PropertyValue::Int(30);
/// let active = PropertyValue::Bool(true);
/// let score = PropertyValue::Float(95.5);
/// let missing = PropertyValue::Null;
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum PropertyValue {
    /// Null literal.
    Null,
    /// Boolean value (true/false)
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
}

impl PropertyValue {
    /// Compares two values, defined only for operands of the same tag.
    ///
    /// Mixed-tag pairs return `None`; the query layer maps that to `false`
    /// for equality operators and a type error for ordering operators.
    pub fn partial_cmp_value(&self, other: &PropertyValue) -> Option<Ordering> {
        match (self, other) {
            (PropertyValue::Null, PropertyValue::Null) => Some(Ordering::Equal),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.partial_cmp(b),
            (PropertyValue::Int(a), PropertyValue::Int(b)) => a.partial_cmp(b),
            (PropertyValue::Float(a), PropertyValue::Float(b)) => a.partial_cmp(b),
            (PropertyValue::String(a), PropertyValue::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Returns true when the value is the null literal.
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

/// Represents a node in the graph.
///
/// Nodes are the primary entities in a graph database and can have
/// multiple labels and properties. Nodes are connected by edges.
///
/// # Fields
///
/// * `id` - Unique identifier for the node
/// * `labels` - Set of labels categorizing the node
/// * `properties` - Key-value pairs storing node attributes
///
/// # Examples
///
/// ```rust
/// use grafito::model::{Node, PropertyValue};
///
/// let mut node = Node::new("a1f0".to_string());
/// node.labels.insert("Person".to_string());
/// node.properties.insert("age".to_string(), PropertyValue::Int(30));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Labels that categorize this node
    pub labels: BTreeSet<String>,
    /// Properties as key-value pairs
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    /// Creates a new node with the given ID and no labels or properties.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            labels: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }
}

/// Represents a directed edge connecting two nodes in the graph.
///
/// Edges represent relationships between nodes and carry a single type
/// plus properties. Edges are directed from a source node to a target node
/// and refer to their endpoints by id; they never own them.
///
/// # Examples
///
/// ```rust
/// use grafito::model::{Edge, PropertyValue};
///
/// let mut edge = Edge::new("e7".to_string(), "a1".to_string(), "b2".to_string(), "KNOWS");
/// edge.properties.insert("since".to_string(), PropertyValue::Int(2020));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// ID of the source node
    pub source_node_id: NodeId,
    /// ID of the target node
    pub target_node_id: NodeId,
    /// Type/name of the relationship
    pub type_name: String,
    /// Properties as key-value pairs
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Edge {
    /// Creates a new edge with the given endpoints and relationship type.
    pub fn new(
        id: EdgeId,
        source_node_id: NodeId,
        target_node_id: NodeId,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_node_id,
            target_node_id,
            type_name: type_name.into(),
            properties: BTreeMap::new(),
        }
    }
}
