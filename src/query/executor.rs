//! Plan execution over the live store and indexes.
//!
//! Rows flow through the operator tree as lazy binding streams; only
//! projection and ordering materialize. Execution never mutates state and
//! reads only committed data. A row reflects a state that was valid at
//! some point during execution; nodes that vanish mid-query simply drop
//! out of the stream.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{GraphError, Result};
use crate::model::{Direction, Node, NodeId, PropertyValue};
use crate::query::ast::{CmpOp, Expr, OrderItem, ReturnItem};
use crate::query::plan::{Plan, Predicate};
use crate::store::{Indexes, Store};

/// A single output row keyed by `"var"` or `"var.prop"`.
pub type Row = BTreeMap<String, Value>;

/// Value bound in an output row.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// A whole node, for bare variable projections.
    Node(Node),
    /// A scalar property value.
    Scalar(PropertyValue),
}

/// Variable bindings accumulated while walking a plan.
#[derive(Clone, Debug, Default)]
struct Binding {
    vars: BTreeMap<String, NodeId>,
}

impl Binding {
    fn get(&self, var: &str) -> Option<&NodeId> {
        self.vars.get(var)
    }

    fn insert(&mut self, var: String, node: NodeId) {
        self.vars.insert(var, node);
    }
}

type BindingIter<'g> = Box<dyn Iterator<Item = Result<Binding>> + 'g>;

/// Executes plan trees against a read-locked store and index pair.
pub struct Executor<'g> {
    store: &'g Store,
    indexes: &'g Indexes,
}

impl<'g> Executor<'g> {
    /// Creates an executor over the given store view.
    pub fn new(store: &'g Store, indexes: &'g Indexes) -> Self {
        Self { store, indexes }
    }

    /// Runs a plan to completion and materializes its rows.
    pub fn run(&self, plan: &Plan) -> Result<Vec<Row>> {
        match plan {
            Plan::OrderBy { items, input } => {
                let mut rows = self.run(input)?;
                sort_rows(&mut rows, items)?;
                Ok(rows)
            }
            Plan::Project { items, input } => {
                let bindings = self.eval(input, seed());
                let mut rows = Vec::new();
                for binding in bindings {
                    rows.push(self.project(&binding?, items)?);
                }
                Ok(rows)
            }
            other => {
                // Bare trees (no projection) emit every binding as a node.
                let bindings = self.eval(other, seed());
                let mut rows = Vec::new();
                for binding in bindings {
                    rows.push(self.project_all(&binding?));
                }
                Ok(rows)
            }
        }
    }

    fn eval(&self, plan: &Plan, input: BindingIter<'g>) -> BindingIter<'g> {
        let store = self.store;
        let indexes = self.indexes;
        match plan {
            Plan::Empty => input,
            Plan::NodeScan { var } => {
                let var = var.clone();
                Box::new(input.flat_map(move |binding| -> BindingIter<'g> {
                    let binding = match binding {
                        Ok(binding) => binding,
                        Err(err) => return Box::new(std::iter::once(Err(err))),
                    };
                    if binding.get(&var).is_some() {
                        // Already bound by an earlier pattern: join, not rescan.
                        return Box::new(std::iter::once(Ok(binding)));
                    }
                    let var = var.clone();
                    Box::new(store.all_nodes().map(move |node| {
                        let mut next = binding.clone();
                        next.insert(var.clone(), node.id.clone());
                        Ok(next)
                    }))
                }))
            }
            Plan::LabelScan { label, var } => {
                let var = var.clone();
                let label = label.clone();
                Box::new(input.flat_map(move |binding| -> BindingIter<'g> {
                    let binding = match binding {
                        Ok(binding) => binding,
                        Err(err) => return Box::new(std::iter::once(Err(err))),
                    };
                    if let Some(node_id) = binding.get(&var) {
                        let keep = store
                            .get_node(node_id)
                            .map(|node| node.labels.contains(&label))
                            .unwrap_or(false);
                        return if keep {
                            Box::new(std::iter::once(Ok(binding)))
                        } else {
                            Box::new(std::iter::empty())
                        };
                    }
                    let var = var.clone();
                    Box::new(
                        indexes
                            .nodes_with_label(&label)
                            .into_iter()
                            .map(move |node_id| {
                                let mut next = binding.clone();
                                next.insert(var.clone(), node_id);
                                Ok(next)
                            }),
                    )
                }))
            }
            Plan::Expand {
                from,
                edge_type,
                direction,
                to,
            } => {
                let from = from.clone();
                let edge_type = edge_type.clone();
                let to = to.clone();
                let direction = *direction;
                Box::new(input.flat_map(move |binding| -> BindingIter<'g> {
                    let binding = match binding {
                        Ok(binding) => binding,
                        Err(err) => return Box::new(std::iter::once(Err(err))),
                    };
                    let Some(start) = binding.get(&from).cloned() else {
                        return Box::new(std::iter::empty());
                    };
                    let edge_ids = match direction {
                        Direction::Outgoing => indexes.out_edges_of(&start),
                        Direction::Incoming => indexes.in_edges_of(&start),
                    };
                    let mut results = Vec::new();
                    for edge_id in edge_ids {
                        let Some(edge) = store.get_edge(&edge_id) else {
                            continue;
                        };
                        if edge.type_name != edge_type {
                            continue;
                        }
                        let endpoint = match direction {
                            Direction::Outgoing => edge.target_node_id.clone(),
                            Direction::Incoming => edge.source_node_id.clone(),
                        };
                        match binding.get(&to) {
                            Some(existing) => {
                                if *existing == endpoint {
                                    results.push(Ok(binding.clone()));
                                }
                            }
                            None => {
                                let mut next = binding.clone();
                                next.insert(to.clone(), endpoint);
                                results.push(Ok(next));
                            }
                        }
                    }
                    Box::new(results.into_iter())
                }))
            }
            Plan::Filter { pred, input: inner } => {
                let stream = self.eval(inner, input);
                let pred = pred.clone();
                Box::new(stream.filter_map(move |binding| match binding {
                    Err(err) => Some(Err(err)),
                    Ok(binding) => match eval_predicate(store, &pred, &binding) {
                        Err(err) => Some(Err(err)),
                        Ok(true) => Some(Ok(binding)),
                        Ok(false) => None,
                    },
                }))
            }
            Plan::Pipe { left, right } => {
                let left_rows = self.eval(left, input);
                self.eval(right, left_rows)
            }
            Plan::Project { input: inner, .. } | Plan::OrderBy { input: inner, .. } => {
                self.eval(inner, input)
            }
        }
    }

    fn project(&self, binding: &Binding, items: &[ReturnItem]) -> Result<Row> {
        let mut row = Row::new();
        for item in items {
            match item {
                ReturnItem::Var(var) => {
                    let value = binding
                        .get(var)
                        .and_then(|id| self.store.get_node(id))
                        .cloned()
                        .map(Value::Node)
                        .unwrap_or(Value::Scalar(PropertyValue::Null));
                    row.insert(var.clone(), value);
                }
                ReturnItem::Prop(var, prop) => {
                    let value = binding
                        .get(var)
                        .and_then(|id| self.store.get_node(id))
                        .and_then(|node| node.properties.get(prop))
                        .cloned()
                        .unwrap_or(PropertyValue::Null);
                    row.insert(format!("{var}.{prop}"), Value::Scalar(value));
                }
            }
        }
        Ok(row)
    }

    fn project_all(&self, binding: &Binding) -> Row {
        let mut row = Row::new();
        for (var, node_id) in &binding.vars {
            let value = self
                .store
                .get_node(node_id)
                .cloned()
                .map(Value::Node)
                .unwrap_or(Value::Scalar(PropertyValue::Null));
            row.insert(var.clone(), value);
        }
        row
    }
}

fn seed<'g>() -> BindingIter<'g> {
    Box::new(std::iter::once(Ok(Binding::default())))
}

fn eval_predicate(store: &Store, pred: &Predicate, binding: &Binding) -> Result<bool> {
    match pred {
        Predicate::HasLabel { var, label } => Ok(binding
            .get(var)
            .and_then(|id| store.get_node(id))
            .map(|node| node.labels.contains(label))
            .unwrap_or(false)),
        Predicate::Expr(expr) => eval_expr(store, expr, binding),
    }
}

fn eval_expr(store: &Store, expr: &Expr, binding: &Binding) -> Result<bool> {
    match expr {
        Expr::And(left, right) => {
            Ok(eval_expr(store, left, binding)? && eval_expr(store, right, binding)?)
        }
        Expr::Or(left, right) => {
            Ok(eval_expr(store, left, binding)? || eval_expr(store, right, binding)?)
        }
        Expr::Cmp {
            var,
            prop,
            op,
            value,
        } => {
            let current = binding
                .get(var)
                .and_then(|id| store.get_node(id))
                .and_then(|node| node.properties.get(prop))
                .cloned()
                .unwrap_or(PropertyValue::Null);
            compare(&current, *op, value)
        }
    }
}

/// Applies a comparison operator under the mixed-tag policy: equality
/// against a different tag is false, ordering against a different tag is
/// a type error.
fn compare(left: &PropertyValue, op: CmpOp, right: &PropertyValue) -> Result<bool> {
    let cmp = left.partial_cmp_value(right);
    match op {
        CmpOp::Eq => Ok(cmp == Some(Ordering::Equal)),
        CmpOp::Ne => Ok(matches!(cmp, Some(ord) if ord != Ordering::Equal)),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let Some(ord) = cmp else {
                return Err(GraphError::TypeError(format!(
                    "cannot order {} against {}",
                    tag_name(left),
                    tag_name(right)
                )));
            };
            Ok(match op {
                CmpOp::Lt => ord == Ordering::Less,
                CmpOp::Le => ord != Ordering::Greater,
                CmpOp::Gt => ord == Ordering::Greater,
                CmpOp::Ge => ord != Ordering::Less,
                CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

fn tag_name(value: &PropertyValue) -> &'static str {
    match value {
        PropertyValue::Null => "null",
        PropertyValue::Bool(_) => "boolean",
        PropertyValue::Int(_) => "integer",
        PropertyValue::Float(_) => "float",
        PropertyValue::String(_) => "string",
    }
}

fn sort_key(row: &Row, item: &OrderItem) -> PropertyValue {
    let prop_key = format!("{}.{}", item.var, item.prop);
    if let Some(Value::Scalar(value)) = row.get(&prop_key) {
        return value.clone();
    }
    if let Some(Value::Node(node)) = row.get(&item.var) {
        return node
            .properties
            .get(&item.prop)
            .cloned()
            .unwrap_or(PropertyValue::Null);
    }
    PropertyValue::Null
}

/// Sorts rows by the given keys, ascending by default, nulls first.
/// Mixing non-null tags within one key column is a type error.
fn sort_rows(rows: &mut [Row], items: &[OrderItem]) -> Result<()> {
    for item in items {
        let mut seen: Option<&'static str> = None;
        for row in rows.iter() {
            let value = sort_key(row, item);
            if value.is_null() {
                continue;
            }
            let tag = tag_name(&value);
            match seen {
                None => seen = Some(tag),
                Some(prev) if prev != tag => {
                    return Err(GraphError::TypeError(format!(
                        "ORDER BY {}.{} mixes {prev} and {tag} values",
                        item.var, item.prop
                    )));
                }
                Some(_) => {}
            }
        }
    }

    rows.sort_by(|a, b| {
        for item in items {
            let ka = sort_key(a, item);
            let kb = sort_key(b, item);
            let ord = cmp_nulls_first(&ka, &kb);
            let ord = if item.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn cmp_nulls_first(a: &PropertyValue, b: &PropertyValue) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp_value(b).unwrap_or(Ordering::Equal),
    }
}
