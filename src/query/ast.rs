//! Abstract syntax tree produced by the parser.

use crate::model::{Direction, PropertyValue};

/// A parsed query: patterns, optional filter, projection, optional sort.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    /// Comma-separated match patterns.
    pub patterns: Vec<Pattern>,
    /// Optional WHERE expression.
    pub where_clause: Option<Expr>,
    /// RETURN items, at least one.
    pub return_items: Vec<ReturnItem>,
    /// ORDER BY items, possibly empty.
    pub order_by: Vec<OrderItem>,
}

/// A node pattern optionally extended by relation hops.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    /// The leading node.
    pub start: NodePattern,
    /// Relation-node continuations, left to right.
    pub hops: Vec<(RelPattern, NodePattern)>,
}

/// `( var? (: label)? ({ key: value, ... })? )`
#[derive(Clone, Debug, PartialEq)]
pub struct NodePattern {
    /// Variable binding, absent for anonymous nodes.
    pub var: Option<String>,
    /// Label constraint.
    pub label: Option<String>,
    /// Inline property equality constraints.
    pub props: Vec<(String, PropertyValue)>,
}

/// `-[:TYPE]->` or `<-[:TYPE]-`
#[derive(Clone, Debug, PartialEq)]
pub struct RelPattern {
    /// The edge type to follow.
    pub edge_type: String,
    /// Outgoing for `-[:T]->`, incoming for `<-[:T]-`.
    pub direction: Direction,
}

/// Boolean filter expression; AND/OR fold left over comparisons.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// `var.prop op value`
    Cmp {
        /// Variable holding the node.
        var: String,
        /// Property name on the node.
        prop: String,
        /// Comparison operator.
        op: CmpOp,
        /// Literal operand.
        value: PropertyValue,
    },
    /// Conjunction, short-circuiting.
    And(Box<Expr>, Box<Expr>),
    /// Disjunction, short-circuiting.
    Or(Box<Expr>, Box<Expr>),
}

/// Comparison operators allowed in expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A projected output column.
#[derive(Clone, Debug, PartialEq)]
pub enum ReturnItem {
    /// Whole bound value, keyed by the variable name.
    Var(String),
    /// Scalar property, keyed `"var.prop"`.
    Prop(String, String),
}

/// One ORDER BY key; ascending unless marked descending.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderItem {
    /// Variable holding the node.
    pub var: String,
    /// Property sorted on.
    pub prop: String,
    /// True for `DESC`.
    pub descending: bool,
}
