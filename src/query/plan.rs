//! Executable plan operators.
//!
//! The operator set is closed: the executor switches on the kind, and the
//! optimizer rewrites trees structurally. `Pipe` feeds each row of its
//! left subplan through its right subplan; `Empty` is the fold seed that
//! emits a single empty row and disappears during optimization.

use crate::model::Direction;
use crate::query::ast::{Expr, OrderItem, ReturnItem};

/// A node in the plan tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Plan {
    /// Identity operator: passes rows through unchanged.
    Empty,
    /// One row per live node, bound as `var`.
    NodeScan {
        /// Variable to bind each node to.
        var: String,
    },
    /// One row per node carrying `label`, via the label index.
    LabelScan {
        /// Label looked up in the index.
        label: String,
        /// Variable to bind each node to.
        var: String,
    },
    /// For each input row, follow edges of `from` and bind reachable
    /// endpoints as `to`.
    Expand {
        /// Already-bound variable supplying the start node.
        from: String,
        /// Edge type to follow.
        edge_type: String,
        /// Whether to follow outgoing or incoming edges.
        direction: Direction,
        /// Variable the reached endpoint binds to.
        to: String,
    },
    /// Keeps rows satisfying a predicate.
    Filter {
        /// Predicate evaluated per row.
        pred: Predicate,
        /// Rows to filter.
        input: Box<Plan>,
    },
    /// Runs `right` once per row produced by `left`.
    Pipe {
        /// Producer subplan.
        left: Box<Plan>,
        /// Consumer subplan.
        right: Box<Plan>,
    },
    /// Maps binding rows to output rows.
    Project {
        /// Output columns.
        items: Vec<ReturnItem>,
        /// Rows to project.
        input: Box<Plan>,
    },
    /// Materializes and sorts projected rows.
    OrderBy {
        /// Sort keys, left to right.
        items: Vec<OrderItem>,
        /// Rows to sort.
        input: Box<Plan>,
    },
}

/// Filter predicate: a boolean expression or a label membership check.
#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Property comparison tree from the WHERE clause or inline maps.
    Expr(Expr),
    /// Node bound to `var` carries `label`.
    HasLabel {
        /// Variable holding the node.
        var: String,
        /// Required label.
        label: String,
    },
}

impl Plan {
    /// Variables bound in rows this subplan emits.
    pub fn bound_vars(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Plan::Empty => {}
            Plan::NodeScan { var } | Plan::LabelScan { var, .. } => {
                out.insert(var.clone());
            }
            Plan::Expand { to, .. } => {
                out.insert(to.clone());
            }
            Plan::Filter { input, .. }
            | Plan::Project { input, .. }
            | Plan::OrderBy { input, .. } => input.bound_vars(out),
            Plan::Pipe { left, right } => {
                left.bound_vars(out);
                right.bound_vars(out);
            }
        }
    }
}

impl Predicate {
    /// Variables the predicate reads.
    pub fn free_vars(&self, out: &mut std::collections::BTreeSet<String>) {
        match self {
            Predicate::HasLabel { var, .. } => {
                out.insert(var.clone());
            }
            Predicate::Expr(expr) => collect_expr_vars(expr, out),
        }
    }
}

fn collect_expr_vars(expr: &Expr, out: &mut std::collections::BTreeSet<String>) {
    match expr {
        Expr::Cmp { var, .. } => {
            out.insert(var.clone());
        }
        Expr::And(left, right) | Expr::Or(left, right) => {
            collect_expr_vars(left, out);
            collect_expr_vars(right, out);
        }
    }
}
