//! Translates the AST into an operator tree.

use std::collections::BTreeSet;

use crate::error::{GraphError, Result};
use crate::query::ast::{CmpOp, Expr, NodePattern, Query, ReturnItem};
use crate::query::plan::{Plan, Predicate};

/// Builds the unoptimized plan for a parsed query.
///
/// Shape: patterns left-folded over `Pipe` starting from `Empty`; a scan
/// per pattern head (label index scan when labeled); inline property maps
/// as equality filters; relations as `Expand` piped after their source;
/// WHERE as an outer filter; projection; then ordering.
pub fn plan(query: &Query) -> Result<Plan> {
    let mut namer = Namer::default();
    let mut bound = BTreeSet::new();

    let mut acc = Plan::Empty;
    for pattern in &query.patterns {
        let mut plan = scan_for(&pattern.start, &mut namer, &mut bound);
        let mut prev_var = last_var(&plan);
        for (rel, node) in &pattern.hops {
            let to_var = node
                .var
                .clone()
                .unwrap_or_else(|| namer.fresh());
            bound.insert(to_var.clone());
            let expand = Plan::Expand {
                from: prev_var.clone(),
                edge_type: rel.edge_type.clone(),
                direction: rel.direction,
                to: to_var.clone(),
            };
            plan = Plan::Pipe {
                left: Box::new(plan),
                right: Box::new(expand),
            };
            plan = constrain(plan, node, &to_var);
            prev_var = to_var;
        }
        acc = Plan::Pipe {
            left: Box::new(acc),
            right: Box::new(plan),
        };
    }

    if let Some(expr) = &query.where_clause {
        check_expr_vars(expr, &bound)?;
        acc = Plan::Filter {
            pred: Predicate::Expr(expr.clone()),
            input: Box::new(acc),
        };
    }

    for item in &query.return_items {
        let var = match item {
            ReturnItem::Var(var) | ReturnItem::Prop(var, _) => var,
        };
        check_var(var, &bound)?;
    }
    acc = Plan::Project {
        items: query.return_items.clone(),
        input: Box::new(acc),
    };

    if !query.order_by.is_empty() {
        for item in &query.order_by {
            check_var(&item.var, &bound)?;
        }
        acc = Plan::OrderBy {
            items: query.order_by.clone(),
            input: Box::new(acc),
        };
    }

    Ok(acc)
}

/// Scan operator for a pattern head plus its inline constraints.
fn scan_for(node: &NodePattern, namer: &mut Namer, bound: &mut BTreeSet<String>) -> Plan {
    let var = node.var.clone().unwrap_or_else(|| namer.fresh());
    bound.insert(var.clone());
    let scan = match &node.label {
        Some(label) => Plan::LabelScan {
            label: label.clone(),
            var: var.clone(),
        },
        None => Plan::NodeScan { var: var.clone() },
    };
    wrap_prop_filters(scan, node, &var)
}

/// Filters a relation target by its label and inline properties.
fn constrain(plan: Plan, node: &NodePattern, var: &str) -> Plan {
    let plan = match &node.label {
        Some(label) => Plan::Filter {
            pred: Predicate::HasLabel {
                var: var.to_string(),
                label: label.clone(),
            },
            input: Box::new(plan),
        },
        None => plan,
    };
    wrap_prop_filters(plan, node, var)
}

fn wrap_prop_filters(mut plan: Plan, node: &NodePattern, var: &str) -> Plan {
    for (key, value) in &node.props {
        plan = Plan::Filter {
            pred: Predicate::Expr(Expr::Cmp {
                var: var.to_string(),
                prop: key.clone(),
                op: CmpOp::Eq,
                value: value.clone(),
            }),
            input: Box::new(plan),
        };
    }
    plan
}

/// The variable most recently introduced by a pattern-local subplan.
fn last_var(plan: &Plan) -> String {
    match plan {
        Plan::NodeScan { var } | Plan::LabelScan { var, .. } => var.clone(),
        Plan::Expand { to, .. } => to.clone(),
        Plan::Filter { input, .. } => last_var(input),
        Plan::Pipe { right, .. } => last_var(right),
        Plan::Empty | Plan::Project { .. } | Plan::OrderBy { .. } => String::new(),
    }
}

fn check_expr_vars(expr: &Expr, bound: &BTreeSet<String>) -> Result<()> {
    match expr {
        Expr::Cmp { var, .. } => check_var(var, bound),
        Expr::And(left, right) | Expr::Or(left, right) => {
            check_expr_vars(left, bound)?;
            check_expr_vars(right, bound)
        }
    }
}

fn check_var(var: &str, bound: &BTreeSet<String>) -> Result<()> {
    if bound.contains(var) {
        Ok(())
    } else {
        Err(GraphError::Parse {
            position: 0,
            message: format!("unknown variable '{var}'"),
        })
    }
}

#[derive(Default)]
struct Namer {
    next: usize,
}

impl Namer {
    /// Names for anonymous pattern nodes; `$` keeps them out of the
    /// user-visible identifier space.
    fn fresh(&mut self) -> String {
        let name = format!("${}", self.next);
        self.next += 1;
        name
    }
}
