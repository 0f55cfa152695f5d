//! The read-only pattern query pipeline.
//!
//! A query runs through five stages: [`lexer`] tokenizes the text,
//! [`parser`] builds the AST, [`planner`] lowers it to an operator tree,
//! [`optimizer`] rewrites the tree structurally, and [`executor`] streams
//! rows off the live graph.
//!
//! The language is a small Cypher-inspired subset:
//!
//! ```text
//! MATCH (u:User)-[:FRIEND]->(f)
//! WHERE f.age >= 20
//! RETURN f.name, f.age
//! ORDER BY f.age DESC
//! ```

pub mod ast;
pub mod executor;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod plan;
pub mod planner;

pub use executor::{Executor, Row, Value};

use crate::error::Result;
use crate::store::{Indexes, Store};

/// Runs a query text through the full pipeline against a store view.
pub fn run(store: &Store, indexes: &Indexes, text: &str) -> Result<Vec<Row>> {
    let tokens = lexer::tokenize(text)?;
    let query = parser::parse(&tokens)?;
    let plan = planner::plan(&query)?;
    let plan = optimizer::optimize(plan);
    Executor::new(store, indexes).run(&plan)
}
