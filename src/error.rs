use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("corruption detected: {0}")]
    Corruption(String),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("edge '{edge}' references missing node '{node}'")]
    ReferentialIntegrity { edge: String, node: String },
    #[error("transaction is {actual}, expected open")]
    InvalidTransactionState { actual: &'static str },
    #[error("parse error at position {position}: {message}")]
    Parse { position: usize, message: String },
    #[error("type error: {0}")]
    TypeError(String),
    #[error("durability failure: {0}")]
    Durability(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("unsupported format version {found}, engine supports up to {supported}")]
    VersionMismatch { found: u16, supported: u16 },
}

impl GraphError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind,
            id: id.into(),
        }
    }
}
