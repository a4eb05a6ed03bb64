use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to load or compile a scenario into [`crate::Rules`].
#[derive(Error, Debug)]
pub enum RulesError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Scenario JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{context} references unknown {kind} '{id}'")]
    UnknownReference {
        context: String,
        kind: &'static str,
        id: String,
    },
    #[error("Expected exactly two coalitions, found {0}")]
    CoalitionCount(usize),
    #[error("Sea territory {id} is invalid: {reason}")]
    InvalidSea { id: String, reason: &'static str },
    #[error("Unit type {id} is invalid: {reason}")]
    InvalidUnitType { id: String, reason: &'static str },
    #[error("Territory {0} lists itself as a neighbor")]
    SelfAdjacency(String),
    #[error("Turn order is invalid: {0}")]
    TurnOrder(String),
    #[error("Invalid setup: {0}")]
    Setup(String),
    #[error("Invalid victory rule {rule}: {reason}")]
    VictoryRule { rule: String, reason: String },
}
