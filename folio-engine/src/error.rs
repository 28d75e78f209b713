//! Error types for folio-engine
//!
//! Failures are contained at field or record granularity:
//! - `StrategyError`: one field could not be computed; the field degrades to ""
//! - `EngineError::PoolExhausted`: the record is skipped, the batch continues
//! - validation failures and unrecoverable fields are data (diagnostics and
//!   report statuses), never errors

use crate::pool::IdentifierStatus;
use thiserror::Error;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// No AVAILABLE identifier is left in the pool
    #[error("Identifier pool exhausted: no available identifier for book '{book_id}'")]
    PoolExhausted { book_id: String },

    /// Identifier is not in the pool
    #[error("Identifier not found in pool: {0}")]
    IdentifierNotFound(String),

    /// Lifecycle transition not permitted from the current status
    #[error("Identifier {identifier} cannot move from {from} to {to}")]
    InvalidTransition {
        identifier: String,
        from: IdentifierStatus,
        to: IdentifierStatus,
    },

    /// Identifier already belongs to another book
    #[error("Identifier {identifier} is already owned by book '{owner}'")]
    AlreadyOwned { identifier: String, owner: String },

    /// Book already holds a different identifier
    #[error("Book '{book_id}' already holds identifier {identifier}")]
    BookAlreadyAssigned { book_id: String, identifier: String },

    /// Identifier has the wrong length or check digit
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A blocking worker panicked or was cancelled
    #[error("Worker failed: {0}")]
    Worker(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV write error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// folio-common error
    #[error("Common error: {0}")]
    Common(#[from] folio_common::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// A computed strategy failed for one field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    /// Input present but unparseable
    #[error("Cannot parse '{value}' as {expected}")]
    Parse { value: String, expected: &'static str },

    /// Input refers to an unknown lookup entry
    #[error("Unknown {table} entry: {key}")]
    UnknownLookup { table: &'static str, key: String },

    /// Any other evaluation failure
    #[error("Strategy evaluation failed: {0}")]
    Evaluation(String),
}

impl StrategyError {
    pub fn parse(value: impl Into<String>, expected: &'static str) -> Self {
        StrategyError::Parse {
            value: value.into(),
            expected,
        }
    }
}
