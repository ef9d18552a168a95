//! Error types for the index boundary, hierarchy traversal and mutations.

use thiserror::Error;

use crate::model::{ElementKey, SourceLocation};

/// Failure reported by a [`SemanticIndex`](crate::index::SemanticIndex) call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("index is not ready")]
    NotReady,

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("search not supported by the index: {0}")]
    Unsupported(String),

    #[error("stale edit at {location}: expected `{expected}`, found `{found}`")]
    StaleEdit {
        location: SourceLocation,
        expected: String,
        found: String,
    },

    #[error("index was modified since the change set was computed (expected stamp {expected}, found {found})")]
    ConcurrentModification { expected: u64, found: u64 },

    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("index failure: {0}")]
    Internal(String),
}

pub type IndexResult<T> = Result<T, IndexError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TraversalError {
    #[error("traversal cancelled")]
    Cancelled,

    #[error("index is not ready")]
    NotReady,
}

pub type TraversalResult<T> = Result<T, TraversalError>;

/// Failure of a rename, safe-delete or extract operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("refactoring conflict: {0}")]
    Conflict(String),

    #[error("operation cancelled before any change was applied")]
    Cancelled,

    #[error("index is not ready")]
    NotReady,
}

pub type MutationResult<T> = Result<T, MutationError>;

impl MutationError {
    pub fn not_found(key: &ElementKey) -> Self {
        MutationError::SymbolNotFound(key.to_string())
    }
}

impl From<IndexError> for MutationError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotReady => MutationError::NotReady,
            IndexError::ElementNotFound(what) => MutationError::SymbolNotFound(what),
            other => MutationError::Conflict(other.to_string()),
        }
    }
}

impl From<TraversalError> for MutationError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::Cancelled => MutationError::Cancelled,
            TraversalError::NotReady => MutationError::NotReady,
        }
    }
}
