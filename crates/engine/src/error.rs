//! Caller-facing failures, each with a stable code.

use symbridge_core::{IndexError, LanguageTag, MutationError, TraversalError};
use thiserror::Error;

use crate::handlers::Capability;

/// No handler could be selected for a request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no {capability} handler for language '{language}' (supported: {})", format_languages(.supported))]
    NoHandler {
        capability: Capability,
        language: LanguageTag,
        supported: Vec<LanguageTag>,
    },

    #[error("{capability} is not available for language '{language}'")]
    UnavailableCapability {
        capability: Capability,
        language: LanguageTag,
    },

    #[error("no refactoring support for language '{language}' (supported: {})", format_languages(.supported))]
    NoRefactoringSupport {
        language: LanguageTag,
        supported: Vec<LanguageTag>,
    },
}

fn format_languages(languages: &[LanguageTag]) -> String {
    if languages.is_empty() {
        return "none".to_string();
    }
    languages
        .iter()
        .map(LanguageTag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    #[error("no element at {file}:{line}:{column}")]
    NoElementAtPosition { file: String, line: u32, column: u32 },

    #[error("could not resolve what '{0}' refers to")]
    UnresolvedReference(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("index is not ready; retry once indexing has finished")]
    IndexNotReady,

    #[error("request cancelled")]
    Cancelled,

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("refactoring conflict: {0}")]
    RefactoringConflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

impl BridgeError {
    /// Stable identifier of the failure, used in responses.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::NoElementAtPosition { .. } => "no-element-at-position",
            BridgeError::UnresolvedReference(_) => "unresolved-reference",
            BridgeError::Dispatch(
                DispatchError::NoHandler { .. } | DispatchError::NoRefactoringSupport { .. },
            ) => "no-handler-for-language",
            BridgeError::Dispatch(DispatchError::UnavailableCapability { .. }) => {
                "unavailable-capability"
            }
            BridgeError::IndexNotReady => "index-not-ready",
            BridgeError::Cancelled => "cancelled",
            BridgeError::SymbolNotFound(_) => "symbol-not-found",
            BridgeError::InvalidRange(_) => "invalid-range",
            BridgeError::InvalidName { .. } => "invalid-name",
            BridgeError::RefactoringConflict(_) => "refactoring-conflict",
            BridgeError::Internal(_) => "internal-error",
        }
    }

    /// Transient failures a caller may resubmit after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::IndexNotReady)
    }
}

impl From<IndexError> for BridgeError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotReady => BridgeError::IndexNotReady,
            IndexError::ElementNotFound(what) => BridgeError::SymbolNotFound(what),
            other => BridgeError::Internal(other.to_string()),
        }
    }
}

impl From<TraversalError> for BridgeError {
    fn from(err: TraversalError) -> Self {
        match err {
            TraversalError::Cancelled => BridgeError::Cancelled,
            TraversalError::NotReady => BridgeError::IndexNotReady,
        }
    }
}

impl From<MutationError> for BridgeError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::SymbolNotFound(what) => BridgeError::SymbolNotFound(what),
            MutationError::InvalidRange(reason) => BridgeError::InvalidRange(reason),
            MutationError::InvalidName { name, reason } => BridgeError::InvalidName { name, reason },
            MutationError::Conflict(reason) => BridgeError::RefactoringConflict(reason),
            MutationError::Cancelled => BridgeError::Cancelled,
            MutationError::NotReady => BridgeError::IndexNotReady,
        }
    }
}

impl From<tokio::task::JoinError> for BridgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        BridgeError::Internal(format!("worker task failed: {err}"))
    }
}
