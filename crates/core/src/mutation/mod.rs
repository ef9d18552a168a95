//! Two-phase refactorings: rename, safe-delete, extract variable and extract method.
//!
//! Every operation is split into a `prepare_*` function (Phase 1: read-only,
//! cancellable, never takes the writer lock) and an `apply_*` function
//! (Phase 2: one exclusive index transaction applying precomputed edits).

mod change_set;
mod conventions;
mod extract;
mod rename;
mod safe_delete;

pub use change_set::{ChangeSet, ChangeSetBuilder, PlannedRename};
pub use conventions::{capitalize, indentation_of, is_balanced, RefactoringConventions};
pub use extract::{ExtractKind, ExtractPlan, PlannedEdit, TextRange};
pub use safe_delete::{DeletePlan, SafeDeleteOutcome, UsageReport};

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::cancel::CancelFlag;
use crate::error::{IndexError, IndexResult, MutationError, MutationResult};
use crate::index::{MutationTransaction, SemanticIndex};
use crate::model::{ElementKind, SemanticElement};
use crate::traversal::{HierarchyTraversalEngine, TraversalLimits};

/// Result of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationOutcome {
    pub success: bool,
    pub affected_files: Vec<String>,
    /// Number of declarations or text regions changed.
    pub changes_count: usize,
    pub message: String,
}

impl MutationOutcome {
    pub fn committed(
        affected_files: &BTreeSet<String>,
        changes_count: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            affected_files: affected_files.iter().cloned().collect(),
            changes_count,
            message: message.into(),
        }
    }
}

pub struct MutationCoordinator<'a> {
    index: &'a dyn SemanticIndex,
    conventions: &'a dyn RefactoringConventions,
    cancel: CancelFlag,
    limits: TraversalLimits,
}

impl<'a> MutationCoordinator<'a> {
    pub fn new(index: &'a dyn SemanticIndex, conventions: &'a dyn RefactoringConventions) -> Self {
        Self {
            index,
            conventions,
            cancel: CancelFlag::new(),
            limits: TraversalLimits::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    fn ensure_ready(&self) -> MutationResult<()> {
        if self.index.is_index_ready() {
            Ok(())
        } else {
            Err(MutationError::NotReady)
        }
    }

    fn checkpoint(&self) -> MutationResult<()> {
        if self.cancel.is_cancelled() {
            Err(MutationError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn traversal(&self) -> HierarchyTraversalEngine<'a> {
        HierarchyTraversalEngine::new(self.index)
            .with_limits(self.limits)
            .with_cancel(self.cancel.clone())
    }

    /// The declaration a mutation acts on; usages resolve to what they reference.
    fn resolve_target(&self, element: &SemanticElement) -> MutationResult<SemanticElement> {
        if element.kind != ElementKind::Usage {
            return Ok(element.clone());
        }
        self.index
            .resolve_reference(element)?
            .ok_or_else(|| MutationError::not_found(&element.key()))
    }

    fn validate_new_name(&self, current: &str, new_name: &str) -> MutationResult<()> {
        self.conventions
            .validate_identifier(new_name)
            .map_err(|reason| MutationError::InvalidName {
                name: new_name.to_string(),
                reason,
            })?;
        if current == new_name {
            return Err(MutationError::InvalidName {
                name: new_name.to_string(),
                reason: "the new name is the same as the current name".to_string(),
            });
        }
        Ok(())
    }

    /// Phase 2 entry point: one exclusive transaction, refused if the index moved on.
    fn commit(
        &self,
        stamp: u64,
        mut block: impl FnMut(&mut dyn MutationTransaction) -> IndexResult<()>,
    ) -> MutationResult<()> {
        self.ensure_ready()?;
        let result = self.index.run_exclusive_mutation(&mut |tx| {
            if tx.base_stamp() != stamp {
                return Err(IndexError::ConcurrentModification {
                    expected: stamp,
                    found: tx.base_stamp(),
                });
            }
            block(tx)
        });

        match result {
            Ok(()) => Ok(()),
            Err(IndexError::NotReady) => Err(MutationError::NotReady),
            Err(err) => {
                warn!(error = %err, "mutation transaction aborted");
                Err(MutationError::Conflict(err.to_string()))
            }
        }
    }
}
