use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::{MutationCoordinator, MutationOutcome};
use crate::error::MutationResult;
use crate::index::SearchScope;
use crate::model::{ElementId, Reference, SemanticElement};

/// Why a safe-delete was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub can_delete: bool,
    pub usage_count: usize,
    pub blocking_usages: Vec<Reference>,
}

/// Phase 1 result of a safe-delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletePlan {
    pub id: ElementId,
    pub name: String,
    pub file: Option<String>,
    pub usages: Vec<Reference>,
    stamp: u64,
}

impl DeletePlan {
    pub fn usage_report(&self) -> UsageReport {
        UsageReport {
            can_delete: self.usages.is_empty(),
            usage_count: self.usages.len(),
            blocking_usages: self.usages.clone(),
        }
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SafeDeleteOutcome {
    Deleted(MutationOutcome),
    Blocked(UsageReport),
}

impl MutationCoordinator<'_> {
    /// Phase 1 of a safe-delete: collect usages outside the declaration itself.
    pub fn prepare_safe_delete(&self, element: &SemanticElement) -> MutationResult<DeletePlan> {
        self.ensure_ready()?;
        let target = self.resolve_target(element)?;
        let stamp = self.index.modification_stamp();

        let mut usages = Vec::new();
        for reference in self.index.find_references(&target, SearchScope::Project)? {
            self.checkpoint()?;
            if !is_inside_declaration(&target, &reference) {
                usages.push(reference);
            }
        }

        Ok(DeletePlan {
            id: target.id.clone(),
            name: target.name.clone(),
            file: target.file().map(str::to_string),
            usages,
            stamp,
        })
    }

    /// Decision point between the phases: blocked plans never reach Phase 2.
    pub fn safe_delete(&self, plan: DeletePlan, force: bool) -> MutationResult<SafeDeleteOutcome> {
        if !plan.usages.is_empty() && !force {
            return Ok(SafeDeleteOutcome::Blocked(plan.usage_report()));
        }
        self.apply_safe_delete(plan).map(SafeDeleteOutcome::Deleted)
    }

    /// Phase 2 of a safe-delete: removes the declaration, leaving any usages dangling.
    pub fn apply_safe_delete(&self, plan: DeletePlan) -> MutationResult<MutationOutcome> {
        self.commit(plan.stamp, |tx| tx.delete_declaration(&plan.id))?;

        let affected_files: BTreeSet<String> = plan.file.iter().cloned().collect();
        let message = if plan.usages.is_empty() {
            format!("Deleted '{}'", plan.name)
        } else {
            let dangling: Vec<String> = plan
                .usages
                .iter()
                .map(|usage| usage.location().to_string())
                .collect();
            warn!(
                element = %plan.name,
                dangling = plan.usages.len(),
                "forced deletion left dangling references"
            );
            format!(
                "Deleted '{}'; {} dangling reference(s) left at {}",
                plan.name,
                dangling.len(),
                dangling.join(", ")
            )
        };
        info!("{message}");
        Ok(MutationOutcome::committed(&affected_files, 1, message))
    }
}

/// Recursive calls and other self-references do not block deletion.
fn is_inside_declaration(element: &SemanticElement, reference: &Reference) -> bool {
    element.file() == Some(reference.file.as_str())
        && element
            .body
            .is_some_and(|body| body.contains(reference.line))
}
