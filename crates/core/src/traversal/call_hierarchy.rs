use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::{HierarchyTraversalEngine, Neighbor, Walk};
use crate::error::{IndexError, TraversalError, TraversalResult};
use crate::index::SearchScope;
use crate::model::{ElementKind, HierarchyNode, RefKind, SemanticElement};

pub const CALLABLE_KINDS: &[ElementKind] = &[
    ElementKind::Method,
    ElementKind::Function,
    ElementKind::Constructor,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Callers,
    Callees,
    #[default]
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallHierarchy {
    pub element: HierarchyNode,
    pub callers: Vec<HierarchyNode>,
    pub callees: Vec<HierarchyNode>,
}

type CallKey = (String, String, u32);

fn call_key(element: &SemanticElement) -> CallKey {
    (
        element.name.clone(),
        element.file().unwrap_or_default().to_string(),
        element.line().unwrap_or_default(),
    )
}

fn dedup_calls(elements: Vec<SemanticElement>) -> Vec<SemanticElement> {
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .filter(|element| seen.insert(call_key(element)))
        .collect()
}

impl HierarchyTraversalEngine<'_> {
    /// Caller and callee trees of a callable. `max_depth` defaults to 3 and is capped at 5.
    pub fn call_hierarchy(
        &self,
        callable: &SemanticElement,
        direction: CallDirection,
        max_depth: Option<usize>,
    ) -> TraversalResult<CallHierarchy> {
        self.ensure_ready()?;
        let depth = self.limits().call_depth(max_depth);

        let callers = if matches!(direction, CallDirection::Callers | CallDirection::Both) {
            let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
                Ok(self
                    .direct_callers(current)?
                    .into_iter()
                    .map(Neighbor::Element)
                    .collect())
            };
            self.expand(callable, &fetch, &mut Walk::new(), depth, 0)?
        } else {
            Vec::new()
        };

        let callees = if matches!(direction, CallDirection::Callees | CallDirection::Both) {
            let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
                Ok(self
                    .direct_callees(current)?
                    .into_iter()
                    .map(Neighbor::Element)
                    .collect())
            };
            self.expand(callable, &fetch, &mut Walk::new(), depth, 0)?
        } else {
            Vec::new()
        };

        Ok(CallHierarchy {
            element: HierarchyNode::from_element(callable),
            callers,
            callees,
        })
    }

    /// Callables containing a call to `callee` or to any declaration it overrides.
    pub(crate) fn direct_callers(
        &self,
        callee: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        let mut targets = self.super_method_chain(callee)?;
        targets.push(callee.clone());

        let mut callers = Vec::new();
        for target in &targets {
            let references = match self.index().find_references(target, SearchScope::Project) {
                Ok(references) => references,
                Err(IndexError::NotReady) => return Err(TraversalError::NotReady),
                Err(err) => {
                    debug!(target = %target.name, error = %err, "reference search failed");
                    continue;
                }
            };
            for reference in references {
                self.checkpoint()?;
                if reference.ref_kind != RefKind::Call {
                    continue;
                }
                match self
                    .index()
                    .enclosing_element(&reference.file, reference.line, CALLABLE_KINDS)
                {
                    Ok(Some(caller)) => callers.push(caller),
                    Ok(None) => {}
                    Err(err) => {
                        debug!(error = %err, "enclosing callable lookup failed");
                    }
                }
            }
        }
        Ok(dedup_calls(callers))
    }

    pub(crate) fn direct_callees(
        &self,
        caller: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        let sites = self.or_nothing("callees", self.index().find_callees(caller))?;
        Ok(dedup_calls(sites.into_iter().map(|site| site.element).collect()))
    }
}
