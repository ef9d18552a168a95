//! Cycle-safe, depth-capped walks over type and call relationships.
//!
//! Every walk keeps a visited set of [`ElementKey`]s. A key that was already
//! expanded is still reported as a leaf, but never expanded again, so cyclic
//! graphs terminate. Depth, breadth and recursion depth are capped by
//! [`TraversalLimits`].

mod call_hierarchy;
mod super_methods;
mod type_hierarchy;

pub use call_hierarchy::{CallDirection, CallHierarchy, CALLABLE_KINDS};
pub use type_hierarchy::{HierarchyDirection, TypeHierarchy};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::cancel::CancelFlag;
use crate::error::{IndexError, TraversalError, TraversalResult};
use crate::index::SemanticIndex;
use crate::model::{ElementKey, HierarchyNode, SemanticElement};

pub const DEFAULT_TYPE_HIERARCHY_DEPTH: usize = 100;
pub const DEFAULT_CALL_HIERARCHY_DEPTH: usize = 3;
pub const MAX_CALL_HIERARCHY_DEPTH: usize = 5;
pub const DEFAULT_MAX_BREADTH: usize = 100;
pub const MAX_STACK_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalLimits {
    pub type_hierarchy_depth: usize,
    pub call_hierarchy_depth: usize,
    pub call_hierarchy_max_depth: usize,
    /// Per-node cap on supertype/subtype neighbors.
    pub max_breadth: usize,
    pub max_stack_depth: usize,
}

impl Default for TraversalLimits {
    fn default() -> Self {
        Self {
            type_hierarchy_depth: DEFAULT_TYPE_HIERARCHY_DEPTH,
            call_hierarchy_depth: DEFAULT_CALL_HIERARCHY_DEPTH,
            call_hierarchy_max_depth: MAX_CALL_HIERARCHY_DEPTH,
            max_breadth: DEFAULT_MAX_BREADTH,
            max_stack_depth: MAX_STACK_DEPTH,
        }
    }
}

impl TraversalLimits {
    /// Requested call depth, defaulted and clamped to the hard cap.
    pub fn call_depth(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.call_hierarchy_depth)
            .min(self.call_hierarchy_max_depth)
    }

    pub fn type_depth(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.type_hierarchy_depth)
            .min(self.type_hierarchy_depth)
    }
}

/// One neighbor found while expanding a node.
#[derive(Debug, Clone)]
pub(crate) enum Neighbor {
    Element(SemanticElement),
    /// Declared but unresolvable; carries the written name.
    Unresolved(String),
}

/// Shared walk state of one traversal.
#[derive(Debug, Default)]
pub(crate) struct Walk {
    visited: HashSet<ElementKey>,
}

impl Walk {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

type NeighborFetch<'f> = dyn Fn(&SemanticElement) -> TraversalResult<Vec<Neighbor>> + 'f;

pub struct HierarchyTraversalEngine<'a> {
    index: &'a dyn SemanticIndex,
    limits: TraversalLimits,
    cancel: CancelFlag,
    excluded_supertypes: Vec<String>,
}

impl<'a> HierarchyTraversalEngine<'a> {
    pub fn new(index: &'a dyn SemanticIndex) -> Self {
        Self {
            index,
            limits: TraversalLimits::default(),
            cancel: CancelFlag::new(),
            excluded_supertypes: Vec::new(),
        }
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Root supertypes (e.g. `java.lang.Object`) left out of supertype lists.
    pub fn with_excluded_supertypes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_supertypes = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn limits(&self) -> &TraversalLimits {
        &self.limits
    }

    pub(crate) fn index(&self) -> &'a dyn SemanticIndex {
        self.index
    }

    pub(crate) fn ensure_ready(&self) -> TraversalResult<()> {
        if self.index.is_index_ready() {
            Ok(())
        } else {
            Err(TraversalError::NotReady)
        }
    }

    pub(crate) fn checkpoint(&self) -> TraversalResult<()> {
        if self.cancel.is_cancelled() {
            Err(TraversalError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Treats a failed index search as "found nothing".
    pub(crate) fn or_nothing<T>(
        &self,
        strategy: &str,
        result: Result<Vec<T>, IndexError>,
    ) -> TraversalResult<Vec<T>> {
        match result {
            Ok(found) => Ok(found),
            Err(IndexError::NotReady) => Err(TraversalError::NotReady),
            Err(err) => {
                debug!(strategy, error = %err, "search strategy failed");
                Ok(Vec::new())
            }
        }
    }

    /// Children of `element` down to `remaining` levels.
    pub(crate) fn expand(
        &self,
        element: &SemanticElement,
        fetch: &NeighborFetch<'_>,
        walk: &mut Walk,
        remaining: usize,
        stack_depth: usize,
    ) -> TraversalResult<Vec<HierarchyNode>> {
        self.checkpoint()?;
        let key = element.key();
        if walk.visited.contains(&key) || stack_depth > self.limits.max_stack_depth || remaining == 0
        {
            return Ok(Vec::new());
        }
        walk.visited.insert(key);

        let mut children = Vec::new();
        for neighbor in fetch(element)? {
            let node = match neighbor {
                Neighbor::Element(next) => {
                    let grandchildren =
                        self.expand(&next, fetch, walk, remaining - 1, stack_depth + 1)?;
                    HierarchyNode::from_element(&next).with_children(grandchildren)
                }
                Neighbor::Unresolved(name) => {
                    HierarchyNode::unresolved(name, element.language.clone())
                }
            };
            children.push(node);
        }
        Ok(children)
    }

    /// Flat, visited-guarded closure of `fetch` starting below `element`.
    pub(crate) fn collect_transitive(
        &self,
        element: &SemanticElement,
        fetch: &NeighborFetch<'_>,
    ) -> TraversalResult<Vec<SemanticElement>> {
        let mut seen: HashSet<ElementKey> = HashSet::from([element.key()]);
        let mut found = Vec::new();
        let mut frontier = vec![(element.clone(), 0usize)];

        while let Some((current, depth)) = frontier.pop() {
            self.checkpoint()?;
            if depth >= self.limits.max_stack_depth {
                continue;
            }
            for neighbor in fetch(&current)? {
                let Neighbor::Element(next) = neighbor else {
                    continue;
                };
                if seen.insert(next.key()) {
                    found.push(next.clone());
                    frontier.push((next, depth + 1));
                }
            }
        }
        Ok(found)
    }
}

/// Drops neighbors sharing a key, keeping the first.
pub(crate) fn dedup_by_key(elements: Vec<SemanticElement>) -> Vec<SemanticElement> {
    let mut seen = HashSet::new();
    elements
        .into_iter()
        .filter(|element| seen.insert(element.key()))
        .collect()
}
