use serde::{Deserialize, Serialize};

use super::{dedup_by_key, HierarchyTraversalEngine, Neighbor, Walk};
use crate::error::TraversalResult;
use crate::model::{HierarchyNode, SemanticElement, Supertype};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDirection {
    Supertypes,
    Subtypes,
    #[default]
    Both,
}

impl HierarchyDirection {
    fn includes_supertypes(&self) -> bool {
        matches!(self, HierarchyDirection::Supertypes | HierarchyDirection::Both)
    }

    fn includes_subtypes(&self) -> bool {
        matches!(self, HierarchyDirection::Subtypes | HierarchyDirection::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeHierarchy {
    pub element: HierarchyNode,
    pub supertypes: Vec<HierarchyNode>,
    pub subtypes: Vec<HierarchyNode>,
}

impl HierarchyTraversalEngine<'_> {
    /// Supertype and subtype trees of a type, each walked with its own visited set.
    pub fn type_hierarchy(
        &self,
        element: &SemanticElement,
        direction: HierarchyDirection,
        max_depth: Option<usize>,
    ) -> TraversalResult<TypeHierarchy> {
        self.ensure_ready()?;
        let depth = self.limits().type_depth(max_depth);

        let supertypes = if direction.includes_supertypes() {
            let fetch = |current: &SemanticElement| self.supertype_neighbors(current);
            self.expand(element, &fetch, &mut Walk::new(), depth, 0)?
        } else {
            Vec::new()
        };

        let subtypes = if direction.includes_subtypes() {
            let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
                Ok(self
                    .direct_subtypes(current)?
                    .into_iter()
                    .map(Neighbor::Element)
                    .collect())
            };
            self.expand(element, &fetch, &mut Walk::new(), depth, 0)?
        } else {
            Vec::new()
        };

        Ok(TypeHierarchy {
            element: HierarchyNode::from_element(element),
            supertypes,
            subtypes,
        })
    }

    /// Every transitive subtype, nearest first within each branch.
    pub fn all_subtypes(&self, element: &SemanticElement) -> TraversalResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
            Ok(self
                .direct_subtypes(current)?
                .into_iter()
                .map(Neighbor::Element)
                .collect())
        };
        self.collect_transitive(element, &fetch)
    }

    /// Declared supertypes, minus excluded roots, capped at the breadth limit.
    pub(crate) fn supertype_neighbors(
        &self,
        element: &SemanticElement,
    ) -> TraversalResult<Vec<Neighbor>> {
        let declared = self.or_nothing("supertypes", self.index().find_supertypes(element))?;
        Ok(declared
            .into_iter()
            .filter_map(|supertype| match supertype {
                Supertype::Resolved(resolved) => {
                    (!self.is_excluded(resolved.display_name(), &resolved.name))
                        .then_some(Neighbor::Element(resolved))
                }
                Supertype::Unresolved { name } => {
                    (!self.is_excluded(&name, &name)).then_some(Neighbor::Unresolved(name))
                }
            })
            .take(self.limits().max_breadth)
            .collect())
    }

    /// Resolved direct supertypes only; used by member-name fallbacks.
    pub(crate) fn resolved_supertypes(
        &self,
        element: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        Ok(self
            .supertype_neighbors(element)?
            .into_iter()
            .filter_map(|neighbor| match neighbor {
                Neighbor::Element(resolved) => Some(resolved),
                Neighbor::Unresolved(_) => None,
            })
            .collect())
    }

    /// Index inheritance search first, then the by-name definitions search.
    pub(crate) fn direct_subtypes(
        &self,
        element: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        let mut found = self.or_nothing("subtypes", self.index().find_subtypes(element))?;
        if found.is_empty() {
            found = self.or_nothing(
                "inheritors-by-name",
                self.index()
                    .find_inheritors_by_name(&element.language, &element.name),
            )?;
            found.retain(|candidate| candidate.key() != element.key());
        }
        let mut found = dedup_by_key(found);
        found.truncate(self.limits().max_breadth);
        Ok(found)
    }

    fn is_excluded(&self, qualified: &str, name: &str) -> bool {
        self.excluded_supertypes
            .iter()
            .any(|root| root == qualified || root == name)
    }
}
