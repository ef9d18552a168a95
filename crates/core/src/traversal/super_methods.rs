use std::collections::{HashSet, VecDeque};
use tracing::debug;

use super::{HierarchyTraversalEngine, Neighbor, Walk};
use crate::error::TraversalResult;
use crate::model::{ElementKey, HierarchyNode, SemanticElement};

impl HierarchyTraversalEngine<'_> {
    /// Chain of declarations a method overrides, walked up the inheritance graph.
    ///
    /// Unbounded in depth; cycles are cut by the visited set and runaway
    /// hierarchies by the stack limit.
    pub fn super_methods(&self, method: &SemanticElement) -> TraversalResult<Vec<HierarchyNode>> {
        self.ensure_ready()?;
        let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
            Ok(self
                .overridden_declarations(current)?
                .into_iter()
                .map(Neighbor::Element)
                .collect())
        };
        self.expand(method, &fetch, &mut Walk::new(), usize::MAX, 0)
    }

    /// Flattened [`super_methods`](Self::super_methods), nearest first.
    pub fn super_method_chain(
        &self,
        method: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
            Ok(self
                .overridden_declarations(current)?
                .into_iter()
                .map(Neighbor::Element)
                .collect())
        };
        self.collect_transitive(method, &fetch)
    }

    /// Every method overriding `method`, directly or transitively.
    pub fn all_overriders(&self, method: &SemanticElement) -> TraversalResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let fetch = |current: &SemanticElement| -> TraversalResult<Vec<Neighbor>> {
            Ok(self
                .direct_overriders(current)?
                .into_iter()
                .map(Neighbor::Element)
                .collect())
        };
        self.collect_transitive(method, &fetch)
    }

    /// Index override search first, then a name match over the owner's supertypes.
    pub(crate) fn overridden_declarations(
        &self,
        method: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        self.checkpoint()?;
        let found = self.or_nothing(
            "overridden-declarations",
            self.index().find_overridden_declarations(method),
        )?;
        if !found.is_empty() {
            return Ok(found);
        }

        let Some(owner) = self.owner_of(method)? else {
            return Ok(Vec::new());
        };
        debug!(method = %method.name, "falling back to member name match over supertypes");

        let mut matches = Vec::new();
        let mut seen: HashSet<ElementKey> = HashSet::from([owner.key()]);
        let mut queue: VecDeque<SemanticElement> = self.resolved_supertypes(&owner)?.into();
        while let Some(supertype) = queue.pop_front() {
            self.checkpoint()?;
            if !seen.insert(supertype.key()) {
                continue;
            }
            match self.member_named(&supertype, method)? {
                Some(declaration) => matches.push(declaration),
                None => queue.extend(self.resolved_supertypes(&supertype)?),
            }
        }
        Ok(matches)
    }

    /// Index overrider search first, then a name match over direct subtypes of the owner.
    pub(crate) fn direct_overriders(
        &self,
        method: &SemanticElement,
    ) -> TraversalResult<Vec<SemanticElement>> {
        self.checkpoint()?;
        let found = self.or_nothing("overriders", self.index().find_overriders(method))?;
        if !found.is_empty() {
            return Ok(found);
        }

        let Some(owner) = self.owner_of(method)? else {
            return Ok(Vec::new());
        };
        let mut matches = Vec::new();
        for subtype in self.direct_subtypes(&owner)? {
            self.checkpoint()?;
            if let Some(overrider) = self.member_named(&subtype, method)? {
                matches.push(overrider);
            }
        }
        Ok(matches)
    }

    fn owner_of(&self, member: &SemanticElement) -> TraversalResult<Option<SemanticElement>> {
        let Some(container) = &member.container else {
            return Ok(None);
        };
        match self.index().element(container) {
            Ok(owner) => Ok(owner.filter(|owner| owner.kind.is_type())),
            Err(err) => {
                debug!(error = %err, "owner lookup failed");
                Ok(None)
            }
        }
    }

    fn member_named(
        &self,
        owner: &SemanticElement,
        method: &SemanticElement,
    ) -> TraversalResult<Option<SemanticElement>> {
        let members = self.or_nothing("members", self.index().members(owner))?;
        Ok(members
            .into_iter()
            .find(|member| member.kind.is_callable() && member.name == method.name))
    }
}
