use symbridge_core::{
    CallDirection, CallHierarchy, HierarchyDirection, HierarchyNode, HierarchyTraversalEngine,
    LanguageTag, SemanticElement, TypeHierarchy, MAX_STACK_DEPTH,
};
use tracing::debug;

use super::{
    CallHierarchyHandler, Capability, ImplementationsHandler, LanguageHandler, RequestContext,
    SuperMethodsHandler, SymbolSearchHandler, TypeHierarchyHandler,
};
use crate::adapters::LanguageAdapter;
use crate::error::BridgeResult;
use crate::search::{SearchQuery, SymbolMatch, SymbolSearchEngine};

/// Serves every capability for one language through the shared engines,
/// shaped by the language's adapter.
pub struct AdapterHandler<A> {
    adapter: A,
}

impl<A: LanguageAdapter> AdapterHandler<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    fn traversal<'a>(&self, ctx: &RequestContext<'a>) -> HierarchyTraversalEngine<'a> {
        ctx.traversal().with_excluded_supertypes(
            self.adapter
                .root_supertypes()
                .iter()
                .map(|root| root.to_string()),
        )
    }

    fn is_type(&self, element: &SemanticElement) -> bool {
        self.adapter.type_kinds().contains(&element.kind)
    }

    fn is_callable(&self, element: &SemanticElement) -> bool {
        self.adapter.callable_kinds().contains(&element.kind)
    }

    /// The type a request is about: the element itself, or the type containing a member.
    fn type_target(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<SemanticElement>> {
        let mut current = ctx.resolve_declaration(element)?;
        for _ in 0..MAX_STACK_DEPTH {
            if self.is_type(&current) {
                return Ok(Some(current));
            }
            let Some(container) = current.container.clone() else {
                return Ok(None);
            };
            match ctx.index.element(&container)? {
                Some(parent) => current = parent,
                None => return Ok(None),
            }
        }
        Ok(None)
    }

    /// The callable a request is about: the element itself, or the callable enclosing it.
    fn callable_target(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<SemanticElement>> {
        let declaration = ctx.resolve_declaration(element)?;
        if self.is_callable(&declaration) {
            return Ok(Some(declaration));
        }
        for location in [declaration.location.as_ref(), element.location.as_ref()]
            .into_iter()
            .flatten()
        {
            let enclosing = ctx.index.enclosing_element(
                &location.file,
                location.line,
                self.adapter.callable_kinds(),
            )?;
            if enclosing.is_some() {
                return Ok(enclosing);
            }
        }
        Ok(None)
    }
}

impl<A: LanguageAdapter> LanguageHandler for AdapterHandler<A> {
    fn language(&self) -> &LanguageTag {
        self.adapter.language()
    }

    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| {
                *capability != Capability::SuperMethods || self.adapter.has_classical_inheritance()
            })
            .collect()
    }
}

impl<A: LanguageAdapter> TypeHierarchyHandler for AdapterHandler<A> {
    fn type_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: HierarchyDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<TypeHierarchy>> {
        let Some(target) = self.type_target(ctx, element)? else {
            debug!(element = %element.display_name(), "no enclosing type");
            return Ok(None);
        };
        let mut hierarchy = self
            .traversal(ctx)
            .type_hierarchy(&target, direction, max_depth)?;
        if !self.adapter.has_classical_inheritance() {
            hierarchy.supertypes.clear();
        }
        Ok(Some(hierarchy))
    }
}

impl<A: LanguageAdapter> ImplementationsHandler for AdapterHandler<A> {
    fn implementations(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        let declaration = ctx.resolve_declaration(element)?;
        let engine = self.traversal(ctx);
        let found = if self.is_callable(&declaration) {
            engine.all_overriders(&declaration)?
        } else if let Some(target) = self.type_target(ctx, &declaration)? {
            engine
                .all_subtypes(&target)?
                .into_iter()
                .filter(|subtype| self.adapter.is_concrete(subtype))
                .collect()
        } else {
            return Ok(None);
        };
        Ok(Some(found.iter().map(HierarchyNode::from_element).collect()))
    }
}

impl<A: LanguageAdapter> CallHierarchyHandler for AdapterHandler<A> {
    fn call_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: CallDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<CallHierarchy>> {
        let Some(target) = self.callable_target(ctx, element)? else {
            debug!(element = %element.display_name(), "no enclosing callable");
            return Ok(None);
        };
        Ok(Some(
            self.traversal(ctx)
                .call_hierarchy(&target, direction, max_depth)?,
        ))
    }
}

impl<A: LanguageAdapter> SymbolSearchHandler for AdapterHandler<A> {
    fn search_language(
        &self,
        ctx: &RequestContext<'_>,
        query: &SearchQuery,
        language: &LanguageTag,
    ) -> BridgeResult<Vec<SymbolMatch>> {
        SymbolSearchEngine::new(ctx.search).search_in(ctx.index, query, Some(language))
    }
}

impl<A: LanguageAdapter> SuperMethodsHandler for AdapterHandler<A> {
    fn super_methods(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        let declaration = ctx.resolve_declaration(element)?;
        if !self.is_callable(&declaration) {
            return Ok(None);
        }
        Ok(Some(self.traversal(ctx).super_methods(&declaration)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{GoAdapter, JavaAdapter};
    use crate::error::BridgeError;
    use crate::test_support::{get, shapes_index};
    use symbridge_core::{CancelFlag, SemanticIndex};

    fn names(nodes: &[HierarchyNode]) -> Vec<&str> {
        nodes.iter().map(|node| node.name.as_str()).collect()
    }

    #[test]
    fn test_type_hierarchy_hides_object() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let ctx = RequestContext::new(&index);

        let hierarchy = handler
            .type_hierarchy(&ctx, &get(&index, "polygon"), HierarchyDirection::Both, None)
            .unwrap()
            .unwrap();
        assert_eq!(names(&hierarchy.supertypes), vec!["Shape"]);
        assert_eq!(names(&hierarchy.subtypes), vec!["Square"]);
    }

    #[test]
    fn test_member_resolves_to_its_type() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let ctx = RequestContext::new(&index);

        let hierarchy = handler
            .type_hierarchy(&ctx, &get(&index, "square_twice"), HierarchyDirection::Supertypes, None)
            .unwrap()
            .unwrap();
        assert_eq!(hierarchy.element.name, "Square");
        let polygon = &hierarchy.supertypes[0];
        assert_eq!(polygon.name, "Polygon");
        assert_eq!(names(polygon.children.as_deref().unwrap_or_default()), vec!["Shape"]);
    }

    #[test]
    fn test_implementations_skip_abstract_types() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let ctx = RequestContext::new(&index);

        let mut found = names(
            &handler
                .implementations(&ctx, &get(&index, "shape"))
                .unwrap()
                .unwrap(),
        )
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["Circle", "Square"]);

        let overriders = handler
            .implementations(&ctx, &get(&index, "shape_area"))
            .unwrap()
            .unwrap();
        assert_eq!(overriders.len(), 3);
    }

    #[test]
    fn test_call_hierarchy_from_usage() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let ctx = RequestContext::new(&index);
        let usage = index.resolve_at("Shapes.java", 9, 30).unwrap().unwrap();

        let calls = handler
            .call_hierarchy(&ctx, &usage, CallDirection::Callers, None)
            .unwrap()
            .unwrap();
        assert_eq!(calls.element.name, "area");
        assert_eq!(names(&calls.callers), vec!["twice"]);
    }

    #[test]
    fn test_super_methods_chain() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let ctx = RequestContext::new(&index);

        let chain = handler
            .super_methods(&ctx, &get(&index, "square_area"))
            .unwrap()
            .unwrap();
        assert_eq!(chain[0].qualified_name.as_deref(), Some("shapes.Polygon.area"));
        assert_eq!(chain[0].depth(), 1);
        assert!(handler
            .super_methods(&ctx, &get(&index, "square"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_go_reports_no_supertypes() {
        let index = shapes_index();
        let handler = AdapterHandler::new(GoAdapter::new());
        let ctx = RequestContext::new(&index);

        assert!(!handler.capabilities().contains(&Capability::SuperMethods));
        let square = handler
            .type_hierarchy(&ctx, &get(&index, "go_square"), HierarchyDirection::Both, None)
            .unwrap()
            .unwrap();
        assert!(square.supertypes.is_empty());

        let shape = handler
            .type_hierarchy(&ctx, &get(&index, "go_shape"), HierarchyDirection::Subtypes, None)
            .unwrap()
            .unwrap();
        assert_eq!(names(&shape.subtypes), vec!["Square"]);
    }

    #[test]
    fn test_cancelled_request() {
        let index = shapes_index();
        let handler = AdapterHandler::new(JavaAdapter::new());
        let cancel = CancelFlag::new();
        cancel.cancel();
        let ctx = RequestContext::new(&index).with_cancel(cancel);

        let result =
            handler.type_hierarchy(&ctx, &get(&index, "shape"), HierarchyDirection::Both, None);
        assert_eq!(result, Err(BridgeError::Cancelled));
    }
}
