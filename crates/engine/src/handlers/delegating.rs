use std::sync::Arc;
use symbridge_core::{
    CallDirection, CallHierarchy, HierarchyDirection, HierarchyNode, LanguageTag, SemanticElement,
    TypeHierarchy,
};

use super::{
    CallHierarchyHandler, Capability, ImplementationsHandler, LanguageHandler, RequestContext,
    SuperMethodsHandler, SymbolSearchHandler, TypeHierarchyHandler,
};
use crate::error::BridgeResult;
use crate::search::{SearchQuery, SymbolMatch};

/// Serves a language with another language's handler under its own tag.
///
/// Kotlin delegates to Java and JavaScript to TypeScript.
pub struct DelegatingHandler<H> {
    language: LanguageTag,
    delegate: Arc<H>,
}

impl<H> DelegatingHandler<H> {
    pub fn new(language: impl Into<LanguageTag>, delegate: Arc<H>) -> Self {
        Self {
            language: language.into(),
            delegate,
        }
    }

    pub fn delegate(&self) -> &H {
        &self.delegate
    }
}

impl<H: LanguageHandler> LanguageHandler for DelegatingHandler<H> {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn capabilities(&self) -> Vec<Capability> {
        self.delegate.capabilities()
    }
}

impl<H: TypeHierarchyHandler> TypeHierarchyHandler for DelegatingHandler<H> {
    fn type_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: HierarchyDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<TypeHierarchy>> {
        self.delegate
            .type_hierarchy(ctx, element, direction, max_depth)
    }
}

impl<H: ImplementationsHandler> ImplementationsHandler for DelegatingHandler<H> {
    fn implementations(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        self.delegate.implementations(ctx, element)
    }
}

impl<H: CallHierarchyHandler> CallHierarchyHandler for DelegatingHandler<H> {
    fn call_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: CallDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<CallHierarchy>> {
        self.delegate
            .call_hierarchy(ctx, element, direction, max_depth)
    }
}

impl<H: SymbolSearchHandler> SymbolSearchHandler for DelegatingHandler<H> {
    fn search_language(
        &self,
        ctx: &RequestContext<'_>,
        query: &SearchQuery,
        language: &LanguageTag,
    ) -> BridgeResult<Vec<SymbolMatch>> {
        self.delegate.search_language(ctx, query, language)
    }
}

impl<H: SuperMethodsHandler> SuperMethodsHandler for DelegatingHandler<H> {
    fn super_methods(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>> {
        self.delegate.super_methods(ctx, element)
    }
}
