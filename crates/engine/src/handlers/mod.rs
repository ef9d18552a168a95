//! Capability handlers
//!
//! Each capability is a narrow trait over the common [`LanguageHandler`]
//! base. A handler may answer `Ok(None)` when a request does not apply to the
//! element it was given; that is not an error.

mod adapter_handler;
mod delegating;

pub use adapter_handler::AdapterHandler;
pub use delegating::DelegatingHandler;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use symbridge_core::{
    CallDirection, CallHierarchy, CancelFlag, ElementKind, HierarchyDirection, HierarchyNode,
    HierarchyTraversalEngine, LanguageTag, SemanticElement, SemanticIndex, TraversalLimits,
    TypeHierarchy,
};

use crate::error::{BridgeError, BridgeResult};
use crate::search::{SearchLimits, SearchQuery, SymbolMatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    TypeHierarchy,
    Implementations,
    CallHierarchy,
    SymbolSearch,
    SuperMethods,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::TypeHierarchy,
        Capability::Implementations,
        Capability::CallHierarchy,
        Capability::SymbolSearch,
        Capability::SuperMethods,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TypeHierarchy => "type-hierarchy",
            Capability::Implementations => "implementations",
            Capability::CallHierarchy => "call-hierarchy",
            Capability::SymbolSearch => "symbol-search",
            Capability::SuperMethods => "super-methods",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Answers whether optional support for a language is installed.
pub trait InstalledLanguages: Send + Sync {
    fn is_supported(&self, language: &LanguageTag) -> bool;
}

/// Installed languages as reported by [`SemanticIndex::supports_language`].
pub struct IndexLanguages<'a> {
    index: &'a dyn SemanticIndex,
}

impl<'a> IndexLanguages<'a> {
    pub fn new(index: &'a dyn SemanticIndex) -> Self {
        Self { index }
    }
}

impl InstalledLanguages for IndexLanguages<'_> {
    fn is_supported(&self, language: &LanguageTag) -> bool {
        self.index.supports_language(language)
    }
}

/// A fixed set of languages.
#[derive(Debug, Clone, Default)]
pub struct StaticLanguages {
    languages: BTreeSet<LanguageTag>,
}

impl StaticLanguages {
    pub fn new<I, L>(languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<LanguageTag>,
    {
        Self {
            languages: languages.into_iter().map(Into::into).collect(),
        }
    }
}

impl InstalledLanguages for StaticLanguages {
    fn is_supported(&self, language: &LanguageTag) -> bool {
        self.languages.contains(language)
    }
}

/// Everything a handler needs to serve one request.
#[derive(Clone)]
pub struct RequestContext<'a> {
    pub index: &'a dyn SemanticIndex,
    pub limits: TraversalLimits,
    pub search: SearchLimits,
    pub cancel: CancelFlag,
}

impl<'a> RequestContext<'a> {
    pub fn new(index: &'a dyn SemanticIndex) -> Self {
        Self {
            index,
            limits: TraversalLimits::default(),
            search: SearchLimits::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_search_limits(mut self, search: SearchLimits) -> Self {
        self.search = search;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn traversal(&self) -> HierarchyTraversalEngine<'a> {
        HierarchyTraversalEngine::new(self.index)
            .with_limits(self.limits)
            .with_cancel(self.cancel.clone())
    }

    /// The declaration behind a usage; declarations are returned as they are.
    pub fn resolve_declaration(&self, element: &SemanticElement) -> BridgeResult<SemanticElement> {
        if element.kind != ElementKind::Usage {
            return Ok(element.clone());
        }
        self.index
            .resolve_reference(element)?
            .ok_or_else(|| BridgeError::UnresolvedReference(element.name.clone()))
    }
}

/// Base of every capability handler
pub trait LanguageHandler: Send + Sync {
    fn language(&self) -> &LanguageTag;

    fn can_handle(&self, element: &SemanticElement) -> bool {
        element.language == *self.language()
    }

    fn is_available(&self, installed: &dyn InstalledLanguages) -> bool {
        installed.is_supported(self.language())
    }

    /// Capabilities this handler should be registered for
    fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL.to_vec()
    }
}

pub trait TypeHierarchyHandler: LanguageHandler {
    fn type_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: HierarchyDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<TypeHierarchy>>;
}

pub trait ImplementationsHandler: LanguageHandler {
    /// Concrete subtypes of a type, or overriders of a method.
    fn implementations(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>>;
}

pub trait CallHierarchyHandler: LanguageHandler {
    fn call_hierarchy(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
        direction: CallDirection,
        max_depth: Option<usize>,
    ) -> BridgeResult<Option<CallHierarchy>>;
}

pub trait SymbolSearchHandler: LanguageHandler {
    /// Matches among the candidates declared in `language`.
    fn search_language(
        &self,
        ctx: &RequestContext<'_>,
        query: &SearchQuery,
        language: &LanguageTag,
    ) -> BridgeResult<Vec<SymbolMatch>>;

    fn search_symbols(
        &self,
        ctx: &RequestContext<'_>,
        query: &SearchQuery,
    ) -> BridgeResult<Vec<SymbolMatch>> {
        self.search_language(ctx, query, self.language())
    }
}

pub trait SuperMethodsHandler: LanguageHandler {
    fn super_methods(
        &self,
        ctx: &RequestContext<'_>,
        element: &SemanticElement,
    ) -> BridgeResult<Option<Vec<HierarchyNode>>>;
}

/// A handler offering every capability trait.
pub trait FullHandler:
    TypeHierarchyHandler
    + ImplementationsHandler
    + CallHierarchyHandler
    + SymbolSearchHandler
    + SuperMethodsHandler
{
}

impl<T> FullHandler for T where
    T: TypeHierarchyHandler
        + ImplementationsHandler
        + CallHierarchyHandler
        + SymbolSearchHandler
        + SuperMethodsHandler
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_names() {
        assert_eq!(Capability::SuperMethods.to_string(), "super-methods");
        assert_eq!(
            serde_json::to_string(&Capability::TypeHierarchy).unwrap(),
            "\"type-hierarchy\""
        );
    }

    #[test]
    fn test_static_languages() {
        let installed = StaticLanguages::new(["java", "Go"]);
        assert!(installed.is_supported(&LanguageTag::new("go")));
        assert!(!installed.is_supported(&LanguageTag::new("python")));
    }
}
