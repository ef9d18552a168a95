//! Handler registry
//!
//! Built once at startup and read-only afterwards. Handlers are kept in
//! registration order; the first one able to handle an element wins.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use symbridge_core::{LanguageTag, RefactoringConventions, SemanticElement};
use tracing::{debug, info};

use crate::adapters::{
    GoAdapter, JavaAdapter, KotlinConventions, LanguageAdapter, PythonAdapter, RustAdapter,
    TypeScriptAdapter, TypeScriptConventions,
};
use crate::config::BridgeConfig;
use crate::error::DispatchError;
use crate::handlers::{
    AdapterHandler, CallHierarchyHandler, Capability, DelegatingHandler, FullHandler,
    ImplementationsHandler, InstalledLanguages, SuperMethodsHandler, SymbolSearchHandler,
    TypeHierarchyHandler,
};

/// A handler registered for exactly one capability.
#[derive(Clone)]
pub enum RegisteredHandler {
    TypeHierarchy(Arc<dyn TypeHierarchyHandler>),
    Implementations(Arc<dyn ImplementationsHandler>),
    CallHierarchy(Arc<dyn CallHierarchyHandler>),
    SymbolSearch(Arc<dyn SymbolSearchHandler>),
    SuperMethods(Arc<dyn SuperMethodsHandler>),
}

macro_rules! with_handler {
    ($entry:expr, $handler:ident => $body:expr) => {
        match $entry {
            RegisteredHandler::TypeHierarchy($handler) => $body,
            RegisteredHandler::Implementations($handler) => $body,
            RegisteredHandler::CallHierarchy($handler) => $body,
            RegisteredHandler::SymbolSearch($handler) => $body,
            RegisteredHandler::SuperMethods($handler) => $body,
        }
    };
}

impl RegisteredHandler {
    /// Entry for `capability` backed by a handler implementing every capability trait.
    pub fn for_capability<H: FullHandler + 'static>(capability: Capability, handler: Arc<H>) -> Self {
        match capability {
            Capability::TypeHierarchy => RegisteredHandler::TypeHierarchy(handler),
            Capability::Implementations => RegisteredHandler::Implementations(handler),
            Capability::CallHierarchy => RegisteredHandler::CallHierarchy(handler),
            Capability::SymbolSearch => RegisteredHandler::SymbolSearch(handler),
            Capability::SuperMethods => RegisteredHandler::SuperMethods(handler),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            RegisteredHandler::TypeHierarchy(_) => Capability::TypeHierarchy,
            RegisteredHandler::Implementations(_) => Capability::Implementations,
            RegisteredHandler::CallHierarchy(_) => Capability::CallHierarchy,
            RegisteredHandler::SymbolSearch(_) => Capability::SymbolSearch,
            RegisteredHandler::SuperMethods(_) => Capability::SuperMethods,
        }
    }

    pub fn language(&self) -> &LanguageTag {
        with_handler!(self, handler => handler.language())
    }

    pub fn can_handle(&self, element: &SemanticElement) -> bool {
        with_handler!(self, handler => handler.can_handle(element))
    }

    pub fn is_available(&self, installed: &dyn InstalledLanguages) -> bool {
        with_handler!(self, handler => handler.is_available(installed))
    }

    pub fn as_type_hierarchy(&self) -> Option<&dyn TypeHierarchyHandler> {
        match self {
            RegisteredHandler::TypeHierarchy(handler) => Some(handler.as_ref()),
            _ => None,
        }
    }

    pub fn as_implementations(&self) -> Option<&dyn ImplementationsHandler> {
        match self {
            RegisteredHandler::Implementations(handler) => Some(handler.as_ref()),
            _ => None,
        }
    }

    pub fn as_call_hierarchy(&self) -> Option<&dyn CallHierarchyHandler> {
        match self {
            RegisteredHandler::CallHierarchy(handler) => Some(handler.as_ref()),
            _ => None,
        }
    }

    pub fn as_symbol_search(&self) -> Option<&dyn SymbolSearchHandler> {
        match self {
            RegisteredHandler::SymbolSearch(handler) => Some(handler.as_ref()),
            _ => None,
        }
    }

    pub fn as_super_methods(&self) -> Option<&dyn SuperMethodsHandler> {
        match self {
            RegisteredHandler::SuperMethods(handler) => Some(handler.as_ref()),
            _ => None,
        }
    }
}

/// Registry for capability handlers and per-language refactoring conventions
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<RegisteredHandler>,
    conventions: HashMap<LanguageTag, Arc<dyn RefactoringConventions>>,
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in languages whose support is installed
    pub fn with_default_handlers(installed: &dyn InstalledLanguages, config: &BridgeConfig) -> Self {
        let mut registry = Self::new();

        let java_adapter = JavaAdapter::new();
        let java_conventions = java_adapter.conventions();
        let java = Arc::new(AdapterHandler::new(java_adapter));
        let typescript_adapter = TypeScriptAdapter::new();
        let typescript_conventions = typescript_adapter.conventions();
        let typescript = Arc::new(AdapterHandler::new(typescript_adapter));

        registry.register_language(java.clone(), java_conventions, installed, config);
        registry.register_language(
            Arc::new(DelegatingHandler::new("kotlin", java)),
            Arc::new(KotlinConventions),
            installed,
            config,
        );
        registry.register_adapter(PythonAdapter::new(), installed, config);
        registry.register_language(typescript.clone(), typescript_conventions, installed, config);
        registry.register_language(
            Arc::new(DelegatingHandler::new("javascript", typescript)),
            Arc::new(TypeScriptConventions::javascript()),
            installed,
            config,
        );
        registry.register_adapter(GoAdapter::new(), installed, config);
        registry.register_adapter(RustAdapter::new(), installed, config);

        info!(
            languages = ?registry.languages(),
            handlers = registry.handlers.len(),
            "handler registry ready"
        );
        registry
    }

    /// Register every capability of an adapter-backed handler
    pub fn register_adapter<A: LanguageAdapter + 'static>(
        &mut self,
        adapter: A,
        installed: &dyn InstalledLanguages,
        config: &BridgeConfig,
    ) -> bool {
        let conventions = adapter.conventions();
        self.register_language(Arc::new(AdapterHandler::new(adapter)), conventions, installed, config)
    }

    /// Register a handler for each capability it offers, plus its conventions
    pub fn register_language<H: FullHandler + 'static>(
        &mut self,
        handler: Arc<H>,
        conventions: Arc<dyn RefactoringConventions>,
        installed: &dyn InstalledLanguages,
        config: &BridgeConfig,
    ) -> bool {
        let language = handler.language().clone();
        if config.is_disabled(&language) {
            debug!(%language, "language disabled by configuration");
            return false;
        }
        if !handler.is_available(installed) {
            debug!(%language, "language support not installed, skipping handlers");
            return false;
        }

        for capability in handler.capabilities() {
            self.register(RegisteredHandler::for_capability(capability, handler.clone()), installed);
        }
        self.conventions.insert(language, conventions);
        true
    }

    /// Add a handler for one capability; unavailable handlers are skipped
    pub fn register(&mut self, handler: RegisteredHandler, installed: &dyn InstalledLanguages) -> bool {
        if !handler.is_available(installed) {
            debug!(
                language = %handler.language(),
                capability = %handler.capability(),
                "handler unavailable, skipping"
            );
            return false;
        }
        self.handlers.push(handler);
        true
    }

    pub fn register_conventions(
        &mut self,
        language: LanguageTag,
        conventions: Arc<dyn RefactoringConventions>,
    ) {
        self.conventions.insert(language, conventions);
    }

    /// First handler of `capability` able to handle `element`
    pub fn dispatch(
        &self,
        capability: Capability,
        element: &SemanticElement,
    ) -> Result<&RegisteredHandler, DispatchError> {
        self.handlers
            .iter()
            .find(|handler| handler.capability() == capability && handler.can_handle(element))
            .ok_or_else(|| self.no_handler(capability, &element.language))
    }

    pub fn type_hierarchy_handler(
        &self,
        element: &SemanticElement,
    ) -> Result<&dyn TypeHierarchyHandler, DispatchError> {
        self.dispatch(Capability::TypeHierarchy, element)?
            .as_type_hierarchy()
            .ok_or_else(|| self.no_handler(Capability::TypeHierarchy, &element.language))
    }

    pub fn implementations_handler(
        &self,
        element: &SemanticElement,
    ) -> Result<&dyn ImplementationsHandler, DispatchError> {
        self.dispatch(Capability::Implementations, element)?
            .as_implementations()
            .ok_or_else(|| self.no_handler(Capability::Implementations, &element.language))
    }

    pub fn call_hierarchy_handler(
        &self,
        element: &SemanticElement,
    ) -> Result<&dyn CallHierarchyHandler, DispatchError> {
        self.dispatch(Capability::CallHierarchy, element)?
            .as_call_hierarchy()
            .ok_or_else(|| self.no_handler(Capability::CallHierarchy, &element.language))
    }

    pub fn super_methods_handler(
        &self,
        element: &SemanticElement,
    ) -> Result<&dyn SuperMethodsHandler, DispatchError> {
        self.dispatch(Capability::SuperMethods, element)?
            .as_super_methods()
            .ok_or_else(|| self.no_handler(Capability::SuperMethods, &element.language))
    }

    /// Every registered search handler, in registration order
    pub fn symbol_search_handlers(&self) -> Vec<&dyn SymbolSearchHandler> {
        self.handlers
            .iter()
            .filter_map(RegisteredHandler::as_symbol_search)
            .collect()
    }

    pub fn supported_languages(&self, capability: Capability) -> Vec<LanguageTag> {
        self.handlers
            .iter()
            .filter(|handler| handler.capability() == capability)
            .map(|handler| handler.language().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Languages with at least one registered handler
    pub fn languages(&self) -> Vec<LanguageTag> {
        self.handlers
            .iter()
            .map(|handler| handler.language().clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Capabilities registered for a language; empty when its support is absent
    pub fn capabilities_for(&self, language: &LanguageTag) -> Vec<Capability> {
        self.handlers
            .iter()
            .filter(|handler| handler.language() == language)
            .map(RegisteredHandler::capability)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn conventions_for(&self, language: &LanguageTag) -> Option<Arc<dyn RefactoringConventions>> {
        self.conventions.get(language).cloned()
    }

    /// Conventions for a language, or the error naming the languages that have them
    pub fn require_conventions(
        &self,
        language: &LanguageTag,
    ) -> Result<Arc<dyn RefactoringConventions>, DispatchError> {
        self.conventions_for(language)
            .ok_or_else(|| DispatchError::NoRefactoringSupport {
                language: language.clone(),
                supported: self
                    .conventions
                    .keys()
                    .cloned()
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
            })
    }

    fn no_handler(&self, capability: Capability, language: &LanguageTag) -> DispatchError {
        if self.handlers.iter().any(|handler| handler.language() == language) {
            DispatchError::UnavailableCapability {
                capability,
                language: language.clone(),
            }
        } else {
            DispatchError::NoHandler {
                capability,
                language: language.clone(),
                supported: self.supported_languages(capability),
            }
        }
    }
}
