//! symbridge engine
//!
//! Per-language capability handlers, the handler registry, symbol search and
//! the request surface that turns every outcome into a named response.

pub mod adapters;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod response;
pub mod search;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types
pub use adapters::LanguageAdapter;
pub use config::BridgeConfig;
pub use context::{BridgeContext, Target};
pub use error::{BridgeError, BridgeResult, DispatchError};
pub use handlers::{
    AdapterHandler, CallHierarchyHandler, Capability, DelegatingHandler, ImplementationsHandler,
    IndexLanguages, LanguageHandler, InstalledLanguages, RequestContext, StaticLanguages, SuperMethodsHandler,
    SymbolSearchHandler, TypeHierarchyHandler,
};
pub use registry::{HandlerRegistry, RegisteredHandler};
pub use response::{BridgeResponse, ResponseStatus};
pub use search::{MatchType, SearchLimits, SearchQuery, SymbolMatch, SymbolSearchEngine};
