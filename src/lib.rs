//! symbridge
//!
//! One navigation and refactoring surface over a semantic code index,
//! independent of the language behind each element.

pub use symbridge_core as core;
pub use symbridge_engine as engine;

// Re-export commonly used types
pub use symbridge_core::{
    CallDirection, CallHierarchy, CancelFlag, ElementKind, HierarchyDirection, HierarchyNode,
    LanguageTag, MemoryIndex, MutationOutcome, SafeDeleteOutcome, SemanticElement, SemanticIndex,
    TextRange, TypeHierarchy, UsageReport,
};
pub use symbridge_engine::{
    BridgeConfig, BridgeContext, BridgeError, BridgeResponse, BridgeResult, Capability,
    HandlerRegistry, SearchQuery, SymbolMatch, Target,
};
