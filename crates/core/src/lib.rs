//! symbridge core library
//!
//! Data model, the `SemanticIndex` boundary, hierarchy traversal and the
//! two-phase mutation coordinator.

pub mod cancel;
pub mod error;
pub mod graph;
pub mod index;
pub mod memory_index;
pub mod model;
pub mod mutation;
pub mod traversal;

// Re-export main types
pub use cancel::CancelFlag;
pub use error::{IndexError, IndexResult, MutationError, MutationResult, TraversalError, TraversalResult};
pub use graph::{DeclaredSupertype, ElementGraph, Relation};
pub use index::{MutationTransaction, ReferenceStream, SearchScope, SemanticIndex};
pub use memory_index::{ElementRecord, IndexSnapshot, MemoryIndex, ReferenceRecord};
pub use model::{
    CallSite, ElementId, ElementKey, ElementKind, HierarchyNode, LanguageTag, LineRange, RefKind,
    Reference, SemanticElement, SourceLocation, Supertype,
};
pub use mutation::{
    capitalize, indentation_of, is_balanced, ChangeSet, DeletePlan, ExtractKind, ExtractPlan,
    MutationCoordinator, MutationOutcome, RefactoringConventions, SafeDeleteOutcome, TextRange,
    UsageReport,
};
pub use traversal::{
    CallDirection, CallHierarchy, HierarchyDirection, HierarchyTraversalEngine, TraversalLimits,
    TypeHierarchy, CALLABLE_KINDS, DEFAULT_CALL_HIERARCHY_DEPTH, DEFAULT_MAX_BREADTH,
    DEFAULT_TYPE_HIERARCHY_DEPTH, MAX_CALL_HIERARCHY_DEPTH, MAX_STACK_DEPTH,
};
