//! Boundary to the external semantic index.
//!
//! Everything the core knows about source code comes through [`SemanticIndex`].
//! Reads may run concurrently; [`SemanticIndex::run_exclusive_mutation`] is the
//! only write path and excludes every reader while its block runs.

use crate::error::IndexResult;
use crate::model::{
    CallSite, ElementId, ElementKind, LanguageTag, Reference, SemanticElement, Supertype,
};

/// Where reference and symbol searches look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Project sources only.
    #[default]
    Project,
    /// Project sources and library dependencies.
    ProjectAndLibraries,
}

impl SearchScope {
    pub fn from_include_libraries(include_libraries: bool) -> Self {
        if include_libraries {
            SearchScope::ProjectAndLibraries
        } else {
            SearchScope::Project
        }
    }

    pub fn includes_libraries(&self) -> bool {
        matches!(self, SearchScope::ProjectAndLibraries)
    }
}

pub type ReferenceStream<'a> = Box<dyn Iterator<Item = Reference> + Send + 'a>;

pub trait SemanticIndex: Send + Sync {
    /// False while the index is being rebuilt; callers must fail fast.
    fn is_index_ready(&self) -> bool;

    /// Whether optional support for `language` is installed.
    fn supports_language(&self, language: &LanguageTag) -> bool;

    /// Monotonic counter bumped by every committed mutation.
    fn modification_stamp(&self) -> u64;

    fn element(&self, id: &ElementId) -> IndexResult<Option<SemanticElement>>;

    /// Element at a source position; a `Usage` element when the position is on an occurrence.
    fn resolve_at(&self, file: &str, line: u32, column: u32)
        -> IndexResult<Option<SemanticElement>>;

    /// Declaration referenced by a `Usage` element.
    fn resolve_reference(&self, element: &SemanticElement) -> IndexResult<Option<SemanticElement>>;

    fn find_by_qualified_name(&self, qualified_name: &str) -> IndexResult<Option<SemanticElement>>;

    fn find_references(
        &self,
        element: &SemanticElement,
        scope: SearchScope,
    ) -> IndexResult<ReferenceStream<'_>>;

    /// Declared direct supertypes, in declaration order.
    fn find_supertypes(&self, element: &SemanticElement) -> IndexResult<Vec<Supertype>>;

    /// Direct subtypes from the index's inheritance data.
    fn find_subtypes(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>>;

    /// Generic definitions search: types whose declared supertype names match `name`.
    fn find_inheritors_by_name(
        &self,
        language: &LanguageTag,
        name: &str,
    ) -> IndexResult<Vec<SemanticElement>>;

    /// Methods that directly override `element`.
    fn find_overriders(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>>;

    /// Declarations `element` directly overrides.
    fn find_overridden_declarations(
        &self,
        element: &SemanticElement,
    ) -> IndexResult<Vec<SemanticElement>>;

    /// Calls written inside the body of `element`.
    fn find_callees(&self, element: &SemanticElement) -> IndexResult<Vec<CallSite>>;

    /// Innermost declaration whose body contains the line, optionally restricted by kind.
    fn enclosing_element(
        &self,
        file: &str,
        line: u32,
        kinds: &[ElementKind],
    ) -> IndexResult<Option<SemanticElement>>;

    /// Direct members (fields, methods, parameters) of a declaration.
    fn members(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>>;

    /// Name index used by symbol search.
    fn symbol_candidates(&self, scope: SearchScope) -> IndexResult<Vec<SemanticElement>>;

    fn file_text(&self, file: &str) -> IndexResult<Option<String>>;

    /// Runs `block` as one all-or-nothing transaction under exclusive access.
    ///
    /// The transaction is committed only when `block` returns `Ok`.
    fn run_exclusive_mutation(
        &self,
        block: &mut dyn FnMut(&mut dyn MutationTransaction) -> IndexResult<()>,
    ) -> IndexResult<()>;
}

/// Write operations available inside [`SemanticIndex::run_exclusive_mutation`].
///
/// Positions are those observed before the transaction started; the
/// implementation maps them onto the text as edits accumulate.
pub trait MutationTransaction {
    /// Stamp of the state the transaction started from.
    fn base_stamp(&self) -> u64;

    /// Replace the occurrence of `old_name` at the reference position with `new_name`.
    fn rewrite_reference(
        &mut self,
        reference: &Reference,
        old_name: &str,
        new_name: &str,
    ) -> IndexResult<()>;

    fn rename_declaration(&mut self, id: &ElementId, new_name: &str) -> IndexResult<()>;

    /// Remove the declaration's lines; references to it are left dangling.
    fn delete_declaration(&mut self, id: &ElementId) -> IndexResult<()>;

    /// Replace `[start_column, end_column)` on one line with `text`.
    fn replace_text(
        &mut self,
        file: &str,
        line: u32,
        start_column: u32,
        end_column: u32,
        text: &str,
    ) -> IndexResult<()>;

    /// Replace whole lines `[start_line, end_line]` with `lines`.
    fn replace_lines(
        &mut self,
        file: &str,
        start_line: u32,
        end_line: u32,
        lines: &[String],
    ) -> IndexResult<()>;

    /// Insert `lines` after `after_line` (0 inserts at the top of the file).
    fn insert_lines(&mut self, file: &str, after_line: u32, lines: &[String]) -> IndexResult<()>;
}
