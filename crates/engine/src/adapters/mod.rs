//! Language-specific adapters
//!
//! An adapter tells the shared traversal and refactoring machinery how one
//! language is shaped: which kinds are types, whether types inherit, which
//! implicit roots to hide and how source text is written.

pub mod go;
pub mod java;
pub mod python;
pub mod rust;
pub mod typescript;

pub use go::{GoAdapter, GoConventions};
pub use java::{JavaAdapter, JavaConventions, KotlinConventions};
pub use python::{PythonAdapter, PythonConventions};
pub use rust::{RustAdapter, RustConventions};
pub use typescript::{TypeScriptAdapter, TypeScriptConventions};

use regex::Regex;
use std::sync::Arc;
use symbridge_core::{ElementKind, LanguageTag, RefactoringConventions, SemanticElement, CALLABLE_KINDS};

/// Trait for language-specific behavior
pub trait LanguageAdapter: Send + Sync {
    /// Language tag served by this adapter
    fn language(&self) -> &LanguageTag;

    /// Element kinds that take part in type hierarchies
    fn type_kinds(&self) -> &[ElementKind];

    fn callable_kinds(&self) -> &[ElementKind] {
        CALLABLE_KINDS
    }

    /// Whether types declare supertypes that methods can override
    fn has_classical_inheritance(&self) -> bool {
        true
    }

    /// Implicit roots left out of supertype lists
    fn root_supertypes(&self) -> &[&'static str] {
        &[]
    }

    /// Whether a subtype counts as an implementation of its supertype
    fn is_concrete(&self, element: &SemanticElement) -> bool;

    /// How refactorings write source text in this language
    fn conventions(&self) -> Arc<dyn RefactoringConventions>;
}

/// Whether the element's declaration detail carries the `abstract` modifier.
pub(crate) fn declared_abstract(element: &SemanticElement) -> bool {
    element
        .detail
        .as_deref()
        .is_some_and(|detail| detail.split_whitespace().any(|word| word == "abstract"))
}

/// Shared identifier check: lexical shape first, then reserved words.
pub(crate) fn check_identifier(
    name: &str,
    pattern: &Regex,
    keywords: &[&str],
) -> Result<(), String> {
    if name.is_empty() {
        return Err("the name is empty".to_string());
    }
    if !pattern.is_match(name) {
        return Err(format!("'{name}' is not a valid identifier"));
    }
    if keywords.contains(&name) {
        return Err(format!("'{name}' is a reserved keyword"));
    }
    Ok(())
}

/// Whether a trimmed line visibly continues onto the next one.
pub(crate) fn is_continued(line: &str) -> bool {
    const CONTINUATIONS: &[&str] = &[
        ",", "(", "[", "+", "-", "*", "/", "%", "=", ".", "&&", "||", "\\", "?", ":",
    ];
    if line.ends_with("++") || line.ends_with("--") {
        return false;
    }
    CONTINUATIONS.iter().any(|suffix| line.ends_with(suffix))
}
