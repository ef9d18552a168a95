//! Rust language adapter
//!
//! Traits are the only supertypes; a method in an `impl Trait for T` block
//! overrides the trait's declaration.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use symbridge_core::{ElementKind, LanguageTag, RefactoringConventions, SemanticElement};

use super::{check_identifier, LanguageAdapter};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "_",
];

const TYPE_KINDS: &[ElementKind] = &[
    ElementKind::Struct,
    ElementKind::Enum,
    ElementKind::Trait,
    ElementKind::TypeAlias,
];

pub struct RustAdapter {
    language: LanguageTag,
}

impl Default for RustAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RustAdapter {
    pub fn new() -> Self {
        Self {
            language: LanguageTag::new("rust"),
        }
    }
}

impl LanguageAdapter for RustAdapter {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn type_kinds(&self) -> &[ElementKind] {
        TYPE_KINDS
    }

    fn is_concrete(&self, element: &SemanticElement) -> bool {
        matches!(element.kind, ElementKind::Struct | ElementKind::Enum)
    }

    fn conventions(&self) -> Arc<dyn RefactoringConventions> {
        Arc::new(RustConventions)
    }
}

pub struct RustConventions;

impl RefactoringConventions for RustConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &IDENTIFIER, KEYWORDS)
    }

    fn accessor_names(&self, field: &str) -> Vec<String> {
        vec![field.to_string(), format!("set_{field}"), format!("{field}_mut")]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("let {name} = {expression};")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let mut lines = vec![format!("{indent}fn {name}(&self) {{")];
        lines.extend(body.iter().cloned());
        lines.push(format!("{indent}}}"));
        lines
    }

    fn method_call(&self, name: &str) -> String {
        format!("self.{name}();")
    }

    fn is_statement_line(&self, line: &str) -> bool {
        line.ends_with(';') || line.ends_with('{') || line.ends_with('}') || line.ends_with("},")
    }
}
