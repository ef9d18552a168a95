//! Go language adapter
//!
//! Go has no classical inheritance: types never declare supertypes, so the
//! super-methods capability is not offered. Interfaces are satisfied
//! implicitly and their implementers come from the index's subtype data.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use symbridge_core::{capitalize, ElementKind, LanguageTag, RefactoringConventions, SemanticElement};

use super::{check_identifier, is_continued, LanguageAdapter};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

const TYPE_KINDS: &[ElementKind] = &[
    ElementKind::Struct,
    ElementKind::Interface,
    ElementKind::TypeAlias,
];

pub struct GoAdapter {
    language: LanguageTag,
}

impl Default for GoAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GoAdapter {
    pub fn new() -> Self {
        Self {
            language: LanguageTag::new("go"),
        }
    }
}

impl LanguageAdapter for GoAdapter {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn type_kinds(&self) -> &[ElementKind] {
        TYPE_KINDS
    }

    fn has_classical_inheritance(&self) -> bool {
        false
    }

    fn is_concrete(&self, element: &SemanticElement) -> bool {
        element.kind != ElementKind::Interface
    }

    fn conventions(&self) -> Arc<dyn RefactoringConventions> {
        Arc::new(GoConventions)
    }
}

pub struct GoConventions;

impl RefactoringConventions for GoConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &IDENTIFIER, KEYWORDS)
    }

    /// Go getters drop the `Get` prefix: `owner` -> `Owner`, `SetOwner`.
    fn accessor_names(&self, field: &str) -> Vec<String> {
        let capitalized = capitalize(field);
        vec![capitalized.clone(), format!("Set{capitalized}")]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("{name} := {expression}")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let mut lines = vec![format!("{indent}func {name}() {{")];
        lines.extend(body.iter().cloned());
        lines.push(format!("{indent}}}"));
        lines
    }

    fn method_call(&self, name: &str) -> String {
        format!("{name}()")
    }

    fn is_statement_line(&self, line: &str) -> bool {
        !is_continued(line)
    }

    fn indent_unit(&self) -> &str {
        "\t"
    }
}
