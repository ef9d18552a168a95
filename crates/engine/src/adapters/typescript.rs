//! TypeScript language adapter
//!
//! JavaScript is served by the same handlers; only the emitted method
//! syntax differs.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use symbridge_core::{capitalize, ElementKind, LanguageTag, RefactoringConventions, SemanticElement};

use super::{check_identifier, declared_abstract, is_continued, LanguageAdapter};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

const KEYWORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true", "try",
    "typeof", "var", "void", "while", "with", "let", "static", "yield", "await", "implements",
    "interface", "package", "private", "protected", "public",
];

const TYPE_KINDS: &[ElementKind] = &[
    ElementKind::Class,
    ElementKind::Interface,
    ElementKind::Enum,
    ElementKind::TypeAlias,
];

pub struct TypeScriptAdapter {
    language: LanguageTag,
}

impl Default for TypeScriptAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeScriptAdapter {
    pub fn new() -> Self {
        Self {
            language: LanguageTag::new("typescript"),
        }
    }
}

impl LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn type_kinds(&self) -> &[ElementKind] {
        TYPE_KINDS
    }

    fn root_supertypes(&self) -> &[&'static str] {
        &["Object"]
    }

    fn is_concrete(&self, element: &SemanticElement) -> bool {
        element.kind == ElementKind::Class && !declared_abstract(element)
    }

    fn conventions(&self) -> Arc<dyn RefactoringConventions> {
        Arc::new(TypeScriptConventions::typescript())
    }
}

pub struct TypeScriptConventions {
    typed: bool,
}

impl TypeScriptConventions {
    pub fn typescript() -> Self {
        Self { typed: true }
    }

    pub fn javascript() -> Self {
        Self { typed: false }
    }
}

impl RefactoringConventions for TypeScriptConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &IDENTIFIER, KEYWORDS)
    }

    fn accessor_names(&self, field: &str) -> Vec<String> {
        let capitalized = capitalize(field);
        vec![format!("get{capitalized}"), format!("set{capitalized}")]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("const {name} = {expression};")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let header = if self.typed {
            format!("{indent}private {name}(): void {{")
        } else {
            format!("{indent}{name}() {{")
        };
        let mut lines = vec![header];
        lines.extend(body.iter().cloned());
        lines.push(format!("{indent}}}"));
        lines
    }

    fn method_call(&self, name: &str) -> String {
        format!("this.{name}();")
    }

    fn is_statement_line(&self, line: &str) -> bool {
        line.ends_with(';') || line.ends_with('{') || line.ends_with('}') || !is_continued(line)
    }
}
