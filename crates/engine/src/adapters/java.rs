//! Java language adapter
//!
//! Kotlin shares the Java handlers through a delegating handler and only
//! brings its own source conventions.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use symbridge_core::{capitalize, ElementKind, LanguageTag, RefactoringConventions, SemanticElement};

use super::{check_identifier, declared_abstract, is_continued, LanguageAdapter};

static JAVA_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

static KOTLIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "var", "record", "yield",
];

const KOTLIN_KEYWORDS: &[&str] = &[
    "as", "break", "class", "continue", "do", "else", "false", "for", "fun", "if", "in",
    "interface", "is", "null", "object", "package", "return", "super", "this", "throw", "true",
    "try", "typealias", "typeof", "val", "var", "when", "while",
];

const JAVA_TYPE_KINDS: &[ElementKind] = &[
    ElementKind::Class,
    ElementKind::Interface,
    ElementKind::Enum,
];

pub struct JavaAdapter {
    language: LanguageTag,
}

impl Default for JavaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl JavaAdapter {
    pub fn new() -> Self {
        Self {
            language: LanguageTag::new("java"),
        }
    }
}

impl LanguageAdapter for JavaAdapter {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn type_kinds(&self) -> &[ElementKind] {
        JAVA_TYPE_KINDS
    }

    fn root_supertypes(&self) -> &[&'static str] {
        &["java.lang.Object", "Object"]
    }

    fn is_concrete(&self, element: &SemanticElement) -> bool {
        matches!(element.kind, ElementKind::Class | ElementKind::Enum) && !declared_abstract(element)
    }

    fn conventions(&self) -> Arc<dyn RefactoringConventions> {
        Arc::new(JavaConventions)
    }
}

pub struct JavaConventions;

impl RefactoringConventions for JavaConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &JAVA_IDENTIFIER, JAVA_KEYWORDS)
    }

    fn accessor_names(&self, field: &str) -> Vec<String> {
        let capitalized = capitalize(field);
        vec![
            format!("get{capitalized}"),
            format!("set{capitalized}"),
            format!("is{capitalized}"),
        ]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("var {name} = {expression};")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let mut lines = vec![format!("{indent}private void {name}() {{")];
        lines.extend(body.iter().cloned());
        lines.push(format!("{indent}}}"));
        lines
    }

    fn method_call(&self, name: &str) -> String {
        format!("{name}();")
    }

    fn is_statement_line(&self, line: &str) -> bool {
        line.ends_with(';') || line.ends_with('{') || line.ends_with('}') || line.starts_with("//")
    }
}

/// Kotlin source conventions; semicolons are optional.
pub struct KotlinConventions;

impl RefactoringConventions for KotlinConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &KOTLIN_IDENTIFIER, KOTLIN_KEYWORDS)
    }

    fn accessor_names(&self, field: &str) -> Vec<String> {
        let capitalized = capitalize(field);
        vec![format!("get{capitalized}"), format!("set{capitalized}")]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("val {name} = {expression}")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let mut lines = vec![format!("{indent}private fun {name}() {{")];
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use symbridge_core::ElementId;

    fn class(detail: Option<&str>) -> SemanticElement {
        SemanticElement {
            id: ElementId::from("a"),
            language: LanguageTag::new("java"),
            kind: ElementKind::Class,
            name: "A".to_string(),
            qualified_name: None,
            location: None,
            body: None,
            container: None,
            library: false,
            detail: detail.map(str::to_string),
        }
    }

    #[test]
    fn test_abstract_classes_are_not_implementations() {
        let adapter = JavaAdapter::new();
        assert!(adapter.is_concrete(&class(Some("public class A"))));
        assert!(!adapter.is_concrete(&class(Some("public abstract class A"))));
    }

    #[test]
    fn test_java_identifiers() {
        let conventions = JavaConventions;
        assert!(conventions.validate_identifier("$count").is_ok());
        assert!(conventions.validate_identifier("class").is_err());
        assert!(conventions.validate_identifier("a-b").is_err());
    }

    #[test]
    fn test_accessor_order_is_stable() {
        assert_eq!(
            JavaConventions.accessor_names("count"),
            vec!["getCount", "setCount", "isCount"]
        );
    }

    #[test]
    fn test_kotlin_conventions() {
        let conventions = KotlinConventions;
        assert_eq!(conventions.variable_declaration("x", "a + b"), "val x = a + b");
        assert!(conventions.validate_identifier("fun").is_err());
        assert!(conventions.is_statement_line("println(x)"));
        assert!(!conventions.is_statement_line("println(x,"));
    }
}
