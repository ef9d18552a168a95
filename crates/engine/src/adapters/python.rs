//! Python language adapter

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use symbridge_core::{ElementKind, LanguageTag, RefactoringConventions, SemanticElement};

use super::{check_identifier, declared_abstract, is_continued, LanguageAdapter};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub struct PythonAdapter {
    language: LanguageTag,
}

impl Default for PythonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonAdapter {
    pub fn new() -> Self {
        Self {
            language: LanguageTag::new("python"),
        }
    }
}

impl LanguageAdapter for PythonAdapter {
    fn language(&self) -> &LanguageTag {
        &self.language
    }

    fn type_kinds(&self) -> &[ElementKind] {
        &[ElementKind::Class]
    }

    fn root_supertypes(&self) -> &[&'static str] {
        &["object", "builtins.object"]
    }

    fn is_concrete(&self, element: &SemanticElement) -> bool {
        // ABC subclasses are reported with an "abstract" detail by the index.
        element.kind == ElementKind::Class && !declared_abstract(element)
    }

    fn conventions(&self) -> Arc<dyn RefactoringConventions> {
        Arc::new(PythonConventions)
    }
}

pub struct PythonConventions;

impl RefactoringConventions for PythonConventions {
    fn validate_identifier(&self, name: &str) -> Result<(), String> {
        check_identifier(name, &IDENTIFIER, KEYWORDS)
    }

    fn accessor_names(&self, field: &str) -> Vec<String> {
        vec![format!("get_{field}"), format!("set_{field}")]
    }

    fn variable_declaration(&self, name: &str, expression: &str) -> String {
        format!("{name} = {expression}")
    }

    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String> {
        let mut lines = vec![format!("{indent}def {name}(self):")];
        lines.extend(body.iter().cloned());
        lines
    }

    fn method_call(&self, name: &str) -> String {
        format!("self.{name}()")
    }

    fn is_statement_line(&self, line: &str) -> bool {
        // Block headers end with a colon and stand on their own.
        line.ends_with(':') || !is_continued(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_identifiers() {
        let conventions = PythonConventions;
        assert!(conventions.validate_identifier("snake_case").is_ok());
        assert!(conventions.validate_identifier("lambda").is_err());
        assert!(conventions.validate_identifier("$x").is_err());
    }

    #[test]
    fn test_python_method_has_no_closing_line() {
        let body = vec!["        print(x)".to_string()];
        let lines = PythonConventions.method_declaration("report", &body, "    ");
        assert_eq!(lines, vec!["    def report(self):", "        print(x)"]);
        assert_eq!(PythonConventions.method_call("report"), "self.report()");
    }

    #[test]
    fn test_block_headers_are_statements() {
        assert!(PythonConventions.is_statement_line("if total > 0:"));
        assert!(PythonConventions.is_statement_line("total += 1"));
        assert!(!PythonConventions.is_statement_line("total = (a +"));
    }
}
