/// Per-language source conventions the refactorings need to produce text.
///
/// Implemented by the language adapters; the coordinator never inspects a
/// language tag itself.
pub trait RefactoringConventions: Send + Sync {
    /// `Err` carries the reason the name is not a usable identifier.
    fn validate_identifier(&self, name: &str) -> Result<(), String>;

    /// Accessor method names for a field, in a fixed order.
    ///
    /// Renaming maps `accessor_names(old)[i]` to `accessor_names(new)[i]`.
    fn accessor_names(&self, field: &str) -> Vec<String>;

    /// Statement declaring a local variable initialized with `expression`.
    fn variable_declaration(&self, name: &str, expression: &str) -> String;

    /// Lines of a new method with `body` (already indented one level), starting at `indent`.
    fn method_declaration(&self, name: &str, body: &[String], indent: &str) -> Vec<String>;

    /// Statement calling a method with no arguments.
    fn method_call(&self, name: &str) -> String;

    /// Whether a trimmed source line stands as a complete statement.
    fn is_statement_line(&self, line: &str) -> bool;

    fn indent_unit(&self) -> &str {
        "    "
    }
}

/// Upper-cases the first character: `count` -> `Count`.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Leading whitespace of a line.
pub fn indentation_of(line: &str) -> &str {
    let trimmed = line.trim_start();
    &line[..line.len() - trimmed.len()]
}

/// Whether brackets balance and string quotes pair up, ignoring escapes.
pub fn is_balanced(text: &str) -> bool {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty() && quote.is_none()
}
