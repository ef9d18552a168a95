//! Request-scoped values exchanged with the semantic index and returned to callers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language identifier used for handler dispatch only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LanguageTag(String);

impl LanguageTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LanguageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for LanguageTag {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<LanguageTag> for String {
    fn from(tag: LanguageTag) -> Self {
        tag.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Class,
    Interface,
    Enum,
    Struct,
    Trait,
    TypeAlias,
    Method,
    Function,
    Constructor,
    Field,
    Property,
    Parameter,
    Variable,
    Module,
    /// An occurrence of another element under the cursor.
    Usage,
    Unknown,
}

impl ElementKind {
    pub fn is_type(&self) -> bool {
        matches!(
            self,
            ElementKind::Class
                | ElementKind::Interface
                | ElementKind::Enum
                | ElementKind::Struct
                | ElementKind::Trait
                | ElementKind::TypeAlias
        )
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            ElementKind::Method | ElementKind::Function | ElementKind::Constructor
        )
    }

    pub fn is_field(&self) -> bool {
        matches!(self, ElementKind::Field | ElementKind::Property)
    }
}

/// Position of an element name: 1-based line, 1-based column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Inclusive line range of a declaration body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub String);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque handle into the semantic index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticElement {
    pub id: ElementId,
    pub language: LanguageTag,
    pub kind: ElementKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<LineRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ElementId>,
    #[serde(default)]
    pub library: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl SemanticElement {
    pub fn key(&self) -> ElementKey {
        match &self.qualified_name {
            Some(qualified) => ElementKey::Qualified(qualified.clone()),
            None => {
                let (file, line) = self
                    .location
                    .as_ref()
                    .map(|loc| (loc.file.clone(), loc.line))
                    .unwrap_or_default();
                ElementKey::Located {
                    file,
                    line,
                    name: self.name.clone(),
                }
            }
        }
    }

    pub fn file(&self) -> Option<&str> {
        self.location.as_ref().map(|loc| loc.file.as_str())
    }

    pub fn line(&self) -> Option<u32> {
        self.location.as_ref().map(|loc| loc.line)
    }

    pub fn display_name(&self) -> &str {
        self.qualified_name.as_deref().unwrap_or(&self.name)
    }
}

/// Stable identity of an element within one traversal or change set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementKey {
    Qualified(String),
    Located { file: String, line: u32, name: String },
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Qualified(name) => f.write_str(name),
            ElementKey::Located { file, line, name } => write!(f, "{file}:{line}:{name}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    Read,
    Write,
    Call,
    TypeUsage,
    Import,
    Other,
}

/// One occurrence of an element being used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: String,
    pub ref_kind: RefKind,
}

impl Reference {
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line, self.column)
    }
}

/// A supertype as declared: resolved to an element, or only its written name.
#[derive(Debug, Clone, PartialEq)]
pub enum Supertype {
    Resolved(SemanticElement),
    Unresolved { name: String },
}

/// A call relationship: the element on the other end and where the call is written.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub element: SemanticElement,
    pub reference: Reference,
}

/// One node in a supertype/subtype or caller/callee tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub kind: ElementKind,
    pub language: LanguageTag,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unresolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<HierarchyNode>>,
}

impl HierarchyNode {
    pub fn from_element(element: &SemanticElement) -> Self {
        Self {
            name: element.name.clone(),
            qualified_name: element.qualified_name.clone(),
            file: element.file().map(str::to_string),
            line: element.line(),
            kind: element.kind,
            language: element.language.clone(),
            unresolved: false,
            children: None,
        }
    }

    /// Best-effort node for a neighbor the index could not resolve.
    pub fn unresolved(name: impl Into<String>, language: LanguageTag) -> Self {
        Self {
            name: name.into(),
            qualified_name: None,
            file: None,
            line: None,
            kind: ElementKind::Unknown,
            language,
            unresolved: true,
            children: None,
        }
    }

    pub fn with_children(mut self, children: Vec<HierarchyNode>) -> Self {
        self.children = if children.is_empty() {
            None
        } else {
            Some(children)
        };
        self
    }

    /// Nesting depth below this node (0 for a leaf).
    pub fn depth(&self) -> usize {
        self.children
            .as_ref()
            .and_then(|children| children.iter().map(|c| c.depth() + 1).max())
            .unwrap_or(0)
    }

    pub fn count(&self) -> usize {
        1 + self
            .children
            .as_ref()
            .map(|children| children.iter().map(HierarchyNode::count).sum())
            .unwrap_or(0)
    }
}
