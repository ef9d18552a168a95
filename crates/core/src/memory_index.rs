//! Snapshot-backed implementation of [`SemanticIndex`].
//!
//! A [`MemoryIndex`] serves elements, relations and references that were
//! computed elsewhere and stored in an [`IndexSnapshot`]. It parses nothing.
//! Reads share a `parking_lot::RwLock`; mutations stage edits against a copy
//! of the state and swap it in only when the whole transaction succeeded.

use parking_lot::RwLock;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{IndexError, IndexResult};
use crate::graph::{DeclaredSupertype, ElementGraph, Relation};
use crate::index::{MutationTransaction, ReferenceStream, SearchScope, SemanticIndex};
use crate::model::{
    CallSite, ElementId, ElementKind, LanguageTag, RefKind, Reference, SemanticElement,
    SourceLocation, Supertype,
};

const USAGE_ID_PREFIX: &str = "usage:";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Languages with installed support; derived from the elements when empty.
    #[serde(default)]
    pub languages: Vec<LanguageTag>,
    /// Languages whose inheritance index is missing, so subtype lookups must fall back.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unindexed_hierarchy: Vec<LanguageTag>,
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default)]
    pub elements: Vec<ElementRecord>,
    #[serde(default)]
    pub references: Vec<ReferenceRecord>,
}

impl IndexSnapshot {
    /// Rejects 0-based lines and columns and inverted bodies.
    pub fn validate(&self) -> IndexResult<()> {
        for record in &self.elements {
            let element = &record.element;
            if let Some(location) = &element.location {
                if location.line == 0 || location.column == 0 {
                    return Err(IndexError::InvalidSnapshot(format!(
                        "{} is declared at {location}; positions are 1-based",
                        element.id
                    )));
                }
            }
            if let Some(body) = element.body {
                if body.start == 0 || body.start > body.end {
                    return Err(IndexError::InvalidSnapshot(format!(
                        "{} has body lines {}..={}",
                        element.id, body.start, body.end
                    )));
                }
            }
        }
        for record in &self.references {
            if record.line == 0 || record.column == 0 {
                return Err(IndexError::InvalidSnapshot(format!(
                    "reference to {} at {}:{}:{}; positions are 1-based",
                    record.target, record.file, record.line, record.column
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    #[serde(flatten)]
    pub element: SemanticElement,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<DeclaredSupertype>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<ElementId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub target: ElementId,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub kind: RefKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub library: bool,
}

#[derive(Debug, Clone, Default)]
struct IndexState {
    graph: ElementGraph,
    references: Vec<ReferenceRecord>,
    files: BTreeMap<String, String>,
    languages: BTreeSet<LanguageTag>,
    unindexed_hierarchy: BTreeSet<LanguageTag>,
}

impl IndexState {
    fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        let mut state = IndexState {
            files: snapshot.files,
            references: snapshot.references,
            unindexed_hierarchy: snapshot.unindexed_hierarchy.into_iter().collect(),
            ..Default::default()
        };

        state.languages = if snapshot.languages.is_empty() {
            snapshot
                .elements
                .iter()
                .map(|record| record.element.language.clone())
                .collect()
        } else {
            snapshot.languages.into_iter().collect()
        };

        for record in &snapshot.elements {
            state.graph.add_element(record.element.clone());
        }
        for record in snapshot.elements {
            let id = record.element.id.clone();
            if let Some(container) = &record.element.container {
                state.graph.add_relation(container, &id, Relation::Contains);
            }
            for overridden in &record.overrides {
                state.graph.add_relation(&id, overridden, Relation::Overrides);
            }
            if !record.supertypes.is_empty() {
                state.graph.set_declared_supertypes(&id, record.supertypes);
            }
        }
        state
    }

    fn to_snapshot(&self) -> IndexSnapshot {
        let elements = self
            .graph
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.graph.node_weight(idx))
            .map(|element| ElementRecord {
                element: element.clone(),
                supertypes: self.graph.declared_supertypes(&element.id).to_vec(),
                overrides: self
                    .graph
                    .related(&element.id, Relation::Overrides, Direction::Outgoing)
                    .into_iter()
                    .map(|e| e.id.clone())
                    .collect(),
            })
            .collect();

        IndexSnapshot {
            languages: self.languages.iter().cloned().collect(),
            unindexed_hierarchy: self.unindexed_hierarchy.iter().cloned().collect(),
            files: self.files.clone(),
            elements,
            references: self.references.clone(),
        }
    }

    fn line_text(&self, file: &str, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }
        self.files.get(file)?.split('\n').nth(line as usize - 1)
    }

    fn to_reference(&self, record: &ReferenceRecord) -> Reference {
        Reference {
            file: record.file.clone(),
            line: record.line,
            column: record.column,
            context: self
                .line_text(&record.file, record.line)
                .map(|text| text.trim().to_string())
                .unwrap_or_default(),
            ref_kind: record.kind,
        }
    }

    fn usage_element(&self, position: usize, record: &ReferenceRecord) -> Option<SemanticElement> {
        let target = self.graph.find_element(&record.target)?;
        Some(SemanticElement {
            id: ElementId(format!("{USAGE_ID_PREFIX}{position}")),
            language: target.language.clone(),
            kind: ElementKind::Usage,
            name: target.name.clone(),
            qualified_name: None,
            location: Some(SourceLocation::new(
                record.file.clone(),
                record.line,
                record.column,
            )),
            body: None,
            container: None,
            library: record.library,
            detail: Some(format!("{:?}", record.kind).to_lowercase()),
        })
    }

    fn enclosing(&self, file: &str, line: u32, kinds: &[ElementKind]) -> Option<&SemanticElement> {
        self.graph
            .elements()
            .filter(|element| element.file() == Some(file))
            .filter(|element| kinds.is_empty() || kinds.contains(&element.kind))
            .filter(|element| element.body.is_some_and(|body| body.contains(line)))
            .min_by_key(|element| {
                element
                    .body
                    .map(|body| (body.len(), u32::MAX - body.start))
                    .unwrap_or((u32::MAX, 0))
            })
    }
}

/// In-memory semantic index loaded from a snapshot.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    state: RwLock<IndexState>,
    ready: AtomicBool,
    stamp: AtomicU64,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::with_state(IndexState::from_snapshot(IndexSnapshot::default()))
    }

    /// Index over a snapshot whose positions are all 1-based.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> IndexResult<Self> {
        snapshot.validate()?;
        let state = IndexState::from_snapshot(snapshot);
        debug!(
            elements = state.graph.element_count(),
            references = state.references.len(),
            files = state.files.len(),
            "loaded index snapshot"
        );
        Ok(Self::with_state(state))
    }

    pub fn from_json(json: &str) -> IndexResult<Self> {
        let snapshot = serde_json::from_str(json)
            .map_err(|err| IndexError::InvalidSnapshot(err.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    fn with_state(state: IndexState) -> Self {
        Self {
            state: RwLock::new(state),
            ready: AtomicBool::new(true),
            stamp: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        self.state.read().to_snapshot()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Marks the index as rebuilding (`false`) or usable (`true`).
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn content_hash(&self, file: &str) -> Option<u64> {
        self.state
            .read()
            .files
            .get(file)
            .map(|text| xxh3_64(text.as_bytes()))
    }

    /// Hash over every file path and text, in path order.
    pub fn workspace_hash(&self) -> u64 {
        let state = self.state.read();
        let mut buffer = Vec::new();
        for (path, text) in &state.files {
            buffer.extend_from_slice(path.as_bytes());
            buffer.push(0);
            buffer.extend_from_slice(text.as_bytes());
            buffer.push(0);
        }
        xxh3_64(&buffer)
    }

    pub fn element_count(&self) -> usize {
        self.state.read().graph.element_count()
    }

    pub fn reference_count(&self) -> usize {
        self.state.read().references.len()
    }

    fn ensure_ready(&self) -> IndexResult<()> {
        if self.is_index_ready() {
            Ok(())
        } else {
            Err(IndexError::NotReady)
        }
    }
}

impl SemanticIndex for MemoryIndex {
    fn is_index_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn supports_language(&self, language: &LanguageTag) -> bool {
        self.state.read().languages.contains(language)
    }

    fn modification_stamp(&self) -> u64 {
        self.stamp.load(Ordering::SeqCst)
    }

    fn element(&self, id: &ElementId) -> IndexResult<Option<SemanticElement>> {
        self.ensure_ready()?;
        Ok(self.state.read().graph.find_element(id).cloned())
    }

    fn resolve_at(
        &self,
        file: &str,
        line: u32,
        column: u32,
    ) -> IndexResult<Option<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();

        for (position, record) in state.references.iter().enumerate() {
            if record.file != file || record.line != line {
                continue;
            }
            let Some(target) = state.graph.find_element(&record.target) else {
                continue;
            };
            let width = target.name.chars().count().max(1) as u32;
            if column >= record.column && column < record.column.saturating_add(width) {
                return Ok(state.usage_element(position, record));
            }
        }

        let declaration = state.graph.elements().find(|element| {
            element.kind != ElementKind::Usage
                && element.location.as_ref().is_some_and(|loc| {
                    let width = element.name.chars().count().max(1) as u32;
                    loc.file == file
                        && loc.line == line
                        && column >= loc.column
                        && column < loc.column.saturating_add(width)
                })
        });
        if let Some(declaration) = declaration {
            return Ok(Some(declaration.clone()));
        }

        Ok(state.enclosing(file, line, &[]).cloned())
    }

    fn resolve_reference(&self, element: &SemanticElement) -> IndexResult<Option<SemanticElement>> {
        self.ensure_ready()?;
        if element.kind != ElementKind::Usage {
            return Ok(Some(element.clone()));
        }
        let state = self.state.read();
        let Some(location) = &element.location else {
            return Ok(None);
        };

        let by_position = element
            .id
            .0
            .strip_prefix(USAGE_ID_PREFIX)
            .and_then(|position| position.parse::<usize>().ok())
            .and_then(|position| state.references.get(position))
            .filter(|record| {
                record.file == location.file
                    && record.line == location.line
                    && record.column == location.column
            });
        let record = by_position.or_else(|| {
            state.references.iter().find(|record| {
                record.file == location.file
                    && record.line == location.line
                    && record.column == location.column
            })
        });

        Ok(record.and_then(|record| state.graph.find_element(&record.target).cloned()))
    }

    fn find_by_qualified_name(&self, qualified_name: &str) -> IndexResult<Option<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        let found = state
            .graph
            .elements()
            .find(|element| element.qualified_name.as_deref() == Some(qualified_name))
            .cloned();
        Ok(found)
    }

    fn find_references(
        &self,
        element: &SemanticElement,
        scope: SearchScope,
    ) -> IndexResult<ReferenceStream<'_>> {
        self.ensure_ready()?;
        let state = self.state.read();
        let mut references: Vec<Reference> = state
            .references
            .iter()
            .filter(|record| record.target == element.id)
            .filter(|record| scope.includes_libraries() || !record.library)
            .map(|record| state.to_reference(record))
            .collect();
        references.sort_by(|a, b| (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column)));
        Ok(Box::new(references.into_iter()))
    }

    fn find_supertypes(&self, element: &SemanticElement) -> IndexResult<Vec<Supertype>> {
        self.ensure_ready()?;
        let state = self.state.read();
        let supertypes = state
            .graph
            .declared_supertypes(&element.id)
            .iter()
            .map(|declared| {
                match declared
                    .target
                    .as_ref()
                    .and_then(|target| state.graph.find_element(target))
                {
                    Some(resolved) => Supertype::Resolved(resolved.clone()),
                    None => Supertype::Unresolved {
                        name: declared.name.clone(),
                    },
                }
            })
            .collect();
        Ok(supertypes)
    }

    fn find_subtypes(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        if state.unindexed_hierarchy.contains(&element.language) {
            return Err(IndexError::Unsupported(format!(
                "no inheritance index for {}",
                element.language
            )));
        }
        Ok(state
            .graph
            .related(&element.id, Relation::Extends, Direction::Incoming)
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_inheritors_by_name(
        &self,
        language: &LanguageTag,
        name: &str,
    ) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        let inheritors = state
            .graph
            .elements()
            .filter(|element| &element.language == language)
            .filter(|element| {
                state
                    .graph
                    .declared_supertypes(&element.id)
                    .iter()
                    .any(|declared| simple_type_name(&declared.name) == name)
            })
            .cloned()
            .collect();
        Ok(inheritors)
    }

    fn find_overriders(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        Ok(state
            .graph
            .related(&element.id, Relation::Overrides, Direction::Incoming)
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_overridden_declarations(
        &self,
        element: &SemanticElement,
    ) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        Ok(state
            .graph
            .related(&element.id, Relation::Overrides, Direction::Outgoing)
            .into_iter()
            .cloned()
            .collect())
    }

    fn find_callees(&self, element: &SemanticElement) -> IndexResult<Vec<CallSite>> {
        self.ensure_ready()?;
        let (Some(file), Some(body)) = (element.file(), element.body) else {
            return Ok(Vec::new());
        };
        let state = self.state.read();
        let mut callees: Vec<CallSite> = state
            .references
            .iter()
            .filter(|record| record.kind == RefKind::Call)
            .filter(|record| record.file == file && body.contains(record.line))
            .filter_map(|record| {
                state.graph.find_element(&record.target).map(|target| CallSite {
                    element: target.clone(),
                    reference: state.to_reference(record),
                })
            })
            .collect();
        callees.sort_by_key(|site| (site.reference.line, site.reference.column));
        Ok(callees)
    }

    fn enclosing_element(
        &self,
        file: &str,
        line: u32,
        kinds: &[ElementKind],
    ) -> IndexResult<Option<SemanticElement>> {
        self.ensure_ready()?;
        Ok(self.state.read().enclosing(file, line, kinds).cloned())
    }

    fn members(&self, element: &SemanticElement) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        let mut members: Vec<SemanticElement> = state
            .graph
            .related(&element.id, Relation::Contains, Direction::Outgoing)
            .into_iter()
            .cloned()
            .collect();
        members.sort_by(|a, b| a.location.cmp(&b.location));
        Ok(members)
    }

    fn symbol_candidates(&self, scope: SearchScope) -> IndexResult<Vec<SemanticElement>> {
        self.ensure_ready()?;
        let state = self.state.read();
        Ok(state
            .graph
            .elements()
            .filter(|element| scope.includes_libraries() || !element.library)
            .filter(|element| {
                !matches!(element.kind, ElementKind::Usage | ElementKind::Parameter)
            })
            .cloned()
            .collect())
    }

    fn file_text(&self, file: &str) -> IndexResult<Option<String>> {
        self.ensure_ready()?;
        Ok(self.state.read().files.get(file).cloned())
    }

    fn run_exclusive_mutation(
        &self,
        block: &mut dyn FnMut(&mut dyn MutationTransaction) -> IndexResult<()>,
    ) -> IndexResult<()> {
        self.ensure_ready()?;
        let mut state = self.state.write();
        let base_stamp = self.stamp.load(Ordering::SeqCst);
        let mut staged = state.clone();

        let mut transaction = MemoryTransaction::new(&mut staged, base_stamp);
        block(&mut transaction)?;
        transaction.finish()?;

        *state = staged;
        self.stamp.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Last path segment of a written type name, without generic arguments.
fn simple_type_name(written: &str) -> &str {
    let without_generics = written.split('<').next().unwrap_or(written).trim();
    without_generics
        .rsplit(|c| c == '.' || c == ':' || c == '\\' || c == '/')
        .next()
        .unwrap_or(without_generics)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnEdit {
    file: String,
    line: u32,
    start: u32,
    end: u32,
    text: String,
}

/// `end < start` denotes a pure insertion before `start`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineEdit {
    file: String,
    start: u32,
    end: u32,
    lines: Vec<String>,
}

impl LineEdit {
    fn removed(&self) -> u32 {
        if self.end >= self.start {
            self.end - self.start + 1
        } else {
            0
        }
    }

    /// Lines after the pivot move by the edit's delta.
    fn pivot(&self) -> u32 {
        if self.removed() > 0 {
            self.end
        } else {
            self.start.saturating_sub(1)
        }
    }

    fn delta(&self) -> i64 {
        self.lines.len() as i64 - self.removed() as i64
    }

    fn removes(&self, line: u32) -> bool {
        self.removed() > 0 && self.start <= line && line <= self.end
    }

    fn shift(&self, line: u32) -> u32 {
        if line > self.pivot() {
            (line as i64 + self.delta()).max(1) as u32
        } else {
            line
        }
    }
}

struct MemoryTransaction<'a> {
    state: &'a mut IndexState,
    base_stamp: u64,
    column_edits: Vec<ColumnEdit>,
    line_edits: Vec<LineEdit>,
    deleted: Vec<ElementId>,
}

impl<'a> MemoryTransaction<'a> {
    fn new(state: &'a mut IndexState, base_stamp: u64) -> Self {
        Self {
            state,
            base_stamp,
            column_edits: Vec::new(),
            line_edits: Vec::new(),
            deleted: Vec::new(),
        }
    }

    fn line_count(&self, file: &str) -> IndexResult<u32> {
        self.state
            .files
            .get(file)
            .map(|text| text.split('\n').count() as u32)
            .ok_or_else(|| IndexError::InvalidEdit(format!("unknown file {file}")))
    }

    fn text_at(&self, file: &str, line: u32, column: u32, width: usize) -> IndexResult<String> {
        let text = self.state.line_text(file, line).ok_or_else(|| {
            IndexError::InvalidEdit(format!("{file}:{line} is outside the file"))
        })?;
        Ok(text
            .chars()
            .skip(column.saturating_sub(1) as usize)
            .take(width)
            .collect())
    }

    fn expect_text(&self, location: SourceLocation, expected: &str) -> IndexResult<()> {
        let found = self.text_at(
            &location.file,
            location.line,
            location.column,
            expected.chars().count(),
        )?;
        if found == expected {
            Ok(())
        } else {
            Err(IndexError::StaleEdit {
                location,
                expected: expected.to_string(),
                found,
            })
        }
    }

    fn push_column_edit(&mut self, edit: ColumnEdit) -> IndexResult<()> {
        if self.column_edits.contains(&edit) {
            return Ok(());
        }
        let overlaps = self.column_edits.iter().any(|other| {
            other.file == edit.file
                && other.line == edit.line
                && other.start < edit.end.max(edit.start.saturating_add(1))
                && edit.start < other.end.max(other.start.saturating_add(1))
        });
        if overlaps {
            return Err(IndexError::InvalidEdit(format!(
                "overlapping edits at {}:{}:{}",
                edit.file, edit.line, edit.start
            )));
        }
        self.column_edits.push(edit);
        Ok(())
    }

    fn push_line_edit(&mut self, edit: LineEdit) -> IndexResult<()> {
        let overlaps = self.line_edits.iter().any(|other| {
            other.file == edit.file
                && other.start <= edit.end.max(edit.start)
                && edit.start <= other.end.max(other.start)
        });
        if overlaps {
            return Err(IndexError::InvalidEdit(format!(
                "overlapping line edits in {} at line {}",
                edit.file, edit.start
            )));
        }
        self.line_edits.push(edit);
        Ok(())
    }

    fn finish(mut self) -> IndexResult<()> {
        self.apply_column_edits()?;
        self.apply_line_edits();

        let mut removed: HashSet<ElementId> = HashSet::new();
        for id in std::mem::take(&mut self.deleted) {
            removed.extend(self.state.graph.remove_element(&id));
        }
        if !removed.is_empty() {
            self.state
                .references
                .retain(|record| !removed.contains(&record.target));
        }
        Ok(())
    }

    fn apply_column_edits(&mut self) -> IndexResult<()> {
        let mut by_line: BTreeMap<(String, u32), Vec<ColumnEdit>> = BTreeMap::new();
        for edit in std::mem::take(&mut self.column_edits) {
            by_line
                .entry((edit.file.clone(), edit.line))
                .or_default()
                .push(edit);
        }

        for ((file, line), mut edits) in by_line {
            edits.sort_by(|a, b| b.start.cmp(&a.start));
            let text = self
                .state
                .files
                .get_mut(&file)
                .ok_or_else(|| IndexError::InvalidEdit(format!("unknown file {file}")))?;
            let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
            let slot = line
                .checked_sub(1)
                .and_then(|index| lines.get_mut(index as usize))
                .ok_or_else(|| IndexError::InvalidEdit(format!("{file}:{line} is outside the file")))?;

            let mut chars: Vec<char> = slot.chars().collect();
            for edit in &edits {
                let (Some(start), Some(end)) = (edit.start.checked_sub(1), edit.end.checked_sub(1))
                else {
                    return Err(IndexError::InvalidEdit(format!(
                        "column 0 is outside {file}:{line}"
                    )));
                };
                let (start, end) = (start as usize, (end as usize).min(chars.len()));
                if start > chars.len() || start > end {
                    return Err(IndexError::InvalidEdit(format!(
                        "column {} is outside {file}:{line}",
                        edit.start
                    )));
                }
                chars.splice(start..end, edit.text.chars());
            }
            *slot = chars.into_iter().collect();
            *text = lines.join("\n");

            let shifts: Vec<(u32, i64)> = edits
                .iter()
                .map(|edit| {
                    let delta = edit.text.chars().count() as i64 - (edit.end - edit.start) as i64;
                    (edit.start, delta)
                })
                .collect();
            let relocate = |column: u32| -> u32 {
                let delta: i64 = shifts
                    .iter()
                    .filter(|(start, _)| *start < column)
                    .map(|(_, delta)| delta)
                    .sum();
                (column as i64 + delta).max(1) as u32
            };

            for record in self.state.references.iter_mut() {
                if record.file == file && record.line == line {
                    record.column = relocate(record.column);
                }
            }
            for element in self.state.graph.elements_mut() {
                if let Some(location) = element.location.as_mut() {
                    if location.file == file && location.line == line {
                        location.column = relocate(location.column);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_line_edits(&mut self) {
        let mut edits = std::mem::take(&mut self.line_edits);
        edits.sort_by(|a, b| b.start.cmp(&a.start));

        for edit in edits {
            let Some(text) = self.state.files.get_mut(&edit.file) else {
                continue;
            };
            let mut lines: Vec<String> = text.split('\n').map(str::to_string).collect();
            let start = edit.start.saturating_sub(1) as usize;
            let end = start + edit.removed() as usize;
            lines.splice(start..end.min(lines.len()), edit.lines.iter().cloned());
            *text = lines.join("\n");

            self.state.references.retain(|record| {
                record.file != edit.file || !edit.removes(record.line)
            });
            for record in self.state.references.iter_mut() {
                if record.file == edit.file {
                    record.line = edit.shift(record.line);
                }
            }

            let mut swallowed = Vec::new();
            for element in self.state.graph.elements_mut() {
                if element.file() != Some(edit.file.as_str()) {
                    continue;
                }
                if let Some(location) = element.location.as_mut() {
                    if edit.removes(location.line) {
                        swallowed.push(element.id.clone());
                        continue;
                    }
                    location.line = edit.shift(location.line);
                }
                if let Some(body) = element.body.as_mut() {
                    let end_swallowed = edit.removes(body.end) && body.start < edit.start;
                    body.start = edit.shift(body.start);
                    body.end = if end_swallowed {
                        (edit.start.saturating_sub(1) + edit.lines.len() as u32).max(body.start)
                    } else {
                        edit.shift(body.end)
                    };
                }
            }
            for id in swallowed {
                if !self.deleted.contains(&id) {
                    self.deleted.push(id);
                }
            }
        }
    }
}

impl MutationTransaction for MemoryTransaction<'_> {
    fn base_stamp(&self) -> u64 {
        self.base_stamp
    }

    fn rewrite_reference(
        &mut self,
        reference: &Reference,
        old_name: &str,
        new_name: &str,
    ) -> IndexResult<()> {
        self.expect_text(reference.location(), old_name)?;
        self.push_column_edit(ColumnEdit {
            file: reference.file.clone(),
            line: reference.line,
            start: reference.column,
            end: reference.column.saturating_add(old_name.chars().count() as u32),
            text: new_name.to_string(),
        })
    }

    fn rename_declaration(&mut self, id: &ElementId, new_name: &str) -> IndexResult<()> {
        let element = self
            .state
            .graph
            .find_element(id)
            .cloned()
            .ok_or_else(|| IndexError::ElementNotFound(id.to_string()))?;
        let location = element
            .location
            .clone()
            .ok_or_else(|| IndexError::InvalidEdit(format!("{id} has no source location")))?;
        self.expect_text(location.clone(), &element.name)?;
        self.push_column_edit(ColumnEdit {
            file: location.file,
            line: location.line,
            start: location.column,
            end: location.column.saturating_add(element.name.chars().count() as u32),
            text: new_name.to_string(),
        })?;

        if let Some(stored) = self.state.graph.find_element_mut(id) {
            if let Some(qualified) = stored.qualified_name.as_mut() {
                if let Some(prefix) = qualified.strip_suffix(element.name.as_str()) {
                    *qualified = format!("{prefix}{new_name}");
                }
            }
            stored.name = new_name.to_string();
        }
        Ok(())
    }

    fn delete_declaration(&mut self, id: &ElementId) -> IndexResult<()> {
        let element = self
            .state
            .graph
            .find_element(id)
            .cloned()
            .ok_or_else(|| IndexError::ElementNotFound(id.to_string()))?;
        let location = element
            .location
            .ok_or_else(|| IndexError::InvalidEdit(format!("{id} has no source location")))?;
        let (start, end) = element
            .body
            .map(|body| (body.start, body.end))
            .unwrap_or((location.line, location.line));
        if end > self.line_count(&location.file)? {
            return Err(IndexError::InvalidEdit(format!(
                "{id} extends past the end of {}",
                location.file
            )));
        }
        self.push_line_edit(LineEdit {
            file: location.file,
            start,
            end,
            lines: Vec::new(),
        })?;
        self.deleted.push(id.clone());
        Ok(())
    }

    fn replace_text(
        &mut self,
        file: &str,
        line: u32,
        start_column: u32,
        end_column: u32,
        text: &str,
    ) -> IndexResult<()> {
        let line_text = self.state.line_text(file, line).ok_or_else(|| {
            IndexError::InvalidEdit(format!("{file}:{line} is outside the file"))
        })?;
        let width = line_text.chars().count() as u32;
        if start_column == 0 || start_column > end_column || end_column > width + 1 {
            return Err(IndexError::InvalidEdit(format!(
                "columns {start_column}..{end_column} are outside {file}:{line}"
            )));
        }
        self.push_column_edit(ColumnEdit {
            file: file.to_string(),
            line,
            start: start_column,
            end: end_column,
            text: text.to_string(),
        })
    }

    fn replace_lines(
        &mut self,
        file: &str,
        start_line: u32,
        end_line: u32,
        lines: &[String],
    ) -> IndexResult<()> {
        if start_line == 0 || start_line > end_line || end_line > self.line_count(file)? {
            return Err(IndexError::InvalidEdit(format!(
                "lines {start_line}..={end_line} are outside {file}"
            )));
        }
        self.push_line_edit(LineEdit {
            file: file.to_string(),
            start: start_line,
            end: end_line,
            lines: lines.to_vec(),
        })
    }

    fn insert_lines(&mut self, file: &str, after_line: u32, lines: &[String]) -> IndexResult<()> {
        if after_line > self.line_count(file)? {
            return Err(IndexError::InvalidEdit(format!(
                "line {after_line} is outside {file}"
            )));
        }
        self.push_line_edit(LineEdit {
            file: file.to_string(),
            start: after_line + 1,
            end: after_line,
            lines: lines.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const COUNTER: &str = "class Counter {\n    int count;\n    int next() { return count + count; }\n}\n";

    fn counter_index() -> MemoryIndex {
        let snapshot = json!({
            "languages": ["java"],
            "files": { "Counter.java": COUNTER },
            "elements": [
                { "id": "cls", "language": "java", "kind": "class", "name": "Counter",
                  "qualified_name": "Counter",
                  "location": { "file": "Counter.java", "line": 1, "column": 7 },
                  "body": { "start": 1, "end": 4 } },
                { "id": "fld", "language": "java", "kind": "field", "name": "count",
                  "qualified_name": "Counter.count", "container": "cls",
                  "location": { "file": "Counter.java", "line": 2, "column": 9 } },
                { "id": "next", "language": "java", "kind": "method", "name": "next",
                  "qualified_name": "Counter.next", "container": "cls",
                  "location": { "file": "Counter.java", "line": 3, "column": 9 },
                  "body": { "start": 3, "end": 3 } }
            ],
            "references": [
                { "target": "fld", "file": "Counter.java", "line": 3, "column": 27, "kind": "read" },
                { "target": "fld", "file": "Counter.java", "line": 3, "column": 35, "kind": "read" }
            ]
        });
        MemoryIndex::from_json(&snapshot.to_string()).unwrap()
    }

    #[test]
    fn test_resolve_at_usage_and_declaration() {
        let index = counter_index();

        let usage = index.resolve_at("Counter.java", 3, 29).unwrap().unwrap();
        assert_eq!(usage.kind, ElementKind::Usage);
        let target = index.resolve_reference(&usage).unwrap().unwrap();
        assert_eq!(target.name, "count");

        let declaration = index.resolve_at("Counter.java", 3, 10).unwrap().unwrap();
        assert_eq!(declaration.name, "next");

        let enclosing = index.resolve_at("Counter.java", 3, 2).unwrap().unwrap();
        assert_eq!(enclosing.name, "next");

        assert!(index.resolve_at("Other.java", 1, 1).unwrap().is_none());
    }

    #[test]
    fn test_find_references_carries_context() {
        let index = counter_index();
        let field = index.element(&"fld".into()).unwrap().unwrap();
        let refs: Vec<_> = index
            .find_references(&field, SearchScope::Project)
            .unwrap()
            .collect();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].context, "int next() { return count + count; }");
    }

    #[test]
    fn test_rename_rewrites_same_line_references() {
        let index = counter_index();
        let field = index.element(&"fld".into()).unwrap().unwrap();
        let refs: Vec<_> = index
            .find_references(&field, SearchScope::Project)
            .unwrap()
            .collect();

        index
            .run_exclusive_mutation(&mut |tx| {
                for reference in &refs {
                    tx.rewrite_reference(reference, "count", "total")?;
                }
                tx.rename_declaration(&"fld".into(), "total")
            })
            .unwrap();

        let text = index.file_text("Counter.java").unwrap().unwrap();
        assert!(text.contains("    int total;"));
        assert!(text.contains("return total + total;"));
        assert_eq!(index.modification_stamp(), 1);

        let renamed = index.element(&"fld".into()).unwrap().unwrap();
        assert_eq!(renamed.qualified_name.as_deref(), Some("Counter.total"));

        let second = index.resolve_at("Counter.java", 3, 36).unwrap().unwrap();
        assert_eq!(second.kind, ElementKind::Usage);
        assert_eq!(second.location.unwrap().column, 35);
    }

    #[test]
    fn test_failed_transaction_leaves_state_untouched() {
        let index = counter_index();
        let before = index.content_hash("Counter.java");
        let stale = Reference {
            file: "Counter.java".into(),
            line: 3,
            column: 27,
            context: String::new(),
            ref_kind: RefKind::Read,
        };

        let result = index.run_exclusive_mutation(&mut |tx| {
            tx.rename_declaration(&"fld".into(), "total")?;
            tx.rewrite_reference(&stale, "amount", "total")
        });

        assert!(matches!(result, Err(IndexError::StaleEdit { .. })));
        assert_eq!(index.content_hash("Counter.java"), before);
        assert_eq!(index.modification_stamp(), 0);
        assert_eq!(
            index.element(&"fld".into()).unwrap().unwrap().name,
            "count"
        );
    }

    #[test]
    fn test_delete_declaration_shifts_following_lines() {
        let index = counter_index();
        index
            .run_exclusive_mutation(&mut |tx| tx.delete_declaration(&"fld".into()))
            .unwrap();

        let text = index.file_text("Counter.java").unwrap().unwrap();
        assert!(!text.contains("int count;"));
        let next = index.element(&"next".into()).unwrap().unwrap();
        assert_eq!(next.line(), Some(2));
        assert_eq!(next.body.unwrap().start, 2);
        let class = index.element(&"cls".into()).unwrap().unwrap();
        assert_eq!(class.body.unwrap().end, 3);
        assert_eq!(index.reference_count(), 0);
    }

    #[test]
    fn test_insert_lines_extends_enclosing_body() {
        let index = counter_index();
        index
            .run_exclusive_mutation(&mut |tx| {
                tx.insert_lines("Counter.java", 3, &["    void reset() {}".to_string()])
            })
            .unwrap();

        let class = index.element(&"cls".into()).unwrap().unwrap();
        assert_eq!(class.body.unwrap().end, 5);
        let next = index.element(&"next".into()).unwrap().unwrap();
        assert_eq!(next.body.unwrap().end, 3);
    }

    #[test]
    fn test_not_ready_fails_fast() {
        let index = counter_index();
        index.set_ready(false);
        assert_eq!(
            index.resolve_at("Counter.java", 1, 1),
            Err(IndexError::NotReady)
        );
        assert!(index
            .run_exclusive_mutation(&mut |_tx| Ok(()))
            .is_err());
    }

    #[test]
    fn test_snapshot_roundtrip_preserves_relations() {
        let index = counter_index();
        let restored = MemoryIndex::from_json(&index.to_json().unwrap()).unwrap();
        let class = restored.element(&"cls".into()).unwrap().unwrap();
        assert_eq!(restored.members(&class).unwrap().len(), 2);
        assert_eq!(restored.workspace_hash(), index.workspace_hash());
    }

    #[test]
    fn test_zero_based_positions_are_rejected() {
        let element = |line: u32, body_start: u32| {
            json!({
                "languages": ["java"],
                "files": { "A.java": "class A {}" },
                "elements": [
                    { "id": "a", "language": "java", "kind": "class", "name": "A",
                      "qualified_name": "A",
                      "location": { "file": "A.java", "line": line, "column": 7 },
                      "body": { "start": body_start, "end": 1 } }
                ]
            })
        };
        for snapshot in [element(0, 1), element(1, 0)] {
            let result = MemoryIndex::from_json(&snapshot.to_string());
            assert!(matches!(result, Err(IndexError::InvalidSnapshot(_))));
        }

        let mut snapshot = element(1, 1);
        snapshot["references"] =
            json!([{ "target": "a", "file": "A.java", "line": 1, "column": 0, "kind": "read" }]);
        let result = MemoryIndex::from_json(&snapshot.to_string());
        assert!(matches!(result, Err(IndexError::InvalidSnapshot(_))));

        assert!(matches!(
            MemoryIndex::from_json("{ not json"),
            Err(IndexError::InvalidSnapshot(_))
        ));
        assert!(MemoryIndex::from_json(&element(1, 1).to_string()).is_ok());
    }

    #[test]
    fn test_simple_type_name() {
        assert_eq!(simple_type_name("java.util.List<String>"), "List");
        assert_eq!(simple_type_name("crate::shapes::Shape"), "Shape");
        assert_eq!(simple_type_name("Base"), "Base");
    }
}
