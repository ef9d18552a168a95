use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::{ElementId, ElementKey, Reference, SemanticElement};

/// One declaration that changes name together with the others in a change set.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRename {
    pub id: ElementId,
    pub old_name: String,
    pub new_name: String,
}

/// Concurrent accumulator filled during Phase 1.
#[derive(Debug, Default)]
pub struct ChangeSetBuilder {
    targets: DashMap<ElementKey, PlannedRename>,
    references: DashMap<ElementKey, Vec<Reference>>,
    affected_files: DashSet<String>,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declaration; the first registration of a key wins.
    pub fn add_target(&self, element: &SemanticElement, new_name: &str) -> bool {
        let key = element.key();
        match self.targets.entry(key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(PlannedRename {
                    id: element.id.clone(),
                    old_name: element.name.clone(),
                    new_name: new_name.to_string(),
                });
            }
        }
        if let Some(file) = element.file() {
            self.affected_files.insert(file.to_string());
        }
        self.references.entry(key).or_default();
        true
    }

    pub fn add_reference(&self, key: &ElementKey, reference: Reference) {
        self.affected_files.insert(reference.file.clone());
        self.references
            .entry(key.clone())
            .or_default()
            .push(reference);
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Snapshot into an immutable change set computed against `stamp`.
    pub fn freeze(self, stamp: u64) -> ChangeSet {
        let mut target_elements = BTreeMap::new();
        let mut old_names = BTreeMap::new();
        let mut declarations = BTreeMap::new();
        for (key, planned) in self.targets.into_iter() {
            target_elements.insert(key.clone(), planned.new_name);
            old_names.insert(key.clone(), planned.old_name);
            declarations.insert(key, planned.id);
        }

        let collected_references = self
            .references
            .into_iter()
            .map(|(key, mut references)| {
                references.sort_by(|a, b| {
                    (&a.file, a.line, a.column).cmp(&(&b.file, b.line, b.column))
                });
                references.dedup();
                (key, references)
            })
            .collect();

        ChangeSet {
            target_elements,
            collected_references,
            affected_files: self.affected_files.into_iter().collect(),
            old_names,
            declarations,
            stamp,
        }
    }
}

/// Every edit a rename will perform, computed in Phase 1 and consumed once in Phase 2.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    target_elements: BTreeMap<ElementKey, String>,
    collected_references: BTreeMap<ElementKey, Vec<Reference>>,
    affected_files: BTreeSet<String>,
    old_names: BTreeMap<ElementKey, String>,
    declarations: BTreeMap<ElementKey, ElementId>,
    stamp: u64,
}

impl ChangeSet {
    pub fn target_elements(&self) -> &BTreeMap<ElementKey, String> {
        &self.target_elements
    }

    pub fn collected_references(&self) -> &BTreeMap<ElementKey, Vec<Reference>> {
        &self.collected_references
    }

    pub fn affected_files(&self) -> &BTreeSet<String> {
        &self.affected_files
    }

    pub fn old_name(&self, key: &ElementKey) -> Option<&str> {
        self.old_names.get(key).map(String::as_str)
    }

    pub fn declaration(&self, key: &ElementKey) -> Option<&ElementId> {
        self.declarations.get(key)
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn reference_count(&self) -> usize {
        self.collected_references.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, LanguageTag, RefKind, SourceLocation};
    use rayon::prelude::*;

    fn create_test_element(name: &str, file: &str) -> SemanticElement {
        SemanticElement {
            id: ElementId::from(name),
            language: LanguageTag::new("java"),
            kind: ElementKind::Field,
            name: name.to_string(),
            qualified_name: Some(format!("app.Counter.{name}")),
            location: Some(SourceLocation::new(file, 2, 9)),
            body: None,
            container: None,
            library: false,
            detail: None,
        }
    }

    fn reference(file: &str, line: u32) -> Reference {
        Reference {
            file: file.to_string(),
            line,
            column: 5,
            context: String::new(),
            ref_kind: RefKind::Read,
        }
    }

    #[test]
    fn test_affected_files_cover_references_and_declarations() {
        let builder = ChangeSetBuilder::new();
        let count = create_test_element("count", "Counter.java");
        builder.add_target(&count, "total");
        builder.add_reference(&count.key(), reference("Main.java", 3));

        let change_set = builder.freeze(7);
        assert_eq!(change_set.stamp(), 7);
        let files: Vec<_> = change_set.affected_files().iter().cloned().collect();
        assert_eq!(files, vec!["Counter.java", "Main.java"]);
        assert_eq!(change_set.old_name(&count.key()), Some("count"));
    }

    #[test]
    fn test_concurrent_collection() {
        let builder = ChangeSetBuilder::new();
        let elements: Vec<_> = (0..8)
            .map(|n| create_test_element(&format!("f{n}"), "Counter.java"))
            .collect();
        for element in &elements {
            builder.add_target(element, "renamed");
        }

        elements.par_iter().for_each(|element| {
            for line in 1..=50 {
                builder.add_reference(&element.key(), reference("Use.java", line));
            }
        });

        let change_set = builder.freeze(0);
        assert_eq!(change_set.target_elements().len(), 8);
        assert_eq!(change_set.reference_count(), 400);
    }

    #[test]
    fn test_duplicate_targets_and_references_collapse() {
        let builder = ChangeSetBuilder::new();
        let count = create_test_element("count", "Counter.java");
        assert!(builder.add_target(&count, "total"));
        assert!(!builder.add_target(&count, "other"));
        builder.add_reference(&count.key(), reference("Main.java", 3));
        builder.add_reference(&count.key(), reference("Main.java", 3));

        let change_set = builder.freeze(0);
        assert_eq!(change_set.reference_count(), 1);
        assert_eq!(
            change_set.target_elements().get(&count.key()).map(String::as_str),
            Some("total")
        );
    }
}
