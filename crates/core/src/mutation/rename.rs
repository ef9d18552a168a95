use rayon::prelude::*;
use tracing::{debug, info};

use super::{ChangeSet, ChangeSetBuilder, MutationCoordinator, MutationOutcome};
use crate::error::{MutationError, MutationResult};
use crate::index::SearchScope;
use crate::model::{ElementKind, SemanticElement};

impl MutationCoordinator<'_> {
    /// Phase 1 of a rename: resolve the target, gather the elements renamed
    /// with it and collect every reference to each of them concurrently.
    pub fn prepare_rename(
        &self,
        element: &SemanticElement,
        new_name: &str,
    ) -> MutationResult<ChangeSet> {
        self.ensure_ready()?;
        let target = self.resolve_target(element)?;
        self.validate_new_name(&target.name, new_name)?;
        let stamp = self.index.modification_stamp();

        let related = self.related_renames(&target, new_name)?;
        let builder = ChangeSetBuilder::new();
        for (element, name) in &related {
            self.validate_new_name(&element.name, name)?;
            builder.add_target(element, name);
        }
        debug!(
            target = %target.display_name(),
            related = builder.target_count(),
            "collecting references for rename"
        );

        related
            .par_iter()
            .try_for_each(|(element, _)| self.collect_references(&builder, element))?;

        Ok(builder.freeze(stamp))
    }

    /// Phase 2 of a rename: references first, then declarations, in one transaction.
    pub fn apply_rename(&self, change_set: ChangeSet) -> MutationResult<MutationOutcome> {
        let targets = change_set.target_elements();
        self.commit(change_set.stamp(), |tx| {
            for (key, references) in change_set.collected_references() {
                let (Some(old_name), Some(new_name)) = (change_set.old_name(key), targets.get(key))
                else {
                    continue;
                };
                for reference in references {
                    tx.rewrite_reference(reference, old_name, new_name)?;
                }
            }
            for (key, new_name) in targets {
                if let Some(id) = change_set.declaration(key) {
                    tx.rename_declaration(id, new_name)?;
                }
            }
            Ok(())
        })?;

        let message = format!(
            "Renamed {} element(s) and {} reference(s) across {} file(s)",
            targets.len(),
            change_set.reference_count(),
            change_set.affected_files().len()
        );
        info!("{message}");
        Ok(MutationOutcome::committed(
            change_set.affected_files(),
            targets.len(),
            message,
        ))
    }

    /// The target plus every element that must change name with it.
    ///
    /// Fields bring their accessors and same-named constructor parameters;
    /// methods bring every transitive overrider.
    pub fn related_renames(
        &self,
        target: &SemanticElement,
        new_name: &str,
    ) -> MutationResult<Vec<(SemanticElement, String)>> {
        let mut related = vec![(target.clone(), new_name.to_string())];

        if target.kind.is_field() {
            related.extend(self.field_companions(target, new_name)?);
        } else if target.kind.is_callable() && target.kind != ElementKind::Constructor {
            for overrider in self.traversal().all_overriders(target)? {
                related.push((overrider, new_name.to_string()));
            }
        }
        Ok(related)
    }

    fn field_companions(
        &self,
        field: &SemanticElement,
        new_name: &str,
    ) -> MutationResult<Vec<(SemanticElement, String)>> {
        let Some(owner_id) = &field.container else {
            return Ok(Vec::new());
        };
        let Some(owner) = self.index.element(owner_id)? else {
            return Ok(Vec::new());
        };

        let old_accessors = self.conventions.accessor_names(&field.name);
        let new_accessors = self.conventions.accessor_names(new_name);
        let mut companions = Vec::new();

        for member in self.index.members(&owner)? {
            self.checkpoint()?;
            if member.kind == ElementKind::Constructor {
                for parameter in self.index.members(&member)? {
                    if parameter.kind == ElementKind::Parameter && parameter.name == field.name {
                        companions.push((parameter, new_name.to_string()));
                    }
                }
            } else if member.kind.is_callable() {
                let accessor = old_accessors
                    .iter()
                    .position(|name| *name == member.name)
                    .and_then(|position| new_accessors.get(position));
                if let Some(renamed) = accessor {
                    companions.push((member, renamed.clone()));
                }
            }
        }
        Ok(companions)
    }

    fn collect_references(
        &self,
        builder: &ChangeSetBuilder,
        element: &SemanticElement,
    ) -> MutationResult<()> {
        let key = element.key();
        for reference in self.index.find_references(element, SearchScope::Project)? {
            self.checkpoint()?;
            builder.add_reference(&key, reference);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelFlag;
    use crate::index::SemanticIndex;
    use crate::memory_index::MemoryIndex;
    use crate::mutation::test_support::BraceConventions;
    use serde_json::json;

    const COUNTER: &str = "\
class Counter {
    private int count;
    Counter(int count) { this.count = count; }
    int getCount() { return count; }
    void setCount(int value) { count = value; }
}";

    const MAIN: &str = "\
class Main {
    void run(Counter c) { c.setCount(c.getCount() + 1); }
}";

    fn counter_index() -> MemoryIndex {
        let snapshot = json!({
            "languages": ["java"],
            "files": { "Counter.java": COUNTER, "Main.java": MAIN },
            "elements": [
                { "id": "counter", "language": "java", "kind": "class", "name": "Counter",
                  "qualified_name": "Counter",
                  "location": { "file": "Counter.java", "line": 1, "column": 7 },
                  "body": { "start": 1, "end": 6 } },
                { "id": "count", "language": "java", "kind": "field", "name": "count",
                  "qualified_name": "Counter.count", "container": "counter",
                  "location": { "file": "Counter.java", "line": 2, "column": 17 } },
                { "id": "ctor", "language": "java", "kind": "constructor", "name": "Counter",
                  "qualified_name": "Counter.Counter", "container": "counter",
                  "location": { "file": "Counter.java", "line": 3, "column": 5 },
                  "body": { "start": 3, "end": 3 } },
                { "id": "ctor_count", "language": "java", "kind": "parameter", "name": "count",
                  "container": "ctor",
                  "location": { "file": "Counter.java", "line": 3, "column": 17 } },
                { "id": "get", "language": "java", "kind": "method", "name": "getCount",
                  "qualified_name": "Counter.getCount", "container": "counter",
                  "location": { "file": "Counter.java", "line": 4, "column": 9 },
                  "body": { "start": 4, "end": 4 } },
                { "id": "set", "language": "java", "kind": "method", "name": "setCount",
                  "qualified_name": "Counter.setCount", "container": "counter",
                  "location": { "file": "Counter.java", "line": 5, "column": 10 },
                  "body": { "start": 5, "end": 5 } },
                { "id": "main", "language": "java", "kind": "class", "name": "Main",
                  "qualified_name": "Main",
                  "location": { "file": "Main.java", "line": 1, "column": 7 },
                  "body": { "start": 1, "end": 3 } }
            ],
            "references": [
                { "target": "count", "file": "Counter.java", "line": 3, "column": 31, "kind": "write" },
                { "target": "ctor_count", "file": "Counter.java", "line": 3, "column": 39, "kind": "read" },
                { "target": "count", "file": "Counter.java", "line": 4, "column": 29, "kind": "read" },
                { "target": "count", "file": "Counter.java", "line": 5, "column": 32, "kind": "write" },
                { "target": "set", "file": "Main.java", "line": 2, "column": 29, "kind": "call" },
                { "target": "get", "file": "Main.java", "line": 2, "column": 40, "kind": "call" }
            ]
        });
        MemoryIndex::from_json(&snapshot.to_string()).unwrap()
    }

    #[test]
    fn test_field_rename_propagates_to_accessors_and_parameter() {
        let index = counter_index();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions);
        let field = index.element(&"count".into()).unwrap().unwrap();

        let change_set = coordinator.prepare_rename(&field, "total").unwrap();
        assert_eq!(change_set.target_elements().len(), 4);
        assert_eq!(change_set.reference_count(), 6);

        let outcome = coordinator.apply_rename(change_set).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.changes_count, 4);
        assert_eq!(outcome.affected_files, vec!["Counter.java", "Main.java"]);

        let counter = index.file_text("Counter.java").unwrap().unwrap();
        assert!(counter.contains("private int total;"));
        assert!(counter.contains("Counter(int total) { this.total = total; }"));
        assert!(counter.contains("int getTotal() { return total; }"));
        assert!(counter.contains("void setTotal(int value) { total = value; }"));
        let main = index.file_text("Main.java").unwrap().unwrap();
        assert!(main.contains("c.setTotal(c.getTotal() + 1)"));
    }

    #[test]
    fn test_rename_round_trip_restores_text() {
        let index = counter_index();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions);
        let before = index.snapshot();

        let field = index.element(&"count".into()).unwrap().unwrap();
        let forward = coordinator.prepare_rename(&field, "total").unwrap();
        coordinator.apply_rename(forward).unwrap();

        let field = index.element(&"count".into()).unwrap().unwrap();
        let back = coordinator.prepare_rename(&field, "count").unwrap();
        coordinator.apply_rename(back).unwrap();

        let after = index.snapshot();
        assert_eq!(after.files, before.files);
        assert_eq!(after.references, before.references);
    }

    #[test]
    fn test_stale_change_set_is_a_conflict() {
        let index = counter_index();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions);
        let getter = index.element(&"get".into()).unwrap().unwrap();
        let stale = coordinator.prepare_rename(&getter, "fetchCount").unwrap();

        let field = index.element(&"count".into()).unwrap().unwrap();
        let fresh = coordinator.prepare_rename(&field, "total").unwrap();
        coordinator.apply_rename(fresh).unwrap();

        let hash = index.content_hash("Counter.java");
        assert!(matches!(
            coordinator.apply_rename(stale),
            Err(MutationError::Conflict(_))
        ));
        assert_eq!(index.content_hash("Counter.java"), hash);
    }

    #[test]
    fn test_invalid_and_unchanged_names_are_rejected() {
        let index = counter_index();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions);
        let field = index.element(&"count".into()).unwrap().unwrap();

        assert!(matches!(
            coordinator.prepare_rename(&field, "1abc"),
            Err(MutationError::InvalidName { .. })
        ));
        assert!(matches!(
            coordinator.prepare_rename(&field, "count"),
            Err(MutationError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_cancelled_prepare_leaves_index_untouched() {
        let index = counter_index();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions).with_cancel(cancel);
        let field = index.element(&"count".into()).unwrap().unwrap();

        assert_eq!(
            coordinator.prepare_rename(&field, "total"),
            Err(MutationError::Cancelled)
        );
        assert_eq!(index.modification_stamp(), 0);
    }

    #[test]
    fn test_rename_from_usage_resolves_declaration() {
        let index = counter_index();
        let coordinator = MutationCoordinator::new(&index, &BraceConventions);
        let usage = index.resolve_at("Main.java", 2, 42).unwrap().unwrap();
        assert_eq!(usage.kind, ElementKind::Usage);

        let change_set = coordinator.prepare_rename(&usage, "fetchCount").unwrap();
        assert_eq!(change_set.target_elements().len(), 1);
        coordinator.apply_rename(change_set).unwrap();
        let main = index.file_text("Main.java").unwrap().unwrap();
        assert!(main.contains("c.fetchCount()"));
    }
}
