mod common;

use common::{counter, SnapshotBuilder, COUNTER_JAVA};
use std::sync::Arc;
use symbridge::{
    BridgeResponse, CancelFlag, SafeDeleteOutcome, SemanticIndex, Target, TextRange,
};

#[tokio::test]
async fn test_field_rename_propagates_to_accessors() {
    let (index, context) = counter().into_context();

    let outcome = context
        .rename(&Target::position("Counter.java", 2, 17), "total", &CancelFlag::new())
        .await
        .unwrap();

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

#[tokio::test]
async fn test_rename_round_trip_restores_files() {
    let (index, context) = counter().into_context();
    let cancel = CancelFlag::new();
    let before = index.snapshot();

    context
        .rename(&Target::qualified("Counter.count"), "total", &cancel)
        .await
        .unwrap();
    assert_ne!(index.snapshot().files, before.files);

    context
        .rename(&Target::position("Counter.java", 2, 17), "count", &cancel)
        .await
        .unwrap();
    let after = index.snapshot();
    assert_eq!(after.files, before.files);
    assert_eq!(after.references, before.references);
}

#[tokio::test]
async fn test_rename_from_a_usage_renames_the_declaration() {
    let (index, context) = counter().into_context();

    // cursor on the getCount() call in Main.java
    context
        .rename(&Target::position("Main.java", 2, 41), "current", &CancelFlag::new())
        .await
        .unwrap();

    assert!(index
        .file_text("Counter.java")
        .unwrap()
        .unwrap()
        .contains("int current() { return count; }"));
    assert!(index
        .file_text("Main.java")
        .unwrap()
        .unwrap()
        .contains("c.setCount(c.current() + 1)"));
}

#[tokio::test]
async fn test_invalid_name_is_rejected_without_changes() {
    let (index, context) = counter().into_context();
    let hash = index.content_hash("Counter.java");

    let err = context
        .rename(&Target::qualified("Counter.count"), "class", &CancelFlag::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-name");
    assert_eq!(index.content_hash("Counter.java"), hash);
}

#[tokio::test]
async fn test_safe_delete_is_gated_by_usages() {
    let (index, context) = counter().into_context();
    let cancel = CancelFlag::new();
    let hash = index.content_hash("Counter.java");

    let outcome = context
        .safe_delete(&Target::qualified("Counter.getCount"), false, &cancel)
        .await
        .unwrap();
    let SafeDeleteOutcome::Blocked(report) = &outcome else {
        panic!("expected a blocked delete, got {outcome:?}");
    };
    assert!(!report.can_delete);
    assert_eq!(report.usage_count, 1);
    assert_eq!(report.blocking_usages[0].file, "Main.java");
    assert_eq!(index.content_hash("Counter.java"), hash);

    let response = BridgeResponse::from_safe_delete(Ok(outcome));
    assert_eq!(response.code, "refactoring-conflict");

    let forced = context
        .safe_delete(&Target::qualified("Counter.getCount"), true, &cancel)
        .await
        .unwrap();
    let SafeDeleteOutcome::Deleted(deleted) = forced else {
        panic!("expected a forced delete");
    };
    assert_eq!(deleted.changes_count, 1);
    assert!(deleted.message.contains("dangling"));
    assert_ne!(index.content_hash("Counter.java"), hash);
    assert!(!index.file_text("Counter.java").unwrap().unwrap().contains("getCount"));
}

#[tokio::test]
async fn test_unused_declaration_is_deleted() {
    let (index, context) = counter().into_context();

    let outcome = context
        .safe_delete(&Target::qualified("Main.run"), false, &CancelFlag::new())
        .await
        .unwrap();
    assert!(matches!(outcome, SafeDeleteOutcome::Deleted(_)));
    assert_eq!(index.file_text("Main.java").unwrap().unwrap(), "class Main {\n}");
    assert_eq!(index.file_text("Counter.java").unwrap().unwrap(), COUNTER_JAVA);
}

const BILLING_JAVA: &str = "\
class Billing {
    int total(int price, int qty) {
        int net = price * qty;
        return net + net / 10;
    }
}";

fn billing() -> SnapshotBuilder {
    SnapshotBuilder::new(&["java"])
        .file("Billing.java", BILLING_JAVA)
        .declare("billing", "java", "class", "Billing", "Billing.java", (1, 7), Some((1, 6)), None)
        .declare("total", "java", "method", "Billing.total", "Billing.java", (2, 9), Some((2, 5)), Some("billing"))
}

#[tokio::test]
async fn test_extract_variable() {
    let (index, context) = billing().into_context();

    // `net / 10`
    let outcome = context
        .extract_variable("Billing.java", TextRange::new(4, 22, 4, 30), "tax", &CancelFlag::new())
        .await
        .unwrap();
    assert!(outcome.success);

    let text = index.file_text("Billing.java").unwrap().unwrap();
    assert!(text.contains("        var tax = net / 10;\n        return net + tax;"));
}

#[tokio::test]
async fn test_extract_rejects_bad_selections() {
    let (index, context) = billing().into_context();
    let cancel = CancelFlag::new();

    let err = context
        .extract_variable("Billing.java", TextRange::new(3, 19, 4, 10), "x", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-range");

    // `net` is already taken in this method
    let err = context
        .extract_variable("Billing.java", TextRange::new(4, 22, 4, 30), "net", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-name");
    assert_eq!(index.file_text("Billing.java").unwrap().unwrap(), BILLING_JAVA);
}

#[tokio::test]
async fn test_extract_outside_any_declaration() {
    let (index, context) = billing()
        .file("Limits.java", "int limit = 10 + 2;")
        .into_context();
    let cancel = CancelFlag::new();

    let err = context
        .extract_variable("Limits.java", TextRange::new(1, 13, 1, 19), "base", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-range");

    let err = context
        .extract_method("Missing.java", TextRange::lines(1, 2), "helper", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-range");
    assert_eq!(index.modification_stamp(), 0);
}

#[tokio::test]
async fn test_stale_reference_aborts_the_whole_rename() {
    // the recorded usage no longer lines up with the source text
    let (index, context) = counter()
        .reference("count", "Main.java", (1, 1), "read")
        .into_context();
    let before = index.snapshot();

    let err = context
        .rename(&Target::qualified("Counter.count"), "total", &CancelFlag::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "refactoring-conflict");
    assert!(!err.is_retryable());
    assert_eq!(index.snapshot().files, before.files);
    assert_eq!(index.snapshot().references, before.references);
}

#[tokio::test]
async fn test_cancelled_refactoring_changes_nothing() {
    let (index, context) = counter().into_context();
    let before = index.snapshot();
    let cancel = CancelFlag::new();
    cancel.cancel();

    let err = context
        .rename(&Target::qualified("Counter.count"), "total", &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "cancelled");
    assert_eq!(index.snapshot().files, before.files);
}

#[tokio::test]
async fn test_concurrent_navigation_during_refactoring() {
    let (index, context) = counter().into_context();
    let context = Arc::new(context);

    let reader = {
        let context = context.clone();
        tokio::task::spawn_blocking(move || {
            for _ in 0..50 {
                let result = context.implementations(&Target::qualified("Counter"), &CancelFlag::new());
                assert!(result.is_ok());
            }
        })
    };
    context
        .rename(&Target::qualified("Counter.count"), "total", &CancelFlag::new())
        .await
        .unwrap();
    reader.await.unwrap();

    assert!(index.file_text("Counter.java").unwrap().unwrap().contains("getTotal"));
}

#[tokio::test]
async fn test_refactoring_needs_conventions() {
    let (_, context) = SnapshotBuilder::new(&["java"])
        .file("lib.ex", "defmodule Lib do\nend")
        .declare("lib", "elixir", "module", "Lib", "lib.ex", (1, 11), Some((1, 2)), None)
        .into_context();

    let err = context
        .rename(&Target::qualified("Lib"), "Core", &CancelFlag::new())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "no-handler-for-language");
}
