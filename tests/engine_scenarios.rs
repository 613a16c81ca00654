//! End-to-end behavior of `PatchEngine::apply_patch` on real files.

mod util;

use std::fs;

use roughpatch::{
    PatchEngine, PatchOperation,
    core::{
        backup::backup_path_for,
        operation::{ConflictResolution, MergeStrategy},
    },
};
use util::{file_fixture, read};

#[test]
fn line_replace_scenario()
{
    let (_tmp, path) = file_fixture("foo\nbar\n");
    let op: PatchOperation = serde_json::from_value(serde_json::json!({
        "type": "line",
        "filePath": path,
        "search": "bar",
        "replace": "baz",
    }))
    .unwrap();

    let result = PatchEngine::default().apply_patch(&op);

    assert!(result.success);
    assert_eq!(result.changes_applied, 1);
    assert!(result.conflicts.is_none());
    assert_eq!(read(&path), "foo\nbaz\n");
}

#[test]
fn protected_delete_scenario()
{
    let (_tmp, path) = file_fixture("x = 1;  // TODO fix\n");
    let op: PatchOperation = serde_json::from_value(serde_json::json!({
        "type": "line",
        "filePath": path,
        "lineNumbers": [1],
    }))
    .unwrap();

    let result = PatchEngine::default().apply_patch(&op);

    assert!(!result.success);
    assert_eq!(result.changes_applied, 0);
    assert_eq!(result.conflict_list(), ["Line 1: Cannot delete protected line".to_string()]);
    assert_eq!(read(&path), "x = 1;  // TODO fix\n");
}

#[test]
fn non_matching_search_leaves_file_byte_identical()
{
    // Mixed endings and trailing blanks would change under normalization
    let body = "a  \r\nb\nc\t\r\n";
    let (_tmp, path) = file_fixture(body);
    let engine = PatchEngine::default();

    for op in [
        PatchOperation::line(&path, "nothing here", "x"),
        PatchOperation::block(&path, "fn missing() {}", "fn found() {}"),
    ]
    {
        let result = engine.apply_patch(&op);
        assert!(result.success, "{result:?}");
        assert_eq!(result.changes_applied, 0);
        assert!(result.conflicts.is_none());
        assert_eq!(fs::read(&path).unwrap(), body.as_bytes());
    }
}

#[test]
fn backup_absent_after_success()
{
    let (_tmp, path) = file_fixture("one\ntwo\n");
    let op = PatchOperation::line(&path, "two", "three").with_backup(true);

    let result = PatchEngine::default().apply_patch(&op);

    assert!(result.success);
    assert_eq!(result.backup_path.as_deref(), Some(backup_path_for(&path).as_path()));
    assert!(!backup_path_for(&path).exists());
    assert_eq!(read(&path), "one\nthree\n");
}

#[test]
fn failed_apply_restores_original_and_removes_backup()
{
    let original = "keep me\r\n  exactly\r\n";
    let (_tmp, path) = file_fixture(original);
    let op = PatchOperation::complete(&path, "\0binary\n").with_backup(true);

    let result = PatchEngine::default().apply_patch(&op);

    assert!(!result.success);
    assert_eq!(result.error_code.as_deref(), Some("rpatch::validation_failed"));
    assert_eq!(result.conflict_list(), ["Content contains NUL bytes".to_string()]);
    assert_eq!(fs::read(&path).unwrap(), original.as_bytes());
    assert!(!backup_path_for(&path).exists());
}

#[test]
fn merge_conflict_revert_and_force()
{
    let engine = PatchEngine::default();

    let (_tmp, path) = file_fixture("a b");
    let revert = PatchOperation::complete(&path, "a x y")
        .with_merge(MergeStrategy::Merge)
        .with_resolution(ConflictResolution::Revert);
    let result = engine.apply_patch(&revert);

    assert!(!result.success);
    assert_eq!(result.conflict_list(), ["Merge conflict at token 2: 'b' vs 'x'".to_string()]);
    assert_eq!(read(&path), "a b");

    let force = PatchOperation::complete(&path, "a x y")
        .with_merge(MergeStrategy::Merge)
        .with_resolution(ConflictResolution::Force);
    let result = engine.apply_patch(&force);

    assert!(result.success);
    assert!(!result.conflict_list().is_empty());
    assert_eq!(read(&path), "a b y");
}

#[test]
fn manual_resolution_behaves_like_revert()
{
    let (_tmp, path) = file_fixture("a b");
    let op = PatchOperation::complete(&path, "a x y")
        .with_merge(MergeStrategy::Smart)
        .with_resolution(ConflictResolution::Manual);

    let result = PatchEngine::default().apply_patch(&op);

    assert!(!result.success);
    assert_eq!(result.error_code.as_deref(), Some("rpatch::conflicts"));
    assert_eq!(read(&path), "a b");
}

#[test]
fn block_replace_keeps_surroundings()
{
    let body = "fn main() {\n    let total = compute(1, 2);\n    println!(\"{total}\");\n}\n";
    let (_tmp, path) = file_fixture(body);
    let op = PatchOperation::block(
        &path,
        "let total = compute(1, 2);",
        "let total = compute(1, 3);",
    );

    let result = PatchEngine::default().apply_patch(&op);

    assert!(result.success, "{result:?}");
    assert_eq!(result.changes_applied, 1);
    assert_eq!(
        read(&path),
        "fn main() {\n    let total = compute(1, 3);\n    println!(\"{total}\");\n}\n"
    );
}

#[test]
fn diff_with_bad_header_still_applies_good_hunks_when_forced()
{
    let (_tmp, path) = file_fixture("a\nb\nc\n");
    let diff = "--- a/file.txt\n+++ b/file.txt\n@@ garbage @@\n@@ -3 +3 @@\n-c\n+C\n";
    let op = PatchOperation::diff(&path, diff).with_resolution(ConflictResolution::Force);

    let result = util::permissive_engine().apply_patch(&op);

    assert!(result.success, "{result:?}");
    assert_eq!(result.changes_applied, 1);
    assert_eq!(result.conflict_list(), ["Hunk 1: malformed header".to_string()]);
    assert_eq!(read(&path), "a\nb\nC\n");
}

#[test]
fn result_json_is_camel_case()
{
    let (_tmp, path) = file_fixture("foo\nbar\n");
    let result = PatchEngine::default().apply_patch(&PatchOperation::line(&path, "bar", "baz"));
    let value = serde_json::to_value(&result).unwrap();

    assert_eq!(value["type"], "line");
    assert_eq!(value["changesApplied"], 1);
    assert_eq!(value["originalLines"], 2);
    assert_eq!(value["newLines"], 2);
    assert!(value.get("error").is_none());
}
