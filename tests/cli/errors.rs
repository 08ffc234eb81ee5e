//! CLI error reporting tests.

use crate::support::*;
use predicates::prelude::*;

#[test]
fn test_missing_value_fails_with_hint() {
    let t = Test::with_settings("[[sources]]\nkind = \"defaults\"\n");
    let output = t.get("NOT_DEFINED_ANYWHERE");
    assert_failure(&output);
    assert_stderr_contains(&output, "no value found for NOT_DEFINED_ANYWHERE");
    assert_stderr_contains(&output, "--default");
}

#[test]
fn test_malformed_settings() {
    let t = Test::with_settings("this is not valid toml { [ }");
    let output = t.get("anything");
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to parse settings");
}

#[test]
fn test_invalid_settings() {
    let t = Test::with_settings("miss_threshold = 0\n");
    let output = t.sources();
    assert_failure(&output);
    assert_stderr_contains(&output, "miss_threshold");
}

#[test]
fn test_unreadable_settings_path() {
    let t = Test::new();
    let dir = t.dir.path().join("a-directory.toml");
    std::fs::create_dir(&dir).unwrap();

    let output = t.cmd().args(["get", "x", "--settings"]).arg(&dir).output().unwrap();
    assert_failure(&output);
    assert_stderr_contains(&output, "failed to read");
}

#[test]
fn test_bad_object_coercion() {
    let t = Test::with_settings("[[sources]]\nkind = \"defaults\"\nvalues = { broken = \"{\" }\n");
    let output = t.get_as("broken", "object");
    assert_failure(&output);
    assert_stderr_contains(&output, "cannot read broken as an object");
}

#[cfg(not(feature = "aws"))]
#[test]
fn test_remote_source_without_feature() {
    let t = Test::with_settings("[[sources]]\nkind = \"secret-store\"\nstore_id = \"prod/app\"\n");
    let output = t.sources();
    assert_failure(&output);
    assert_stderr_contains(&output, "requires the `aws` feature");
    assert_stderr_contains(&output, "--features aws");
}

#[test]
fn test_unknown_coercion_rejected() {
    let t = Test::new();
    t.cmd()
        .args(["get", "x", "--as", "uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'uuid'"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let t = Test::with_settings("[[sources]]\nkind = \"defaults\"\nvalues = { a = 1 }\n");
    t.cmd()
        .args(["--verbose", "get", "a"])
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("source registered"));
}
