//! `configurations sources` tests.

use crate::support::*;

#[test]
fn test_sources_in_resolution_order() {
    let t = Test::with_settings(
        "miss_threshold = 7\n[[sources]]\nkind = \"environment\"\n[[sources]]\nkind = \"defaults\"\n",
    );
    let output = t.sources();
    assert_success(&output);

    let out = stdout(&output);
    let environment = out.find("environment").expect("environment listed");
    let defaults = out.find("defaults").expect("defaults listed");
    assert!(environment < defaults);
    assert!(out.contains("miss threshold"));
    assert!(out.contains('7'));
}

#[test]
fn test_sources_json() {
    let t = Test::with_settings("[[sources]]\nkind = \"defaults\"\n[[sources]]\nkind = \"environment\"\n");
    let output = t.cmd().args(["sources", "--json"]).output().unwrap();
    assert_success(&output);

    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        parsed,
        serde_json::json!({"sources": ["defaults", "environment"], "miss_threshold": 5})
    );
}

#[test]
fn test_sources_empty() {
    let t = Test::with_settings("miss_threshold = 5\n");
    let output = t.sources();
    assert_success(&output);
    assert_stdout_contains(&output, "no sources configured");
}

#[test]
fn test_default_sources_without_file() {
    let t = Test::new();
    let output = t.sources();
    assert_success(&output);
    assert_stdout_contains(&output, "environment");
}
