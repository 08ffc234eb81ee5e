//! `configurations get` tests.

use crate::support::*;

const SETTINGS: &str = r#"
[[sources]]
kind = "defaults"
values = { aboolean = true, anumber = 1, text_flag = "TRUE", db = '{"host": "db", "port": 5432}', when = 2012-04-23T18:25:43Z }

[[sources]]
kind = "environment"
"#;

#[test]
fn test_get_string() {
    let t = Test::with_settings(SETTINGS);
    assert_prints(&t.get("anumber"), "1");
    assert_prints(&t.get("aboolean"), "true");
}

#[test]
fn test_get_date_prints_rfc3339() {
    let t = Test::with_settings(SETTINGS);
    assert_prints(&t.get("when"), "2012-04-23T18:25:43.000Z");
}

#[test]
fn test_get_with_coercions() {
    let t = Test::with_settings(SETTINGS);
    assert_prints(&t.get_as("text_flag", "boolean"), "true");
    assert_prints(&t.get_as("anumber", "number"), "1");
    assert_prints(&t.get_as("text_flag", "number"), "NaN");

    let output = t.get_as("db", "object");
    assert_success(&output);
    let parsed: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(parsed, serde_json::json!({"host": "db", "port": 5432}));
}

#[test]
fn test_defaults_win_over_environment() {
    let t = Test::with_settings(SETTINGS);
    let output = t
        .cmd()
        .args(["get", "anumber"])
        .env("anumber", "from-env")
        .output()
        .unwrap();
    assert_prints(&output, "1");
}

#[test]
fn test_environment_used_when_defaults_lack_name() {
    let t = Test::with_settings(SETTINGS);
    let output = t
        .cmd()
        .args(["get", "CONFIGURATIONS_CLI_TEST_VALUE"])
        .env("CONFIGURATIONS_CLI_TEST_VALUE", "from-env")
        .output()
        .unwrap();
    assert_prints(&output, "from-env");
}

#[test]
fn test_get_default_for_missing_name() {
    let t = Test::with_settings(SETTINGS);
    assert_prints(&t.get_or("CONFIGURATIONS_CLI_TEST_MISSING", "fallback"), "fallback");
}

#[test]
fn test_without_settings_file_reads_environment() {
    let t = Test::new();
    let output = t
        .cmd()
        .args(["get", "CONFIGURATIONS_CLI_TEST_VALUE"])
        .env("CONFIGURATIONS_CLI_TEST_VALUE", "env-only")
        .output()
        .unwrap();
    assert_prints(&output, "env-only");
}

#[test]
fn test_settings_path_from_flag_and_env() {
    let t = Test::new();
    let custom = t.dir.path().join("custom.toml");
    std::fs::write(&custom, "[[sources]]\nkind = \"defaults\"\nvalues = { picked = \"custom\" }\n")
        .unwrap();

    let output = t
        .cmd()
        .args(["get", "picked", "--settings"])
        .arg(&custom)
        .output()
        .unwrap();
    assert_prints(&output, "custom");

    let output = t
        .cmd()
        .args(["get", "picked"])
        .env("CONFIGURATIONS_SETTINGS", &custom)
        .output()
        .unwrap();
    assert_prints(&output, "custom");
}
