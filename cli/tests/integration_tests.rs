use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn schema_inherit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_schema-inherit"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run schema-inherit")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write fixture");
    path
}

/// Directory with a small diamond: `d` extends `b` and `c`, both extend `a`.
fn diamond_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    write(dir.path(), "a.yaml", "kind: base\ntags: [a]\n");
    write(dir.path(), "b.yaml", "extends: a\nk: 1\ntags: [b]\n");
    write(dir.path(), "c.yaml", "extends: a\nk: 2\ntags: [c]\n");
    write(dir.path(), "d.yaml", "extends: [b, c]\nown: true\n");
    dir
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

#[test]
fn merge_prints_json_for_directory() {
    let dir = diamond_dir();
    let output = schema_inherit(&["merge", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let merged: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        merged["d"],
        serde_json::json!({ "kind": "base", "tags": ["c"], "k": 2, "own": true })
    );
    assert_eq!(merged["a"], serde_json::json!({ "kind": "base", "tags": ["a"] }));
}

#[test]
fn merge_flags_override_policy() {
    let dir = diamond_dir();
    let output = schema_inherit(&[
        "merge",
        dir.path().to_str().unwrap(),
        "--sequences",
        "merge",
        "--keep-id",
        "--only",
        "d",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let merged: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let object = merged.as_object().unwrap();
    assert_eq!(object.keys().collect::<Vec<_>>(), vec!["d"]);
    assert_eq!(merged["d"]["id"], "d");
    assert_eq!(merged["d"]["tags"], serde_json::json!(["a", "b", "c"]));
}

#[test]
fn merge_writes_yaml_file() {
    let dir = diamond_dir();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("merged.yaml");

    let output = schema_inherit(&[
        "merge",
        dir.path().to_str().unwrap(),
        "--format",
        "yaml",
        "--output",
        target.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Wrote 4 fragment(s)"));

    let written: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(written["b"]["k"].as_i64(), Some(1));
}

#[test]
fn merge_uses_config_and_exclusions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "base.yaml", "a:\n  kind: base\n");
    write(dir.path(), "leaf.json", r#"{"b": {"extends": "a", "k": 1}}"#);
    let config = write(
        dir.path(),
        "run.yml",
        "version: \"1.0\"\nsources: [base.yaml, leaf.json]\nexclude: [a]\nmerge:\n  omit_id: false\n",
    );

    let output = schema_inherit(&["merge", "--config", config.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let merged: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(
        merged,
        serde_json::json!({ "b": { "id": "b", "kind": "base", "k": 1 } })
    );
}

#[test]
fn merge_rejects_unknown_only_id() {
    let dir = diamond_dir();
    let output = schema_inherit(&["merge", dir.path().to_str().unwrap(), "--only", "zzz"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unknown fragment 'zzz'"));
}

#[test]
fn merge_without_sources_fails() {
    let output = schema_inherit(&["merge"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).starts_with("error: "));
}

// ---------------------------------------------------------------------------
// order / check
// ---------------------------------------------------------------------------

#[test]
fn order_lists_ancestors_first() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(
        dir.path(),
        "fragments.json",
        r#"{"leaf": {"extends": "mid"}, "mid": {"extends": "root"}, "root": {}}"#,
    );

    let output = schema_inherit(&["order", file.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "root\nmid\nleaf\n");
}

#[test]
fn check_reports_fragment_count() {
    let dir = diamond_dir();
    let output = schema_inherit(&["check", dir.path().to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "Resolved 4 fragment(s).");
}

#[test]
fn check_fails_on_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.yaml", "extends: b\n");
    write(dir.path(), "b.yaml", "extends: a\n");

    let output = schema_inherit(&["check", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("cyclic"), "stderr: {}", stderr(&output));
}

#[test]
fn check_fails_on_unknown_parent() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.yaml", "extends: ghost\n");

    let output = schema_inherit(&["check", dir.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("ghost"));
}
