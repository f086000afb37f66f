//! CLI integration tests for celldex commands.
//!
//! These tests focus on exit codes and basic behavioral verification,
//! not specific output formatting which may change.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{fs, path::PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SCHEMA: &str = r#"
[fields.name]
type = "string"
case_sensitive = false

[fields.bio]
type = "text"

[fields.age]
type = "integer"

[fields.tags]
type = "string"
"#;

const TABLE: &str = r#"
partition_key = [{ name = "id", type = "int" }]
columns = [
    { name = "name", type = "text" },
    { name = "bio", type = "text" },
    { name = "age", type = "int" },
    { name = "tags", type = "set<text>" },
]
"#;

const ROWS: &str = r#"[
    {"partition_key": [1], "columns": {"name": "Ann", "bio": "writes databases", "age": 42, "tags": ["rust", "db"]}},
    {"partition_key": [2], "columns": {"name": "Bob", "bio": "tends gardens", "age": 35, "tags": ["garden"]}},
    {"partition_key": [3], "columns": {"name": "Cid", "bio": "databases and gardens", "age": 51}}
]"#;

/// Helper to get a celldex command.
fn celldex() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("celldex").unwrap()
}

/// A directory holding the schema, table and rows fixtures.
struct Fixture {
    /// Backing directory.
    dir: TempDir,
}

impl Fixture {
    /// Writes the default fixtures into a fresh directory.
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("schema.toml"), SCHEMA).unwrap();
        fs::write(dir.path().join("table.toml"), TABLE).unwrap();
        fs::write(dir.path().join("rows.json"), ROWS).unwrap();
        Self { dir }
    }

    /// Path of a file inside the fixture directory.
    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes an extra file and returns its path.
    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

mod check {
    use super::*;

    #[test]
    fn valid_schema_succeeds() {
        let fx = Fixture::new();
        celldex()
            .arg("check")
            .arg(fx.path("schema.toml"))
            .arg("--table")
            .arg(fx.path("table.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains("age"))
            .stdout(predicate::str::contains("No issues found."));
    }

    #[test]
    fn warnings_exit_with_failure() {
        let fx = Fixture::new();
        let schema = fx.write(
            "warn.toml",
            "[analyzers.unused]\ntype = \"whitespace\"\n\n[fields.name]\ntype = \"string\"\n",
        );
        celldex()
            .arg("check")
            .arg(schema)
            .assert()
            .failure()
            .stdout(predicate::str::contains("Warnings (1)"))
            .stdout(predicate::str::contains("unused"));
    }

    #[test]
    fn field_missing_from_table_fails() {
        let fx = Fixture::new();
        let table = fx.write(
            "narrow.toml",
            "partition_key = [{ name = \"id\", type = \"int\" }]\n",
        );
        celldex()
            .arg("check")
            .arg(fx.path("schema.toml"))
            .arg("--table")
            .arg(table)
            .assert()
            .failure()
            .stderr(predicate::str::contains("error:"));
    }

    #[test]
    fn missing_schema_fails() {
        let fx = Fixture::new();
        celldex()
            .arg("check")
            .arg(fx.path("missing.toml"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("error: failed to load schema"));
    }
}

mod encode {
    use super::*;

    #[test]
    fn folds_case_of_strings() {
        let fx = Fixture::new();
        celldex()
            .arg("encode")
            .arg(fx.path("schema.toml"))
            .args(["name", "Ann"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Encoded: \"ann\""));
    }

    #[test]
    fn encodes_numbers() {
        let fx = Fixture::new();
        celldex()
            .arg("encode")
            .arg(fx.path("schema.toml"))
            .args(["age", "42"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Encoded: 42"));
    }

    #[test]
    fn rejects_values_the_mapper_cannot_take() {
        let fx = Fixture::new();
        celldex()
            .arg("encode")
            .arg(fx.path("schema.toml"))
            .args(["age", "old"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("error:"));
    }

    #[test]
    fn unknown_field_fails() {
        let fx = Fixture::new();
        celldex()
            .arg("encode")
            .arg(fx.path("schema.toml"))
            .args(["nickname", "x"])
            .assert()
            .failure();
    }
}

mod explain {
    use super::*;

    #[test]
    fn shows_compiled_search() {
        let fx = Fixture::new();
        celldex()
            .arg("explain")
            .arg(fx.path("schema.toml"))
            .arg(r#"{"filter": {"type": "range", "field": "age", "lower": 40}, "sort": [{"field": "age", "reverse": true}]}"#)
            .assert()
            .success()
            .stdout(predicate::str::contains("Range(age in"))
            .stdout(predicate::str::contains("age desc"))
            .stdout(predicate::str::contains("Uses sorting: yes"));
    }

    #[test]
    fn reads_search_from_file() {
        let fx = Fixture::new();
        let search = fx.write("search.json", r#"{"query": {"type": "prefix", "field": "name", "value": "A"}}"#);
        celldex()
            .arg("explain")
            .arg(fx.path("schema.toml"))
            .arg("--file")
            .arg(search)
            .assert()
            .success()
            .stdout(predicate::str::contains("Prefix(name"));
    }

    #[test]
    fn unknown_condition_type_gives_hint() {
        let fx = Fixture::new();
        celldex()
            .arg("explain")
            .arg(fx.path("schema.toml"))
            .arg(r#"{"query": {"type": "nope", "field": "name"}}"#)
            .assert()
            .failure()
            .stderr(predicate::str::contains("hint:"));
    }

    #[test]
    fn unsupported_operation_fails() {
        let fx = Fixture::new();
        celldex()
            .arg("explain")
            .arg(fx.path("schema.toml"))
            .arg(r#"{"filter": {"type": "prefix", "field": "age", "value": "4"}}"#)
            .assert()
            .failure()
            .stderr(predicate::str::contains("not supported"));
    }
}

mod extract {
    use super::*;

    #[test]
    fn lists_cells_as_json() {
        let fx = Fixture::new();
        let output = celldex()
            .arg("extract")
            .arg(fx.path("table.toml"))
            .arg(fx.path("rows.json"))
            .arg("--schema")
            .arg(fx.path("schema.toml"))
            .arg("--json")
            .output()
            .unwrap();
        assert!(output.status.success());

        let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 3);
        let fields: Vec<&str> = rows[0]
            .as_array()
            .unwrap()
            .iter()
            .map(|cell| cell["field"].as_str().unwrap())
            .collect();
        assert!(fields.contains(&"tags.rust"));
        assert!(fields.contains(&"id"));
    }

    #[test]
    fn rejects_unknown_columns() {
        let fx = Fixture::new();
        let row = fx.write("bad.json", r#"{"partition_key": [1], "columns": {"nope": 1}}"#);
        celldex()
            .arg("extract")
            .arg(fx.path("table.toml"))
            .arg(row)
            .assert()
            .failure()
            .stderr(predicate::str::contains("error: row 1"));
    }
}

mod search {
    use super::*;

    #[test]
    fn finds_rows_in_json() {
        let fx = Fixture::new();
        let output = celldex()
            .arg("search")
            .arg(fx.path("schema.toml"))
            .arg(fx.path("table.toml"))
            .arg(r#"{"query": {"type": "match", "field": "bio", "value": "databases"}, "sort": [{"field": "age"}]}"#)
            .arg("--rows")
            .arg(fx.path("rows.json"))
            .arg("--json")
            .output()
            .unwrap();
        assert!(output.status.success());

        let hits: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let keys: Vec<&str> = hits
            .as_array()
            .unwrap()
            .iter()
            .map(|hit| hit["row_key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["00000001", "00000003"]);
    }

    #[test]
    fn keeps_index_on_disk() {
        let fx = Fixture::new();
        let index = fx.path("index");
        celldex()
            .arg("search")
            .arg(fx.path("schema.toml"))
            .arg(fx.path("table.toml"))
            .arg("{}")
            .arg("--rows")
            .arg(fx.path("rows.json"))
            .arg("--index")
            .arg(&index)
            .assert()
            .success();

        celldex()
            .arg("search")
            .arg(fx.path("schema.toml"))
            .arg(fx.path("table.toml"))
            .arg(r#"{"filter": {"type": "match", "field": "tags", "value": "garden"}}"#)
            .arg("--index")
            .arg(&index)
            .assert()
            .success()
            .stdout(predicate::str::contains("00000002"));
    }

    #[test]
    fn empty_result_is_not_an_error() {
        let fx = Fixture::new();
        celldex()
            .arg("search")
            .arg(fx.path("schema.toml"))
            .arg(fx.path("table.toml"))
            .arg(r#"{"query": {"type": "match", "field": "name", "value": "zed"}}"#)
            .arg("--rows")
            .arg(fx.path("rows.json"))
            .assert()
            .success()
            .stdout(predicate::str::contains("No matches."));
    }

    #[test]
    fn invalid_search_fails_before_indexing() {
        let fx = Fixture::new();
        celldex()
            .arg("search")
            .arg(fx.path("schema.toml"))
            .arg(fx.path("table.toml"))
            .arg(r#"{"query": {"type": "match", "field": "nickname", "value": "x"}}"#)
            .arg("--rows")
            .arg(fx.path("rows.json"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid search"));
    }
}
