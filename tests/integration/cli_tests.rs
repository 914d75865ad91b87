//! CLI integration tests.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn depwatch() -> Command {
    Command::cargo_bin("depwatch").expect("binary built")
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

#[test]
fn test_cli_help() {
    depwatch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("depwatch"))
        .stdout(predicate::str::contains("--once"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_cli_version() {
    depwatch()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("depwatch"));
}

#[test]
fn test_init_scaffolds_project() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{ "name": "demo", "scripts": { "build": "tsc" } }"#,
    );

    depwatch()
        .arg(dir.path())
        .arg("init")
        .assert()
        .success();

    assert!(dir.path().join(".depwatch.yml").exists());
    let manifest = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
    assert!(manifest.contains("watch-imports"));
    assert!(manifest.contains("build"));
}

#[test]
fn test_init_fails_on_missing_directory() {
    depwatch()
        .arg("/nonexistent/depwatch-project")
        .arg("init")
        .assert()
        .failure();
}

#[test]
fn test_once_dry_run_reports_plan() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{ "name": "demo", "dependencies": { "lodash": "^4.0.0" } }"#,
    );
    write(
        dir.path(),
        "index.js",
        "const _ = require('lodash');\nconst axios = require('axios');\naxios.get('/');\n",
    );

    depwatch()
        .arg(dir.path())
        .arg("--once")
        .arg("--dry-run")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("axios"))
        .stdout(predicate::str::contains("lodash"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn test_once_on_synced_project_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{ "name": "demo", "dependencies": { "axios": "^1.0.0" } }"#,
    );
    write(dir.path(), "index.js", "const axios = require('axios');\naxios.get('/');\n");

    depwatch()
        .arg(dir.path())
        .arg("--once")
        .arg("--dry-run")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dependency changes").not());
}

#[test]
fn test_empty_project_still_syncs_manifest() {
    // With no source files the used set is empty, but essential packages
    // must still be ensured and stale declared dependencies removed.
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "package.json",
        r#"{ "name": "demo", "dependencies": { "stale-lib": "^1.0.0" } }"#,
    );
    write(
        dir.path(),
        ".depwatch.yml",
        "ignored_packages: []\nessential_packages:\n  - typescript\n",
    );

    depwatch()
        .arg(dir.path())
        .arg("--once")
        .arg("--dry-run")
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("typescript"))
        .stdout(predicate::str::contains("stale-lib"))
        .stdout(predicate::str::contains("Dry run"));
}

#[test]
fn test_once_without_manifest_fails_cycle() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "index.js", "const axios = require('axios');\naxios.get('/');\n");

    depwatch()
        .arg(dir.path())
        .arg("--once")
        .arg("--quiet")
        .assert()
        .failure();
}
