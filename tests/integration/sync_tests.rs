//! Integration tests for manifest diffing and plan application.

use depwatch::sync::{Confirmer, InteractivePrompt, SyncOptions, Synchronizer};
use depwatch::{Config, PackageJson, SyncPlan, UsedPackages};
use std::path::{Path, PathBuf};

fn used(packages: &[&str]) -> UsedPackages {
    let mut set = UsedPackages::new();
    for pkg in packages {
        set.insert(pkg);
    }
    set
}

fn write_manifest(root: &Path, contents: &str) -> PathBuf {
    let path = root.join("package.json");
    std::fs::write(&path, contents).unwrap();
    path
}

/// Confirmer that records prompts and answers a fixed response
struct ScriptedConfirmer {
    answer: bool,
    prompts: std::cell::RefCell<Vec<String>>,
}

impl ScriptedConfirmer {
    fn new(answer: bool) -> Self {
        Self {
            answer,
            prompts: std::cell::RefCell::new(Vec::new()),
        }
    }
}

impl Confirmer for ScriptedConfirmer {
    fn confirm(&self, message: &str) -> bool {
        self.prompts.borrow_mut().push(message.to_string());
        self.answer
    }
}

#[test]
fn test_unused_lodash_alias_scenario() {
    // Manifest declares lodash, the only source file imports it as `_`
    // but never references `_`: removal is proposed.
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(
        dir.path(),
        r#"{ "name": "demo", "dependencies": { "lodash": "^4.0.0" } }"#,
    );
    std::fs::write(
        dir.path().join("index.js"),
        "const _ = require('lodash');\nconsole.log('no usage');\n",
    )
    .unwrap();

    let mut config = Config::default();
    config.ignored_packages.clear();

    let files = depwatch::FileScanner::new(&config).scan(dir.path()).unwrap();
    let mut analyzer = depwatch::SourceAnalyzer::new().unwrap();
    let mut usage = UsedPackages::new();
    for file in &files {
        usage.merge(&analyzer.analyze_file(&dir.path().join(file)).unwrap());
    }

    let manifest = PackageJson::load(&manifest_path).unwrap();
    let sync = Synchronizer::new(&config, dir.path(), SyncOptions::default());
    let plan = sync.plan(&usage, &manifest);

    assert!(plan.to_install.is_empty());
    assert_eq!(plan.to_remove, vec!["lodash"]);
}

#[test]
fn test_styled_components_proposed_without_import() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = write_manifest(dir.path(), r#"{ "name": "demo" }"#);
    std::fs::write(
        dir.path().join("button.js"),
        "const Button = styled.button`color: blue;`;\n",
    )
    .unwrap();

    let mut config = Config::default();
    config.ignored_packages.clear();

    let files = depwatch::FileScanner::new(&config).scan(dir.path()).unwrap();
    let mut analyzer = depwatch::SourceAnalyzer::new().unwrap();
    let mut usage = UsedPackages::new();
    for file in &files {
        usage.merge(&analyzer.analyze_file(&dir.path().join(file)).unwrap());
    }

    let manifest = PackageJson::load(&manifest_path).unwrap();
    let sync = Synchronizer::new(&config, dir.path(), SyncOptions::default());
    let plan = sync.plan(&usage, &manifest);

    assert!(plan.to_install.contains(&"styled-components".to_string()));
}

#[test]
fn test_second_cycle_with_synced_manifest_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.ignored_packages.clear();
    let sync = Synchronizer::new(&config, dir.path(), SyncOptions::default());

    let usage = used(&["axios", "dayjs"]);

    // First cycle against a stale manifest
    let stale: PackageJson = serde_json::from_str(
        r#"{ "dependencies": { "axios": "^1.0.0", "unused": "^2.0.0" } }"#,
    )
    .unwrap();
    let first = sync.plan(&usage, &stale);
    assert_eq!(first.to_install, vec!["dayjs"]);
    assert_eq!(first.to_remove, vec!["unused"]);

    // Second cycle after the package manager applied the changes
    let current: PackageJson = serde_json::from_str(
        r#"{ "dependencies": { "axios": "^1.0.0", "dayjs": "^1.11.0" } }"#,
    )
    .unwrap();
    let second = sync.plan(&usage, &current);
    assert!(second.is_empty());
}

#[test]
fn test_manifest_read_failure_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("package.json");
    assert!(PackageJson::load(&missing).is_err());

    let garbled = dir.path().join("broken.json");
    std::fs::write(&garbled, "{ not json").unwrap();
    assert!(PackageJson::load(&garbled).is_err());
}

#[test]
fn test_safe_mode_decline_skips_without_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.ignored_packages.clear();
    config.manifest.safe_mode = true;

    let sync = Synchronizer::new(&config, dir.path(), SyncOptions::default());
    let confirmer = ScriptedConfirmer::new(false);

    let plan = SyncPlan {
        to_install: vec!["axios".to_string()],
        to_remove: vec!["unused".to_string()],
    };
    let outcome = sync.apply(&plan, &confirmer);

    assert_eq!(outcome.skipped, vec!["axios", "unused"]);
    assert!(outcome.installed.is_empty());
    assert!(outcome.removed.is_empty());
    assert!(outcome.failed.is_empty());
    assert_eq!(confirmer.prompts.borrow().len(), 2);
}

#[test]
fn test_dry_run_executes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.ignored_packages.clear();

    let sync = Synchronizer::new(&config, dir.path(), SyncOptions { dry_run: true });
    let plan = SyncPlan {
        to_install: vec!["axios".to_string()],
        to_remove: vec![],
    };

    // No package manager exists in the temp dir; dry run must not try one
    let outcome = sync.apply(&plan, &InteractivePrompt);
    assert!(outcome.installed.is_empty());
    assert!(outcome.failed.is_empty());
}
