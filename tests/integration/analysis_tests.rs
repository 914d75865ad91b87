//! Integration tests for the scan → analyze → aggregate pipeline.

use depwatch::{Config, FileScanner, SourceAnalyzer, UsedPackages};
use std::path::Path;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Scan the project and aggregate usage across all discovered files
fn analyze_project(root: &Path, config: &Config) -> UsedPackages {
    let files = FileScanner::new(config).scan(root).unwrap();
    let mut analyzer = SourceAnalyzer::new().unwrap();
    let mut used = UsedPackages::new();
    for file in &files {
        if let Ok(analysis) = analyzer.analyze_file(&root.join(file)) {
            used.merge(&analysis);
        }
    }
    used
}

#[test]
fn test_project_with_no_imports_yields_empty_set() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/math.js", "export const add = (a, b) => a + b;\n");
    write(dir.path(), "src/index.js", "const x = 40 + 2;\nconsole.log(x);\n");

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.is_empty());
}

#[test]
fn test_usage_is_unioned_across_files() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/api.js",
        "import axios from 'axios';\nexport const get = (url) => axios.get(url);\n",
    );
    write(
        dir.path(),
        "src/time.ts",
        "import dayjs from 'dayjs';\nexport const now = () => dayjs();\n",
    );
    // Imported but never referenced anywhere
    write(dir.path(), "src/dead.js", "import chalk from 'chalk';\n");

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.contains("axios"));
    assert!(used.contains("dayjs"));
    assert!(!used.contains("chalk"));
}

#[test]
fn test_jsx_file_contributes_react() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/App.jsx",
        "export function App() { return <main>hi</main>; }\n",
    );

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.contains("react"));
}

#[test]
fn test_styled_template_contributes_styled_components() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "src/button.js",
        "const Button = styled.button`\n  color: red;\n`;\nexport default Button;\n",
    );

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.contains("styled-components"));
}

#[test]
fn test_ignored_paths_do_not_contribute_usage() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "node_modules/lib/index.js",
        "import secret from 'secret-dep';\nsecret();\n",
    );
    write(
        dir.path(),
        "src/app.test.js",
        "import jest_only from 'jest-only';\njest_only();\n",
    );
    write(dir.path(), "src/app.js", "import axios from 'axios';\naxios.get('/');\n");

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.contains("axios"));
    assert!(!used.contains("secret-dep"));
    assert!(!used.contains("jest-only"));
}

#[test]
fn test_broken_file_is_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    // Invalid UTF-8 makes the read fail for this file only
    std::fs::write(dir.path().join("bad.js"), [0xff, 0xfe, 0x00]).unwrap();
    write(dir.path(), "good.js", "import axios from 'axios';\naxios.get('/');\n");

    let used = analyze_project(dir.path(), &Config::default());
    assert!(used.contains("axios"));
}

#[test]
fn test_scoped_subpath_imports_collapse_to_one_identity() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "a.js",
        "import { useQuery } from '@tanstack/react-query';\nuseQuery();\n",
    );
    write(
        dir.path(),
        "b.js",
        "import { devtools } from '@tanstack/react-query/devtools';\ndevtools();\n",
    );

    let used = analyze_project(dir.path(), &Config::default());
    let identities: Vec<_> = used.iter().collect();
    assert_eq!(identities, vec!["@tanstack/react-query"]);
}
