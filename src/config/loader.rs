use crate::package_manager::PackageManager;
use miette::{IntoDiagnostic, Result, WrapErr};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// File names probed for a project-local configuration override.
///
/// These are also the files `depwatch init` may create, so the scanner
/// excludes them from analysis unconditionally.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".depwatch.yml",
    ".depwatch.yaml",
    ".depwatch.toml",
    "depwatch.toml",
];

/// Configuration for dependency synchronization
///
/// Loaded once at startup and immutable for the process lifetime; editing
/// the config file takes effect on the next run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packages never proposed for install or removal
    pub ignored_packages: Vec<String>,

    /// Packages always ensured installed, regardless of detected usage
    pub essential_packages: Vec<String>,

    /// Watch loop configuration
    pub watch: WatchConfig,

    /// Manifest synchronization policy
    pub manifest: ManifestConfig,

    /// Emit per-file used/unused diagnostics
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Re-run analysis when a watched file is saved
    pub on_save: bool,

    /// Quiet period before a change triggers re-analysis
    pub debounce_ms: u64,

    /// Glob-style patterns excluded from scanning and watching
    pub ignored_paths: Vec<String>,

    /// Allow-list of analyzable file extensions (without the dot)
    pub file_extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Include devDependencies in used/declared comparisons
    pub check_dev_dependencies: bool,

    /// Require interactive confirmation before each install/removal
    pub safe_mode: bool,

    /// Which package manager dialect to invoke
    pub package_manager: PackageManager,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignored_packages: vec![
                "typescript".to_string(),
                "react".to_string(),
                "react-dom".to_string(),
                "fs".to_string(),
                "depwatch".to_string(),
            ],
            essential_packages: vec![],
            watch: WatchConfig::default(),
            manifest: ManifestConfig::default(),
            debug: false,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            on_save: true,
            debounce_ms: 300,
            ignored_paths: vec![
                "node_modules".to_string(),
                "dist".to_string(),
                "build".to_string(),
                ".next".to_string(),
                "*.test.*".to_string(),
                "package.json".to_string(),
                "package-lock.json".to_string(),
                ".git".to_string(),
            ],
            file_extensions: vec![
                "js".to_string(),
                "jsx".to_string(),
                "ts".to_string(),
                "tsx".to_string(),
            ],
        }
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            check_dev_dependencies: false,
            safe_mode: false,
            package_manager: PackageManager::Npm,
        }
    }
}

impl Config {
    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse YAML config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                if let Ok(config) = serde_yaml::from_str(&contents) {
                    Ok(config)
                } else {
                    toml::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Resolve the effective configuration for a project root.
    ///
    /// A project-local file takes precedence over the bundled defaults.
    /// An unreadable or invalid project-local file is logged and ignored;
    /// a missing config file is not an error.
    pub fn resolve(project_root: &Path) -> Self {
        for name in CONFIG_FILE_NAMES {
            let path = project_root.join(name);
            if path.exists() {
                match Self::from_file(&path) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Ignoring invalid config file {}: {}", path.display(), e);
                        return Self::default();
                    }
                }
            }
        }
        Self::default()
    }

    /// Build the ignore-pattern matcher for the watch configuration
    pub fn ignore_matcher(&self) -> IgnoreMatcher {
        IgnoreMatcher::new(&self.watch.ignored_paths)
    }

    /// Check whether an extension (without dot) is analyzable
    pub fn is_watched_extension(&self, ext: &str) -> bool {
        self.watch
            .file_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// Compiled ignore patterns.
///
/// Each pattern is a simplified glob: `*` matches any run of characters,
/// every other character is literal, matching is case-insensitive and
/// anchored. A pattern matches a path if it matches the whole relative
/// path or any single path segment.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| match glob_to_regex(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Skipping unusable ignore pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Check a relative path (slash-separated) against the patterns
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = relative_path.replace('\\', "/");
        self.patterns.iter().any(|re| {
            re.is_match(&normalized)
                || normalized.split('/').any(|segment| re.is_match(segment))
        })
    }
}

/// Translate a simplified glob into an anchored case-insensitive regex
fn glob_to_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for ch in pattern.chars() {
        if ch == '*' {
            source.push_str(".*");
        } else {
            source.push_str(&regex::escape(&ch.to_string()));
        }
    }
    source.push('$');

    RegexBuilder::new(&source).case_insensitive(true).build()
}
