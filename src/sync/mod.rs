//! Manifest diffing and plan execution.
//!
//! The synchronizer compares the project-wide used-package set against the
//! declared dependencies in package.json and produces a plan of installs and
//! removals. The plan is applied through the external package manager; the
//! manifest file itself is never hand-edited here.

use crate::analysis::UsedPackages;
use crate::config::Config;
use crate::package_manager::PackageManagerAdapter;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Packages depwatch refuses to remove even when the configured ignore list
/// omits them. Removing the tool out from under its own watch loop would be
/// self-destructive.
pub const PROTECTED_PACKAGES: &[&str] = &["depwatch"];

/// Manifest access errors; they abort the current cycle only
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to serialize manifest {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The slice of package.json the synchronizer cares about.
///
/// Unknown fields are preserved so scaffolding can rewrite the file without
/// dropping anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scripts: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,

    #[serde(
        default,
        rename = "devDependencies",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub dev_dependencies: BTreeMap<String, String>,

    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl PackageJson {
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let mut contents =
            serde_json::to_string_pretty(self).map_err(|source| ManifestError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;
        contents.push('\n');
        std::fs::write(path, contents).map_err(|source| ManifestError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Install/removal plan for one cycle; never persisted
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub to_install: Vec<String>,
    pub to_remove: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_install.is_empty() && self.to_remove.is_empty()
    }
}

/// Per-action yes/no gate used in safe mode
pub trait Confirmer {
    fn confirm(&self, message: &str) -> bool;
}

/// Line-based prompt on stdin/stdout
pub struct InteractivePrompt;

impl Confirmer for InteractivePrompt {
    fn confirm(&self, message: &str) -> bool {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Execution options for one cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Print the plan without running any commands
    pub dry_run: bool,
}

/// What happened while applying a plan
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub installed: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Diffs used packages against the manifest and applies the result
pub struct Synchronizer<'a> {
    config: &'a Config,
    project_root: &'a Path,
    options: SyncOptions,
}

impl<'a> Synchronizer<'a> {
    pub fn new(config: &'a Config, project_root: &'a Path, options: SyncOptions) -> Self {
        Self {
            config,
            project_root,
            options,
        }
    }

    /// Compute the install/removal plan for one cycle.
    ///
    /// Essential packages are force-checked for presence independent of
    /// detected usage. Ignored and protected packages appear in neither
    /// half of the plan.
    pub fn plan(&self, used: &UsedPackages, manifest: &PackageJson) -> SyncPlan {
        let dev_deps: &BTreeMap<String, String> = if self.config.manifest.check_dev_dependencies {
            &manifest.dev_dependencies
        } else {
            static EMPTY: BTreeMap<String, String> = BTreeMap::new();
            &EMPTY
        };

        let is_ignored = |pkg: &str| self.config.ignored_packages.iter().any(|p| p == pkg);
        let is_essential = |pkg: &str| self.config.essential_packages.iter().any(|p| p == pkg);
        let is_protected = |pkg: &str| PROTECTED_PACKAGES.contains(&pkg);

        let mut to_install: Vec<String> = Vec::new();
        let candidates = used
            .iter()
            .chain(self.config.essential_packages.iter().map(String::as_str));
        for pkg in candidates {
            if manifest.dependencies.contains_key(pkg)
                || dev_deps.contains_key(pkg)
                || is_ignored(pkg)
                || is_protected(pkg)
                || to_install.iter().any(|p| p == pkg)
            {
                continue;
            }
            to_install.push(pkg.to_string());
        }

        let to_remove: Vec<String> = manifest
            .dependencies
            .keys()
            .filter(|pkg| !used.contains(pkg))
            .filter(|pkg| !dev_deps.contains_key(*pkg))
            .filter(|pkg| !is_ignored(pkg))
            .filter(|pkg| !is_essential(pkg))
            .filter(|pkg| !is_protected(pkg))
            .cloned()
            .collect();

        SyncPlan {
            to_install,
            to_remove,
        }
    }

    /// Apply a plan through the package manager.
    ///
    /// Actions run sequentially in plan order. A declined confirmation
    /// skips that one package; a failed command is logged and the rest of
    /// the plan still runs.
    pub fn apply(&self, plan: &SyncPlan, confirmer: &dyn Confirmer) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();

        if plan.is_empty() {
            info!("Dependencies already in sync");
            return outcome;
        }

        self.print_plan(plan);

        if self.options.dry_run {
            println!("{}", "Dry run - no commands executed".dimmed());
            return outcome;
        }

        let adapter =
            PackageManagerAdapter::new(self.config.manifest.package_manager, self.project_root);

        for pkg in &plan.to_install {
            if self.config.manifest.safe_mode
                && !confirmer.confirm(&format!("Install {pkg}?"))
            {
                println!("  {} skipped {}", "→".dimmed(), pkg);
                outcome.skipped.push(pkg.clone());
                continue;
            }
            match adapter.install(pkg) {
                Ok(()) => {
                    println!("  {} installed {}", "✓".green(), pkg);
                    outcome.installed.push(pkg.clone());
                }
                Err(e) => {
                    error!("{}", e);
                    println!("  {} failed to install {}", "✗".red(), pkg);
                    outcome.failed.push(pkg.clone());
                }
            }
        }

        for pkg in &plan.to_remove {
            if PROTECTED_PACKAGES.contains(&pkg.as_str()) {
                warn!("Blocked removal of protected package {}", pkg);
                continue;
            }
            if self.config.manifest.safe_mode
                && !confirmer.confirm(&format!("Remove {pkg}?"))
            {
                println!("  {} skipped {}", "→".dimmed(), pkg);
                outcome.skipped.push(pkg.clone());
                continue;
            }
            match adapter.remove(pkg) {
                Ok(()) => {
                    println!("  {} removed {}", "✓".green(), pkg);
                    outcome.removed.push(pkg.clone());
                }
                Err(e) => {
                    error!("{}", e);
                    println!("  {} failed to remove {}", "✗".red(), pkg);
                    outcome.failed.push(pkg.clone());
                }
            }
        }

        outcome
    }

    fn print_plan(&self, plan: &SyncPlan) {
        println!();
        println!("{}", "Dependency changes:".bold());
        if !plan.to_install.is_empty() {
            println!("  {} {}", "+ adding:".green(), plan.to_install.join(", "));
        }
        if !plan.to_remove.is_empty() {
            println!("  {} {}", "- removing:".red(), plan.to_remove.join(", "));
        }
    }
}
