//! External package-manager invocation.
//!
//! The manifest is never edited by hand; installs and removals are delegated
//! to the configured package manager so it stays authoritative for versions
//! and the lockfile.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Errors from running an external package-manager command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} {action} {package} failed: {message}")]
    Failed {
        program: String,
        action: &'static str,
        package: String,
        message: String,
    },
}

/// Supported package-manager dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
        }
    }

    pub fn install_args<'a>(&self, package: &'a str) -> Vec<&'a str> {
        match self {
            PackageManager::Npm => vec!["install", package],
            PackageManager::Yarn => vec!["add", package],
        }
    }

    pub fn remove_args<'a>(&self, package: &'a str) -> Vec<&'a str> {
        match self {
            PackageManager::Npm => vec!["uninstall", package],
            PackageManager::Yarn => vec!["remove", package],
        }
    }
}

/// Runs install/removal commands in the project root.
///
/// Invocations are blocking and are not retried; a failure is reported to
/// the caller and the rest of the plan proceeds.
pub struct PackageManagerAdapter {
    manager: PackageManager,
    project_root: PathBuf,
}

impl PackageManagerAdapter {
    pub fn new(manager: PackageManager, project_root: &Path) -> Self {
        Self {
            manager,
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn install(&self, package: &str) -> Result<(), CommandError> {
        self.run("install", self.manager.install_args(package), package)
    }

    pub fn remove(&self, package: &str) -> Result<(), CommandError> {
        self.run("remove", self.manager.remove_args(package), package)
    }

    fn run(
        &self,
        action: &'static str,
        args: Vec<&str>,
        package: &str,
    ) -> Result<(), CommandError> {
        let program = self.manager.program();
        let output = Command::new(program)
            .args(&args)
            .current_dir(&self.project_root)
            .output()
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr
                .lines()
                .last()
                .unwrap_or("exited with non-zero status")
                .to_string();
            Err(CommandError::Failed {
                program: program.to_string(),
                action,
                package: package.to_string(),
                message,
            })
        }
    }
}
