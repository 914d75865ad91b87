//! Project scaffolding for `depwatch init`.
//!
//! Adds a `watch-imports` script entry to the project manifest and writes
//! the bundled default configuration file. Both steps are idempotent.

use crate::config::{Config, CONFIG_FILE_NAMES};
use crate::sync::PackageJson;
use colored::Colorize;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use std::path::Path;
use tracing::info;

const WATCH_SCRIPT_NAME: &str = "watch-imports";
const WATCH_SCRIPT_COMMAND: &str = "depwatch";
const DEFAULT_CONFIG_FILE: &str = ".depwatch.yml";

/// Set up a project for depwatch
pub fn init(project_root: &Path) -> Result<()> {
    if !project_root.is_dir() {
        return Err(miette!(
            "Project root is not a directory: {}",
            project_root.display()
        ));
    }

    add_watch_script(project_root)?;
    write_default_config(project_root)?;

    println!("{}", "✓ depwatch initialized".green().bold());
    Ok(())
}

/// Add the watch script to package.json, preserving existing entries
fn add_watch_script(project_root: &Path) -> Result<()> {
    let manifest_path = project_root.join("package.json");
    if !manifest_path.exists() {
        info!("No package.json found, skipping script entry");
        return Ok(());
    }

    let mut manifest = PackageJson::load(&manifest_path)
        .into_diagnostic()
        .wrap_err("Failed to load package.json")?;

    if manifest.scripts.contains_key(WATCH_SCRIPT_NAME) {
        return Ok(());
    }

    manifest
        .scripts
        .insert(WATCH_SCRIPT_NAME.to_string(), WATCH_SCRIPT_COMMAND.to_string());
    manifest
        .save(&manifest_path)
        .into_diagnostic()
        .wrap_err("Failed to update package.json")?;

    println!("  {} added \"{}\" script to package.json", "✓".green(), WATCH_SCRIPT_NAME);
    Ok(())
}

/// Write the bundled default configuration if no config file exists
fn write_default_config(project_root: &Path) -> Result<()> {
    let existing = CONFIG_FILE_NAMES
        .iter()
        .any(|name| project_root.join(name).exists());
    if existing {
        return Ok(());
    }

    let contents = serde_yaml::to_string(&Config::default())
        .into_diagnostic()
        .wrap_err("Failed to serialize default config")?;
    let path = project_root.join(DEFAULT_CONFIG_FILE);
    std::fs::write(&path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;

    println!("  {} created {}", "✓".green(), DEFAULT_CONFIG_FILE);
    Ok(())
}
