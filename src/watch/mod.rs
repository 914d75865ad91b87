//! Watch mode: debounced re-analysis on file changes.
//!
//! Bursts of saves collapse into one re-run after the configured quiet
//! period. There is no lock against a cycle already in flight; if external
//! install commands are still running when the debounce window closes
//! again, a new cycle starts regardless. This is a known limitation.

use crate::config::{Config, IgnoreMatcher};
use crate::discovery;
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::Path;
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Watch mode errors
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    Watcher(#[from] notify::Error),
    #[error("Failed to receive events: {0}")]
    Recv(#[from] std::sync::mpsc::RecvError),
}

/// Caller-owned watch session over a project root.
///
/// The file-change subscription lives for the duration of [`watch`]; it is
/// released when the callback asks to stop or the session is dropped. An
/// in-flight package-manager command is not cancelled on shutdown.
///
/// [`watch`]: DependencyWatcher::watch
pub struct DependencyWatcher {
    debounce_ms: u64,
    extensions: Vec<String>,
    matcher: IgnoreMatcher,
}

impl DependencyWatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            debounce_ms: config.watch.debounce_ms,
            extensions: config.watch.file_extensions.clone(),
            matcher: config.ignore_matcher(),
        }
    }

    /// Check whether a changed path should trigger a re-run
    fn should_trigger(&self, root: &Path, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
            return false;
        }
        if discovery::is_self_file(path) {
            return false;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        !self.matcher.is_ignored(&relative.to_string_lossy())
    }

    /// Watch a project root and run the callback once per debounced change
    /// burst. The callback runs once immediately before watching begins and
    /// returns false to stop the session.
    pub fn watch<F>(&self, root: &Path, mut on_cycle: F) -> Result<(), WatchError>
    where
        F: FnMut() -> bool,
    {
        let (tx, rx) = channel();

        let mut debouncer = new_debouncer(Duration::from_millis(self.debounce_ms), tx)?;
        debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

        println!();
        println!("{}", "Watching for import changes. Press Ctrl+C to stop.".cyan().bold());
        println!("{}", format!("   Project: {}", root.display()).dimmed());
        println!();

        // Initial cycle before the first event
        if !on_cycle() {
            return Ok(());
        }

        loop {
            match rx.recv()? {
                Ok(events) => {
                    let relevant: Vec<_> = events
                        .iter()
                        .filter(|e| {
                            matches!(
                                e.kind,
                                DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous
                            ) && self.should_trigger(root, &e.path)
                        })
                        .collect();

                    if relevant.is_empty() {
                        continue;
                    }

                    debug!("{} relevant change(s) after debounce", relevant.len());
                    for event in relevant.iter().take(5) {
                        if let Some(name) = event.path.file_name() {
                            println!("   {} {}", "•".dimmed(), name.to_string_lossy().dimmed());
                        }
                    }

                    if !on_cycle() {
                        break;
                    }
                }
                Err(e) => {
                    eprintln!("{}: {:?}", "Watch error".red(), e);
                }
            }
        }

        Ok(())
    }
}
