use crate::config::{Config, IgnoreMatcher, CONFIG_FILE_NAMES};
use miette::{miette, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Discovers analyzable source files under a project root.
///
/// Traversal is depth-first with directory entries visited in lexicographic
/// order, so repeated scans of an unchanged tree produce the same sequence.
/// A directory matching an ignore pattern is pruned entirely; its subtree is
/// never visited.
pub struct FileScanner<'a> {
    config: &'a Config,
    matcher: IgnoreMatcher,
}

impl<'a> FileScanner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            matcher: config.ignore_matcher(),
        }
    }

    /// List files to analyze, as paths relative to `root`
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(miette!(
                "Project root is not a readable directory: {}",
                root.display()
            ));
        }

        debug!("Scanning for source files in {}", root.display());

        let walker = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                let relative_str = relative.to_string_lossy();
                if self.matcher.is_ignored(&relative_str) {
                    trace!("Pruning ignored path: {}", relative_str);
                    return false;
                }
                true
            });

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.has_watched_extension(path) {
                continue;
            }
            if is_self_file(path) {
                trace!("Excluding tool file: {}", path.display());
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            files.push(relative.to_path_buf());
        }

        debug!("Found {} files to analyze", files.len());
        Ok(files)
    }

    fn has_watched_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.config.is_watched_extension(ext))
    }
}

/// Files belonging to depwatch itself are never analyzed, regardless of the
/// configured ignore patterns.
pub(crate) fn is_self_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| CONFIG_FILE_NAMES.contains(&name))
}
