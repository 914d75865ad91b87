//! depwatch - keep package.json in sync with the imports your code actually uses
//!
//! This library watches a JavaScript/TypeScript project and continuously
//! reconciles the declared dependency manifest with the packages referenced
//! in source files.
//!
//! # Architecture
//!
//! One sync cycle consists of:
//! 1. **File Discovery** - Find all .js/.jsx/.ts/.tsx files under the project root
//! 2. **Analysis** - Parse each file with tree-sitter and classify imported packages as used or unused
//! 3. **Aggregation** - Union per-file results into a project-wide used-package set
//! 4. **Synchronization** - Diff against package.json and install/remove via npm or yarn
//!
//! The watch loop debounces file-change events and triggers a full cycle
//! after the configured quiet period.

pub mod config;
pub mod discovery;
pub mod analysis;
pub mod sync;
pub mod package_manager;
pub mod watch;
pub mod scaffold;

pub use config::Config;
pub use discovery::FileScanner;
pub use analysis::{FileAnalysis, ImportBinding, SourceAnalyzer, SourceLanguage, UsedPackages};
pub use sync::{PackageJson, SyncOptions, SyncPlan, Synchronizer, PROTECTED_PACKAGES};
pub use package_manager::{PackageManager, PackageManagerAdapter};
pub use watch::DependencyWatcher;
