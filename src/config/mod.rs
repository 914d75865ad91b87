mod loader;

pub use loader::{Config, IgnoreMatcher, CONFIG_FILE_NAMES};
