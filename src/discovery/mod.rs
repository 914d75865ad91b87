mod file_finder;

pub use file_finder::FileScanner;
pub(crate) use file_finder::is_self_file;
