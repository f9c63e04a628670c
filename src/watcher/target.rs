//! Mapping changed file names to cache keys.

use std::path::Path;

use crate::store::{BANK_FILE, MANIFEST_FILE};

/// A content file the watcher knows how to react to.
///
/// Closed set: anything else in the data directory (editor temp files,
/// backups) is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFile {
    /// `grades_config.json`
    Manifest,
    /// `grade_<id>.json`
    Grade(u32),
    /// `questions.json`
    Bank,
}

impl DataFile {
    /// Derive the affected key from a changed path's file name.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::from_file_name)
    }

    /// Parse a bare file name into a key.
    pub fn from_file_name(name: &str) -> Option<Self> {
        match name {
            MANIFEST_FILE => Some(Self::Manifest),
            BANK_FILE => Some(Self::Bank),
            _ => {
                let id = name.strip_prefix("grade_")?.strip_suffix(".json")?;
                id.parse().ok().map(Self::Grade)
            }
        }
    }
}
