//! In-memory content cache shared by the query service and the watcher.
//!
//! Entries are stored and replaced as whole values under the lock, so a
//! reader can never observe a document without its version token. Grade
//! entries are evicted individually; the manifest and the flat bank live
//! in single slots that are only ever wholesale-replaced.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::{GradeData, GradesConfig, QuestionBank, VersionToken};

/// A cached grade: parsed document plus the token of the file state it
/// was read from.
#[derive(Debug, Clone)]
pub struct CachedGrade {
    pub data: Arc<GradeData>,
    pub version: VersionToken,
}

/// A cached flat question bank.
#[derive(Debug, Clone)]
pub struct CachedBank {
    pub data: Arc<QuestionBank>,
    pub version: VersionToken,
}

/// Process-wide cache of parsed content documents.
///
/// Read methods never touch the disk and never block on it; writers hold
/// the lock only for the map mutation itself.
#[derive(Default)]
pub struct ContentCache {
    grades: RwLock<HashMap<u32, CachedGrade>>,
    manifest: RwLock<Option<Arc<GradesConfig>>>,
    bank: RwLock<Option<CachedBank>>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grade(&self, id: u32) -> Option<CachedGrade> {
        self.grades.read().get(&id).cloned()
    }

    pub fn put_grade(&self, id: u32, entry: CachedGrade) {
        self.grades.write().insert(id, entry);
    }

    /// Evict one grade. Returns true if an entry was present.
    pub fn invalidate_grade(&self, id: u32) -> bool {
        self.grades.write().remove(&id).is_some()
    }

    /// Snapshot of the last successfully loaded manifest.
    pub fn manifest(&self) -> Option<Arc<GradesConfig>> {
        self.manifest.read().clone()
    }

    pub fn put_manifest(&self, config: Arc<GradesConfig>) {
        *self.manifest.write() = Some(config);
    }

    pub fn bank(&self) -> Option<CachedBank> {
        self.bank.read().clone()
    }

    pub fn put_bank(&self, entry: CachedBank) {
        *self.bank.write() = Some(entry);
    }

    /// Number of cached grade entries.
    pub fn grade_count(&self) -> usize {
        self.grades.read().len()
    }
}
