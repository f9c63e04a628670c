//! The watcher task: notify subscription, event loop, and cache updates.

use std::sync::Arc;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

use crate::cache::{CachedBank, ContentCache};
use crate::store::FileStore;

use super::debouncer::Debouncer;
use super::error::WatchError;
use super::target::DataFile;

/// How often the loop checks for debounced targets that became ready.
const TICK_MS: u64 = 50;

/// Watches the data directory and keeps the cache in step with it.
///
/// Reaction per file kind (the two layouts deliberately differ, see the
/// variant notes in DESIGN.md):
/// - manifest changed: re-read and wholesale-replace; a failed read keeps
///   the previous manifest visible
/// - grade file changed or removed: evict that entry; the next request
///   repopulates it lazily, and load failures stay misses
/// - bank changed: re-read and replace in place; a failed read keeps the
///   previous bank visible
pub struct DataWatcher {
    store: Arc<FileStore>,
    cache: Arc<ContentCache>,
    debouncer: Debouncer,
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The subscription handle. Dropping it ends the notify stream.
    _watcher: notify::RecommendedWatcher,
    stop: CancellationToken,
}

impl DataWatcher {
    /// Subscribe to the store's data directory.
    ///
    /// Failing to create the watcher or to subscribe the directory is
    /// fatal: the caller must refuse to serve rather than serve stale
    /// data with no invalidation.
    pub fn new(
        store: Arc<FileStore>,
        cache: Arc<ContentCache>,
        debounce_ms: u64,
        stop: CancellationToken,
    ) -> Result<Self, WatchError> {
        let (tx, rx) = mpsc::channel(64);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let data_dir = store.data_dir().to_path_buf();
        watcher
            .watch(&data_dir, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: data_dir,
                reason: e.to_string(),
            })?;

        Ok(Self {
            store,
            cache,
            debouncer: Debouncer::new(debounce_ms),
            event_rx: rx,
            _watcher: watcher,
            stop,
        })
    }

    /// Run the event loop until cancelled.
    ///
    /// Per-event errors from notify are logged and the loop keeps
    /// running; only channel closure ends it with an error.
    pub async fn watch(mut self) -> Result<(), WatchError> {
        crate::log_event!(
            "watcher",
            "started",
            "{}",
            self.store.data_dir().display()
        );

        // A free-running interval, not a sleep recreated per iteration:
        // a sustained event stream must not starve the debounce check.
        let mut tick = interval(Duration::from_millis(TICK_MS));

        loop {
            tokio::select! {
                res = self.event_rx.recv() => {
                    match res {
                        Some(Ok(event)) => self.handle_event(event),
                        Some(Err(e)) => {
                            tracing::error!("[watcher] file event error: {e}");
                        }
                        None => return Err(WatchError::ChannelClosed),
                    }
                }

                _ = tick.tick() => {
                    for target in self.debouncer.take_ready() {
                        self.apply_change(target).await;
                    }
                }

                _ = self.stop.cancelled() => {
                    crate::log_event!("watcher", "stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Route one notify event into the debouncer or immediate handling.
    fn handle_event(&mut self, event: Event) {
        // Renames surface as Modify(Name) in notify, so the closed set
        // {create, modify, rename, remove} collapses to three kinds here.
        let removal = match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => false,
            EventKind::Remove(_) => true,
            _ => return,
        };

        for path in &event.paths {
            let Some(target) = DataFile::from_path(path) else {
                crate::debug_event!("watcher", "ignored", "{}", path.display());
                continue;
            };

            if removal {
                self.debouncer.remove(&target);
                self.handle_removal(target);
            } else {
                self.debouncer.record(target);
            }
        }
    }

    /// React to a content file disappearing. No debounce: there is no
    /// half-written state to wait out.
    fn handle_removal(&self, target: DataFile) {
        match target {
            DataFile::Grade(id) => {
                if self.cache.invalidate_grade(id) {
                    crate::log_event!("watcher", "evicted", "grade {id} (file removed)");
                }
            }
            DataFile::Manifest => {
                tracing::warn!("[watcher] manifest removed, keeping last-loaded copy");
            }
            DataFile::Bank => {
                tracing::warn!("[watcher] question bank removed, keeping last-loaded copy");
            }
        }
    }

    /// Apply a debounced change for one target.
    async fn apply_change(&self, target: DataFile) {
        match target {
            DataFile::Manifest => match self.store.read_manifest().await {
                Ok(config) => {
                    let grades = config.grades.len();
                    self.cache.put_manifest(Arc::new(config));
                    crate::log_event!("watcher", "manifest reloaded", "{grades} grades");
                }
                Err(e) => {
                    tracing::warn!("[watcher] manifest reload failed, keeping previous: {e}");
                }
            },

            DataFile::Grade(id) => {
                self.cache.invalidate_grade(id);
                crate::log_event!("watcher", "evicted", "grade {id}");
            }

            DataFile::Bank => match self.store.read_bank().await {
                Ok((bank, version)) => {
                    let total = bank.questions.len();
                    self.cache.put_bank(CachedBank {
                        data: Arc::new(bank),
                        version,
                    });
                    crate::log_event!("watcher", "bank reloaded", "{total} questions");
                }
                Err(e) => {
                    tracing::warn!("[watcher] bank reload failed, keeping previous: {e}");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CachedGrade;
    use crate::model::{GradeData, QuestionBank, VersionToken};
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn fixture(dir: &TempDir) -> DataWatcher {
        let store = Arc::new(FileStore::new(dir.path()));
        let cache = Arc::new(ContentCache::new());
        DataWatcher::new(store, cache, 10, CancellationToken::new()).unwrap()
    }

    fn cached_grade(id: u32) -> CachedGrade {
        CachedGrade {
            data: Arc::new(GradeData {
                version: "1.0.0".into(),
                grade_id: id,
                name: String::new(),
                description: String::new(),
                required_score: 0,
                total_questions: 0,
                questions: Vec::new(),
            }),
            version: VersionToken::new("t0".into()),
        }
    }

    fn manifest_json(total: u32) -> String {
        serde_json::json!({
            "version": "1.0.0",
            "totalGrades": total,
            "grades": (1..=total).map(|id| serde_json::json!({
                "gradeId": id,
                "name": format!("Grade {id}"),
                "description": "",
                "requiredScore": 6,
                "totalQuestions": 10,
                "icon": ""
            })).collect::<Vec<_>>()
        })
        .to_string()
    }

    #[tokio::test]
    async fn grade_change_evicts_entry() {
        let dir = TempDir::new().unwrap();
        let watcher = fixture(&dir);
        watcher.cache.put_grade(3, cached_grade(3));

        watcher.apply_change(DataFile::Grade(3)).await;
        assert!(watcher.cache.grade(3).is_none());
    }

    #[tokio::test]
    async fn manifest_change_replaces_wholesale() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("grades_config.json"), manifest_json(2)).unwrap();
        let watcher = fixture(&dir);

        watcher.apply_change(DataFile::Manifest).await;
        assert_eq!(watcher.cache.manifest().unwrap().grades.len(), 2);

        fs::write(dir.path().join("grades_config.json"), manifest_json(3)).unwrap();
        watcher.apply_change(DataFile::Manifest).await;
        assert_eq!(watcher.cache.manifest().unwrap().grades.len(), 3);
    }

    #[tokio::test]
    async fn failed_manifest_reload_keeps_old_data() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("grades_config.json"), manifest_json(2)).unwrap();
        let watcher = fixture(&dir);
        watcher.apply_change(DataFile::Manifest).await;

        fs::write(dir.path().join("grades_config.json"), "{broken").unwrap();
        watcher.apply_change(DataFile::Manifest).await;

        // Old manifest stays visible after the failed reload.
        assert_eq!(watcher.cache.manifest().unwrap().grades.len(), 2);
    }

    fn bank_json(total: usize) -> String {
        serde_json::json!({
            "version": "1.0.0",
            "questions": (0..total).map(|i| serde_json::json!({
                "id": format!("q{i}"),
                "type": "single",
                "question": format!("Question {i}?"),
                "options": ["a", "b"],
                "correctAnswer": 0,
                "explanation": "",
                "tag": "basics"
            })).collect::<Vec<_>>()
        })
        .to_string()
    }

    #[tokio::test]
    async fn bank_change_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("questions.json"), bank_json(1)).unwrap();
        let watcher = fixture(&dir);

        watcher.apply_change(DataFile::Bank).await;
        let before = watcher.cache.bank().unwrap();
        assert_eq!(before.data.questions.len(), 1);

        fs::write(dir.path().join("questions.json"), bank_json(2)).unwrap();
        watcher.apply_change(DataFile::Bank).await;

        let after = watcher.cache.bank().unwrap();
        assert_eq!(after.data.questions.len(), 2);
        assert_ne!(before.version, after.version);
    }

    #[tokio::test]
    async fn failed_bank_reload_keeps_old_data() {
        let dir = TempDir::new().unwrap();
        let watcher = fixture(&dir);
        watcher.cache.put_bank(CachedBank {
            data: Arc::new(QuestionBank {
                version: "1.0.0".into(),
                questions: Vec::new(),
            }),
            version: VersionToken::new("t0".into()),
        });

        // questions.json does not exist, so the reload fails.
        watcher.apply_change(DataFile::Bank).await;
        assert_eq!(watcher.cache.bank().unwrap().version.as_str(), "t0");
    }

    #[tokio::test]
    async fn modify_event_lands_in_debouncer() {
        let dir = TempDir::new().unwrap();
        let mut watcher = fixture(&dir);

        let mut event = Event::new(EventKind::Modify(ModifyKind::Any));
        event = event.add_path(dir.path().join("grade_5.json"));
        watcher.handle_event(event);

        assert!(watcher.debouncer.has_pending());
    }

    #[tokio::test]
    async fn create_event_lands_in_debouncer() {
        let dir = TempDir::new().unwrap();
        let mut watcher = fixture(&dir);

        let mut event = Event::new(EventKind::Create(CreateKind::File));
        event = event.add_path(dir.path().join("questions.json"));
        watcher.handle_event(event);

        assert!(watcher.debouncer.has_pending());
    }

    #[tokio::test]
    async fn remove_event_evicts_immediately() {
        let dir = TempDir::new().unwrap();
        let mut watcher = fixture(&dir);
        watcher.cache.put_grade(5, cached_grade(5));
        watcher.debouncer.record(DataFile::Grade(5));

        let mut event = Event::new(EventKind::Remove(RemoveKind::File));
        event = event.add_path(dir.path().join("grade_5.json"));
        watcher.handle_event(event);

        assert!(watcher.cache.grade(5).is_none());
        assert!(!watcher.debouncer.has_pending());
    }

    #[tokio::test]
    async fn unrelated_files_are_ignored() {
        let dir = TempDir::new().unwrap();
        let mut watcher = fixture(&dir);

        let mut event = Event::new(EventKind::Modify(ModifyKind::Any));
        event = event.add_path(dir.path().join("grade_1.json.swp"));
        watcher.handle_event(event);

        assert!(!watcher.debouncer.has_pending());
    }

    #[test]
    fn missing_data_dir_is_fatal() {
        let store = Arc::new(FileStore::new("/definitely/not/a/real/dir"));
        let cache = Arc::new(ContentCache::new());
        let result = DataWatcher::new(store, cache, 10, CancellationToken::new());
        assert!(matches!(result, Err(WatchError::PathWatchFailed { .. })));
    }
}
