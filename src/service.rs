//! Query facade used by the HTTP handlers.
//!
//! Resolution order is always cache first, then disk. Store failures are
//! never cached: a missing or malformed grade stays a miss and is retried
//! on the next request.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::cache::{CachedBank, CachedGrade, ContentCache};
use crate::model::{GradesConfig, Question, VersionToken};
use crate::store::{FileStore, StoreError};

/// Failures surfaced to the HTTP layer.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("grade {0} not found")]
    GradeNotFound(u32),

    #[error("grades manifest unavailable")]
    ManifestUnavailable,

    #[error("question bank unavailable")]
    BankUnavailable,
}

/// Response body for the flat `/api/questions` endpoint.
///
/// `tags` is the distinct classification tags across the bank, recomputed
/// from the cached bank on every call rather than cached separately.
#[derive(Debug, Serialize)]
pub struct BankView {
    pub total: usize,
    pub tags: Vec<String>,
    pub questions: Vec<Question>,
    pub version: VersionToken,
}

/// Per-key locks for miss-path loads.
///
/// Coalesces a stampede of cold requests for one key into a single disk
/// read, while loads of distinct keys proceed independently: a slow read
/// of one grade never stalls another grade, the manifest, or the bank.
struct LoadLocks {
    grades: SyncMutex<HashMap<u32, Arc<Mutex<()>>>>,
    manifest: Mutex<()>,
    bank: Mutex<()>,
}

impl LoadLocks {
    fn new() -> Self {
        Self {
            grades: SyncMutex::new(HashMap::new()),
            manifest: Mutex::new(()),
            bank: Mutex::new(()),
        }
    }

    /// Lock handle for one grade id. One entry per id ever requested,
    /// created on first use and kept for the service lifetime.
    fn grade(&self, id: u32) -> Arc<Mutex<()>> {
        self.grades.lock().entry(id).or_default().clone()
    }
}

/// Facade resolving content keys through the cache, loading from the
/// store on miss. Cache hits never touch the load locks.
pub struct QueryService {
    store: Arc<FileStore>,
    cache: Arc<ContentCache>,
    locks: LoadLocks,
}

impl QueryService {
    pub fn new(store: Arc<FileStore>, cache: Arc<ContentCache>) -> Self {
        Self {
            store,
            cache,
            locks: LoadLocks::new(),
        }
    }

    /// The grades manifest, loading it on first use.
    pub async fn manifest(&self) -> Result<Arc<GradesConfig>, ServiceError> {
        if let Some(config) = self.cache.manifest() {
            return Ok(config);
        }

        let _guard = self.locks.manifest.lock().await;
        if let Some(config) = self.cache.manifest() {
            return Ok(config);
        }

        match self.store.read_manifest().await {
            Ok(config) => {
                let config = Arc::new(config);
                self.cache.put_manifest(config.clone());
                Ok(config)
            }
            Err(e) => {
                log_load_failure("manifest", &e);
                Err(ServiceError::ManifestUnavailable)
            }
        }
    }

    /// Full content of one grade.
    pub async fn grade(&self, id: u32) -> Result<CachedGrade, ServiceError> {
        if let Some(hit) = self.cache.grade(id) {
            return Ok(hit);
        }

        let lock = self.locks.grade(id);
        let _guard = lock.lock().await;
        if let Some(hit) = self.cache.grade(id) {
            return Ok(hit);
        }

        match self.store.read_grade(id).await {
            Ok((data, version)) => {
                let entry = CachedGrade {
                    data: Arc::new(data),
                    version,
                };
                self.cache.put_grade(id, entry.clone());
                crate::log_event!(
                    "service",
                    "loaded",
                    "grade {id}: {} questions, token {}",
                    entry.data.questions.len(),
                    entry.version
                );
                Ok(entry)
            }
            Err(e) => {
                log_load_failure(&format!("grade {id}"), &e);
                Err(ServiceError::GradeNotFound(id))
            }
        }
    }

    /// Version token of one grade's backing file.
    pub async fn grade_version(&self, id: u32) -> Result<VersionToken, ServiceError> {
        Ok(self.grade(id).await?.version)
    }

    /// The flat question bank, loading it on first use.
    pub async fn bank(&self) -> Result<CachedBank, ServiceError> {
        if let Some(hit) = self.cache.bank() {
            return Ok(hit);
        }

        let _guard = self.locks.bank.lock().await;
        if let Some(hit) = self.cache.bank() {
            return Ok(hit);
        }

        match self.store.read_bank().await {
            Ok((data, version)) => {
                let entry = CachedBank {
                    data: Arc::new(data),
                    version,
                };
                self.cache.put_bank(entry.clone());
                crate::log_event!(
                    "service",
                    "loaded",
                    "bank: {} questions, token {}",
                    entry.data.questions.len(),
                    entry.version
                );
                Ok(entry)
            }
            Err(e) => {
                log_load_failure("bank", &e);
                Err(ServiceError::BankUnavailable)
            }
        }
    }

    /// Bank projection for `/api/questions`: totals plus the tag index.
    pub async fn bank_view(&self) -> Result<BankView, ServiceError> {
        let bank = self.bank().await?;
        let tags: BTreeSet<&str> = bank.data.questions.iter().map(|q| q.tag.as_str()).collect();

        Ok(BankView {
            total: bank.data.questions.len(),
            tags: tags.into_iter().map(String::from).collect(),
            questions: bank.data.questions.clone(),
            version: bank.version,
        })
    }

    /// Version token of the flat bank's backing file.
    pub async fn bank_version(&self) -> Result<VersionToken, ServiceError> {
        Ok(self.bank().await?.version)
    }
}

fn log_load_failure(what: &str, e: &StoreError) {
    match e {
        StoreError::NotFound { .. } => tracing::debug!("[service] {what} not on disk: {e}"),
        _ => tracing::warn!("[service] failed to load {what}: {e}"),
    }
}
