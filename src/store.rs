//! Read-only view of the JSON content files in the data directory.
//!
//! Every successful read derives a [`VersionToken`] from the file it came
//! from, so the cache can tell whether a later read observed the same
//! on-disk state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{GradeData, GradesConfig, QuestionBank, VersionToken};

/// Manifest file name in the data directory.
pub const MANIFEST_FILE: &str = "grades_config.json";
/// Flat-layout bank file name in the data directory.
pub const BANK_FILE: &str = "questions.json";

/// Errors from reading content files.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no such content file: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read access to the on-disk content documents.
///
/// Holds no document state of its own; the cache owns everything that
/// outlives a single read. The read counter exists so callers can assert
/// cache behavior (a cache hit performs zero store reads).
pub struct FileStore {
    data_dir: PathBuf,
    reads: AtomicU64,
}

impl FileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            reads: AtomicU64::new(0),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Total number of disk reads attempted since construction.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Path of the file backing a grade id.
    pub fn grade_path(&self, id: u32) -> PathBuf {
        self.data_dir.join(format!("grade_{id}.json"))
    }

    /// Read and parse the grades manifest.
    pub async fn read_manifest(&self) -> Result<GradesConfig, StoreError> {
        let path = self.data_dir.join(MANIFEST_FILE);
        let (bytes, _token) = self.read_raw(&path).await?;
        parse(&path, &bytes)
    }

    /// Read and parse one grade file, returning its version token.
    pub async fn read_grade(&self, id: u32) -> Result<(GradeData, VersionToken), StoreError> {
        let path = self.grade_path(id);
        let (bytes, token) = self.read_raw(&path).await?;
        Ok((parse(&path, &bytes)?, token))
    }

    /// Read and parse the flat question bank, returning its version token.
    pub async fn read_bank(&self) -> Result<(QuestionBank, VersionToken), StoreError> {
        let path = self.data_dir.join(BANK_FILE);
        let (bytes, token) = self.read_raw(&path).await?;
        Ok((parse(&path, &bytes)?, token))
    }

    /// Load raw bytes and derive the version token for one file.
    async fn read_raw(&self, path: &Path) -> Result<(Vec<u8>, VersionToken), StoreError> {
        self.reads.fetch_add(1, Ordering::Relaxed);

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        // Stat after the read so the token can never predate the bytes.
        let mtime_nanos = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let digest = Sha256::digest(&bytes);
        let token = VersionToken::new(format!(
            "{:016x}.{mtime_nanos:x}",
            u64::from_be_bytes(digest[..8].try_into().unwrap_or([0; 8]))
        ));

        Ok((bytes, token))
    }
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}
