//! Error types for the data directory watcher.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher setup and operation.
///
/// Setup errors are fatal to the serving process: without invalidation
/// the cache would serve stale data indefinitely.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to initialize file watcher: {reason}")]
    InitFailed { reason: String },

    #[error("cannot watch data directory {}: {reason}", path.display())]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("file event channel closed unexpectedly")]
    ChannelClosed,
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
