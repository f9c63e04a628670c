//! Filesystem watcher keeping the content cache consistent with the
//! data directory.
//!
//! # Architecture
//!
//! ```text
//! DataWatcher
//!   - single notify::RecommendedWatcher on the data directory
//!   - Debouncer (per content file)
//!   - filename -> DataFile parser
//!         |
//!    +---------------+---------------+
//!    |               |               |
//! Manifest       Grade(id)         Bank
//! (reload whole) (evict, lazy)  (reload in place)
//! ```

mod data_watcher;
mod debouncer;
mod error;
mod target;

pub use data_watcher::DataWatcher;
pub use debouncer::Debouncer;
pub use error::WatchError;
pub use target::DataFile;
