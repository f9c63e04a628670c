pub mod cache;
pub mod config;
pub mod logging;
pub mod model;
pub mod server;
pub mod service;
pub mod store;
pub mod watcher;

pub use cache::{CachedBank, CachedGrade, ContentCache};
pub use config::Settings;
pub use model::{GradeData, GradeInfo, GradesConfig, Question, QuestionBank, VersionToken};
pub use service::{QueryService, ServiceError};
pub use store::{FileStore, StoreError};
pub use watcher::{DataWatcher, WatchError};
