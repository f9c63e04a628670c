//! Layered configuration for the quiz server.
//!
//! Sources, later ones winning:
//! - built-in defaults
//! - a TOML config file (`quizd.toml` by default)
//! - environment variables
//! - CLI flags (merged by the caller)
//!
//! # Environment Variables
//!
//! Variables are prefixed with `QUIZD_` and use double underscores to
//! separate nested levels:
//! - `QUIZD_DATA_DIR=/srv/quiz/data` sets `data_dir`
//! - `QUIZD_SERVER__BIND=0.0.0.0:8080` sets `server.bind`
//! - `QUIZD_FILE_WATCH__DEBOUNCE_MS=250` sets `file_watch.debounce_ms`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding the JSON content files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// File watcher settings
    #[serde(default)]
    pub file_watch: FileWatchConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Address and port to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileWatchConfig {
    /// How long a changed file must stay quiet before it is reloaded.
    /// Trades a little staleness for never reading a half-written file.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default log level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module level overrides, e.g. `watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
            file_watch: FileWatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for FileWatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, `quizd.toml`, and environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from("quizd.toml")
    }

    /// Load configuration with a specific config file path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore separates nested levels; single
            // underscores stay part of the field name.
            .merge(Env::prefixed("QUIZD_").split("__"))
            .extract()
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.server.bind, "127.0.0.1:8080");
        assert_eq!(settings.file_watch.debounce_ms, 100);
        assert_eq!(settings.logging.default, "warn");
    }

    #[test]
    fn toml_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "quizd.toml",
                r#"
                data_dir = "/srv/quiz/data"

                [server]
                bind = "0.0.0.0:9000"

                [file_watch]
                debounce_ms = 250
                "#,
            )?;

            let settings = Settings::load_from("quizd.toml").expect("load");
            assert_eq!(settings.data_dir, PathBuf::from("/srv/quiz/data"));
            assert_eq!(settings.server.bind, "0.0.0.0:9000");
            assert_eq!(settings.file_watch.debounce_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("quizd.toml", "[file_watch]\ndebounce_ms = 250\n")?;
            jail.set_env("QUIZD_FILE_WATCH__DEBOUNCE_MS", "500");
            jail.set_env("QUIZD_SERVER__BIND", "0.0.0.0:7000");

            let settings = Settings::load_from("quizd.toml").expect("load");
            assert_eq!(settings.file_watch.debounce_ms, 500);
            assert_eq!(settings.server.bind, "0.0.0.0:7000");
            Ok(())
        });
    }
}
