//! Configuration loading
//!
//! Everything has a sensible default, so the config file is optional:
//! `<config dir>/crochet-tracker/config.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::images::IngestSettings;
use crate::state::query::DEFAULT_COLLAGE_LIMIT;

const APP_DIR: &str = "crochet-tracker";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Namespace segment of every collection path
    pub namespace: String,
    pub database_path: PathBuf,
    /// Upper bound for any single gateway call
    pub remote_timeout_secs: u64,
    pub collage_limit: usize,
    pub images: IngestSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            namespace: APP_DIR.to_string(),
            database_path: default_database_path(),
            remote_timeout_secs: 10,
            collage_limit: DEFAULT_COLLAGE_LIMIT,
            images: IngestSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load from the standard location, falling back to defaults.
    /// A broken config file is logged, never fatal.
    pub fn load() -> Self {
        let Some(path) = config_file_path() else {
            return Self::default();
        };

        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs.max(1))
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// The database file is stored in the user's data directory:
/// - Linux: ~/.local/share/crochet-tracker/projects.db
/// - macOS: ~/Library/Application Support/crochet-tracker/projects.db
/// - Windows: %APPDATA%\crochet-tracker\projects.db
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("projects.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.namespace, "crochet-tracker");
        assert_eq!(config.collage_limit, 12);
        assert_eq!(config.images.max_dimension, 800);
        assert_eq!(config.images.jpeg_quality, 70);
        assert_eq!(config.remote_timeout(), Duration::from_secs(10));
        assert!(config.database_path.ends_with("crochet-tracker/projects.db"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "namespace = \"angie\"\nremote_timeout_secs = 3\n\n[images]\nmax_dimension = 640"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.namespace, "angie");
        assert_eq!(config.remote_timeout(), Duration::from_secs(3));
        assert_eq!(config.images.max_dimension, 640);
        assert_eq!(config.images.jpeg_quality, 70);
        assert_eq!(config.collage_limit, 12);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "namespace = [").unwrap();

        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = AppConfig {
            remote_timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.remote_timeout(), Duration::from_secs(1));
    }
}
