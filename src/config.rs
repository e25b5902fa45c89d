use crate::error::{QryError, Result};
use crate::query::{SearchMode, DEFAULT_EXCLUDE_DIRS, DEFAULT_MAX_RESULTS};
use crate::search::algorithms::SearchAlgorithm;
use crate::search::content::DEFAULT_MMAP_THRESHOLD;
use crate::search::engine::{
    default_workers, DEFAULT_CHANNEL_CAPACITY, DEFAULT_INCREMENTAL_TIMEOUT,
};
use crate::search::{EngineConfig, Strategy};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_FILE: &str = "qry/config.toml";
const CONFIG_DOT_FILE: &str = ".qry.toml";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub search: SearchConfig,
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_mode: SearchMode,
    pub max_results: usize,
    pub exclude_dirs: Vec<String>,
    pub case_sensitive: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_mode: SearchMode::default(),
            max_results: DEFAULT_MAX_RESULTS,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            case_sensitive: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub strategy: Strategy,
    /// Defaults to `min(8, logical CPUs)` when unset.
    pub workers: Option<usize>,
    pub incremental_timeout_ms: u64,
    pub mmap_threshold_bytes: u64,
    pub channel_capacity: usize,
    pub algorithm: SearchAlgorithm,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers: None,
            incremental_timeout_ms: DEFAULT_INCREMENTAL_TIMEOUT.as_millis() as u64,
            mmap_threshold_bytes: DEFAULT_MMAP_THRESHOLD,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            algorithm: SearchAlgorithm::default(),
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            strategy: self.strategy,
            workers: self.workers.unwrap_or_else(default_workers),
            incremental_timeout: Duration::from_millis(self.incremental_timeout_ms),
            mmap_threshold: self.mmap_threshold_bytes,
            algorithm: self.algorithm,
            channel_capacity: self.channel_capacity,
        }
    }
}

impl Config {
    /// Loads the first config file found, or defaults when there is none.
    pub fn load() -> Result<Self> {
        match Self::find_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            QryError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config = toml::from_str(&content).map_err(|source| QryError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/qry/config.toml`, then `~/.qry.toml`, then `./.qry.toml`.
    /// Where `init-config` writes when no path is given.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_FILE))
    }

    pub fn find_config_path() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_FILE)),
            dirs::home_dir().map(|home| home.join(CONFIG_DOT_FILE)),
            Some(PathBuf::from(CONFIG_DOT_FILE)),
        ];
        candidates.into_iter().flatten().find(|path| path.exists())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                QryError::Config(format!(
                    "Failed to create config directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        fs::write(path, content).map_err(|e| {
            QryError::Config(format!("Failed to write config file {}: {e}", path.display()))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[search]\ndefault_mode = \"content\"\n\n[engine]\nstrategy = \"priority\"\nworkers = 2\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.search.default_mode, SearchMode::Content);
        assert_eq!(config.search.max_results, DEFAULT_MAX_RESULTS);
        assert!(config.search.exclude_dirs.iter().any(|d| d == ".git"));

        let engine = config.engine.to_engine_config();
        assert_eq!(engine.strategy, Strategy::Priority);
        assert_eq!(engine.workers, 2);
        assert_eq!(engine.incremental_timeout, DEFAULT_INCREMENTAL_TIMEOUT);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/qry.toml");
        let mut config = Config::default();
        config.search.exclude_dirs = vec!["vendor".to_string()];
        config.engine.algorithm = SearchAlgorithm::BoyerMooreHorspool;
        config.engine.incremental_timeout_ms = 250;

        config.save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("algorithm = \"boyer-moore-horspool\""));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[search\nmax_results = ").unwrap();
        match Config::load_from(&path) {
            Err(QryError::ConfigParse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            Config::load_from(&dir.path().join("absent.toml")),
            Err(QryError::Config(_))
        ));
    }
}
