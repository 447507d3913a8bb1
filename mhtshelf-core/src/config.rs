use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::filter::FilterMode;
use crate::overlay::{DEFAULT_MIN_SELECTION, DEFAULT_TARGET_LANGUAGE};
use crate::sort::SortOrder;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_base_dir() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mhtshelf")
        .join("mht")
        .to_string_lossy()
        .to_string()
}

fn default_sort() -> SortOrder {
    SortOrder::TimeDesc
}

fn default_filter_mode() -> FilterMode {
    FilterMode::Substring
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    #[serde(default = "default_sort")]
    pub default_sort: SortOrder,
    #[serde(default = "default_filter_mode")]
    pub filter_mode: FilterMode,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            default_sort: default_sort(),
            filter_mode: default_filter_mode(),
        }
    }
}

impl LibraryConfig {
    pub fn base_path(&self) -> PathBuf {
        PathBuf::from(&self.base_dir)
    }
}

fn default_native_extensions() -> Vec<String> {
    vec![".mht".to_string(), ".mhtml".to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_native_extensions")]
    pub native_extensions: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            native_extensions: default_native_extensions(),
        }
    }
}

fn default_min_selection() -> f32 {
    DEFAULT_MIN_SELECTION
}

fn default_target_language() -> String {
    DEFAULT_TARGET_LANGUAGE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Both sides of a selection must exceed this, in view units.
    #[serde(default = "default_min_selection")]
    pub min_selection: f32,
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            min_selection: default_min_selection(),
            target_language: default_target_language(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("mhtshelf"))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.toml"))
    }

    /// Loads the user config, writing the defaults out on first run.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => {
                let config = Self::default();
                config.save_to(path);
                config
            }
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            self.save_to(&path);
        }
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        match toml::to_string_pretty(self) {
            Ok(content) => {
                if let Err(err) = fs::write(path, content) {
                    warn!(path = %path.display(), error = %err, "could not write config");
                }
            }
            Err(err) => warn!(error = %err, "could not serialize config"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_full_config() {
        let toml_str = r#"
            [library]
            base_dir = "/data/archives"
            default_sort = "name_asc"
            filter_mode = "fuzzy"

            [import]
            native_extensions = [".mht"]

            [overlay]
            min_selection = 32.0
            target_language = "de"

            [logging]
            level = "debug"
        "#;
        let config: Config = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.library.base_path(), PathBuf::from("/data/archives"));
        assert_eq!(config.library.default_sort, SortOrder::NameAsc);
        assert_eq!(config.library.filter_mode, FilterMode::Fuzzy);
        assert_eq!(config.import.native_extensions, vec![".mht"]);
        assert_eq!(config.overlay.min_selection, 32.0);
        assert_eq!(config.overlay.target_language, "de");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn deserialize_minimal_config_uses_defaults() {
        let toml_str = r#"
            [library]
            base_dir = "/data/archives"
        "#;
        let config: Config = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.library.default_sort, SortOrder::TimeDesc);
        assert_eq!(config.library.filter_mode, FilterMode::Substring);
        assert_eq!(config.import.native_extensions, vec![".mht", ".mhtml"]);
        assert_eq!(config.overlay.min_selection, 50.0);
        assert_eq!(config.overlay.target_language, "en");
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn default_base_dir_ends_in_library_folder() {
        let config = Config::default();
        assert!(config.library.base_path().ends_with("mhtshelf/mht"));
    }

    #[test]
    fn first_load_writes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(path.is_file());
        assert_eq!(Config::load_from(&path), config);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[library\nbase_dir = ").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn save_round_trips_edits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.overlay.target_language = "ja".to_string();
        config.library.default_sort = SortOrder::TimeAsc;
        config.save_to(&path);
        assert_eq!(Config::load_from(&path), config);
    }
}
