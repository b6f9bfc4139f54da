use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ranges::Sex;

const ALIASES_FILE: &str = "mapping.json";
const RANGES_FILE: &str = "normal_ranges.json";
const RULES_FILE: &str = "disease_rules.json";
const MODEL_FILE: &str = "predict_model.json";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub schema_version: u32,
    pub output_format: OutputFormat,

    // Data tables (default to files under the config directory)
    pub aliases_path: Option<PathBuf>,
    pub ranges_path: Option<PathBuf>,
    pub rules_path: Option<PathBuf>,

    // Optional statistical predictor
    pub model_path: Option<PathBuf>,

    /// Selects sex-specific reference ranges when set
    pub sex: Option<Sex>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            output_format: OutputFormat::Json,
            aliases_path: None,
            ranges_path: None,
            rules_path: None,
            model_path: None,
            sex: None,
        }
    }
}

impl Config {
    /// Load config from file, or create default
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".bloodreport"))
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.json"))
    }

    fn resolve(explicit: &Option<PathBuf>, filename: &str) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::default_config_dir()?.join(filename)),
        }
    }

    /// Get the alias table path
    pub fn get_aliases_path(&self) -> Result<PathBuf> {
        Self::resolve(&self.aliases_path, ALIASES_FILE)
    }

    /// Get the reference range table path
    pub fn get_ranges_path(&self) -> Result<PathBuf> {
        Self::resolve(&self.ranges_path, RANGES_FILE)
    }

    /// Get the disease rule table path
    pub fn get_rules_path(&self) -> Result<PathBuf> {
        Self::resolve(&self.rules_path, RULES_FILE)
    }

    /// Get the predictor model path
    pub fn get_model_path(&self) -> Result<PathBuf> {
        Self::resolve(&self.model_path, MODEL_FILE)
    }
}

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.output_format, OutputFormat::Json);
        assert!(config.model_path.is_none());
        assert!(config.sex.is_none());
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = Config {
            ranges_path: Some(PathBuf::from("/data/ranges.json")),
            ..Config::default()
        };
        assert_eq!(
            config.get_ranges_path().unwrap(),
            PathBuf::from("/data/ranges.json")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            output_format: OutputFormat::Text,
            sex: Some(Sex::Female),
            model_path: Some(dir.path().join("model.json")),
            ..Config::default()
        };
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.output_format, OutputFormat::Text);
        assert_eq!(loaded.sex, Some(Sex::Female));
        assert_eq!(loaded.model_path, config.model_path);
    }

    #[test]
    fn test_load_missing_returns_default() {
        let dir = tempdir().unwrap();
        let loaded = Config::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.schema_version, 1);
    }

    #[test]
    fn test_load_malformed_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
