use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::logging::LoggingConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroTrackConfig {
    pub dialog: DialogConfig,
    pub structuring: StructuringConfig,
    pub database: DatabaseConfig,
    pub logging: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    /// detectIntent URL of the dialog agent session endpoint
    pub url: String,

    /// Bearer token sent with every request (optional)
    pub token: Option<String>,

    pub language_code: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuringProvider {
    /// Local Ollama server, `/api/generate`
    Ollama,
    /// Remote service speaking `{text, requestedType} -> {flights}`
    Endpoint,
    /// Skip LLM structuring, rely on local extraction only
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringConfig {
    pub provider: StructuringProvider,
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx connection string for the document store
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
    pub dir: PathBuf,
    pub enable_file_logging: bool,
    pub enable_json_format: bool,
    pub max_log_files: usize,
}

impl Default for AeroTrackConfig {
    fn default() -> Self {
        Self {
            dialog: DialogConfig::default(),
            structuring: StructuringConfig::default(),
            database: DatabaseConfig::default(),
            logging: LogSection::default(),
        }
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/detectIntent".to_string(),
            token: None,
            language_code: "en".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            provider: StructuringProvider::Ollama,
            url: "http://localhost:11434".to_string(),
            model: "gemma3:latest".to_string(),
            temperature: 0.2,
            timeout_secs: 120,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://aerotrack.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LogSection {
    fn default() -> Self {
        let logging = LoggingConfig::default();
        Self {
            level: logging.level,
            dir: logging.log_dir,
            enable_file_logging: logging.enable_file_logging,
            enable_json_format: logging.enable_json_format,
            max_log_files: logging.max_log_files,
        }
    }
}

impl LogSection {
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.level.clone(),
            log_dir: self.dir.clone(),
            enable_file_logging: self.enable_file_logging,
            enable_json_format: self.enable_json_format,
            max_log_files: self.max_log_files,
        }
    }
}

impl AeroTrackConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        let config: AeroTrackConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    /// Load the file when given, otherwise defaults; environment wins either way
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("AEROTRACK_DIALOG_URL") {
            self.dialog.url = url;
        }

        if let Ok(token) = std::env::var("AEROTRACK_DIALOG_TOKEN") {
            self.dialog.token = Some(token).filter(|t| !t.is_empty());
        }

        if let Ok(url) = std::env::var("OLLAMA_URL") {
            self.structuring.provider = StructuringProvider::Ollama;
            self.structuring.url = url;
        }

        if let Ok(model) = std::env::var("OLLAMA_GEMMA_MODEL") {
            self.structuring.model = model;
        }

        // An explicit structuring service beats a local Ollama
        if let Ok(url) = std::env::var("AEROTRACK_STRUCTURE_URL") {
            self.structuring.provider = StructuringProvider::Endpoint;
            self.structuring.url = url;
        }

        if let Ok(url) = std::env::var("AEROTRACK_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(level) = std::env::var("AEROTRACK_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        Ok(())
    }
}

impl From<&str> for StructuringProvider {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "ollama" | "local" | "gemma" => StructuringProvider::Ollama,
            "endpoint" | "remote" | "http" => StructuringProvider::Endpoint,
            _ => StructuringProvider::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use std::fs;

    #[test]
    fn test_default_config() {
        let config = AeroTrackConfig::default();
        assert_eq!(config.structuring.provider, StructuringProvider::Ollama);
        assert_eq!(config.structuring.model, "gemma3:latest");
        assert!((config.structuring.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AeroTrackConfig::default();
        config.dialog.url = "https://agent.example/detectIntent".to_string();
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("aerotrack.toml");

        config.save_to_file(&config_path).unwrap();

        let loaded_config = AeroTrackConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded_config.dialog.url, "https://agent.example/detectIntent");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[structuring]\nprovider = \"none\"\n").unwrap();

        let config = AeroTrackConfig::load_from_file(&config_path).unwrap();
        assert_eq!(config.structuring.provider, StructuringProvider::None);
        assert_eq!(config.structuring.timeout_secs, 120);
        assert_eq!(config.dialog.language_code, "en");
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!(StructuringProvider::from("ollama"), StructuringProvider::Ollama);
        assert_eq!(StructuringProvider::from("Remote"), StructuringProvider::Endpoint);
        assert_eq!(StructuringProvider::from("off"), StructuringProvider::None);
    }
}
