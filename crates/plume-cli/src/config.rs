//! Configuration file support

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Configuration for plume
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inference service
    pub endpoint: Option<String>,
    /// Display name override (skips the identity lookup)
    pub user_name: Option<String>,
    /// Print the reasoning trace while it streams
    pub show_reasoning: Option<bool>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plume")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        // Check for PLUME_CONFIG_PATH env var first
        if let Ok(path) = std::env::var("PLUME_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from file
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse config file: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read config file: {}", e);
                Self::default()
            }
        }
    }

    /// Save config to file
    pub fn save(&self) -> std::io::Result<()> {
        let path = Self::config_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }

        let default_config = Config {
            endpoint: Some("http://localhost:8111".to_string()),
            user_name: None,
            show_reasoning: Some(false),
        };

        default_config.save()?;
        Ok(path)
    }
}

/// Example config shown after `--init-config`
pub fn example_config() -> &'static str {
    r#"endpoint = "http://localhost:8111"
# user_name = "alice"
show_reasoning = false
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default() {
        let config: Config = toml::from_str(r#"endpoint = "http://host:1234""#).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://host:1234"));
        assert!(config.user_name.is_none());
        assert!(config.show_reasoning.is_none());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert!(config.endpoint.is_some());
        assert_eq!(config.show_reasoning, Some(false));
    }
}
