//! Dashboard configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::views::DEFAULT_RECENT_LIMIT;
use crate::wallet::WalletConfig;

/// Default config file name
pub const DEFAULT_CONFIG_FILE: &str = "mangrove-admin.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub node: NodeConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Directory holding the dashboard database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Directory served under /static
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewsConfig {
    /// Entries in the recent-activity panel
    #[serde(default = "default_recent_limit")]
    pub recent_activity_limit: usize,
}

// Defaults
fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_http_port() -> u16 { 8080 }
fn default_static_dir() -> PathBuf { PathBuf::from("static") }
fn default_recent_limit() -> usize { DEFAULT_RECENT_LIMIT }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            recent_activity_limit: default_recent_limit(),
        }
    }
}

/// Config file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.node.data_dir, PathBuf::from("./data"));
        assert_eq!(config.views.recent_activity_limit, 6);
        assert_eq!(config.wallet.network, "sepolia");
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml(
            r#"
[api]
http_port = 9000

[wallet]
reject = true
"#,
        )
        .unwrap();

        assert_eq!(config.api.http_port, 9000);
        assert_eq!(config.api.static_dir, PathBuf::from("static"));
        assert!(config.wallet.reject);
        assert!(config.wallet.enabled);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[api]\nhttp_port = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
