//! Runtime configuration.
//!
//! Loaded from `config.toml` under the platform config directory
//! (`~/.config/storegate/config.toml` on Linux) unless `--config` names a
//! file. Every section is optional; missing keys fall back to defaults.
//! A handful of environment variables override the file:
//!
//! - `STOREGATE_DB_PATH`: SQLite database file
//! - `STOREGATE_HOST` / `STOREGATE_PORT`: gateway bind address

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "storegate";
const CONFIG_FILE: &str = "config.toml";
const DB_FILE: &str = "storegate.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the SQLite database holding `users` and `products`.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let path = ProjectDirs::from("", "", APP_NAME)
            .map(|dirs| dirs.data_dir().join(DB_FILE))
            .unwrap_or_else(|| PathBuf::from(DB_FILE));
        Self { path }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Whether new accounts may be created.
    pub allow_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            allow_registration: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8501,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`. A missing default file yields the defaults; a
    /// missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("STOREGATE_DB_PATH") {
            if !path.trim().is_empty() {
                self.store.path = PathBuf::from(path);
            }
        }
        if let Ok(host) = std::env::var("STOREGATE_HOST") {
            self.gateway.host = host;
        }
        if let Ok(port) = std::env::var("STOREGATE_PORT") {
            self.gateway.port = port
                .trim()
                .parse()
                .with_context(|| format!("STOREGATE_PORT is not a valid port: {port}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.gateway.host.trim().is_empty() {
            bail!("gateway.host cannot be empty");
        }
        if self.gateway.port == 0 {
            bail!("gateway.port must be between 1 and 65535");
        }
        if self.store.path.as_os_str().is_empty() {
            bail!("store.path cannot be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert!(config.auth.allow_registration);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert_eq!(config.gateway.port, 8501);
        assert_eq!(config.log.level, "info");
        assert!(config.store.path.ends_with(DB_FILE));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config = Config::from_toml(
            r#"
            [gateway]
            port = 9000

            [auth]
            allow_registration = false
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.host, "127.0.0.1");
        assert!(!config.auth.allow_registration);
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn store_path_is_read_from_toml() {
        let config = Config::from_toml("[store]\npath = \"/tmp/catalog.db\"\n").unwrap();
        assert_eq!(config.store.path, PathBuf::from("/tmp/catalog.db"));
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(Config::from_toml("[gateway]\nport = \"eighty\"").is_err());
    }

    #[test]
    fn validate_rejects_port_zero() {
        let mut config = Config::default();
        config.gateway.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_host() {
        let mut config = Config::default();
        config.gateway.host = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        assert!(Config::from_file(&missing).is_err());
    }

    #[test]
    fn from_file_reads_written_config() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\n").unwrap();
        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.log.level, "debug");
    }
}
