use crate::messages::wire::{WireConfig, DEFAULT_MAX_MESSAGE_SIZE};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Server configuration. Every field has a default so a config file only
/// needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server listens on
    pub bind_addr: String,
    /// Sockets accepted beyond this many live connections are dropped
    pub max_connections: usize,
    /// Largest accepted frame payload, in bytes
    pub max_message_size: usize,
    pub write_timeout_secs: u64,
    /// How long a game that ended on the board is kept before purging
    pub grace_period_secs: u64,
    pub purge_interval_secs: u64,
    /// Close connections that stay silent this long. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
    /// Messages queued for one player before they count as not reading and
    /// get disconnected
    pub outbox_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            max_connections: 1000,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            write_timeout_secs: 10,
            grace_period_secs: 30,
            purge_interval_secs: 5,
            idle_timeout_secs: None,
            outbox_capacity: 256,
        }
    }
}

impl ServerConfig {
    /// Get the default config directory
    pub fn default_config_dir() -> Result<PathBuf> {
        ProjectDirs::from("dev", "fogmate", "fogmate")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the default config file path
    pub fn default_config_file() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Resolve the effective configuration: an explicit file must exist and
    /// parse; otherwise the platform config file is used when present, and
    /// the built-in defaults when not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_config_file() {
            Ok(file) if file.exists() => Self::from_file(&file),
            Ok(file) => {
                debug!("No config file at {}, using defaults", file.display());
                Ok(Self::default())
            }
            Err(e) => {
                debug!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            anyhow::bail!("max_connections must be at least 1");
        }
        if self.max_message_size == 0 {
            anyhow::bail!("max_message_size must be at least 1");
        }
        if self.purge_interval_secs == 0 {
            anyhow::bail!("purge_interval_secs must be at least 1");
        }
        if self.idle_timeout_secs == Some(0) {
            anyhow::bail!("idle_timeout_secs must be at least 1 when set");
        }
        if self.outbox_capacity == 0 {
            anyhow::bail!("outbox_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn wire_config(&self) -> WireConfig {
        WireConfig::new(
            self.max_message_size,
            Duration::from_secs(self.write_timeout_secs),
        )
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3001");
        assert_eq!(config.max_message_size, 64 * 1024);
        assert_eq!(config.idle_timeout(), None);
        assert_eq!(config.grace_period(), Duration::from_secs(30));
        assert_eq!(config.outbox_capacity, 256);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "bind_addr = \"0.0.0.0:4000\"\nidle_timeout_secs = 120").unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:4000");
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.max_connections, 1000);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(ServerConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::from_toml("max_connections = 0").is_err());
        assert!(ServerConfig::from_toml("idle_timeout_secs = 0").is_err());
        assert!(ServerConfig::from_toml("outbox_capacity = 0").is_err());
        assert!(ServerConfig::from_toml("max_connections = \"lots\"").is_err());
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = ServerConfig {
            idle_timeout_secs: Some(60),
            ..ServerConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert!(text.contains("grace_period_secs = 30"));
        assert_eq!(ServerConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_wire_config_follows_settings() {
        let config = ServerConfig::from_toml("max_message_size = 512\nwrite_timeout_secs = 3").unwrap();
        let wire = config.wire_config();
        assert_eq!(wire.max_message_size, 512);
        assert_eq!(wire.write_timeout, Duration::from_secs(3));
    }
}
