use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Daemon configuration, stored as TOML under the user config dir.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Base URL of the REST backend, e.g. `https://api.example.com`.
    pub url: Option<String>,
    /// Bearer token minted by the credential provider during login.
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let home = dirs::home_dir().context("cannot determine home directory")?;
        Ok(home
            .join(".local")
            .join("share")
            .join("praxis")
            .join("sync.db"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Seconds between full reconciliation passes.
    #[serde(default = "default_full_interval")]
    pub full_interval_seconds: u64,
    /// Seconds between quick (pending-only) passes.
    #[serde(default = "default_quick_interval")]
    pub quick_interval_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_interval_seconds: default_full_interval(),
            quick_interval_seconds: default_quick_interval(),
        }
    }
}

fn default_full_interval() -> u64 {
    300
}

fn default_quick_interval() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceConfig {
    /// Stable identifier for this install, generated on first run.
    pub device_id: Option<String>,
}

pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("cannot determine config directory")?;
    Ok(config_dir.join("praxis").join("config.toml"))
}

/// Load configuration, creating a default file (with a fresh device id) on
/// first run.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        let mut config = Config::default();
        config.device.device_id = Some(uuid::Uuid::new_v4().to_string());
        save(path, &config)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(config);
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&raw).with_context(|| format!("invalid config: {}", path.display()))?;

    if config.device.device_id.is_none() {
        config.device.device_id = Some(uuid::Uuid::new_v4().to_string());
        save(path, &config)?;
        tracing::info!("generated device id for existing config");
    }

    Ok(config)
}

fn save(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, raw).with_context(|| format!("failed to write config: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_parses_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sync.full_interval_seconds, 300);
        assert_eq!(config.sync.quick_interval_seconds, 60);
        assert!(config.server.url.is_none());
    }

    #[test]
    fn load_creates_default_config_with_device_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = load(&path).unwrap();
        assert!(path.exists());
        assert!(config.device.device_id.is_some());

        // Second load keeps the generated id stable.
        let again = load(&path).unwrap();
        assert_eq!(again.device.device_id, config.device.device_id);
    }

    #[test]
    fn intervals_round_trip_through_toml() {
        let mut config = Config::default();
        config.sync.full_interval_seconds = 120;
        let raw = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&raw).unwrap();
        assert_eq!(back.sync.full_interval_seconds, 120);
    }
}
