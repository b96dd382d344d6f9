use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::store::{LocalDirStore, RemoteStore, SshStore};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteKind {
    Local,
    Ssh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RemoteProfile {
    pub name: String,
    pub kind: RemoteKind,
    /// Local: directory acting as the remote root. Ssh: remote directory
    /// all paths are resolved under (defaults to `/`).
    pub root: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub default_remote: String,
    pub log_dir: String,
    pub log_level: String,
    pub remotes: Vec<RemoteProfile>,
    /// Repairs made while loading, reported once logging is up
    #[serde(skip)]
    pub warnings: Vec<String>,
}

impl RemoteProfile {
    pub fn build_store(&self) -> Result<Box<dyn RemoteStore>> {
        match self.kind {
            RemoteKind::Local => {
                let root = self
                    .root
                    .as_deref()
                    .with_context(|| format!("Remote '{}' needs a root directory", self.name))?;
                Ok(Box::new(LocalDirStore::new(root)))
            }
            RemoteKind::Ssh => {
                let host = self
                    .host
                    .as_deref()
                    .with_context(|| format!("Remote '{}' needs a host", self.name))?;
                // Without a user, ssh falls back to its own config
                Ok(Box::new(SshStore::new(
                    self.user.as_deref(),
                    host,
                    self.port.unwrap_or(22),
                    self.root.as_deref().unwrap_or("/"),
                )))
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        // Set default mirror directory
        let mirror = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("treesync-remote");
        Self {
            default_remote: "local".to_string(),
            log_dir: "logs".to_string(),
            log_level: "info".to_string(),
            remotes: vec![RemoteProfile {
                name: "local".to_string(),
                kind: RemoteKind::Local,
                root: Some(mirror.to_string_lossy().to_string()),
                host: None,
                user: None,
                port: None,
            }],
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn remote(&self, name: Option<&str>) -> Result<&RemoteProfile> {
        let name = name.unwrap_or(&self.default_remote);
        match self.remotes.iter().find(|r| r.name == name) {
            Some(profile) => Ok(profile),
            None => bail!("No remote named '{}' in config", name),
        }
    }
}

#[derive(Debug)]
pub struct ConfigManager {
    config_file: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("treesync");

        // Create config directory if it doesn't exist
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        }

        Ok(Self::from_file(config_dir.join("treesync.toml")))
    }

    pub fn from_file(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    pub fn load_config(&self) -> Result<AppConfig> {
        // If config file doesn't exist, create it with default values
        if !self.config_file.exists() {
            let default_config = AppConfig::default();
            self.save_config(&default_config)?;
        }

        let content: String =
            fs::read_to_string(&self.config_file).context("Failed to read config file")?;

        let mut config: AppConfig =
            toml::from_str(&content).context("Failed to parse config file")?;

        // Ensure the default remote exists
        if !config.remotes.iter().any(|r| r.name == config.default_remote) {
            if let Some(first) = config.remotes.first() {
                let warning = format!(
                    "Default remote '{}' not configured, using '{}'",
                    config.default_remote, first.name
                );
                config.warnings.push(warning);
                config.default_remote = first.name.clone();
            }
        }

        Ok(config)
    }

    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }
        let toml = toml::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(&self.config_file, toml).context("Failed to write config file")?;
        Ok(())
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_file
    }
}
