use crate::global;
use crate::recorder::RecorderSettings;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Capture program. Receives `<url> <quality> -o <file>`.
    pub program: String,
    /// Extra arguments placed before the stream URL, e.g. `--twitch-disable-ads`.
    pub extra_args: Vec<String>,
    pub quality: String,
    /// Where recordings are written. Defaults to the per-user data directory.
    pub recording_dir: Option<PathBuf>,
    /// How long shutdown waits for stopped capture processes to finish their files.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            program: "streamlink".to_string(),
            extra_args: Vec::new(),
            quality: "best".to_string(),
            recording_dir: None,
            shutdown_grace_secs: 10,
        }
    }
}

impl RecorderConfig {
    pub fn recording_dir(&self) -> Result<PathBuf> {
        match &self.recording_dir {
            Some(dir) => Ok(dir.clone()),
            None => global::recordings_dir(),
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn settings(&self) -> Result<RecorderSettings> {
        Ok(RecorderSettings {
            recording_dir: self.recording_dir()?,
            program: self.program.clone(),
            extra_args: self.extra_args.clone(),
            quality: self.quality.clone(),
        })
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load from the default location, writing defaults there if missing.
    pub fn load() -> Result<Self> {
        Self::load_from(&global::config_file()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }
}
