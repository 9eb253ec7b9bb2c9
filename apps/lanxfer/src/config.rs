//! CLI configuration.
//!
//! Configuration is read from TOML, if present:
//! - Linux: `~/.config/lanxfer/config.toml`
//! - Windows: `%APPDATA%/lanxfer/config.toml`
//!
//! Command-line flags override any value read here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use lanxfer_transfer::TransferConfig;
use serde::{Deserialize, Serialize};

/// lanxfer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Port the receiver listens on and the sender connects to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory received files are saved into.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Emit events as JSON lines.
    #[serde(default)]
    pub json: bool,
}

fn default_port() -> u16 {
    lanxfer_transfer::TransferConfig::default().port
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            download_dir: default_download_dir(),
            json: false,
        }
    }
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// A missing file at the default location yields defaults; a missing
    /// file that was asked for explicitly is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => {
                let path = config_path();
                if path.exists() {
                    Self::read(&path)
                } else {
                    tracing::debug!(path = %path.display(), "no config file, using defaults");
                    Ok(Config::default())
                }
            }
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Settings handed to the transfer sessions.
    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            port: self.port,
            download_dir: self.download_dir.clone(),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("lanxfer").join("config.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("lanxfer")
            .join("config.toml")
    }
}
