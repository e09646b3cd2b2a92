//! Configuration Management
//!
//! Persistent settings for the `gcloud-probe` host. The C exports never read
//! this file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gcp::auth;
use crate::gcp::client::COMPUTE_ENDPOINT;

/// Zone used when neither flags, config nor gcloud provide one
pub const DEFAULT_ZONE: &str = "us-central1-a";

const LOG_FILE_NAME: &str = "gcloud-probe.log";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Last used zone
    #[serde(default)]
    pub zone: Option<String>,
    /// Compute API endpoint override (emulators, mock servers)
    #[serde(default)]
    pub compute_endpoint: Option<String>,
}

impl Config {
    /// Directory holding the config file and the CLI log
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcloud-bridge"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.json"))
    }

    /// Log file written by `gcloud-probe`, next to the config file, or in the
    /// working directory when no config directory is known
    pub fn log_path() -> PathBuf {
        Self::log_path_in(Self::config_dir().as_deref())
    }

    fn log_path_in(config_dir: Option<&Path>) -> PathBuf {
        match config_dir {
            Some(dir) => dir.join(LOG_FILE_NAME),
            None => PathBuf::from(LOG_FILE_NAME),
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`; missing or unreadable files give defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> String {
        self.project_id
            .clone()
            .or_else(auth::get_default_project)
            .unwrap_or_default()
    }

    /// Get effective zone (config > gcloud default > us-central1-a)
    pub fn effective_zone(&self) -> String {
        self.zone
            .clone()
            .or_else(auth::get_default_zone)
            .unwrap_or_else(|| DEFAULT_ZONE.to_string())
    }

    /// Get effective compute endpoint
    pub fn effective_endpoint(&self) -> &str {
        self.compute_endpoint.as_deref().unwrap_or(COMPUTE_ENDPOINT)
    }
}
