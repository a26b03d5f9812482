//! Configuration Management
//!
//! Handles persistent connection settings for vcd-filter and loading of
//! filter files.

use crate::filter::FilterConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// API version requested when none is configured
pub const DEFAULT_API_VERSION: &str = "37.0";

/// Environment variable holding the password (never written to disk)
pub const PASSWORD_ENV: &str = "VCD_PASSWORD";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// VCD endpoint, e.g. https://vcd.example.com/api
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Organization to log in to (`System` for provider sessions)
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    /// Default VDC for network and edge gateway lookups
    #[serde(default)]
    pub vdc: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub allow_unverified_ssl: bool,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vcd-filter").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Apply command-line values over the stored ones (CLI > config)
    pub fn merge_cli(
        &mut self,
        endpoint: Option<String>,
        org: Option<String>,
        user: Option<String>,
        vdc: Option<String>,
    ) {
        if endpoint.is_some() {
            self.endpoint = endpoint;
        }
        if org.is_some() {
            self.org = org;
        }
        if user.is_some() {
            self.user = user;
        }
        if vdc.is_some() {
            self.vdc = vdc;
        }
    }

    pub fn effective_api_version(&self) -> String {
        self.api_version
            .clone()
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
    }

    /// Fetch a required setting with a helpful error
    pub fn require<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
        value.as_deref().filter(|v| !v.is_empty()).ok_or_else(|| {
            anyhow::anyhow!(
                "missing '{}': pass --{} or set it in the config file",
                name,
                name
            )
        })
    }

    /// Password from the environment
    pub fn password() -> Result<String> {
        std::env::var(PASSWORD_ENV).with_context(|| format!("{} is not set", PASSWORD_ENV))
    }
}

/// Load a filter file (YAML or JSON).
///
/// Accepts the plain map form or the Terraform block form (a list holding one map).
pub fn load_filter_file(path: &Path) -> Result<FilterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter file {:?}", path))?;
    parse_filter(&content).with_context(|| format!("Invalid filter file {:?}", path))
}

/// Parse filter text (YAML is a superset of JSON, so both work)
pub fn parse_filter(content: &str) -> Result<FilterConfig> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    let value = serde_json::to_value(yaml)?;

    if value.is_array() {
        FilterConfig::from_block(&value)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}
