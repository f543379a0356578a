//! Daemon configuration loaded from TOML.

use std::path::{Path, PathBuf};

use anyhow::Context;
use loanflow_types::FlowParams;
use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
///
/// Flow timings live under a `[flow]` table; everything else is top level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Base URL of the hosted backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Directory backing the same-origin handoff storage.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Port of the completion endpoint.
    #[serde(default = "default_port")]
    pub port: u16,

    /// "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token for staff calls to the internal completion path. Unset
    /// disables that path. Never written back out.
    #[serde(default, skip_serializing)]
    pub internal_token: Option<String>,

    #[serde(default)]
    pub flow: FlowParams,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_backend_url() -> String {
    "http://127.0.0.1:8080/".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./loanflow_data")
}

fn default_port() -> u16 {
    7080
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl FlowConfig {
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            data_dir: default_data_dir(),
            port: default_port(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            internal_token: None,
            flow: FlowParams::default(),
        }
    }
}
