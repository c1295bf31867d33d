use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::mail::events_client::DEFAULT_API_BASE;

pub const EU_API_BASE: &str = "https://api.eu.mailgun.net/v3/";

/// Per-request timeout used by the CLI when the config names none.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Defaults for `fetch`; every field can be overridden on the command line.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    pub maildir: Option<String>,
    pub domain: Option<String>,
    pub api_base: Option<String>,
    pub limit: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub checkpoint_each: Option<bool>,
}

impl Config {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    /// `timeout_secs = 0` disables the timeout.
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("mailgun_retriever"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    p.push("config.toml");
    Ok(p)
}

/// Load the config file; a missing file means all defaults.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    parse_config(&fs::read_to_string(&path)?)
        .with_context(|| format!("Invalid config {}", path.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(s)?;
    Ok(cfg)
}

/// Write a template for users to edit. Refuses to clobber an existing file.
pub fn write_template() -> Result<PathBuf> {
    let path = config_path()?;
    if path.exists() {
        return Err(anyhow::anyhow!("{} already exists", path.display()));
    }
    fs::create_dir_all(config_dir()?)?;
    let sample = Config {
        maildir: Some("~/Mail/mailgun".to_string()),
        domain: Some("mg.example.com".to_string()),
        api_base: Some(DEFAULT_API_BASE.to_string()),
        limit: None,
        timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
        checkpoint_each: Some(false),
    };
    let tom = toml::to_string_pretty(&sample)?;
    fs::write(&path, tom)?;
    Ok(path)
}
