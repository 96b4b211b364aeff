use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::tracker::{NoiseFilter, DEFAULT_FILTER_LINES, DEFAULT_TIMEOUT};

/// File-based defaults. Every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Launcher path, skips autodetection
    pub launcher: Option<PathBuf>,
    /// Per-slot timeout in seconds
    pub timeout_secs: f64,
    /// Output lines that are never locations
    pub filter_lines: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            launcher: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs_f64(),
            filter_lines: DEFAULT_FILTER_LINES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Config {
    /// `<config_dir>/checks-mix/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("checks-mix").join("config.json"))
    }

    /// Load from a file, falling back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .context(format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the explicit path, or the default location
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Self::load(path)
            }
            None => match Self::default_path() {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.timeout_secs.is_finite() || self.timeout_secs <= 0.0 {
            anyhow::bail!("timeout_secs must be positive, got {}", self.timeout_secs);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn noise_filter(&self) -> NoiseFilter {
        NoiseFilter::from_lines(self.filter_lines.iter().cloned())
    }
}
