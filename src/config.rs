use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::h5::DEFAULT_COMPRESSION;
use crate::imaging::pair::PairMethod;

/// Environment variable pointing at an alternative config file.
pub const CONFIG_ENV: &str = "ELEMENTAL_SCOPE_CONFIG";

const DEFAULT_FILE: &str = "elemental-scope.json";

// ---------------------------------------------------------------------------
// Persistent settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deflate level for written HDF5 files.
    pub compression_level: u8,
    /// Idle time after a slider move before the comparison is redrawn.
    pub debounce_ms: u64,
    /// Extra space around the detected content, as a fraction of the image.
    pub view_margin: f64,
    pub pair_method: PairMethod,
    /// Root folder chosen last time.
    pub last_root: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION,
            debounce_ms: 1000,
            view_margin: 0.05,
            pair_method: PairMethod::default(),
            last_root: None,
        }
    }
}

impl AppConfig {
    /// Config file location: `$ELEMENTAL_SCOPE_CONFIG`, else the working directory.
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE))
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load the default config, falling back to defaults on error.
    pub fn load() -> Self {
        let path = Self::path();
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("Using default settings: {e:#}");
            Self::default()
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("serializing config")?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }

    /// Save to the default location, logging failures.
    pub fn save(&self) {
        let path = Self::path();
        if let Err(e) = self.save_to(&path) {
            log::warn!("Could not save settings: {e:#}");
        }
    }
}
