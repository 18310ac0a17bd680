//! Optional TOML config file.
//!
//! Looked up at `--config <PATH>` or `<config_dir>/kubedump/config.toml`.
//! Command-line values override scalars; lists from both sources are
//! concatenated, file entries first.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub chunk_size: Option<u32>,
    pub dir: Option<PathBuf>,
    pub must_exist: Vec<String>,
    pub ignore: Vec<String>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text)?;
        if cfg.chunk_size == Some(0) {
            anyhow::bail!("chunk_size must be at least 1");
        }
        Ok(cfg)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }
        match default_path() {
            Some(path) if path.is_file() => Self::read(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// `~/.config/kubedump/config.toml` on Linux.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kubedump").join("config.toml"))
}
