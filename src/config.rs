//! Shell configuration, loaded from a TOML file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Shell configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the catalog and table files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Prompt printed before each input line and each response.
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Where line history is kept between sessions.
    #[serde(default)]
    pub history_file: Option<PathBuf>,

    /// `tracing` filter directive, e.g. `reldb=debug`.
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./DB")
}

fn default_prompt() -> String {
    "reldb> ".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            prompt: default_prompt(),
            history_file: None,
            log_filter: None,
        }
    }
}

impl Config {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
