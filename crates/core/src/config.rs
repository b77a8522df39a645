use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides [`PcodeConfig::processors_dir`].
pub const PROCESSORS_DIR_ENV: &str = "PCODE_PROCESSORS_DIR";

/// Front-end settings, read from an optional JSON file.
///
/// Precedence, lowest first: built-in defaults, the file, the environment,
/// explicit command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcodeConfig {
    /// Root of the processor tree (`<arch>/data/languages/*.ldefs`).
    pub processors_dir: PathBuf,
    /// Language used when none is given on the command line.
    pub default_language: String,
    pub base_address: u64,
    pub max_instructions: u32,
}

impl Default for PcodeConfig {
    fn default() -> Self {
        Self {
            processors_dir: PathBuf::from("processors"),
            default_language: "x86:le:32:default".to_string(),
            base_address: 0x401000,
            max_instructions: 1024,
        }
    }
}

impl PcodeConfig {
    /// Read a config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Defaults, or the given file, with the environment applied on top.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_processors_override(std::env::var_os(PROCESSORS_DIR_ENV).map(PathBuf::from)))
    }

    /// Replace the processors directory when `dir` is set and non-empty.
    pub fn with_processors_override(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir.filter(|d| !d.as_os_str().is_empty()) {
            log::debug!("processors directory overridden: {}", dir.display());
            self.processors_dir = dir;
        }
        self
    }
}
