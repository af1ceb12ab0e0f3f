use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use trid_core::{ScanOptions, DEFAULT_COMMAND};

pub const DEFAULT_CONFIG_PATH: &str = "trid-scan.yaml";
pub const DEFAULT_MAX_MATCHES: usize = 5;

pub const ENV_COMMAND: &str = "TRID_CMD";
pub const ENV_DEFINITIONS: &str = "TRID_DEFS";
pub const ENV_TIMEOUT_MS: &str = "TRID_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<PathBuf>,
    pub timeout_ms: u64,
    pub max_matches: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            definitions: None,
            timeout_ms: 30_000,
            max_matches: DEFAULT_MAX_MATCHES,
        }
    }
}

impl Config {
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// An explicit path must exist; otherwise `trid-scan.yaml` is used when present.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if Self::exists(default_path) {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.command.trim().is_empty() {
            anyhow::bail!("command cannot be empty");
        }
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `TRID_CMD`, `TRID_DEFS` and `TRID_TIMEOUT_MS` from `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(command) = lookup(ENV_COMMAND).filter(|v| !v.trim().is_empty()) {
            self.command = command;
        }
        if let Some(definitions) = lookup(ENV_DEFINITIONS) {
            self.definitions = (!definitions.is_empty()).then(|| PathBuf::from(definitions));
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", ENV_TIMEOUT_MS, timeout))?;
        }
        Ok(self)
    }

    pub fn scan_options(&self) -> ScanOptions {
        let options = ScanOptions::new()
            .with_command(self.command.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms));
        match &self.definitions {
            Some(definitions) => options.with_definitions(definitions.clone()),
            None => options,
        }
    }
}
