use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_COMMAND: &str = "trid";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One candidate file type reported by TrID, in the tool's own ranking order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Match probability as a percentage (0-100).
    pub probability: f64,
    /// Lower-cased extension including the leading dot, e.g. ".pdf".
    pub extension: String,
    /// Descriptive name; qualifiers such as "(v0.4)" are kept.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// Name of the TrID definition file (".trid.xml") that produced the match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

impl MatchRecord {
    pub fn new(probability: f64, extension: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            probability,
            extension: extension.into(),
            name: name.into(),
            mime_type: None,
            related_url: None,
            remarks: None,
            definition: None,
        }
    }
}

/// How to invoke TrID. Built once and shared by every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Executable name (resolved through PATH) or absolute path.
    pub command: String,
    /// Alternate definitions package (`-d:`); `None` uses the tool's default.
    pub definitions: Option<PathBuf>,
    pub timeout: Duration,
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        let command = command.into();
        if !command.trim().is_empty() {
            self.command = command;
        }
        self
    }

    pub fn with_definitions(mut self, definitions: impl Into<PathBuf>) -> Self {
        let definitions = definitions.into();
        self.definitions = if definitions.as_os_str().is_empty() {
            None
        } else {
            Some(definitions)
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.timeout = timeout;
        }
        self
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            definitions: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
