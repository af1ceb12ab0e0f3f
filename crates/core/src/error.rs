use thiserror::Error;
use trid_executor::ExecutorError;

use crate::classifier::ToolDiagnostic;

/// Why a scan produced no records. Exactly one applies per scan attempt.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no file specified")]
    NoFileSpecified,

    #[error("number of matches must be at least 1")]
    InvalidMatchCount,

    #[error("no TrID definitions available")]
    NoDefinitions,

    #[error("TrID definitions package is empty")]
    EmptyDefinitionsPackage,

    #[error("file not found")]
    FileNotFound,

    #[error("unknown file type")]
    UnknownFileType,

    #[error("command timed out")]
    Timeout(#[source] ExecutorError),

    #[error("execution failed")]
    Execution(#[from] ExecutorError),
}

impl ScanError {
    /// The run was cut short by the configured timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The caller's arguments were at fault; retrying the same call cannot succeed.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoFileSpecified | Self::InvalidMatchCount | Self::FileNotFound
        )
    }

    /// TrID ran but could not use its definitions or recognize the file.
    pub fn is_tool_diagnostic(&self) -> bool {
        matches!(
            self,
            Self::NoDefinitions | Self::EmptyDefinitionsPackage | Self::UnknownFileType
        )
    }
}

impl From<ToolDiagnostic> for ScanError {
    fn from(diagnostic: ToolDiagnostic) -> Self {
        match diagnostic {
            ToolDiagnostic::NoFileSpecified => Self::NoFileSpecified,
            ToolDiagnostic::NoDefinitions => Self::NoDefinitions,
            ToolDiagnostic::EmptyDefinitionsPackage => Self::EmptyDefinitionsPackage,
            ToolDiagnostic::FileNotFound => Self::FileNotFound,
            ToolDiagnostic::UnknownFileType => Self::UnknownFileType,
        }
    }
}
