use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use trid_core::{MatchRecord, ScanError};

pub type ScanResult = Result<Vec<MatchRecord>, ScanError>;

/// JSON shape of one scanned file.
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<&'a [MatchRecord]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> FileReport<'a> {
    pub fn new(file: &Path, result: &'a ScanResult) -> Self {
        let (matches, error) = match result {
            Ok(records) => (Some(records.as_slice()), None),
            Err(e) => (None, Some(describe_error(e))),
        };
        Self {
            file: file.to_string_lossy().into_owned(),
            matches,
            error,
        }
    }
}

pub fn render_json(results: &[(&Path, ScanResult)]) -> serde_json::Result<String> {
    let reports: Vec<FileReport<'_>> = results
        .iter()
        .map(|(file, result)| FileReport::new(file, result))
        .collect();
    serde_json::to_string_pretty(&reports)
}

/// Human-readable listing in the same layout TrID prints.
pub fn render_text(file: &Path, result: &ScanResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", file.display());
    match result {
        Ok(records) if records.is_empty() => {
            let _ = writeln!(out, "  (no candidates reported)");
        }
        Ok(records) => {
            for record in records {
                let _ = writeln!(
                    out,
                    "  {:>6.2}% ({}) {}",
                    record.probability, record.extension, record.name
                );
                let details = [
                    ("Mime type", &record.mime_type),
                    ("Related URL", &record.related_url),
                    ("Definition", &record.definition),
                    ("Remarks", &record.remarks),
                ];
                for (label, value) in details {
                    if let Some(value) = value {
                        let _ = writeln!(out, "          {:<11}: {}", label, value);
                    }
                }
            }
        }
        Err(e) => {
            let _ = writeln!(out, "  error: {}", describe_error(e));
        }
    }
    out
}

/// The error message followed by its causes, `: `-separated.
pub fn describe_error(error: &ScanError) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        let _ = write!(message, ": {}", cause);
        source = cause.source();
    }
    message
}

/// Process exit status for a failed scan; the worst failure across files wins.
pub fn exit_code(error: &ScanError) -> u8 {
    if error.is_timeout() || matches!(error, ScanError::Execution(_)) {
        3
    } else if error.is_input_error() {
        2
    } else {
        1
    }
}
