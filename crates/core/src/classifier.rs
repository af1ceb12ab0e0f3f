//! Maps TrID's free-text diagnostics onto a closed set of failures.
//!
//! TrID has no machine-readable error channel, so the captured output is
//! searched for known phrases. All wording knowledge lives in [`SIGNATURES`].

/// A failure TrID reported in its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolDiagnostic {
    NoFileSpecified,
    NoDefinitions,
    EmptyDefinitionsPackage,
    FileNotFound,
    UnknownFileType,
}

struct Signature {
    /// Every phrase must be present (case-sensitive substring match).
    phrases: &'static [&'static str],
    diagnostic: ToolDiagnostic,
}

/// Checked in order; the first hit wins.
const SIGNATURES: &[Signature] = &[
    Signature {
        phrases: &["you have to specify at least one file to analyze"],
        diagnostic: ToolDiagnostic::NoFileSpecified,
    },
    Signature {
        phrases: &["No definitions available!"],
        diagnostic: ToolDiagnostic::NoDefinitions,
    },
    Signature {
        phrases: &["Def package", "is empty!"],
        diagnostic: ToolDiagnostic::EmptyDefinitionsPackage,
    },
    Signature {
        phrases: &["Error: found no file(s) to analyze!"],
        diagnostic: ToolDiagnostic::FileNotFound,
    },
    // Also matches a candidate whose remarks happen to contain "Unknown!".
    Signature {
        phrases: &["Unknown!"],
        diagnostic: ToolDiagnostic::UnknownFileType,
    },
];

/// Returns the first known diagnostic present in `output`, if any.
pub fn classify(output: &str) -> Option<ToolDiagnostic> {
    let diagnostic = SIGNATURES
        .iter()
        .find(|sig| sig.phrases.iter().all(|phrase| output.contains(phrase)))
        .map(|sig| sig.diagnostic);

    if let Some(diagnostic) = diagnostic {
        tracing::debug!("TrID output classified as {:?}", diagnostic);
    }
    diagnostic
}
