//! Tolerant parser for TrID's verbose text report.
//!
//! The report is a sequence of blank-line separated blocks. A block that
//! carries a candidate looks like:
//!
//! ```text
//!  85.50% (.PDF) Adobe Portable Document Format (5000/1)
//!        Mime type  : application/pdf
//!        Definition : adobe-pdf.trid.xml
//! ```
//!
//! Each line is classified on its own (header, detail, anything else). Blocks
//! without a usable header are banner or summary text and are skipped; they
//! never turn into errors.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::MatchRecord;

/// `<prob>% (<.ext>) <name>[ (<points>/<patterns>...)]`
static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?P<prob>[0-9.]*)%\s+\((?P<ext>\.[^)]*)\)\s+(?P<name>\S.*?)(?:\s+\(\d+(?:/\d+)+\))?\s*$",
    )
    .expect("header pattern compiles")
});

static DETAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<key>Mime type|Related URL|Definition|Remarks)\s*:\s*(?P<value>.*?)\s*$")
        .expect("detail pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailKey {
    MimeType,
    RelatedUrl,
    Definition,
    Remarks,
}

impl DetailKey {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "Mime type" => Some(Self::MimeType),
            "Related URL" => Some(Self::RelatedUrl),
            "Definition" => Some(Self::Definition),
            "Remarks" => Some(Self::Remarks),
            _ => None,
        }
    }

    /// Later lines overwrite earlier ones; an empty value clears the field.
    fn apply(self, record: &mut MatchRecord, value: &str) {
        let value = (!value.is_empty()).then(|| value.to_string());
        match self {
            Self::MimeType => record.mime_type = value,
            Self::RelatedUrl => record.related_url = value,
            Self::Definition => record.definition = value,
            Self::Remarks => record.remarks = value,
        }
    }
}

#[derive(Debug, PartialEq)]
struct Header<'a> {
    probability: &'a str,
    extension: &'a str,
    name: &'a str,
}

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Header(Header<'a>),
    Detail(DetailKey, &'a str),
    Other,
}

fn classify_line(line: &str) -> Line<'_> {
    if let Some(caps) = HEADER.captures(line) {
        if let (Some(probability), Some(extension), Some(name)) =
            (caps.name("prob"), caps.name("ext"), caps.name("name"))
        {
            return Line::Header(Header {
                probability: probability.as_str(),
                extension: extension.as_str(),
                name: name.as_str(),
            });
        }
    }

    if let Some(caps) = DETAIL.captures(line) {
        let key = caps.name("key").and_then(|m| DetailKey::from_label(m.as_str()));
        if let (Some(key), Some(value)) = (key, caps.name("value")) {
            return Line::Detail(key, value.as_str());
        }
    }

    Line::Other
}

/// Strips `%` and whitespace; empty, unparseable or out-of-range values yield `None`.
fn parse_probability(raw: &str) -> Option<f64> {
    let cleaned = raw.replace('%', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    let probability: f64 = cleaned.parse().ok()?;
    (0.0..=100.0).contains(&probability).then_some(probability)
}

fn parse_block(lines: &[&str]) -> Option<MatchRecord> {
    let mut header = None;
    let mut details = Vec::new();

    for line in lines {
        match classify_line(line) {
            Line::Header(h) if header.is_none() => header = Some(h),
            Line::Header(h) => tracing::trace!("Ignoring extra header in block: {:?}", h),
            Line::Detail(key, value) => details.push((key, value)),
            Line::Other => {}
        }
    }

    let header = header?;
    let Some(probability) = parse_probability(header.probability) else {
        tracing::debug!(
            "Dropping candidate {:?}: bad probability {:?}",
            header.name,
            header.probability
        );
        return None;
    };

    let mut record = MatchRecord::new(
        probability,
        header.extension.to_lowercase(),
        header.name,
    );
    for (key, value) in details {
        key.apply(&mut record, value);
    }
    Some(record)
}

/// Splits normalized text into blocks of non-blank lines.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parses a TrID report into records, preserving the tool's order.
///
/// Never fails: malformed blocks are dropped and text with no candidates
/// yields an empty vector.
pub fn parse_report(output: &str) -> Vec<MatchRecord> {
    let normalized = output.replace("\r\n", "\n").replace('\r', "\n");

    let records: Vec<MatchRecord> = blocks(&normalized)
        .iter()
        .filter_map(|block| parse_block(block))
        .collect();

    tracing::debug!("Parsed {} candidate(s) from TrID output", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_report() {
        let out = "85.50% (.pdf) Adobe Portable Document Format\n     Mime type: application/pdf\n\n10.00% (.ps) PostScript\n";
        let records = parse_report(out);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].extension, ".pdf");
        assert_eq!(records[0].probability, 85.50);
        assert_eq!(records[0].name, "Adobe Portable Document Format");
        assert_eq!(records[0].mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(records[1].extension, ".ps");
        assert_eq!(records[1].probability, 10.0);
        assert_eq!(records[1].name, "PostScript");
        assert_eq!(records[1].mime_type, None);
    }

    #[test]
    fn test_parse_verbose_trid_output() {
        let out = "\r\nTrID/32 - File Identifier v2.24 - (C) 2003-16 By M.Pontello\r\n\
Definitions found:  14386\r\n\
Analyzing...\r\n\
\r\n\
Collecting data from file: sample.7z\r\n\
 100.0% (.7Z) 7-Zip compressed archive (v0.4) (6000/1)\r\n\
        Mime type  : application/x-7z-compressed\r\n\
       Related URL : http://www.7-zip.org/\r\n\
       Definition  : arc-7z-04.trid.xml\r\n\
        Remarks    : Early archives\r\n";
        let records = parse_report(out);

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.probability, 100.0);
        assert_eq!(r.extension, ".7z");
        assert_eq!(r.name, "7-Zip compressed archive (v0.4)");
        assert_eq!(r.mime_type.as_deref(), Some("application/x-7z-compressed"));
        assert_eq!(r.related_url.as_deref(), Some("http://www.7-zip.org/"));
        assert_eq!(r.definition.as_deref(), Some("arc-7z-04.trid.xml"));
        assert_eq!(r.remarks.as_deref(), Some("Early archives"));
    }

    #[test]
    fn test_score_counter_is_not_part_of_name() {
        let line = " 52.5% (.EXE) Win32 Executable MS Visual C++ (generic) (31206/45/13)";
        match classify_line(line) {
            Line::Header(h) => {
                assert_eq!(h.probability, "52.5");
                assert_eq!(h.extension, ".EXE");
                assert_eq!(h.name, "Win32 Executable MS Visual C++ (generic)");
            }
            other => panic!("Expected header, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_probability_is_dropped() {
        let out = "% (.pdf) Adobe Portable Document Format\n\n10.00% (.ps) PostScript\n";
        let records = parse_report(out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].extension, ".ps");
    }

    #[test]
    fn test_non_numeric_probability_is_dropped() {
        let out = "1.2.3% (.pdf) Adobe Portable Document Format\n\n...% (.ps) PostScript\n";
        assert!(parse_report(out).is_empty());
    }

    #[test]
    fn test_out_of_range_probability_is_dropped() {
        assert_eq!(parse_probability("100.01"), None);
        assert_eq!(parse_probability("100"), Some(100.0));
        assert_eq!(parse_probability(" 0.0 "), Some(0.0));
        assert_eq!(parse_probability("42.5%"), Some(42.5));
    }

    #[test]
    fn test_details_attach_to_their_block() {
        let out = "85.50% (.pdf) PDF\n  Mime type: application/pdf\n  Remarks: first\n\n10.00% (.ps) PostScript\n  Related URL: https://example.org/ps\n";
        let records = parse_report(out);

        assert_eq!(records[0].mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(records[0].remarks.as_deref(), Some("first"));
        assert_eq!(records[0].related_url, None);
        assert_eq!(records[1].mime_type, None);
        assert_eq!(records[1].remarks, None);
        assert_eq!(records[1].related_url.as_deref(), Some("https://example.org/ps"));
    }

    #[test]
    fn test_repeated_detail_last_wins() {
        let out = "50% (.txt) Text\n  Remarks: old\n  Remarks: new\n";
        let records = parse_report(out);
        assert_eq!(records[0].remarks.as_deref(), Some("new"));
    }

    #[test]
    fn test_unknown_and_miscased_keys_ignored() {
        let out = "50% (.txt) Text\n  Author: someone\n  mime type: text/plain\n";
        let records = parse_report(out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].mime_type, None);
    }

    #[test]
    fn test_banner_only_output_is_empty() {
        let out = "TrID/32 - File Identifier v2.24\nDefinitions found:  14386\nAnalyzing...\n";
        assert!(parse_report(out).is_empty());
        assert!(parse_report("").is_empty());
    }

    #[test]
    fn test_order_is_preserved_not_sorted() {
        let out = "10.0% (.a) Low\n\n90.0% (.b) High\n\n50.0% (.c) Mid\n";
        let names: Vec<_> = parse_report(out).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Low", "High", "Mid"]);
    }

    #[test]
    fn test_extension_lower_cased() {
        let records = parse_report("75.0% (.TAR.GZ) Gzipped Tape ARchive\n");
        assert_eq!(records[0].extension, ".tar.gz");
    }

    #[test]
    fn test_only_first_header_in_block_counts() {
        let out = "60.0% (.zip) ZIP archive\n40.0% (.jar) Java archive\n";
        let records = parse_report(out);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].extension, ".zip");
    }

    #[test]
    fn test_line_classification() {
        assert_eq!(
            classify_line("   Definition  : pdf.trid.xml"),
            Line::Detail(DetailKey::Definition, "pdf.trid.xml")
        );
        assert_eq!(classify_line("Analyzing..."), Line::Other);
        assert_eq!(classify_line("Definitions found:  14386"), Line::Other);
    }
}
