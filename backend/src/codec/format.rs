//! Quote-aware CSV body parsing and field escaping.
//!
//! Quoted fields may contain commas, doubled quotes, and line breaks, so a
//! record can span several physical lines. Rows that do not produce a valid
//! record are collected as [`SkippedRow`]s instead of failing the parse.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use crate::error::{CsvError, CsvResult, RecordError};
use crate::models::{ConstantRecord, Field};

/// The only accepted header line.
pub const HEADER: &str = "PhysicalName,LogicalName,Value,Unit,Description";

/// Record terminator used on save.
pub const LINE_ENDING: &str = "\r\n";

const COLUMN_COUNT: usize = Field::ALL.len();

/// Why a data row was left out of the load.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Row had this many fields instead of five.
    FieldCount(usize),
    /// Fields did not form a valid record.
    InvalidRecord(RecordError),
    /// The CSV reader could not make sense of the row.
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(n) => write!(f, "expected {} fields, found {}", COLUMN_COUNT, n),
            Self::InvalidRecord(e) => write!(f, "{}", e),
            Self::Malformed(msg) => write!(f, "malformed row: {}", msg),
        }
    }
}

/// A data row that was skipped, with the file line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}

/// Check the header line and return the text after it.
///
/// The header ends at the first `\r\n`, `\n` or lone `\r`.
pub fn split_header(content: &str) -> CsvResult<&str> {
    let (header, body) = match content.find(['\r', '\n']) {
        Some(idx) => {
            let rest = &content[idx..];
            let skip = if rest.starts_with("\r\n") { 2 } else { 1 };
            (&content[..idx], &content[idx + skip..])
        }
        None => (content, ""),
    };

    if header.is_empty() {
        return Err(CsvError::format("CSV file is empty"));
    }
    if header != HEADER {
        return Err(CsvError::format(format!(
            "Invalid header line. Expected: {}",
            HEADER
        )));
    }
    Ok(body)
}

/// Parse the data rows following the header.
///
/// Physical lines are grouped into rows by quote balance. A row that opens a
/// quote and never closes it is skipped as [`SkipReason::Malformed`]; a
/// multi-line row with the wrong field count is skipped on its first line
/// only, and the lines after it are parsed again as rows of their own.
///
/// `first_line` is the file line number of the first body line, used only for
/// reporting skips.
pub fn parse_body(body: &str, first_line: u64) -> (Vec<ConstantRecord>, Vec<SkippedRow>) {
    let lines = physical_lines(body);
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = first_line + i as u64;

        let mut end = i;
        let mut quotes = quote_count(&body[lines[i].clone()]);
        while quotes % 2 == 1 && end + 1 < lines.len() {
            end += 1;
            quotes += quote_count(&body[lines[end].clone()]);
        }
        if quotes % 2 == 1 {
            skipped.push(SkippedRow {
                line,
                reason: SkipReason::Malformed("unterminated quoted field".to_string()),
            });
            i += 1;
            continue;
        }

        let text = &body[lines[i].start..lines[end].end];
        let spans_lines = end > i;
        match parse_row(text) {
            RowOutcome::Blank => {}
            RowOutcome::Record(record) => records.push(record),
            RowOutcome::Skip(reason) => {
                let regroup = spans_lines && !matches!(reason, SkipReason::InvalidRecord(_));
                skipped.push(SkippedRow { line, reason });
                if regroup {
                    i += 1;
                    continue;
                }
            }
        }
        i = end + 1;
    }

    (records, skipped)
}

enum RowOutcome {
    Blank,
    Record(ConstantRecord),
    Skip(SkipReason),
}

fn parse_row(text: &str) -> RowOutcome {
    if text.trim().is_empty() {
        return RowOutcome::Blank;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::with_capacity(1);
    for result in reader.records() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => return RowOutcome::Skip(SkipReason::Malformed(e.to_string())),
        }
    }
    let row = match rows.as_slice() {
        [row] => row,
        _ => {
            return RowOutcome::Skip(SkipReason::Malformed(format!(
                "quoted text split into {} rows",
                rows.len()
            )))
        }
    };

    if row.len() != COLUMN_COUNT {
        return RowOutcome::Skip(SkipReason::FieldCount(row.len()));
    }
    match ConstantRecord::new(&row[0], &row[1], &row[2], &row[3], &row[4]) {
        Ok(record) => RowOutcome::Record(record),
        Err(e) => RowOutcome::Skip(SkipReason::InvalidRecord(e)),
    }
}

/// Byte ranges of each line, terminator included. `\r\n`, `\n` and a lone
/// `\r` all end a line.
fn physical_lines(body: &str) -> Vec<Range<usize>> {
    let bytes = body.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\r' if bytes.get(pos + 1) == Some(&b'\n') => {
                lines.push(start..pos + 2);
                pos += 2;
                start = pos;
            }
            b'\r' | b'\n' => {
                lines.push(start..pos + 1);
                pos += 1;
                start = pos;
            }
            _ => pos += 1,
        }
    }
    if start < bytes.len() {
        lines.push(start..bytes.len());
    }
    lines
}

fn quote_count(line: &str) -> usize {
    line.bytes().filter(|&b| b == b'"').count()
}

/// Quote a field if it holds a comma, a quote, or a line break.
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// One CSV line (without terminator) for a record.
pub fn format_line(record: &ConstantRecord) -> String {
    record
        .columns()
        .iter()
        .map(|c| escape_field(c))
        .collect::<Vec<_>>()
        .join(",")
}
