//! Researcher CSV export
//!
//! One row per stored submission: participant name, timestamp, then the eleven
//! feature columns. Every field is quoted, and free-text cells that a
//! spreadsheet would evaluate as a formula are neutralized.

use crate::error::ComputeError;
use crate::types::{AggregateFeatures, Submission};
use chrono::SecondsFormat;
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;

/// Leading characters that make spreadsheet applications evaluate a cell
const FORMULA_TRIGGERS: [char; 4] = ['=', '+', '-', '@'];

/// Column names in output order
pub fn header() -> Vec<&'static str> {
    let mut columns = vec!["student_name", "timestamp"];
    columns.extend(AggregateFeatures::COLUMNS);
    columns
}

/// Serialize submissions as CSV text
pub fn export_csv(submissions: &[Submission]) -> Result<String, ComputeError> {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, submissions)?;
    String::from_utf8(buffer).map_err(|e| ComputeError::ExportError(e.to_string()))
}

/// Write submissions as CSV to `writer`
pub fn write_csv<W: Write>(writer: W, submissions: &[Submission]) -> Result<(), ComputeError> {
    let mut csv_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);

    csv_writer.write_record(header()).map_err(export_error)?;
    for submission in submissions {
        csv_writer.write_record(row(submission)).map_err(export_error)?;
    }
    csv_writer
        .flush()
        .map_err(|e| ComputeError::ExportError(e.to_string()))
}

fn row(submission: &Submission) -> Vec<String> {
    let mut fields = Vec::with_capacity(2 + AggregateFeatures::COLUMNS.len());
    fields.push(neutralize_formula(&submission.student_name));
    fields.push(
        submission
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    );
    fields.extend(submission.features.values().iter().map(|v| v.to_string()));
    fields
}

/// Prefix a quote to text a spreadsheet would treat as a formula
fn neutralize_formula(text: &str) -> String {
    if text.starts_with(&FORMULA_TRIGGERS[..]) {
        format!("'{text}")
    } else {
        text.to_string()
    }
}

fn export_error(e: csv::Error) -> ComputeError {
    ComputeError::ExportError(e.to_string())
}
