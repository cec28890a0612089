use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::model::{NonPassingCheckDetail, ReconciledRecord, SummaryRow};

/// Columns of the compare-and-export report. `Status` is always last.
pub const RECONCILED_HEADERS: [&str; 9] = [
    "Group ID",
    "Group Title",
    "Rule ID",
    "Severity",
    "Version (Stig-ID)",
    "Rule Title",
    "CAT",
    "800-53",
    "Status",
];

pub const SUMMARY_HEADERS: [&str; 4] = ["NIST Compliance ID", "Result", "Affected Hosts", "Stig IDs"];

pub const CHECKLIST_HEADERS: [&str; 7] = [
    "Host",
    "NIST Control ID",
    "Result",
    "Stig ID",
    "Description",
    "Actual Value",
    "Solution",
];

/// Output encodings supported by the report writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Comma-separated, header row first, CRLF line endings.
    #[default]
    Csv,
    /// Pretty-printed array of objects keyed by the CSV column names.
    Json,
}

pub fn write_reconciled<W: Write>(
    writer: W,
    rows: &[ReconciledRecord],
    format: OutputFormat,
) -> Result<(), ReportError> {
    write_rows(writer, &RECONCILED_HEADERS, rows, format)
}

pub fn write_summary<W: Write>(
    writer: W,
    rows: &[SummaryRow],
    format: OutputFormat,
) -> Result<(), ReportError> {
    write_rows(writer, &SUMMARY_HEADERS, rows, format)
}

pub fn write_checklist<W: Write>(
    writer: W,
    rows: &[NonPassingCheckDetail],
    format: OutputFormat,
) -> Result<(), ReportError> {
    write_rows(writer, &CHECKLIST_HEADERS, rows, format)
}

pub fn render_reconciled(rows: &[ReconciledRecord], format: OutputFormat) -> Result<String, ReportError> {
    render(|buf| write_reconciled(buf, rows, format))
}

pub fn render_summary(rows: &[SummaryRow], format: OutputFormat) -> Result<String, ReportError> {
    render(|buf| write_summary(buf, rows, format))
}

pub fn render_checklist(
    rows: &[NonPassingCheckDetail],
    format: OutputFormat,
) -> Result<String, ReportError> {
    render(|buf| write_checklist(buf, rows, format))
}

fn render(
    write: impl FnOnce(&mut Vec<u8>) -> Result<(), ReportError>,
) -> Result<String, ReportError> {
    let mut buf = Vec::new();
    write(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_rows<W: Write, T: Serialize>(
    mut writer: W,
    headers: &[&str],
    rows: &[T],
    format: OutputFormat,
) -> Result<(), ReportError> {
    match format {
        OutputFormat::Csv => {
            // header written by hand so an empty report still has one
            let mut csv_writer = csv::WriterBuilder::new()
                .has_headers(false)
                .terminator(csv::Terminator::CRLF)
                .from_writer(writer);
            csv_writer.write_record(headers)?;
            for row in rows {
                csv_writer.serialize(row)?;
            }
            csv_writer.flush()?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
    }
    Ok(())
}
