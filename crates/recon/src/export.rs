//! Result and residual tables as CSV text. Writing to disk is the caller's job.

use crate::error::ReconError;
use crate::model::{MatchResult, Residual};

/// Columns appended after the base ledger's own columns in the result table.
pub const RESULT_COLUMNS: [&str; 6] = [
    "label",
    "matched_amount",
    "matched_timestamp",
    "delta_amount",
    "delta_minutes",
    "matched_source_tag",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result table: every base column, then [`RESULT_COLUMNS`].
pub fn results_to_csv(base_headers: &[String], results: &[MatchResult<'_>]) -> Result<String, ReconError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    let header = base_headers
        .iter()
        .map(String::as_str)
        .chain(RESULT_COLUMNS);
    writer.write_record(header).map_err(io_err)?;

    for r in results {
        let mut row: Vec<String> = padded(&r.base.fields, base_headers.len());
        row.push(r.label.to_string());
        row.push(opt(r.matched_amount));
        row.push(
            r.matched_timestamp
                .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default(),
        );
        row.push(opt(r.delta_amount));
        row.push(opt(r.delta_minutes));
        row.push(r.matched_source_tag.clone().unwrap_or_default());
        writer.write_record(&row).map_err(io_err)?;
    }

    finish(writer)
}

/// Residual table: the ledger's original columns, unconsumed rows only.
pub fn residual_to_csv(residual: &Residual<'_>) -> Result<String, ReconError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(residual.headers).map_err(io_err)?;
    for record in &residual.records {
        writer
            .write_record(padded(&record.fields, residual.headers.len()))
            .map_err(io_err)?;
    }
    finish(writer)
}

/// File name for a ledger's residual table, e.g. `cobranzas_km1151_residuo.csv`.
pub fn residual_file_name(ledger: &str) -> String {
    let mut slug = String::new();
    for c in ledger.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "ledger_residuo.csv".into()
    } else {
        format!("{slug}_residuo.csv")
    }
}

fn padded(fields: &[String], width: usize) -> Vec<String> {
    let mut row: Vec<String> = fields.iter().take(width).cloned().collect();
    row.resize(width, String::new());
    row
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn io_err(e: csv::Error) -> ReconError {
    ReconError::Io(e.to_string())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ReconError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| ReconError::Io(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ReconError::Io(e.to_string()))
}
