//! CSV ledger loading.
//!
//! Turns an exported CSV into a typed [`Ledger`]. Configured columns must be
//! present in the header; cell values that cannot be parsed become `None`
//! rather than failing the load.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::error::ReconError;
use crate::model::{Ledger, LedgerRecord};

/// Formats tried when a ledger does not configure its own.
pub const DEFAULT_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DEFAULT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Load one ledger from CSV text, applying the configured column mapping.
pub fn load_csv_ledger(csv_data: &str, config: &LedgerConfig) -> Result<Ledger, ReconError> {
    let ledger_name = config.name.as_str();
    let csv_err = |e: csv::Error| ReconError::Csv {
        ledger: ledger_name.into(),
        message: e.to_string(),
    };

    if !config.delimiter.is_ascii() {
        return Err(ReconError::ConfigValidation(format!(
            "ledger '{ledger_name}': delimiter must be a single ASCII character"
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(config.delimiter as u8)
        .from_reader(skip_lines(csv_data, config.skip_rows).as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        let name = name.trim();
        headers.iter().position(|h| h == name).ok_or_else(|| {
            ReconError::MissingColumn {
                ledger: ledger_name.into(),
                column: name.into(),
            }
        })
    };
    let opt_idx = |name: &Option<String>| -> Result<Option<usize>, ReconError> {
        name.as_deref().map(idx).transpose()
    };

    let col = &config.columns;
    let reference_idx = idx(&col.reference)?;
    let amount_idx = idx(&col.amount)?;
    let timestamp_idx = opt_idx(&col.timestamp)?;
    let operation_idx = opt_idx(&col.operation_type)?;
    let status_idx = opt_idx(&col.status)?;
    let tag_idx = opt_idx(&col.tag)?;

    let formats: Vec<&str> = config.timestamp_formats.iter().map(String::as_str).collect();

    let mut ledger = Ledger::new(ledger_name, config.kind);

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("");
        let cell_opt = |i: Option<usize>| i.map(|i| cell(i).trim().to_string());

        let reference = normalize_reference(cell(reference_idx));
        if config.numeric_references_only
            && (reference.is_empty() || !reference.bytes().all(|b| b.is_ascii_digit()))
        {
            continue;
        }

        let timestamp = timestamp_idx.and_then(|i| parse_timestamp(cell(i), &formats));
        let tag = cell_opt(tag_idx).filter(|t| !t.is_empty());

        ledger.records.push(LedgerRecord {
            origin: ledger_name.into(),
            row: ledger.records.len(),
            reference,
            amount: parse_amount(cell(amount_idx)),
            timestamp,
            operation_type: cell_opt(operation_idx).unwrap_or_default(),
            status: cell_opt(status_idx).unwrap_or_default(),
            tag,
            fields: (0..headers.len()).map(|i| cell(i).to_string()).collect(),
        });
    }

    ledger.headers = headers;
    Ok(ledger)
}

/// Drop the first `n` lines. Exports from the collection systems put a title
/// block above the header row.
fn skip_lines(data: &str, n: usize) -> &str {
    let mut rest = data;
    for _ in 0..n {
        match rest.find('\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return "",
        }
    }
    rest
}

/// Trim a reference and undo the `"123.0"` rendering spreadsheets give to
/// numeric identifiers.
pub fn normalize_reference(raw: &str) -> String {
    let s = raw.trim();
    if let Some((int, frac)) = s.split_once('.') {
        if !int.is_empty()
            && int.bytes().all(|b| b.is_ascii_digit())
            && !frac.is_empty()
            && frac.bytes().all(|b| b == b'0')
        {
            return int.to_string();
        }
    }
    s.to_string()
}

/// Parse a money cell. Currency symbols, thousands commas and spaces are
/// ignored; anything else unparsable yields `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Parse a timestamp cell with `formats`, or the built-in list when empty.
///
/// RFC 3339 values with an explicit offset keep their local wall-clock time.
/// Date-only values resolve to midnight.
pub fn parse_timestamp(raw: &str, formats: &[&str]) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (datetime_formats, date_formats) = if formats.is_empty() {
        (DEFAULT_TIMESTAMP_FORMATS, DEFAULT_DATE_FORMATS)
    } else {
        (formats, formats)
    };

    for fmt in datetime_formats {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_local());
    }
    for fmt in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
