use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::model::{Label, LedgerRecord, Tolerance};

/// Label plus the deltas it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub delta_amount: Decimal,
    pub delta_minutes: Option<f64>,
}

/// Signed minutes from `other` to `base`. `None` if either side is missing.
pub fn delta_minutes(base: Option<NaiveDateTime>, other: Option<NaiveDateTime>) -> Option<f64> {
    let (b, o) = (base?, other?);
    Some((b - o).num_milliseconds() as f64 / 60_000.0)
}

/// Classify a reference match between a base record and a secondary record.
///
/// Checked in order: rejection marker, amount tolerance, time tolerance.
/// With `tolerance.minutes = None` the time check is skipped; otherwise a
/// missing timestamp on either side counts as out of window. Returns `None`
/// when either amount is missing, since such records cannot match.
pub fn classify(
    source: &str,
    base: &LedgerRecord,
    candidate: &LedgerRecord,
    tolerance: &Tolerance,
    rejected: bool,
) -> Option<Classification> {
    let delta_amount = base.amount? - candidate.amount?;
    let delta_minutes = delta_minutes(base.timestamp, candidate.timestamp);
    let source = source.to_string();

    let label = if rejected {
        Label::Rejected { source }
    } else if delta_amount.abs() > tolerance.amount {
        Label::ReviewAmount { source }
    } else if let Some(limit) = tolerance.minutes {
        match delta_minutes {
            Some(m) if m.abs() <= limit => Label::Matched { source },
            _ => Label::ReviewDate { source },
        }
    } else {
        Label::Matched { source }
    };

    Some(Classification {
        label,
        delta_amount,
        delta_minutes,
    })
}
