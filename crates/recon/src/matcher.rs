use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::classify::classify;
use crate::consumption::ConsumptionState;
use crate::error::ReconError;
use crate::events::{EventSink, ReconEvent};
use crate::index::LedgerIndex;
use crate::model::{Label, LedgerRecord, MatchRef, MatchResult, MatchRules, Tolerance};

/// A result row while passes are still running. `label` stays `None` until
/// some pass labels the record or the run is finalized.
#[derive(Debug, Clone)]
pub struct PendingResult<'a> {
    pub base: &'a LedgerRecord,
    pub label: Option<Label>,
    pub matched_amount: Option<Decimal>,
    pub matched_timestamp: Option<NaiveDateTime>,
    pub delta_amount: Option<Decimal>,
    pub delta_minutes: Option<f64>,
    pub matched_source_tag: Option<String>,
    pub matches: Vec<MatchRef>,
}

impl<'a> PendingResult<'a> {
    pub fn new(base: &'a LedgerRecord) -> Self {
        Self {
            base,
            label: None,
            matched_amount: None,
            matched_timestamp: None,
            delta_amount: None,
            delta_minutes: None,
            matched_source_tag: None,
            matches: Vec::new(),
        }
    }

    /// Close the row, labelling it unreconciled if no pass matched it.
    pub fn finalize(self) -> MatchResult<'a> {
        MatchResult {
            base: self.base,
            label: self.label.unwrap_or(Label::Unreconciled),
            matched_amount: self.matched_amount,
            matched_timestamp: self.matched_timestamp,
            delta_amount: self.delta_amount,
            delta_minutes: self.delta_minutes,
            matched_source_tag: self.matched_source_tag,
            matches: self.matches,
        }
    }
}

/// Collection pass: only rows without a label look for a match here, so the
/// first ledger in priority order that knows the reference wins.
///
/// Returns the number of records consumed.
pub fn match_collection<'a>(
    pending: &mut [PendingResult<'a>],
    index: &LedgerIndex<'a>,
    tolerance: &Tolerance,
    rules: &MatchRules,
    state: &mut ConsumptionState,
    sink: &mut dyn EventSink,
) -> Result<usize, ReconError> {
    let ledger = index.ledger();
    let mut matched = 0;

    for p in pending.iter_mut() {
        if p.label.is_some() || p.base.amount.is_none() {
            continue;
        }
        let found = index.first_available(&p.base.reference, state.flags(&ledger.name)?);
        let Some((pos, candidate)) = found else {
            continue;
        };
        let rejected = rules.is_rejected(&p.base.status);
        let Some(c) = classify(&ledger.name, p.base, candidate, tolerance, rejected) else {
            continue;
        };

        state.consume(&ledger.name, pos)?;
        sink.emit(&ReconEvent::Matched {
            ledger: ledger.name.clone(),
            reference: p.base.reference.clone(),
            label: c.label.to_string(),
        });

        p.matched_amount = candidate.amount;
        p.matched_timestamp = candidate.timestamp;
        p.delta_amount = Some(c.delta_amount);
        p.delta_minutes = c.delta_minutes;
        p.matched_source_tag = Some(ledger.name.clone());
        p.matches.push(MatchRef { ledger: ledger.name.clone(), row: pos });
        p.label = Some(c.label);
        matched += 1;
    }

    Ok(matched)
}

/// Spreadsheet pass: runs for every row. An unlabelled row is classified on
/// amount alone; a row that already carries a label and is found again here
/// becomes a duplicate conflict naming both sources.
///
/// Returns the number of records consumed.
pub fn match_spreadsheet<'a>(
    pending: &mut [PendingResult<'a>],
    index: &LedgerIndex<'a>,
    tolerance: &Tolerance,
    rules: &MatchRules,
    state: &mut ConsumptionState,
    sink: &mut dyn EventSink,
) -> Result<usize, ReconError> {
    let ledger = index.ledger();
    let mut matched = 0;

    for p in pending.iter_mut() {
        let flags = state.flags(&ledger.name)?;
        let found = if p.label.is_some() {
            // A repeated reference is a duplicate whatever the sheet's amount.
            index.first_unconsumed(&p.base.reference, flags)
        } else if p.base.amount.is_some() {
            index.first_available(&p.base.reference, flags)
        } else {
            None
        };
        let Some((pos, candidate)) = found else {
            continue;
        };
        let tag = candidate.tag.clone().unwrap_or_else(|| ledger.name.clone());

        match p.label.take() {
            Some(prior) => {
                let label = Label::Duplicate {
                    prior: Box::new(prior),
                    source: ledger.name.clone(),
                };
                state.consume(&ledger.name, pos)?;
                sink.emit(&ReconEvent::DuplicateFlagged {
                    ledger: ledger.name.clone(),
                    reference: p.base.reference.clone(),
                    label: label.to_string(),
                });
                p.label = Some(label);
            }
            None => {
                let rejected = rules.is_rejected(&p.base.status);
                let Some(c) = classify(&ledger.name, p.base, candidate, tolerance, rejected)
                else {
                    continue;
                };
                state.consume(&ledger.name, pos)?;
                sink.emit(&ReconEvent::Matched {
                    ledger: ledger.name.clone(),
                    reference: p.base.reference.clone(),
                    label: c.label.to_string(),
                });
                p.matched_amount = candidate.amount;
                p.matched_timestamp = candidate.timestamp;
                p.delta_amount = Some(c.delta_amount);
                p.delta_minutes = c.delta_minutes;
                p.label = Some(c.label);
            }
        }

        p.matched_source_tag = Some(tag);
        p.matches.push(MatchRef { ledger: ledger.name.clone(), row: pos });
        matched += 1;
    }

    Ok(matched)
}
