use std::collections::HashSet;

use crate::config::ReconConfig;
use crate::consumption::ConsumptionState;
use crate::error::ReconError;
use crate::events::{EventSink, ReconEvent};
use crate::evidence::compute_summary;
use crate::index::LedgerIndex;
use crate::matcher::{match_collection, match_spreadsheet, PendingResult};
use crate::model::{
    Label, Ledger, LedgerKind, MatchResult, MatchRules, OperationFilter, ReconInput, ReconMeta,
    ReconReport,
};
use crate::residual::extract_all;

/// Finalized results plus the consumption state the passes left behind.
#[derive(Debug)]
pub struct Reconciliation<'a> {
    pub results: Vec<MatchResult<'a>>,
    pub state: ConsumptionState,
}

/// Match every eligible base record against `secondaries`, in the order given.
///
/// Base rows whose operation type is not allowed by `filter` are left out of
/// the results entirely. `state` must be fresh for this run (see
/// [`ConsumptionState::for_ledgers`]); it is returned updated.
pub fn reconcile<'a>(
    base: &'a Ledger,
    filter: &OperationFilter,
    secondaries: &'a [Ledger],
    rules: &MatchRules,
    mut state: ConsumptionState,
    sink: &mut dyn EventSink,
) -> Result<Reconciliation<'a>, ReconError> {
    check_ledgers(base, secondaries, &state)?;

    let mut pending: Vec<PendingResult<'a>> = base
        .records
        .iter()
        .filter(|r| filter.allows(&r.operation_type))
        .map(PendingResult::new)
        .collect();

    sink.emit(&ReconEvent::Started {
        base: base.name.clone(),
        base_rows: base.len(),
        eligible_rows: pending.len(),
    });

    for ledger in secondaries {
        sink.emit(&ReconEvent::PassStarted {
            ledger: ledger.name.clone(),
            kind: ledger.kind,
        });

        let index = LedgerIndex::build(ledger);
        let tolerance = rules.tolerance_for(ledger);
        let matched = match ledger.kind {
            LedgerKind::Collection => {
                match_collection(&mut pending, &index, &tolerance, rules, &mut state, sink)?
            }
            LedgerKind::Spreadsheet => {
                match_spreadsheet(&mut pending, &index, &tolerance, rules, &mut state, sink)?
            }
            LedgerKind::Base => return Err(base_as_secondary(ledger)),
        };

        sink.emit(&ReconEvent::PassFinished {
            ledger: ledger.name.clone(),
            matched,
        });
    }

    let results: Vec<MatchResult<'a>> = pending.into_iter().map(PendingResult::finalize).collect();
    let unreconciled = results
        .iter()
        .filter(|r| r.label == Label::Unreconciled)
        .count();
    sink.emit(&ReconEvent::Finalized {
        labelled: results.len() - unreconciled,
        unreconciled,
    });

    Ok(Reconciliation { results, state })
}

fn check_ledgers(
    base: &Ledger,
    secondaries: &[Ledger],
    state: &ConsumptionState,
) -> Result<(), ReconError> {
    let mut names = HashSet::new();
    names.insert(base.name.as_str());

    let mut spreadsheet_seen: Option<&str> = None;
    for ledger in secondaries {
        if !names.insert(ledger.name.as_str()) {
            return Err(ReconError::DuplicateLedger(ledger.name.clone()));
        }
        if !state.contains(&ledger.name) {
            return Err(ReconError::UnknownLedger(ledger.name.clone()));
        }
        match (ledger.kind, spreadsheet_seen) {
            (LedgerKind::Base, _) => return Err(base_as_secondary(ledger)),
            (LedgerKind::Spreadsheet, None) => spreadsheet_seen = Some(ledger.name.as_str()),
            (LedgerKind::Collection, Some(sheet)) => {
                return Err(ReconError::LedgerOrder {
                    collection: ledger.name.clone(),
                    spreadsheet: sheet.to_string(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

fn base_as_secondary(ledger: &Ledger) -> ReconError {
    ReconError::ConfigValidation(format!(
        "ledger '{}' is a base ledger and cannot be matched against",
        ledger.name
    ))
}

/// Run a full reconciliation per config: match, extract residuals, summarize.
pub fn run<'a>(
    config: &ReconConfig,
    input: &'a ReconInput,
    sink: &mut dyn EventSink,
) -> Result<ReconReport<'a>, ReconError> {
    let state = ConsumptionState::for_ledgers(&input.secondaries);
    let Reconciliation { results, state } = reconcile(
        &input.base,
        &config.operation_filter(),
        &input.secondaries,
        &config.match_rules(),
        state,
        sink,
    )?;

    let residuals = extract_all(&input.secondaries, &state, sink)?;
    let summary = compute_summary(&results, &residuals);

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        results,
        residuals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventLog, NullSink};
    use crate::model::LedgerRecord;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(10, m, 0)
            .unwrap()
    }

    fn ledger(name: &str, kind: LedgerKind, rows: &[(&str, Decimal, u32, &str)]) -> Ledger {
        let mut l = Ledger::new(name, kind);
        for (row, (reference, amount, minute, op)) in rows.iter().enumerate() {
            l.records.push(LedgerRecord {
                origin: name.into(),
                row,
                reference: reference.to_string(),
                amount: Some(*amount),
                timestamp: Some(ts(*minute)),
                operation_type: op.to_string(),
                status: String::new(),
                tag: None,
                fields: Vec::new(),
            });
        }
        l
    }

    fn run_simple<'a>(
        base: &'a Ledger,
        secondaries: &'a [Ledger],
        sink: &mut dyn EventSink,
    ) -> Reconciliation<'a> {
        reconcile(
            base,
            &OperationFilter::default(),
            secondaries,
            &MatchRules::default(),
            ConsumptionState::for_ledgers(secondaries),
            sink,
        )
        .unwrap()
    }

    #[test]
    fn first_ledger_in_priority_order_wins() {
        let base = ledger("MP", LedgerKind::Base, &[("1", dec!(10), 0, "Cobro")]);
        let secondaries = vec![
            ledger("KM", LedgerKind::Collection, &[("1", dec!(10), 0, "")]),
            ledger("Bovedas", LedgerKind::Collection, &[("1", dec!(10), 0, "")]),
        ];
        let out = run_simple(&base, &secondaries, &mut NullSink);
        assert_eq!(out.results[0].label.to_string(), "KM");
        assert!(out.state.is_consumed("KM", 0));
        assert!(!out.state.is_consumed("Bovedas", 0));
    }

    #[test]
    fn filtered_operations_are_excluded() {
        let base = ledger(
            "MP",
            LedgerKind::Base,
            &[("1", dec!(10), 0, "Retiro"), ("2", dec!(20), 0, "Cobro")],
        );
        let secondaries = vec![ledger(
            "KM",
            LedgerKind::Collection,
            &[("1", dec!(10), 0, ""), ("2", dec!(20), 0, "")],
        )];
        let out = run_simple(&base, &secondaries, &mut NullSink);
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].base.reference, "2");
        assert!(!out.state.is_consumed("KM", 0));
    }

    #[test]
    fn events_follow_pass_order() {
        let base = ledger("MP", LedgerKind::Base, &[("1", dec!(10), 0, "Cobro")]);
        let secondaries = vec![
            ledger("KM", LedgerKind::Collection, &[("1", dec!(10), 0, "")]),
            ledger("Planilla 1", LedgerKind::Spreadsheet, &[]),
        ];
        let mut log = EventLog::default();
        run_simple(&base, &secondaries, &mut log);

        let kinds: Vec<&str> = log
            .events
            .iter()
            .map(|e| match e {
                ReconEvent::Started { .. } => "started",
                ReconEvent::PassStarted { .. } => "pass_started",
                ReconEvent::Matched { .. } => "matched",
                ReconEvent::DuplicateFlagged { .. } => "duplicate",
                ReconEvent::PassFinished { .. } => "pass_finished",
                ReconEvent::Finalized { .. } => "finalized",
                ReconEvent::ResidualsExtracted { .. } => "residuals",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "started",
                "pass_started",
                "matched",
                "pass_finished",
                "pass_started",
                "pass_finished",
                "finalized",
            ]
        );
    }

    #[test]
    fn reject_collection_after_spreadsheet() {
        let base = ledger("MP", LedgerKind::Base, &[]);
        let secondaries = vec![
            ledger("Planilla 1", LedgerKind::Spreadsheet, &[]),
            ledger("KM", LedgerKind::Collection, &[]),
        ];
        let err = reconcile(
            &base,
            &OperationFilter::default(),
            &secondaries,
            &MatchRules::default(),
            ConsumptionState::for_ledgers(&secondaries),
            &mut NullSink,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::LedgerOrder { .. }));
    }

    #[test]
    fn reject_missing_state() {
        let base = ledger("MP", LedgerKind::Base, &[]);
        let secondaries = vec![ledger("KM", LedgerKind::Collection, &[])];
        let err = reconcile(
            &base,
            &OperationFilter::default(),
            &secondaries,
            &MatchRules::default(),
            ConsumptionState::default(),
            &mut NullSink,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::UnknownLedger(ref n) if n == "KM"));
    }

    #[test]
    fn reject_duplicate_ledger_names() {
        let base = ledger("MP", LedgerKind::Base, &[]);
        let secondaries = vec![
            ledger("KM", LedgerKind::Collection, &[]),
            ledger("KM", LedgerKind::Collection, &[]),
        ];
        let err = reconcile(
            &base,
            &OperationFilter::default(),
            &secondaries,
            &MatchRules::default(),
            ConsumptionState::for_ledgers(&secondaries),
            &mut NullSink,
        )
        .unwrap_err();
        assert!(matches!(err, ReconError::DuplicateLedger(_)));
    }

    #[test]
    fn reused_state_cannot_double_consume() {
        let base = ledger("MP", LedgerKind::Base, &[("1", dec!(10), 0, "Cobro")]);
        let secondaries = vec![ledger("KM", LedgerKind::Collection, &[("1", dec!(10), 0, "")])];
        let first = run_simple(&base, &secondaries, &mut NullSink);

        // Feeding the spent state back in leaves nothing to claim.
        let second = reconcile(
            &base,
            &OperationFilter::default(),
            &secondaries,
            &MatchRules::default(),
            first.state,
            &mut NullSink,
        )
        .unwrap();
        assert_eq!(second.results[0].label, Label::Unreconciled);
    }
}
