use crate::model::{Label, MatchResult, ReconSummary, Residual};

/// Compute summary statistics from finalized results and residuals.
pub fn compute_summary(results: &[MatchResult<'_>], residuals: &[Residual<'_>]) -> ReconSummary {
    let mut summary = ReconSummary {
        total: results.len(),
        ..ReconSummary::default()
    };

    for r in results {
        if let Some(source) = r.label.source() {
            *summary.by_source.entry(source.to_string()).or_insert(0) += 1;
        }
        match r.label {
            Label::Matched { .. } => summary.reconciled += 1,
            Label::ReviewAmount { .. } => summary.amount_reviews += 1,
            Label::ReviewDate { .. } => summary.date_reviews += 1,
            Label::Rejected { .. } => summary.rejected += 1,
            Label::Duplicate { .. } => summary.duplicates += 1,
            Label::Unreconciled => summary.unreconciled += 1,
        }
    }

    for residual in residuals {
        summary
            .residuals
            .insert(residual.ledger.clone(), residual.records.len());
    }

    summary
}
