use crate::consumption::ConsumptionState;
use crate::error::ReconError;
use crate::events::{EventSink, ReconEvent};
use crate::model::{Ledger, Residual};

/// Records of `ledger` that no pass consumed, in original order.
pub fn extract_residuals<'a>(
    ledger: &'a Ledger,
    state: &ConsumptionState,
) -> Result<Residual<'a>, ReconError> {
    let flags = state.flags(&ledger.name)?;
    let records = ledger
        .records
        .iter()
        .enumerate()
        .filter(|(pos, _)| !flags.get(*pos).copied().unwrap_or(false))
        .map(|(_, r)| r)
        .collect();

    Ok(Residual {
        ledger: ledger.name.clone(),
        headers: &ledger.headers,
        records,
    })
}

/// Residuals for every secondary ledger, in the order given.
pub fn extract_all<'a>(
    ledgers: &'a [Ledger],
    state: &ConsumptionState,
    sink: &mut dyn EventSink,
) -> Result<Vec<Residual<'a>>, ReconError> {
    ledgers
        .iter()
        .map(|ledger| {
            let residual = extract_residuals(ledger, state)?;
            sink.emit(&ReconEvent::ResidualsExtracted {
                ledger: ledger.name.clone(),
                count: residual.records.len(),
            });
            Ok(residual)
        })
        .collect()
}
