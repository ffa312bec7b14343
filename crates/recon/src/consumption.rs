use std::collections::HashMap;

use crate::error::ReconError;
use crate::model::Ledger;

/// Per-ledger consumed flags for one run.
///
/// Owned by the engine while it runs and handed back with the results. A flag
/// goes from `false` to `true` at most once; a second claim is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumptionState {
    flags: HashMap<String, Vec<bool>>,
}

impl ConsumptionState {
    /// Fresh state with every record of every ledger unconsumed.
    pub fn for_ledgers(ledgers: &[Ledger]) -> Self {
        let flags = ledgers
            .iter()
            .map(|l| (l.name.clone(), vec![false; l.len()]))
            .collect();
        Self { flags }
    }

    pub fn contains(&self, ledger: &str) -> bool {
        self.flags.contains_key(ledger)
    }

    /// Flags for one ledger, indexed by row.
    pub fn flags(&self, ledger: &str) -> Result<&[bool], ReconError> {
        self.flags
            .get(ledger)
            .map(|v| v.as_slice())
            .ok_or_else(|| ReconError::UnknownLedger(ledger.to_string()))
    }

    pub fn is_consumed(&self, ledger: &str, row: usize) -> bool {
        self.flags
            .get(ledger)
            .and_then(|v| v.get(row).copied())
            .unwrap_or(false)
    }

    /// Claim a record. Fails if the ledger is unknown, the row is out of
    /// range, or the record was already claimed.
    pub fn consume(&mut self, ledger: &str, row: usize) -> Result<(), ReconError> {
        let flags = self
            .flags
            .get_mut(ledger)
            .ok_or_else(|| ReconError::UnknownLedger(ledger.to_string()))?;
        match flags.get_mut(row) {
            Some(flag) if !*flag => {
                *flag = true;
                Ok(())
            }
            _ => Err(ReconError::AlreadyConsumed {
                ledger: ledger.to_string(),
                row,
            }),
        }
    }

    pub fn consumed_count(&self, ledger: &str) -> usize {
        self.flags
            .get(ledger)
            .map(|v| v.iter().filter(|f| **f).count())
            .unwrap_or(0)
    }
}
