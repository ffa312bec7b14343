use std::collections::HashMap;

use crate::model::{Ledger, LedgerRecord};

/// Reference lookup over one secondary ledger.
///
/// Each reference maps to its row positions in ascending order, so the first
/// eligible position is always the lowest original row.
#[derive(Debug)]
pub struct LedgerIndex<'a> {
    ledger: &'a Ledger,
    by_reference: HashMap<&'a str, Vec<usize>>,
}

impl<'a> LedgerIndex<'a> {
    pub fn build(ledger: &'a Ledger) -> Self {
        let mut by_reference: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (pos, record) in ledger.records.iter().enumerate() {
            if record.reference.is_empty() {
                continue;
            }
            by_reference.entry(record.reference.as_str()).or_default().push(pos);
        }
        Self { ledger, by_reference }
    }

    pub fn ledger(&self) -> &'a Ledger {
        self.ledger
    }

    /// All positions sharing `reference`, in original order.
    pub fn positions(&self, reference: &str) -> &[usize] {
        self.by_reference
            .get(reference)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// First unconsumed record with a usable amount for `reference`.
    ///
    /// `consumed` is the ledger's flag slice from the consumption state.
    pub fn first_available(
        &self,
        reference: &str,
        consumed: &[bool],
    ) -> Option<(usize, &'a LedgerRecord)> {
        self.find(reference, consumed, |r| r.amount.is_some())
    }

    /// First unconsumed record for `reference`, whatever its amount. Enough to
    /// prove a reference appears twice.
    pub fn first_unconsumed(
        &self,
        reference: &str,
        consumed: &[bool],
    ) -> Option<(usize, &'a LedgerRecord)> {
        self.find(reference, consumed, |_| true)
    }

    fn find(
        &self,
        reference: &str,
        consumed: &[bool],
        usable: impl Fn(&LedgerRecord) -> bool,
    ) -> Option<(usize, &'a LedgerRecord)> {
        let records: &'a [LedgerRecord] = &self.ledger.records;
        self.positions(reference)
            .iter()
            .copied()
            .find(|&pos| !consumed.get(pos).copied().unwrap_or(true) && usable(&records[pos]))
            .map(|pos| (pos, &records[pos]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LedgerKind;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ledger(rows: &[(&str, Option<Decimal>)]) -> Ledger {
        let mut l = Ledger::new("km", LedgerKind::Collection);
        for (row, (reference, amount)) in rows.iter().enumerate() {
            l.records.push(LedgerRecord {
                origin: "km".into(),
                row,
                reference: reference.to_string(),
                amount: *amount,
                timestamp: None,
                operation_type: String::new(),
                status: String::new(),
                tag: None,
                fields: Vec::new(),
            });
        }
        l
    }

    #[test]
    fn positions_keep_row_order() {
        let l = ledger(&[("7", Some(dec!(1))), ("8", Some(dec!(2))), ("7", Some(dec!(3)))]);
        let idx = LedgerIndex::build(&l);
        assert_eq!(idx.positions("7"), &[0, 2]);
        assert_eq!(idx.positions("8"), &[1]);
        assert!(idx.positions("9").is_empty());
    }

    #[test]
    fn lowest_unconsumed_row_wins() {
        let l = ledger(&[("7", Some(dec!(1))), ("7", Some(dec!(2))), ("7", Some(dec!(3)))]);
        let idx = LedgerIndex::build(&l);

        let (pos, rec) = idx.first_available("7", &[false, false, false]).unwrap();
        assert_eq!(pos, 0);
        assert_eq!(rec.amount, Some(dec!(1)));

        let (pos, _) = idx.first_available("7", &[true, false, false]).unwrap();
        assert_eq!(pos, 1);

        assert!(idx.first_available("7", &[true, true, true]).is_none());
    }

    #[test]
    fn null_amount_rows_are_skipped() {
        let l = ledger(&[("7", None), ("7", Some(dec!(5)))]);
        let idx = LedgerIndex::build(&l);
        let (pos, _) = idx.first_available("7", &[false, false]).unwrap();
        assert_eq!(pos, 1);
    }

    #[test]
    fn unconsumed_lookup_keeps_null_amount_rows() {
        let l = ledger(&[("7", None), ("7", Some(dec!(5)))]);
        let idx = LedgerIndex::build(&l);

        let (pos, rec) = idx.first_unconsumed("7", &[false, false]).unwrap();
        assert_eq!(pos, 0);
        assert!(rec.amount.is_none());

        let (pos, _) = idx.first_unconsumed("7", &[true, false]).unwrap();
        assert_eq!(pos, 1);
        assert!(idx.first_unconsumed("7", &[true, true]).is_none());
    }

    #[test]
    fn blank_references_are_not_indexed() {
        let l = ledger(&[("", Some(dec!(1)))]);
        let idx = LedgerIndex::build(&l);
        assert!(idx.first_available("", &[false]).is_none());
    }
}
