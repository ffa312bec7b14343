use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// How a ledger takes part in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// The ledger being reconciled (payment-platform export).
    Base,
    /// Point-of-sale / collection export. Amount and time are checked.
    Collection,
    /// Manual transfer spreadsheet. Amount only, always runs, flags duplicates.
    Spreadsheet,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::Collection => write!(f, "collection"),
            Self::Spreadsheet => write!(f, "spreadsheet"),
        }
    }
}

/// A single normalized row from any ledger.
///
/// `amount` and `timestamp` are `None` when the source value could not be
/// parsed. Such a row is kept so it can still surface as residual.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerRecord {
    pub origin: String,
    /// Position among the ledger's data rows, in file order.
    pub row: usize,
    pub reference: String,
    pub amount: Option<Decimal>,
    pub timestamp: Option<NaiveDateTime>,
    pub operation_type: String,
    pub status: String,
    /// Sub-source inside a spreadsheet ledger (e.g. which sheet or tab).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Original cell values, aligned with the owning ledger's headers.
    #[serde(skip)]
    pub fields: Vec<String>,
}

/// One loaded ledger: its rows plus the header they were read with.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub name: String,
    pub kind: LedgerKind,
    pub headers: Vec<String>,
    pub records: Vec<LedgerRecord>,
}

impl Ledger {
    pub fn new(name: impl Into<String>, kind: LedgerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            headers: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pre-loaded ledgers for one run. `secondaries` is in priority order.
pub struct ReconInput {
    pub base: Ledger,
    pub secondaries: Vec<Ledger>,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

pub const DEFAULT_OPERATIONS: [&str; 3] = ["Cobro", "Ingreso de dinero", "Dinero recibido"];
pub const DEFAULT_REJECTED_STATUS: &str = "Rechazado";

/// Allow-list over the base ledger's operation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFilter {
    allowed: Vec<String>,
}

impl OperationFilter {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, operation_type: &str) -> bool {
        let op = operation_type.trim();
        self.allowed.iter().any(|a| a == op)
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }
}

impl Default for OperationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATIONS)
    }
}

/// Tolerance window for one pass. `minutes = None` disables the time check.
#[derive(Debug, Clone, PartialEq)]
pub struct Tolerance {
    pub amount: Decimal,
    pub minutes: Option<f64>,
}

impl Tolerance {
    pub fn collection_default() -> Self {
        Self {
            amount: Decimal::ONE,
            minutes: Some(10.0),
        }
    }

    pub fn spreadsheet_default() -> Self {
        Self {
            amount: Decimal::from(15),
            minutes: None,
        }
    }
}

/// Everything the classifier needs besides the records themselves.
#[derive(Debug, Clone)]
pub struct MatchRules {
    pub collection: Tolerance,
    pub spreadsheet: Tolerance,
    /// Per-ledger override keyed by ledger name.
    pub overrides: HashMap<String, Tolerance>,
    pub rejected_status: String,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            collection: Tolerance::collection_default(),
            spreadsheet: Tolerance::spreadsheet_default(),
            overrides: HashMap::new(),
            rejected_status: DEFAULT_REJECTED_STATUS.to_string(),
        }
    }
}

impl MatchRules {
    pub fn tolerance_for(&self, ledger: &Ledger) -> Tolerance {
        if let Some(t) = self.overrides.get(&ledger.name) {
            let mut t = t.clone();
            // Spreadsheets carry no usable time column.
            if ledger.kind == LedgerKind::Spreadsheet {
                t.minutes = None;
            }
            return t;
        }
        match ledger.kind {
            LedgerKind::Spreadsheet => self.spreadsheet.clone(),
            LedgerKind::Base | LedgerKind::Collection => self.collection.clone(),
        }
    }

    pub fn is_rejected(&self, status: &str) -> bool {
        !self.rejected_status.is_empty()
            && status.trim().eq_ignore_ascii_case(self.rejected_status.trim())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Closed set of result labels. `Display` renders the label text written to
/// the result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Matched { source: String },
    ReviewAmount { source: String },
    ReviewDate { source: String },
    Rejected { source: String },
    Duplicate { prior: Box<Label>, source: String },
    Unreconciled,
}

impl Label {
    /// Ledger that produced the label, if any.
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::Matched { source }
            | Self::ReviewAmount { source }
            | Self::ReviewDate { source }
            | Self::Rejected { source }
            | Self::Duplicate { source, .. } => Some(source),
            Self::Unreconciled => None,
        }
    }

    pub fn is_clean_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched { source } => write!(f, "{source}"),
            Self::ReviewAmount { source } => write!(f, "{source} - revisar importe"),
            Self::ReviewDate { source } => write!(f, "{source} - revisar fecha"),
            Self::Rejected { source } => write!(f, "{source} - rechazado"),
            Self::Duplicate { prior, source } => write!(f, "{prior} - {source} - DUPLICADO!"),
            Self::Unreconciled => write!(f, "No Conciliado"),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A secondary record claimed by a base record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MatchRef {
    pub ledger: String,
    pub row: usize,
}

/// One output row per eligible base record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult<'a> {
    pub base: &'a LedgerRecord,
    pub label: Label,
    pub matched_amount: Option<Decimal>,
    pub matched_timestamp: Option<NaiveDateTime>,
    pub delta_amount: Option<Decimal>,
    pub delta_minutes: Option<f64>,
    pub matched_source_tag: Option<String>,
    pub matches: Vec<MatchRef>,
}

/// Unconsumed records of one secondary ledger, in original order.
#[derive(Debug, Clone, Serialize)]
pub struct Residual<'a> {
    pub ledger: String,
    #[serde(skip)]
    pub headers: &'a [String],
    pub records: Vec<&'a LedgerRecord>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub reconciled: usize,
    pub amount_reviews: usize,
    pub date_reviews: usize,
    pub rejected: usize,
    pub duplicates: usize,
    pub unreconciled: usize,
    /// Results per labelling ledger (duplicates count under the later ledger).
    pub by_source: BTreeMap<String, usize>,
    /// Residual row count per secondary ledger.
    pub residuals: BTreeMap<String, usize>,
}

impl ReconSummary {
    /// True when every result is a clean match and no secondary row is left over.
    pub fn is_clean(&self) -> bool {
        self.reconciled == self.total && self.residuals.values().all(|n| *n == 0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport<'a> {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub results: Vec<MatchResult<'a>>,
    pub residuals: Vec<Residual<'a>>,
}
