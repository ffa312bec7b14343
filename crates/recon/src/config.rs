use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ReconError;
use crate::export::residual_file_name;
use crate::model::{
    LedgerKind, MatchRules, OperationFilter, Tolerance, DEFAULT_OPERATIONS,
    DEFAULT_REJECTED_STATUS,
};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation run.
///
/// `[[ledger]]` entries are read in file order: exactly one has
/// `kind = "base"`, the rest are secondary ledgers matched in the order they
/// appear. Spreadsheet ledgers must come after every collection ledger.
#[derive(Debug, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    #[serde(rename = "ledger")]
    pub ledgers: Vec<LedgerConfig>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub name: String,
    pub kind: LedgerKind,
    pub file: String,
    pub columns: ColumnMapping,
    /// Preamble lines above the header row (report titles, export dates).
    #[serde(default)]
    pub skip_rows: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// chrono format strings tried in order. Empty = built-in list.
    #[serde(default)]
    pub timestamp_formats: Vec<String>,
    /// Drop rows whose reference is not all digits (totals lines).
    #[serde(default)]
    pub numeric_references_only: bool,
    #[serde(default)]
    pub tolerance: Option<LedgerToleranceConfig>,
}

fn default_delimiter() -> char {
    ','
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header names in the source file for each normalized field.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub reference: String,
    pub amount: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

// ---------------------------------------------------------------------------
// Matching + Tolerance + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_operations")]
    pub operations: Vec<String>,
    #[serde(default = "default_rejected_status")]
    pub rejected_status: String,
}

fn default_operations() -> Vec<String> {
    DEFAULT_OPERATIONS.iter().map(|s| s.to_string()).collect()
}

fn default_rejected_status() -> String {
    DEFAULT_REJECTED_STATUS.to_string()
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            operations: default_operations(),
            rejected_status: default_rejected_status(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "default_amount")]
    pub amount: Decimal,
    #[serde(default = "default_minutes")]
    pub minutes: f64,
    #[serde(default = "default_spreadsheet_amount")]
    pub spreadsheet_amount: Decimal,
}

fn default_amount() -> Decimal {
    Decimal::ONE
}

fn default_minutes() -> f64 {
    10.0
}

fn default_spreadsheet_amount() -> Decimal {
    Decimal::from(15)
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            minutes: default_minutes(),
            spreadsheet_amount: default_spreadsheet_amount(),
        }
    }
}

/// Per-ledger override; unset fields fall back to the kind's default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerToleranceConfig {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub minutes: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for result and residual files, relative to the config file.
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "default_result_file")]
    pub result_file: String,
}

fn default_result_file() -> String {
    "conciliacion_result.csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            result_file: default_result_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let bases: Vec<&LedgerConfig> = self
            .ledgers
            .iter()
            .filter(|l| l.kind == LedgerKind::Base)
            .collect();
        if bases.len() != 1 {
            return Err(ReconError::ConfigValidation(format!(
                "exactly one ledger must have kind = \"base\", found {}",
                bases.len()
            )));
        }

        if self.secondaries().next().is_none() {
            return Err(ReconError::ConfigValidation(
                "at least one collection or spreadsheet ledger is required".into(),
            ));
        }

        let mut names = HashSet::new();
        for ledger in &self.ledgers {
            if ledger.name.trim().is_empty() {
                return Err(ReconError::ConfigValidation("ledger name cannot be empty".into()));
            }
            if !names.insert(ledger.name.as_str()) {
                return Err(ReconError::DuplicateLedger(ledger.name.clone()));
            }
            if ledger.file.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "ledger '{}': file cannot be empty",
                    ledger.name
                )));
            }
            ledger.validate_columns()?;
            if let Some(ref t) = ledger.tolerance {
                check_tolerance(&ledger.name, t.amount, t.minutes)?;
            }
        }

        let mut spreadsheet_seen: Option<&str> = None;
        for ledger in self.secondaries() {
            match (ledger.kind, spreadsheet_seen) {
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

        self.check_output_files()?;

        if self.matching.operations.is_empty() {
            return Err(ReconError::ConfigValidation(
                "matching.operations must list at least one operation type".into(),
            ));
        }

        check_tolerance("tolerance", Some(self.tolerance.amount), Some(self.tolerance.minutes))?;
        check_tolerance("tolerance", Some(self.tolerance.spreadsheet_amount), None)?;

        Ok(())
    }

    /// Every secondary ledger gets its own residual file, distinct from the
    /// result file. Ledger names that slug alike would overwrite each other.
    fn check_output_files(&self) -> Result<(), ReconError> {
        if self.output.result_file.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "output.result_file cannot be empty".into(),
            ));
        }

        let mut owners: HashMap<String, String> = HashMap::new();
        owners.insert(self.output.result_file.clone(), "output.result_file".into());
        for ledger in self.secondaries() {
            let file = residual_file_name(&ledger.name);
            if let Some(owner) = owners.get(&file) {
                return Err(ReconError::ConfigValidation(format!(
                    "ledger '{}': residual file '{file}' is already written by {owner}; rename the ledger",
                    ledger.name
                )));
            }
            owners.insert(file, format!("ledger '{}'", ledger.name));
        }
        Ok(())
    }

    /// The base ledger. Present once the config has been validated.
    pub fn base(&self) -> Result<&LedgerConfig, ReconError> {
        self.ledgers
            .iter()
            .find(|l| l.kind == LedgerKind::Base)
            .ok_or_else(|| ReconError::ConfigValidation("no base ledger configured".into()))
    }

    /// Secondary ledgers in priority order.
    pub fn secondaries(&self) -> impl Iterator<Item = &LedgerConfig> {
        self.ledgers.iter().filter(|l| l.kind != LedgerKind::Base)
    }

    pub fn operation_filter(&self) -> OperationFilter {
        OperationFilter::new(self.matching.operations.iter().cloned())
    }

    pub fn match_rules(&self) -> MatchRules {
        let collection = Tolerance {
            amount: self.tolerance.amount,
            minutes: Some(self.tolerance.minutes),
        };
        let spreadsheet = Tolerance {
            amount: self.tolerance.spreadsheet_amount,
            minutes: None,
        };

        let mut overrides = HashMap::new();
        for ledger in self.secondaries() {
            let Some(ref t) = ledger.tolerance else {
                continue;
            };
            let default = match ledger.kind {
                LedgerKind::Spreadsheet => &spreadsheet,
                LedgerKind::Base | LedgerKind::Collection => &collection,
            };
            overrides.insert(
                ledger.name.clone(),
                Tolerance {
                    amount: t.amount.unwrap_or(default.amount),
                    minutes: t.minutes.or(default.minutes),
                },
            );
        }

        MatchRules {
            collection,
            spreadsheet,
            overrides,
            rejected_status: self.matching.rejected_status.clone(),
        }
    }
}

impl LedgerConfig {
    fn validate_columns(&self) -> Result<(), ReconError> {
        let missing = |field: &str| {
            ReconError::ConfigValidation(format!(
                "ledger '{}': columns.{field} is required for kind \"{}\"",
                self.name, self.kind
            ))
        };
        let c = &self.columns;
        if c.reference.trim().is_empty() {
            return Err(missing("reference"));
        }
        if c.amount.trim().is_empty() {
            return Err(missing("amount"));
        }
        match self.kind {
            LedgerKind::Base => {
                if c.timestamp.is_none() {
                    return Err(missing("timestamp"));
                }
                if c.operation_type.is_none() {
                    return Err(missing("operation_type"));
                }
            }
            LedgerKind::Collection => {
                if c.timestamp.is_none() {
                    return Err(missing("timestamp"));
                }
            }
            LedgerKind::Spreadsheet => {}
        }
        Ok(())
    }
}

fn check_tolerance(
    scope: &str,
    amount: Option<Decimal>,
    minutes: Option<f64>,
) -> Result<(), ReconError> {
    if let Some(a) = amount {
        if a.is_sign_negative() {
            return Err(ReconError::ConfigValidation(format!(
                "{scope}: amount tolerance cannot be negative, got {a}"
            )));
        }
    }
    if let Some(m) = minutes {
        if !m.is_finite() || m < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "{scope}: minute tolerance must be a non-negative number, got {m}"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
