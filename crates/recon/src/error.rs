use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty allow-list, bad tolerance, etc.).
    ConfigValidation(String),
    /// Missing required column in an input ledger.
    MissingColumn { ledger: String, column: String },
    /// Malformed CSV input.
    Csv { ledger: String, message: String },
    /// Two ledgers in the same run share a name.
    DuplicateLedger(String),
    /// A ledger has no entry in the consumption state.
    UnknownLedger(String),
    /// A collection ledger was scheduled after a spreadsheet ledger.
    LedgerOrder { collection: String, spreadsheet: String },
    /// A secondary record was claimed twice in one run.
    AlreadyConsumed { ledger: String, row: usize },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { ledger, column } => {
                write!(f, "ledger '{ledger}': missing column '{column}'")
            }
            Self::Csv { ledger, message } => write!(f, "ledger '{ledger}': CSV error: {message}"),
            Self::DuplicateLedger(name) => write!(f, "ledger '{name}' appears more than once"),
            Self::UnknownLedger(name) => {
                write!(f, "ledger '{name}' has no consumption state for this run")
            }
            Self::LedgerOrder { collection, spreadsheet } => write!(
                f,
                "collection ledger '{collection}' is scheduled after spreadsheet ledger '{spreadsheet}'"
            ),
            Self::AlreadyConsumed { ledger, row } => {
                write!(f, "ledger '{ledger}', row {row}: record already consumed")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
