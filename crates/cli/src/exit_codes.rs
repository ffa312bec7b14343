//! CLI Exit Code Registry
//!
//! Single source of truth for `cobranzas` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | Unreconciled work remains (`recon run --strict`)     |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Invalid config (parse or validation failure)         |
//! | 4    | Input error (unreadable file, missing column, CSV)   |
//! | 5    | Output error (cannot create dir or write a file)     |
//! | 6    | Engine error (internal invariant violated)           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`recon_exit_code`] or the command's error handling

use cobranzas_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// `--strict` run left review labels, unreconciled records or residuals.
pub const EXIT_RECON_UNRESOLVED: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file did not parse or failed validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// A ledger file could not be read or loaded.
pub const EXIT_RECON_INPUT: u8 = 4;

/// Result or residual files could not be written.
pub const EXIT_RECON_OUTPUT: u8 = 5;

/// The engine refused the run (ordering, double consumption).
pub const EXIT_RECON_ENGINE: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_)
        | ReconError::ConfigValidation(_)
        | ReconError::DuplicateLedger(_)
        | ReconError::LedgerOrder { .. } => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. } | ReconError::Csv { .. } => EXIT_RECON_INPUT,
        ReconError::Io(_) => EXIT_RECON_OUTPUT,
        ReconError::UnknownLedger(_) | ReconError::AlreadyConsumed { .. } => EXIT_RECON_ENGINE,
    }
}
