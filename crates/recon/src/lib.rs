//! `cobranzas-recon`: reference-keyed collections reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded ledgers, returns classified results
//! and per-ledger residuals. No CLI or file-system dependencies.

pub mod classify;
pub mod config;
pub mod consumption;
pub mod engine;
pub mod error;
pub mod events;
pub mod evidence;
pub mod export;
pub mod index;
pub mod load;
pub mod matcher;
pub mod model;
pub mod residual;

pub use config::ReconConfig;
pub use consumption::ConsumptionState;
pub use engine::{reconcile, run, Reconciliation};
pub use error::ReconError;
pub use events::{EventLog, EventSink, NullSink, ReconEvent, TracingSink};
pub use model::{
    Label, Ledger, LedgerKind, LedgerRecord, MatchResult, MatchRules, OperationFilter,
    ReconInput, ReconReport, Residual, Tolerance,
};
pub use residual::extract_residuals;
