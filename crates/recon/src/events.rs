//! Progress side channel for a reconciliation run.
//!
//! The engine reports what it is doing through an [`EventSink`]. Sinks only
//! observe; nothing they do feeds back into classification.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::model::LedgerKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReconEvent {
    Started {
        base: String,
        base_rows: usize,
        eligible_rows: usize,
    },
    PassStarted {
        ledger: String,
        kind: LedgerKind,
    },
    Matched {
        ledger: String,
        reference: String,
        label: String,
    },
    DuplicateFlagged {
        ledger: String,
        reference: String,
        label: String,
    },
    PassFinished {
        ledger: String,
        matched: usize,
    },
    Finalized {
        labelled: usize,
        unreconciled: usize,
    },
    ResidualsExtracted {
        ledger: String,
        count: usize,
    },
}

pub trait EventSink {
    fn emit(&mut self, event: &ReconEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &ReconEvent) {}
}

/// Collects events in order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<ReconEvent>,
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &ReconEvent) {
        self.events.push(event.clone());
    }
}

impl<F> EventSink for F
where
    F: FnMut(&ReconEvent),
{
    fn emit(&mut self, event: &ReconEvent) {
        self(event)
    }
}

/// Forwards events to `tracing`: pass boundaries at info, per-record matches
/// at debug, duplicate conflicts at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: &ReconEvent) {
        match event {
            ReconEvent::Started { base, base_rows, eligible_rows } => {
                info!(%base, base_rows, eligible_rows, "starting reconciliation");
            }
            ReconEvent::PassStarted { ledger, kind } => {
                info!(%ledger, %kind, "reconciling against ledger");
            }
            ReconEvent::Matched { ledger, reference, label } => {
                debug!(%ledger, %reference, %label, "matched");
            }
            ReconEvent::DuplicateFlagged { ledger, reference, label } => {
                warn!(%ledger, %reference, %label, "duplicate reference across ledgers");
            }
            ReconEvent::PassFinished { ledger, matched } => {
                info!(%ledger, matched, "pass finished");
            }
            ReconEvent::Finalized { labelled, unreconciled } => {
                info!(labelled, unreconciled, "results finalized");
            }
            ReconEvent::ResidualsExtracted { ledger, count } => {
                info!(%ledger, count, "residual records extracted");
            }
        }
    }
}
