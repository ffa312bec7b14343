//! Result and residual files on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cobranzas_recon::export::{residual_file_name, residual_to_csv, results_to_csv};
use cobranzas_recon::ReconReport;

use crate::exit_codes::EXIT_RECON_OUTPUT;
use crate::CliError;

#[derive(Debug)]
pub struct WrittenFiles {
    pub result: PathBuf,
    /// One per secondary ledger, in pass order.
    pub residuals: Vec<PathBuf>,
}

/// Write the result table and one residual table per secondary ledger into
/// `dir`, creating it if needed. Files from earlier runs are overwritten, but
/// two tables of the same run never share a path.
pub fn write_outputs(
    dir: &Path,
    result_file: &str,
    base_headers: &[String],
    report: &ReconReport<'_>,
) -> Result<WrittenFiles, CliError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        CliError::new(EXIT_RECON_OUTPUT, format!("cannot create {}: {e}", dir.display()))
    })?;

    let result = dir.join(result_file);
    let mut written: HashSet<PathBuf> = HashSet::new();
    written.insert(result.clone());
    write_file(&result, &results_to_csv(base_headers, &report.results)?)?;

    let mut residuals = Vec::with_capacity(report.residuals.len());
    for residual in &report.residuals {
        let path = dir.join(residual_file_name(&residual.ledger));
        if !written.insert(path.clone()) {
            return Err(CliError::new(
                EXIT_RECON_OUTPUT,
                format!(
                    "residual table for '{}' would overwrite {}",
                    residual.ledger,
                    path.display()
                ),
            )
            .with_hint("give each ledger a name that maps to a distinct file"));
        }
        write_file(&path, &residual_to_csv(residual)?)?;
        residuals.push(path);
    }

    Ok(WrittenFiles { result, residuals })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CliError> {
    std::fs::write(path, contents).map_err(|e| {
        CliError::new(EXIT_RECON_OUTPUT, format!("cannot write {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobranzas_recon::model::{LedgerKind, ReconMeta, ReconSummary};
    use cobranzas_recon::{ConsumptionState, Label, Ledger, LedgerRecord, MatchResult};

    fn record(origin: &str, reference: &str) -> LedgerRecord {
        LedgerRecord {
            origin: origin.into(),
            row: 0,
            reference: reference.into(),
            amount: None,
            timestamp: None,
            operation_type: "Cobro".into(),
            status: String::new(),
            tag: None,
            fields: vec![reference.into()],
        }
    }

    #[test]
    fn writes_result_and_residual_files() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("salida");

        let base = record("Mercado Pago", "4040");
        let mut km = Ledger::new("Cobranzas KM1151", LedgerKind::Collection);
        km.headers = vec!["Transacción".into()];
        km.records.push(record("Cobranzas KM1151", "999"));

        let state = ConsumptionState::for_ledgers(std::slice::from_ref(&km));
        let residual = cobranzas_recon::extract_residuals(&km, &state).unwrap();

        let report = ReconReport {
            meta: ReconMeta {
                config_name: "test".into(),
                engine_version: "0.0.0".into(),
                run_at: String::new(),
            },
            summary: ReconSummary::default(),
            results: vec![MatchResult {
                base: &base,
                label: Label::Unreconciled,
                matched_amount: None,
                matched_timestamp: None,
                delta_amount: None,
                delta_minutes: None,
                matched_source_tag: None,
                matches: Vec::new(),
            }],
            residuals: vec![residual],
        };

        let headers = vec!["Operación Relacionada".to_string()];
        let written = write_outputs(&out, "conciliacion_result.csv", &headers, &report).unwrap();

        assert_eq!(written.result, out.join("conciliacion_result.csv"));
        let result = std::fs::read_to_string(&written.result).unwrap();
        assert!(result.starts_with("Operación Relacionada,label,"));
        assert!(result.contains("4040,No Conciliado"));

        assert_eq!(written.residuals, vec![out.join("cobranzas_km1151_residuo.csv")]);
        let residual = std::fs::read_to_string(&written.residuals[0]).unwrap();
        assert_eq!(residual, "Transacción\n999\n");
    }

    #[test]
    fn residual_names_that_collide_are_refused() {
        let tmp = tempfile::tempdir().unwrap();

        let mut ledgers = Vec::new();
        for name in ["Cobranzas KM-1151", "Cobranzas KM 1151"] {
            let mut l = Ledger::new(name, LedgerKind::Collection);
            l.headers = vec!["Transacción".into()];
            l.records.push(record(name, "999"));
            ledgers.push(l);
        }
        let mut residuals = Vec::new();
        for l in &ledgers {
            let state = ConsumptionState::for_ledgers(std::slice::from_ref(l));
            residuals.push(cobranzas_recon::extract_residuals(l, &state).unwrap());
        }
        let report = ReconReport {
            meta: ReconMeta {
                config_name: "test".into(),
                engine_version: "0.0.0".into(),
                run_at: String::new(),
            },
            summary: ReconSummary::default(),
            results: Vec::new(),
            residuals,
        };

        let err = write_outputs(tmp.path(), "r.csv", &[], &report).unwrap_err();
        assert_eq!(err.code, EXIT_RECON_OUTPUT);
        assert!(err.message.contains("'Cobranzas KM 1151'"), "{}", err.message);
        assert!(err.message.contains("cobranzas_km_1151_residuo.csv"));
    }

    #[test]
    fn residual_cannot_replace_result_file() {
        let tmp = tempfile::tempdir().unwrap();

        let mut l = Ledger::new("Planilla 1", LedgerKind::Spreadsheet);
        l.headers = vec!["Nro Operación".into()];
        l.records.push(record("Planilla 1", "55"));
        let state = ConsumptionState::for_ledgers(std::slice::from_ref(&l));
        let report = ReconReport {
            meta: ReconMeta {
                config_name: "test".into(),
                engine_version: "0.0.0".into(),
                run_at: String::new(),
            },
            summary: ReconSummary::default(),
            results: Vec::new(),
            residuals: vec![cobranzas_recon::extract_residuals(&l, &state).unwrap()],
        };

        let err = write_outputs(tmp.path(), "planilla_1_residuo.csv", &[], &report).unwrap_err();
        assert_eq!(err.code, EXIT_RECON_OUTPUT);
        let result = std::fs::read_to_string(tmp.path().join("planilla_1_residuo.csv")).unwrap();
        assert!(result.starts_with("label,"), "{result}");
    }

    #[test]
    fn unwritable_dir_is_output_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("taken");
        std::fs::write(&blocker, "").unwrap();

        let report = ReconReport {
            meta: ReconMeta {
                config_name: "test".into(),
                engine_version: "0.0.0".into(),
                run_at: String::new(),
            },
            summary: ReconSummary::default(),
            results: Vec::new(),
            residuals: Vec::new(),
        };
        let err = write_outputs(&blocker.join("sub"), "r.csv", &[], &report).unwrap_err();
        assert_eq!(err.code, EXIT_RECON_OUTPUT);
    }
}
