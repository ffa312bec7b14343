//! `cobranzas recon`: config-driven collections reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use tracing::info;

use cobranzas_recon::config::LedgerConfig;
use cobranzas_recon::load::load_csv_ledger;
use cobranzas_recon::{Ledger, ReconConfig, ReconInput, ReconReport, TracingSink};

use crate::exit_codes::{EXIT_RECON_INPUT, EXIT_RECON_OUTPUT, EXIT_RECON_UNRESOLVED};
use crate::output::write_outputs;
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Run reconciliation from a TOML config file
    #[command(after_help = "\
Examples:
  cobranzas recon run conciliacion.toml
  cobranzas recon run conciliacion.toml --out salida/
  cobranzas recon run conciliacion.toml --json > report.json
  cobranzas recon run conciliacion.toml --strict --quiet")]
    Run {
        /// Path to the reconciliation config file
        config: PathBuf,

        /// Directory for the result and residual files (overrides [output] dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the full JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Exit 1 unless every record reconciled cleanly and no residuals remain
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config without running
    #[command(after_help = "\
Examples:
  cobranzas recon validate conciliacion.toml
  cobranzas recon validate conciliacion.toml --check-files")]
    Validate {
        /// Path to the reconciliation config file
        config: PathBuf,

        /// Also load every ledger file and check its configured columns
        #[arg(long)]
        check_files: bool,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run { config, out, json, strict } => cmd_recon_run(config, out, json, strict),
        ReconCommands::Validate { config, check_files } => cmd_recon_validate(config, check_files),
    }
}

fn read_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::new(EXIT_RECON_INPUT, format!("cannot read config {}: {e}", config_path.display()))
    })?;
    Ok(ReconConfig::from_toml(&config_str)?)
}

/// Ledger files resolve relative to the config file's directory.
fn config_dir(config_path: &Path) -> &Path {
    match config_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn load_ledger(base_dir: &Path, ledger: &LedgerConfig) -> Result<Ledger, CliError> {
    let csv_path = base_dir.join(&ledger.file);
    let csv_data = std::fs::read_to_string(&csv_path).map_err(|e| {
        let err = CliError::new(EXIT_RECON_INPUT, format!("cannot read {}: {e}", csv_path.display()));
        if e.kind() == std::io::ErrorKind::InvalidData {
            err.with_hint("re-export the file as UTF-8 CSV")
        } else {
            err
        }
    })?;
    let loaded = load_csv_ledger(&csv_data, ledger)?;
    info!(ledger = %ledger.name, kind = %ledger.kind, rows = loaded.len(), "loaded ledger");
    Ok(loaded)
}

fn load_input(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let base = load_ledger(base_dir, config.base()?)?;
    let secondaries = config
        .secondaries()
        .map(|l| load_ledger(base_dir, l))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReconInput { base, secondaries })
}

fn cmd_recon_run(
    config_path: PathBuf,
    out: Option<PathBuf>,
    json_output: bool,
    strict: bool,
) -> Result<(), CliError> {
    let config = read_config(&config_path)?;
    let base_dir = config_dir(&config_path);
    let input = load_input(&config, base_dir)?;

    let report = cobranzas_recon::run(&config, &input, &mut TracingSink)?;

    let out_dir = match (out, &config.output.dir) {
        (Some(dir), _) => dir,
        (None, Some(dir)) => base_dir.join(dir),
        (None, None) => base_dir.to_path_buf(),
    };
    if out_dir.is_file() {
        return Err(CliError::usage(format!(
            "output path {} is a file, expected a directory",
            out_dir.display()
        )));
    }

    let written = write_outputs(&out_dir, &config.output.result_file, &input.base.headers, &report)?;
    info!(path = %written.result.display(), "wrote result table");
    for path in &written.residuals {
        info!(path = %path.display(), "wrote residual table");
    }

    if json_output {
        let json_str = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::new(EXIT_RECON_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    print_summary(&report);

    if strict && !report.summary.is_clean() {
        return Err(CliError::new(EXIT_RECON_UNRESOLVED, "unresolved records remain (--strict)"));
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ReconReport<'_>) {
    let s = &report.summary;
    eprintln!(
        "{}: {} records, {} reconciled, {} amount reviews, {} date reviews, {} rejected, {} duplicates, {} unreconciled",
        report.meta.config_name,
        s.total,
        s.reconciled,
        s.amount_reviews,
        s.date_reviews,
        s.rejected,
        s.duplicates,
        s.unreconciled,
    );
    for (ledger, count) in &s.residuals {
        eprintln!("  residual {ledger}: {count} row(s)");
    }
}

fn cmd_recon_validate(config_path: PathBuf, check_files: bool) -> Result<(), CliError> {
    let config = read_config(&config_path)?;

    if check_files {
        load_input(&config, config_dir(&config_path))?;
    }

    let order: Vec<&str> = config.secondaries().map(|l| l.name.as_str()).collect();
    eprintln!(
        "valid: recon '{}' with base '{}', then {}",
        config.name,
        config.base()?.name,
        order.join(" → "),
    );
    Ok(())
}
