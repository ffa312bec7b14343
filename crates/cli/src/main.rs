// Cobranzas CLI - reconcile collection ledgers against a payment-processor export

mod exit_codes;
mod output;
mod recon;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{recon_exit_code, EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "cobranzas")]
#[command(about = "Reconcile collection ledgers against a payment-processor export")]
#[command(version)]
struct Cli {
    /// Only log warnings and errors (RUST_LOG overrides)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run or validate a reconciliation config
    #[command(subcommand)]
    Recon(ReconCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    let result = match cli.command {
        None => Err(CliError::usage("no command given")
            .with_hint("cobranzas recon run <config.toml>, or cobranzas --help")),
        Some(Commands::Recon(cmd)) => recon::cmd_recon(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Log to stderr so `--json` output on stdout stays clean.
fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<cobranzas_recon::ReconError> for CliError {
    fn from(err: cobranzas_recon::ReconError) -> Self {
        use cobranzas_recon::ReconError;

        let hint = match &err {
            ReconError::MissingColumn { .. } => {
                Some("check the [ledger.columns] names against the file header".to_string())
            }
            ReconError::LedgerOrder { .. } => {
                Some("list spreadsheet ledgers after every collection ledger".to_string())
            }
            ReconError::Csv { .. } => Some("check the ledger's delimiter setting".to_string()),
            _ => None,
        };
        Self { code: recon_exit_code(&err), message: err.to_string(), hint }
    }
}
