// End-to-end tests for `cobranzas recon`.
// Run with: cargo test -p cobranzas-cli --test recon_cli_tests -- --nocapture

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const FIXTURES: [&str; 5] = [
    "mercado_pago.recon.toml",
    "mercado_pago.csv",
    "km1151.csv",
    "bovedas.csv",
    "planilla.csv",
];

fn cobranzas() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cobranzas"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../recon/tests/fixtures")
}

/// Copy the fixture set into a scratch dir so outputs land there.
fn workspace() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for name in FIXTURES {
        std::fs::copy(fixtures_dir().join(name), tmp.path().join(name)).unwrap();
    }
    tmp
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn run_writes_result_and_residuals_next_to_config() {
    let ws = workspace();
    let out = cobranzas()
        .args(["recon", "run"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let result = std::fs::read_to_string(ws.path().join("conciliacion_result.csv")).unwrap();
    assert_eq!(result.lines().count(), 9);
    assert!(result.contains("Cobranzas KM1151 - Planilla 1 - DUPLICADO!"));
    assert!(result.contains("No Conciliado"));

    for name in [
        "cobranzas_km1151_residuo.csv",
        "cobranzas_las_bovedas_residuo.csv",
        "planilla_1_residuo.csv",
    ] {
        assert!(ws.path().join(name).is_file(), "missing {name}");
    }
    let km = std::fs::read_to_string(ws.path().join("cobranzas_km1151_residuo.csv")).unwrap();
    assert!(km.starts_with("Transacción,Fecha,Cobrado,Caja\n"));
    assert!(km.contains("999,"));

    let err = stderr(&out);
    assert!(err.contains("8 records, 2 reconciled"), "stderr: {err}");
}

#[test]
fn out_flag_redirects_files() {
    let ws = workspace();
    let dest = ws.path().join("salida");
    let out = cobranzas()
        .args(["recon", "run"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .arg("--out")
        .arg(&dest)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(dest.join("conciliacion_result.csv").is_file());
    assert!(!ws.path().join("conciliacion_result.csv").exists());
}

#[test]
fn json_report_on_stdout() {
    let ws = workspace();
    let out = cobranzas()
        .args(["recon", "run", "--json", "--quiet"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["summary"]["total"], 8);
    assert_eq!(report["summary"]["duplicates"], 1);
    assert_eq!(report["results"].as_array().unwrap().len(), 8);
    assert_eq!(report["results"][0]["label"], "Cobranzas KM1151");
}

#[test]
fn strict_fails_when_work_remains() {
    let ws = workspace();
    let out = cobranzas()
        .args(["recon", "run", "--strict"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unresolved records remain"));
    // Files are still written before the strict check.
    assert!(ws.path().join("conciliacion_result.csv").is_file());
}

#[test]
fn missing_ledger_file_is_input_error() {
    let ws = workspace();
    std::fs::remove_file(ws.path().join("bovedas.csv")).unwrap();
    let out = cobranzas()
        .args(["recon", "run"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("bovedas.csv"));
}

#[test]
fn invalid_config_exit_code() {
    let ws = workspace();
    let path = ws.path().join("bad.recon.toml");
    std::fs::write(
        &path,
        r#"
name = "sin base"

[[ledger]]
name = "KM"
kind = "collection"
file = "km1151.csv"
[ledger.columns]
reference = "Transacción"
amount = "Cobrado"
timestamp = "Fecha"
"#,
    )
    .unwrap();

    let out = cobranzas().args(["recon", "validate"]).arg(&path).output().unwrap();
    assert_eq!(out.status.code(), Some(3));
    assert!(stderr(&out).starts_with("error: config validation error"));
}

#[test]
fn validate_reports_pass_order() {
    let ws = workspace();
    let out = cobranzas()
        .args(["recon", "validate", "--check-files"])
        .arg(ws.path().join("mercado_pago.recon.toml"))
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("base 'Mercado Pago'"));
    assert!(err.contains("Cobranzas KM1151 → Cobranzas Las Bovedas → Planilla 1"));
}

#[test]
fn no_command_is_usage_error() {
    let out = cobranzas().output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("hint:"));
}
