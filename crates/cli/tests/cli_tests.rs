// CLI integration tests: run the built binary against workbooks written to a temp dir.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use partcheck_grid::{Col, Sheet, Workbook};
use partcheck_recon::{CheckConfig, Paint};

fn partcheck() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_partcheck"));
    cmd.env_remove("PARTCHECK_LOOKUP_URL");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to run partcheck")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_exit(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {code}, got {:?}\nstderr: {}",
        output.status.code(),
        stderr(output),
    );
}

fn col(letters: &str) -> Col {
    Col::from_letters(letters).unwrap()
}

/// Default-layout export with one populated row per identifier, from row 4.
fn write_export(dir: &Path, identifiers: &[&str]) -> PathBuf {
    let mut sheet = Sheet::new("MARA");
    sheet.set_value(1, col("B"), "Stammdaten");
    let headers = [
        ("A", "Pos."),
        ("B", "Material"),
        ("C", "Materialkurztext"),
        ("E", "Herstellerteilenummer"),
        ("N", "Fert./Prüfhinweis"),
        ("P", "Werkstoff"),
        ("S", "Nettogewicht"),
        ("T", "Bruttogewicht"),
        ("U", "Länge"),
        ("V", "Breite"),
        ("W", "Höhe"),
        ("Z", "Sachnummer"),
        ("AB", "Hersteller"),
    ];
    for (letters, name) in headers {
        sheet.set_value(2, col(letters), letters);
        sheet.set_value(3, col(letters), name);
    }
    for (i, id) in identifiers.iter().enumerate() {
        let row = 4 + i as u32;
        for c in ["B", "D", "F", "G", "H", "I", "J", "O", "Q", "R"] {
            sheet.set_value(row, col(c), "x");
        }
        sheet.set_value(row, col("A"), (i + 1) as f64);
        sheet.set_value(row, col("C"), "Sechskantschraube M8x40");
        sheet.set_value(row, col("E"), *id);
        sheet.set_value(row, col("N"), "2/3.1/CL1/N/A2");
        sheet.set_value(row, col("P"), "Stahl verzinkt");
        sheet.set_value(row, col("S"), 0.125);
        sheet.set_value(row, col("T"), 0.13);
        sheet.set_value(row, col("U"), 120.0);
        sheet.set_value(row, col("V"), 80.0);
        sheet.set_value(row, col("W"), 60.0);
        sheet.set_value(row, col("Z"), *id);
        sheet.set_value(row, col("AB"), "Würth");
    }

    let path = dir.join("export.xlsx");
    partcheck_io::save_path(&Workbook::from_sheets(vec![sheet]), &path).unwrap();
    path
}

fn write_references(dir: &Path, weight: &str) -> PathBuf {
    let records = serde_json::json!({
        "A2V12345678": {
            "Produkttitel": "Sechskantschraube M8x40",
            "Weitere Artikelnummer": "Nicht gefunden",
            "Materialklassifizierung": "Klasse 2",
            "Werkstoff": "Stahl verzinkt",
            "Gewicht": weight,
            "Abmessung": "120 x 80 x 60 mm"
        }
    });
    let path = dir.join("refs.json");
    std::fs::write(&path, records.to_string()).unwrap();
    path
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

// ============================================================================
// config
// ============================================================================

#[test]
fn config_prints_parseable_defaults() {
    let output = run(partcheck().arg("config"));
    assert_exit(&output, 0);

    let text = String::from_utf8(output.stdout).unwrap();
    let config = CheckConfig::from_toml(&text).unwrap();
    assert_eq!(config.lookup.identifier_prefix, "A2V");
    assert_eq!(config.layout.label_row, 4);
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn compare_with_reference_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678"]);
    let refs = write_references(dir.path(), "125 g");
    let out = dir.path().join("abgleich.xlsx");

    let output = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .arg("-o")
        .arg(&out)
        .args(["--json", "--strict"]));
    assert_exit(&output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["report"]["identifiers_requested"], 1);
    assert_eq!(json["report"]["identifiers_found"], 1);
    assert_eq!(json["stats"]["total"]["ok_rows"], 1);
    assert_eq!(json["stats"]["total"]["deviation_rows"], 0);
    assert!(stderr(&output).contains("1 ok, 0 with deviations"));

    let workbook = partcheck_io::load_path(&out).unwrap();
    let sheet = workbook.first_sheet().unwrap();
    assert_eq!(sheet.value(5, col("AK")).as_text(), "OK");
    assert_eq!(
        sheet.format(5, col("X")).and_then(|f| f.fill),
        Some(Paint::Match.argb())
    );
}

#[test]
fn strict_compare_fails_on_deviation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678"]);
    let refs = write_references(dir.path(), "300 g");
    let out = dir.path().join("abgleich.xlsx");

    let output = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .arg("-o")
        .arg(&out)
        .arg("--strict"));
    assert_exit(&output, 5);
    assert!(stderr(&output).contains("1 row(s) with deviations"));
    // Output is still written
    assert!(out.exists());

    let lenient = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .arg("-o")
        .arg(&out));
    assert_exit(&lenient, 0);
}

#[test]
fn compare_without_reference_source_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678"]);

    let output = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("-o")
        .arg(dir.path().join("out.xlsx")));
    assert_exit(&output, 2);
    assert!(stderr(&output).contains("hint:"));
}

#[test]
fn lookup_url_without_placeholder_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678"]);

    let output = run(partcheck()
        .arg("compare")
        .arg(&input)
        .args(["--lookup-url", "http://127.0.0.1:9/products"])
        .arg("-o")
        .arg(dir.path().join("out.xlsx")));
    assert_exit(&output, 2);
    assert!(stderr(&output).contains("{id}"));
}

#[test]
fn missing_input_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let refs = write_references(dir.path(), "125 g");

    let output = run(partcheck()
        .arg("compare")
        .arg(dir.path().join("nope.xlsx"))
        .arg("--reference")
        .arg(&refs)
        .arg("-o")
        .arg(dir.path().join("out.xlsx")));
    assert_exit(&output, 3);
    assert!(stderr(&output).contains("error: "));
}

#[test]
fn invalid_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678"]);
    let refs = write_references(dir.path(), "125 g");
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[lookup]\nconcurrency = 0\n").unwrap();

    let output = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .arg("--config")
        .arg(&config)
        .arg("-o")
        .arg(dir.path().join("out.xlsx")));
    assert_exit(&output, 4);
    assert!(stderr(&output).contains("concurrency"));

    let zero = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .args(["--concurrency", "0"])
        .arg("-o")
        .arg(dir.path().join("out.xlsx")));
    assert_exit(&zero, 4);
}

// ============================================================================
// completeness + stats
// ============================================================================

#[test]
fn completeness_report_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V1", "A2V2"]);
    let report_path = dir.path().join("bericht.xlsx");

    // Blank one mandatory cell in the second data row
    let mut workbook = partcheck_io::load_path(&input).unwrap();
    workbook.sheets_mut()[0].clear_cell(5, col("G"));
    partcheck_io::save_path(&workbook, &input).unwrap();

    let output = run(partcheck()
        .arg("completeness")
        .arg(&input)
        .arg("-o")
        .arg(&report_path)
        .arg("--json"));
    assert_exit(&output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["report"]["rows_checked"], 2);
    assert_eq!(json["report"]["complete_rows"], 1);
    assert_eq!(json["report"]["missing_cells"], 1);
    assert_eq!(json["stats"]["flagged_cells"], 1);

    let stats = run(partcheck()
        .arg("stats")
        .arg(&report_path)
        .args(["--kind", "completeness"]));
    assert_exit(&stats, 0);
    let json = stdout_json(&stats);
    assert_eq!(json["complete_rows"], 1);
    assert_eq!(json["incomplete_rows"], 1);
    assert_eq!(json["complete_percent"], 50.0);
}

#[test]
fn stats_on_reconciled_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_export(dir.path(), &["A2V12345678", "A2V87654321"]);
    let refs = write_references(dir.path(), "125 g");
    let out = dir.path().join("abgleich.xlsx");

    let compare = run(partcheck()
        .arg("compare")
        .arg(&input)
        .arg("--reference")
        .arg(&refs)
        .arg("-o")
        .arg(&out));
    assert_exit(&compare, 0);

    let output = run(partcheck().arg("stats").arg(&out).args(["--kind", "recon"]));
    assert_exit(&output, 0);

    let json = stdout_json(&output);
    assert_eq!(json["total"]["rows"], 2);
    assert_eq!(json["sheets"][0]["sheet"], "MARA");
    // Unknown identifier: every compared field lacks a reference value
    assert!(json["total"]["reference_missing"].as_u64().unwrap() >= 7);
}
