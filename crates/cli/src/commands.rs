//! Subcommand bodies. Each returns `CliError` with the exit code already chosen.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use partcheck_recon::{
    check_completeness, completeness_stats, reconcile_workbook, reconciliation_stats, CheckConfig,
    ProductLookup, StaticLookup,
};

use crate::exit_codes::EXIT_DEVIATIONS;
use crate::http_lookup::HttpLookup;
use crate::{CliError, StatsKind};

pub struct CompareArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub reference: Option<PathBuf>,
    pub lookup_url: Option<String>,
    pub timeout: u64,
    pub config: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub json: bool,
    pub strict: bool,
}

fn load_config(path: Option<&Path>) -> Result<CheckConfig, CliError> {
    match path {
        Some(path) => {
            let config = CheckConfig::load(path)?;
            info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(CheckConfig::default()),
    }
}

fn open_lookup(args: &CompareArgs) -> Result<Box<dyn ProductLookup>, CliError> {
    if let Some(path) = &args.reference {
        let input = std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
        let lookup = StaticLookup::from_json(&input)
            .map_err(|e| CliError::usage(format!("{}: {e}", path.display())))?;
        info!("{} reference records from {}", lookup.len(), path.display());
        return Ok(Box::new(lookup));
    }
    if let Some(template) = &args.lookup_url {
        let lookup = HttpLookup::new(template, Duration::from_secs(args.timeout))
            .map_err(|e| CliError::usage(e.to_string()))?;
        return Ok(Box::new(lookup));
    }
    Err(CliError::usage("no reference source given")
        .with_hint("pass --reference refs.json or --lookup-url (or set PARTCHECK_LOOKUP_URL)"))
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// compare
// ============================================================================

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(concurrency) = args.concurrency {
        config.lookup.concurrency = concurrency;
        config.validate()?;
    }

    let lookup = open_lookup(&args)?;
    let mut workbook = partcheck_io::load_path(&args.input)?;
    let report = reconcile_workbook(&mut workbook, lookup.as_ref(), &config)?;
    partcheck_io::save_path(&workbook, &args.output)?;
    eprintln!("wrote {}", args.output.display());

    let stats = reconciliation_stats(&workbook, &config);
    if args.json {
        print_json(&serde_json::json!({ "report": report, "stats": stats }))?;
    }

    let total = &stats.total;
    eprintln!(
        "{} sheet(s), {} rows: {} ok, {} with deviations; {} of {} identifiers found",
        report.sheets.len(),
        total.rows,
        total.ok_rows,
        total.deviation_rows,
        report.identifiers_found,
        report.identifiers_requested,
    );
    eprintln!(
        "fields: {} matched, {} mismatched, {} without reference value",
        total.matches, total.mismatches, total.reference_missing,
    );

    if args.strict && report.deviation_rows() > 0 {
        return Err(CliError {
            code: EXIT_DEVIATIONS,
            message: format!("{} row(s) with deviations", report.deviation_rows()),
            hint: None,
        });
    }
    Ok(())
}

// ============================================================================
// completeness
// ============================================================================

pub fn cmd_completeness(
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let workbook = partcheck_io::load_path(&input)?;
    let (report_workbook, report) = check_completeness(&workbook, &config)?;
    partcheck_io::save_path(&report_workbook, &output)?;
    eprintln!("wrote {}", output.display());

    if json {
        let sheet = report_workbook
            .first_sheet()
            .ok_or_else(|| CliError::general("report workbook has no sheet"))?;
        let stats = completeness_stats(sheet, config.completeness.first_data_row);
        print_json(&serde_json::json!({ "report": report, "stats": stats }))?;
    }

    eprintln!(
        "{} rows checked: {} complete, {} incomplete ({} missing, {} implausible cells)",
        report.rows_checked,
        report.complete_rows,
        report.incomplete_rows,
        report.missing_cells,
        report.invalid_cells,
    );
    Ok(())
}

// ============================================================================
// stats
// ============================================================================

pub fn cmd_stats(file: PathBuf, kind: StatsKind, config: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let workbook = partcheck_io::load_path(&file)?;

    let value = match kind {
        StatsKind::Recon => serde_json::to_value(reconciliation_stats(&workbook, &config)),
        StatsKind::Completeness => {
            let sheet = workbook
                .first_sheet()
                .ok_or_else(|| CliError::general(format!("{}: no worksheet", file.display())))?;
            serde_json::to_value(completeness_stats(sheet, config.completeness.first_data_row))
        }
    }
    .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    print_json(&value)
}

// ============================================================================
// config
// ============================================================================

pub fn cmd_config() -> Result<(), CliError> {
    let text = CheckConfig::default().to_toml()?;
    print!("{text}");
    Ok(())
}
