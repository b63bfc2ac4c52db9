//! Reconciliation: look up every row identifier once, insert the companion
//! columns, then write and paint every pair and the row status.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};
use partcheck_grid::{Alignment, Col, Sheet, Workbook};

use crate::compare::{compare_field, CompareSettings};
use crate::config::CheckConfig;
use crate::error::CheckError;
use crate::layout::{apply_layout, plan_layout};
use crate::lookup::{lookup_many, ProductLookup};
use crate::model::{ColumnPair, FieldKind, FieldVerdict, ReconReport, ReferenceRecord, RowStatus, SheetReport};
use crate::paint::Paint;

/// Reconcile every sheet of `workbook` in place.
pub fn reconcile_workbook(
    workbook: &mut Workbook,
    lookup: &dyn ProductLookup,
    config: &CheckConfig,
) -> Result<ReconReport, CheckError> {
    if workbook.sheet_count() == 0 {
        return Err(CheckError::NoWorksheet);
    }

    let ids = collect_identifiers(workbook, config);
    info!("looking up {} identifiers (concurrency {})", ids.len(), config.lookup.concurrency);
    let references = lookup_many(lookup, &ids, config.lookup.concurrency);

    let mut report = reconcile_with(workbook, &references, config)?;
    report.identifiers_requested = ids.len();
    report.identifiers_found = references.values().filter(|r| !r.is_empty()).count();
    Ok(report)
}

/// Reconcile against records that were already fetched. Keys are uppercase identifiers.
pub fn reconcile_with(
    workbook: &mut Workbook,
    references: &HashMap<String, ReferenceRecord>,
    config: &CheckConfig,
) -> Result<ReconReport, CheckError> {
    if workbook.sheet_count() == 0 {
        return Err(CheckError::NoWorksheet);
    }
    let sheets = workbook
        .sheets_mut()
        .iter_mut()
        .map(|sheet| reconcile_sheet(sheet, references, config))
        .collect();
    Ok(ReconReport {
        identifiers_requested: 0,
        identifiers_found: 0,
        sheets,
    })
}

/// Distinct identifiers carrying the lookup prefix, read from the untouched
/// sheets (data starts at the row the label row will be inserted at).
pub fn collect_identifiers(workbook: &Workbook, config: &CheckConfig) -> BTreeSet<String> {
    let prefix = config.lookup.identifier_prefix.to_uppercase();
    let column = config.layout.identifier_column;
    let mut ids = BTreeSet::new();
    for sheet in workbook.sheets() {
        for row in config.layout.label_row..=sheet.rows {
            let id = row_identifier(sheet, row, column);
            if !id.is_empty() && id.starts_with(&prefix) {
                ids.insert(id);
            }
        }
    }
    ids
}

fn row_identifier(sheet: &Sheet, row: u32, column: Col) -> String {
    sheet.value(row, column).as_text().trim().to_uppercase()
}

/// Transform one sheet and fill its companion and status columns.
pub fn reconcile_sheet(
    sheet: &mut Sheet,
    references: &HashMap<String, ReferenceRecord>,
    config: &CheckConfig,
) -> SheetReport {
    let layout = plan_layout(&config.layout.fields, sheet.cols);
    for kind in &layout.skipped {
        warn!("sheet '{}': no column for field '{}', pair skipped", sheet.name, kind);
    }
    let id_column = layout.new_position(config.layout.identifier_column);
    if id_column.is_none() {
        warn!(
            "sheet '{}': identifier column {} is past the last column",
            sheet.name, config.layout.identifier_column
        );
    }

    let status_col = apply_layout(sheet, &layout, &config.layout);
    let settings = config.compare_settings();
    let empty = ReferenceRecord::default();

    let mut report = SheetReport {
        sheet: sheet.name.clone(),
        skipped_fields: layout.skipped.clone(),
        ..Default::default()
    };

    for row in config.layout.label_row + 1..=sheet.rows {
        if sheet.row_is_empty(row) {
            continue;
        }
        let row_id = id_column.map(|c| row_identifier(sheet, row, c)).unwrap_or_default();
        let record = references.get(&row_id).unwrap_or(&empty);

        let mut status = RowStatus::Ok;
        for pair in &layout.pairs {
            let verdict = reconcile_pair(sheet, row, pair, &row_id, record, &settings);
            match verdict {
                FieldVerdict::Match => report.matches += 1,
                FieldVerdict::Mismatch => report.mismatches += 1,
                FieldVerdict::ReferenceMissing => report.reference_missing += 1,
                FieldVerdict::SourceMissing => report.source_missing += 1,
            }
            if is_deviation(pair.kind, verdict, config) {
                status = RowStatus::Deviation;
            }
        }

        write_status(sheet, row, status_col, status, config);
        report.rows += 1;
        match status {
            RowStatus::Ok => report.ok_rows += 1,
            RowStatus::Deviation => report.deviation_rows += 1,
        }
    }

    debug!(
        "sheet '{}': {} rows, {} deviations, {} mismatched fields",
        report.sheet, report.rows, report.deviation_rows, report.mismatches
    );
    report
}

/// Compare one field, write the reference value and paint the companion cell.
fn reconcile_pair(
    sheet: &mut Sheet,
    row: u32,
    pair: &ColumnPair,
    row_id: &str,
    record: &ReferenceRecord,
    settings: &CompareSettings,
) -> FieldVerdict {
    let source = sheet.value(row, pair.source).clone();
    let comparison = compare_field(pair.kind, &source, row_id, record, settings);
    let verdict = comparison.verdict(&source);

    if let Some(reference) = comparison.reference {
        sheet.set_value(row, pair.reference, reference);
    }
    let paint = match verdict {
        FieldVerdict::Match => Some(Paint::Match),
        FieldVerdict::Mismatch => Some(Paint::Mismatch),
        FieldVerdict::ReferenceMissing => Some(Paint::ReferenceMissing),
        // Nothing to compare against; the written value stands unpainted
        FieldVerdict::SourceMissing => None,
    };
    if let Some(paint) = paint {
        sheet.set_fill(row, pair.reference, paint.argb());
    }
    verdict
}

fn is_deviation(kind: FieldKind, verdict: FieldVerdict, config: &CheckConfig) -> bool {
    if !config.compare.required_fields.contains(&kind) {
        return false;
    }
    match verdict {
        FieldVerdict::Mismatch => true,
        FieldVerdict::SourceMissing => config.compare.source_missing_is_deviation,
        FieldVerdict::Match | FieldVerdict::ReferenceMissing => false,
    }
}

fn write_status(sheet: &mut Sheet, row: u32, col: Col, status: RowStatus, config: &CheckConfig) {
    let (paint, text) = match status {
        RowStatus::Ok => (Paint::StatusOk, &config.layout.ok_text),
        RowStatus::Deviation => (Paint::StatusDeviation, &config.layout.deviation_text),
    };
    if config.compare.status_text {
        sheet.set_value(row, col, text.as_str());
    }
    let format = sheet.format_mut(row, col);
    format.fill = Some(paint.argb());
    format.alignment = Alignment::Center;
}
