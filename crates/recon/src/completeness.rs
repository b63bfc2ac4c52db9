//! Completeness and plausibility check over a raw export.
//!
//! Works on an annotated copy: values of every row, formatting and merges of
//! the header rows, column widths. The input sheet is never modified and no
//! columns are inserted.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use log::{debug, info, warn};
use partcheck_grid::{Alignment, Col, MergedRegion, Sheet, VerticalAlignment, Workbook};
use regex::Regex;

use crate::config::{CheckConfig, CompletenessConfig, TitleBlock};
use crate::error::CheckError;
use crate::model::{CompletenessReport, QualityFlag};
use crate::normalize::value_number;
use crate::paint::Paint;

/// Allowed values per segment of the five-part inspection code.
const CODE_SEGMENTS: [&[&str]; 5] = [
    &["OHNE", "1", "2", "3"],
    &["N", "3.2", "3.1", "2.2", "2.1"],
    &["N", "CL1", "CL2", "CL3"],
    &["N", "J"],
    &["N", "A1", "A2", "A3", "A5", "A+"],
];

/// Two numbers around a multiplication-like token, e.g. "200x300" in a description.
static TEXT_MEASURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{1,4}[\s×xX*/]{1,3}[0-9]{1,4}").expect("text measure regex"));

/// Exactly five slash-separated segments, each from its allowed set. Segments
/// are trimmed but not case-folded.
pub fn is_valid_composite_code(code: &str) -> bool {
    let parts: Vec<&str> = code.split('/').map(str::trim).collect();
    parts.len() == CODE_SEGMENTS.len()
        && parts.iter().zip(CODE_SEGMENTS.iter()).all(|(part, allowed)| allowed.contains(part))
}

pub fn has_text_measure(text: &str) -> bool {
    TEXT_MEASURE_RE.is_match(text)
}

/// Rule columns found by header name. `None` disables the rules that need it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleColumns {
    pub composite_code: Option<Col>,
    pub length: Option<Col>,
    pub width: Option<Col>,
    pub height: Option<Col>,
    pub description: Option<Col>,
    pub net_weight: Option<Col>,
    pub gross_weight: Option<Col>,
}

impl RuleColumns {
    pub fn locate(sheet: &Sheet, config: &CompletenessConfig) -> Self {
        let find = |name: &str| find_header(sheet, config.header_row, name);
        let headers = &config.headers;
        Self {
            composite_code: find(&headers.composite_code),
            length: find(&headers.length),
            width: find(&headers.width),
            height: find(&headers.height),
            description: find(&headers.description),
            net_weight: find(&headers.net_weight),
            gross_weight: find(&headers.gross_weight),
        }
    }
}

/// First column whose trimmed header text equals `name`.
fn find_header(sheet: &Sheet, header_row: u32, name: &str) -> Option<Col> {
    (1..=sheet.cols)
        .filter_map(Col::new)
        .find(|&c| sheet.value(header_row, c).as_text().trim() == name)
}

/// Check the first sheet; returns a one-sheet report workbook.
pub fn check_completeness(
    workbook: &Workbook,
    config: &CheckConfig,
) -> Result<(Workbook, CompletenessReport), CheckError> {
    let source = workbook.first_sheet().ok_or(CheckError::NoWorksheet)?;
    let (sheet, report) = check_sheet(source, &config.completeness);
    info!(
        "completeness: {} rows checked, {} complete, {} incomplete",
        report.rows_checked, report.complete_rows, report.incomplete_rows
    );
    Ok((Workbook::from_sheets(vec![sheet]), report))
}

pub fn check_sheet(source: &Sheet, config: &CompletenessConfig) -> (Sheet, CompletenessReport) {
    let mut sheet = clone_for_report(source, config);
    write_title_blocks(&mut sheet, &config.title_blocks);

    let columns = RuleColumns::locate(source, config);
    debug!("completeness rule columns: {:?}", columns);

    let mut report = CompletenessReport {
        sheet: sheet.name.clone(),
        ..Default::default()
    };

    for row in config.first_data_row..=source.rows {
        if source.row_is_empty(row) {
            continue;
        }
        report.rows_checked += 1;

        let flags = check_row(source, row, &columns, config);
        if flags.is_empty() {
            report.complete_rows += 1;
            for col in (1..=source.cols).filter_map(Col::new) {
                sheet.set_fill(row, col, Paint::Complete.argb());
            }
            continue;
        }

        report.incomplete_rows += 1;
        for (&col, &flag) in &flags {
            match flag {
                QualityFlag::Missing => report.missing_cells += 1,
                QualityFlag::Invalid => report.invalid_cells += 1,
                QualityFlag::Valid => continue,
            }
            sheet.set_fill(row, col, Paint::Invalid.argb());
        }
    }

    (sheet, report)
}

/// Flagged cells of one row; an empty map means the row is complete.
///
/// A cell keeps its first flag, so an empty mandatory cell stays `Missing`
/// even when a later rule also rejects it.
pub fn check_row(
    sheet: &Sheet,
    row: u32,
    columns: &RuleColumns,
    config: &CompletenessConfig,
) -> BTreeMap<Col, QualityFlag> {
    let mut flags = BTreeMap::new();
    let mut flag = |col: Col, quality: QualityFlag| {
        flags.entry(col).or_insert(quality);
    };

    for range in &config.mandatory_ranges {
        for col in range.cols().take_while(|c| c.index() <= sheet.cols) {
            if sheet.value(row, col).is_blank() {
                flag(col, QualityFlag::Missing);
            }
        }
    }

    if let Some(col) = columns.composite_code {
        let code = sheet.value(row, col);
        if !code.is_blank() && !is_valid_composite_code(&code.as_text()) {
            flag(col, QualityFlag::Invalid);
        }
    }

    let dimension_cols = [columns.length, columns.width, columns.height];
    let dimensions = dimension_cols.map(|c| c.and_then(|c| value_number(sheet.value(row, c))));
    let implausible = if dimensions.iter().flatten().any(|&v| v < 0.0) {
        true
    } else {
        let description = columns.description.map(|c| sheet.value(row, c).as_text()).unwrap_or_default();
        dimensions.iter().all(|v| v.is_none_or(|v| v == 0.0)) && !has_text_measure(&description)
    };
    if implausible {
        for col in dimension_cols.into_iter().flatten() {
            flag(col, QualityFlag::Invalid);
        }
    }

    let weight = |c: Option<Col>| c.and_then(|c| value_number(sheet.value(row, c)).map(|v| (c, v)));
    let net = weight(columns.net_weight);
    let gross = weight(columns.gross_weight);
    for (col, value) in [net, gross].into_iter().flatten() {
        if value <= 0.0 {
            flag(col, QualityFlag::Invalid);
        }
    }
    if let (Some((_, net)), Some((gross_col, gross))) = (net, gross) {
        if gross < net {
            flag(gross_col, QualityFlag::Invalid);
        }
    }

    flags
}

fn clone_for_report(source: &Sheet, config: &CompletenessConfig) -> Sheet {
    let mut sheet = Sheet::new(config.report_sheet.clone());
    for (at, cell) in source.cells_iter() {
        if at.row <= config.header_row {
            sheet.set_format(at.row, at.col, cell.format.clone());
        }
        if !cell.value.is_blank() {
            sheet.set_value(at.row, at.col, cell.value.clone());
        }
    }
    for region in source.merged_regions.iter().filter(|m| m.first_row <= config.header_row) {
        if let Err(msg) = sheet.add_merge(*region) {
            debug!("report header merge dropped: {}", msg);
        }
    }
    for (col, width) in source.col_widths() {
        sheet.set_col_width(col, width);
    }
    sheet
}

/// Replace whatever is merged under each block and write its centred title.
fn write_title_blocks(sheet: &mut Sheet, blocks: &[TitleBlock]) {
    for block in blocks {
        let Some(region) = MergedRegion::parse(&block.range) else {
            warn!("title block range '{}' is not a cell range, skipped", block.range);
            continue;
        };
        sheet.remove_merges_in(&region);
        if !region.is_single_cell() {
            if let Err(msg) = sheet.add_merge(region) {
                debug!("title block {} not merged: {}", region, msg);
            }
        }
        let origin = region.origin();
        sheet.set_value(origin.row, origin.col, block.text.as_str());
        let format = sheet.format_mut(origin.row, origin.col);
        format.alignment = Alignment::Center;
        format.vertical_alignment = VerticalAlignment::Middle;
        format.wrap = true;
    }
}
