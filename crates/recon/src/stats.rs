//! Aggregate counts recovered from painted output. Works on anything the
//! engines wrote, including a workbook reloaded from disk.

use std::collections::BTreeMap;

use partcheck_grid::{Col, Sheet, Workbook};
use serde::Serialize;

use crate::config::CheckConfig;
use crate::paint::Paint;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SheetStats {
    pub sheet: String,
    pub rows: usize,
    pub ok_rows: usize,
    pub deviation_rows: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub reference_missing: usize,
    pub ok_percent: f64,
    pub deviation_percent: f64,
    pub match_percent: f64,
    pub mismatch_percent: f64,
    pub reference_missing_percent: f64,
}

impl SheetStats {
    fn add(&mut self, other: &SheetStats) {
        self.rows += other.rows;
        self.ok_rows += other.ok_rows;
        self.deviation_rows += other.deviation_rows;
        self.matches += other.matches;
        self.mismatches += other.mismatches;
        self.reference_missing += other.reference_missing;
    }

    fn finish(mut self) -> Self {
        let cells = self.matches + self.mismatches + self.reference_missing;
        self.ok_percent = percent(self.ok_rows, self.rows);
        self.deviation_percent = percent(self.deviation_rows, self.rows);
        self.match_percent = percent(self.matches, cells);
        self.mismatch_percent = percent(self.mismatches, cells);
        self.reference_missing_percent = percent(self.reference_missing, cells);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconStats {
    pub sheets: Vec<SheetStats>,
    pub total: SheetStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletenessStats {
    pub rows: usize,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
    pub flagged_cells: usize,
    pub complete_percent: f64,
    pub incomplete_percent: f64,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn paint_at(sheet: &Sheet, row: u32, col: Col) -> Option<Paint> {
    sheet.format(row, col).and_then(|f| f.fill).and_then(Paint::from_argb)
}

/// Companion and status columns are found by their label text in the label row.
pub fn reconciliation_stats(workbook: &Workbook, config: &CheckConfig) -> ReconStats {
    let mut total = SheetStats {
        sheet: "total".into(),
        ..Default::default()
    };
    let sheets: Vec<SheetStats> = workbook
        .sheets()
        .iter()
        .map(|sheet| {
            let stats = sheet_stats(sheet, config);
            total.add(&stats);
            stats
        })
        .collect();
    ReconStats {
        sheets,
        total: total.finish(),
    }
}

fn sheet_stats(sheet: &Sheet, config: &CheckConfig) -> SheetStats {
    let layout = &config.layout;
    let labelled = |text: &str| -> Vec<Col> {
        (1..=sheet.cols)
            .filter_map(Col::new)
            .filter(|&c| sheet.value(layout.label_row, c).as_text().trim() == text)
            .collect()
    };
    let companions = labelled(&layout.reference_label);
    let status = labelled(&layout.status_label).last().copied();

    let mut stats = SheetStats {
        sheet: sheet.name.clone(),
        ..Default::default()
    };
    for row in layout.label_row + 1..=sheet.rows {
        for &col in &companions {
            match paint_at(sheet, row, col) {
                Some(Paint::Match) => stats.matches += 1,
                Some(Paint::Mismatch) => stats.mismatches += 1,
                Some(Paint::ReferenceMissing) => stats.reference_missing += 1,
                _ => {}
            }
        }
        match status.and_then(|c| paint_at(sheet, row, c)) {
            Some(Paint::StatusOk) => {
                stats.rows += 1;
                stats.ok_rows += 1;
            }
            Some(Paint::StatusDeviation) => {
                stats.rows += 1;
                stats.deviation_rows += 1;
            }
            _ => {}
        }
    }
    stats.finish()
}

/// A row painted `Complete` anywhere is complete; a row with `Invalid`
/// cells only is incomplete. Unpainted rows are not counted.
pub fn completeness_stats(sheet: &Sheet, first_data_row: u32) -> CompletenessStats {
    // row -> (complete, flagged cells)
    let mut rows: BTreeMap<u32, (bool, usize)> = BTreeMap::new();
    for (at, cell) in sheet.cells_iter() {
        if at.row < first_data_row {
            continue;
        }
        match cell.format.fill.and_then(Paint::from_argb) {
            Some(Paint::Complete) => rows.entry(at.row).or_default().0 = true,
            Some(Paint::Invalid) => rows.entry(at.row).or_default().1 += 1,
            _ => {}
        }
    }

    let mut stats = CompletenessStats {
        rows: rows.len(),
        ..Default::default()
    };
    for (complete, flagged) in rows.into_values() {
        if complete && flagged == 0 {
            stats.complete_rows += 1;
        } else {
            stats.incomplete_rows += 1;
            stats.flagged_cells += flagged;
        }
    }
    stats.complete_percent = percent(stats.complete_rows, stats.rows);
    stats.incomplete_percent = percent(stats.incomplete_rows, stats.rows);
    stats
}
