use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::cell::{Cell, CellFormat, CellValue};
use super::cell_id::{CellRef, Col};

static EMPTY: CellValue = CellValue::Empty;

/// A rectangular merged region, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub first_row: u32,
    pub first_col: Col,
    pub last_row: u32,
    pub last_col: Col,
}

impl MergedRegion {
    pub fn new(first_row: u32, first_col: Col, last_row: u32, last_col: Col) -> Self {
        Self {
            first_row: first_row.min(last_row),
            first_col: first_col.min(last_col),
            last_row: first_row.max(last_row),
            last_col: first_col.max(last_col),
        }
    }

    /// Parse "B1:X1". A single reference ("Y1") yields a 1x1 region.
    pub fn parse(range: &str) -> Option<MergedRegion> {
        match range.split_once(':') {
            Some((a, b)) => {
                let a = CellRef::parse(a)?;
                let b = CellRef::parse(b)?;
                Some(MergedRegion::new(a.row, a.col, b.row, b.col))
            }
            None => {
                let a = CellRef::parse(range)?;
                Some(MergedRegion::new(a.row, a.col, a.row, a.col))
            }
        }
    }

    pub fn origin(&self) -> CellRef {
        CellRef::new(self.first_row, self.first_col)
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    pub fn contains(&self, row: u32, col: Col) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    pub fn overlaps(&self, other: &MergedRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

impl fmt::Display for MergedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            CellRef::new(self.first_row, self.first_col),
            CellRef::new(self.last_row, self.last_col)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    cells: HashMap<(u32, u32), Cell>,
    /// Highest row index that has ever been addressed
    pub rows: u32,
    /// Highest column index that has ever been addressed
    pub cols: u32,
    pub merged_regions: Vec<MergedRegion>,
    /// Column widths in Excel character units
    col_widths: HashMap<u32, f64>,
    pub autofilter: Option<MergedRegion>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: HashMap::new(),
            rows: 0,
            cols: 0,
            merged_regions: Vec::new(),
            col_widths: HashMap::new(),
            autofilter: None,
        }
    }

    fn touch(&mut self, row: u32, col: Col) {
        self.rows = self.rows.max(row);
        self.cols = self.cols.max(col.index());
    }

    pub fn get(&self, row: u32, col: Col) -> Option<&Cell> {
        self.cells.get(&(row, col.index()))
    }

    pub fn value(&self, row: u32, col: Col) -> &CellValue {
        self.get(row, col).map(|c| &c.value).unwrap_or(&EMPTY)
    }

    pub fn format(&self, row: u32, col: Col) -> Option<&CellFormat> {
        self.get(row, col).map(|c| &c.format)
    }

    pub fn cell_mut(&mut self, row: u32, col: Col) -> &mut Cell {
        self.touch(row, col);
        self.cells.entry((row, col.index())).or_default()
    }

    pub fn set_value(&mut self, row: u32, col: Col, value: impl Into<CellValue>) {
        self.cell_mut(row, col).value = value.into();
    }

    pub fn set_format(&mut self, row: u32, col: Col, format: CellFormat) {
        self.cell_mut(row, col).format = format;
    }

    pub fn format_mut(&mut self, row: u32, col: Col) -> &mut CellFormat {
        &mut self.cell_mut(row, col).format
    }

    pub fn set_fill(&mut self, row: u32, col: Col, argb: u32) {
        self.format_mut(row, col).fill = Some(argb);
    }

    pub fn clear_cell(&mut self, row: u32, col: Col) {
        self.cells.remove(&(row, col.index()));
    }

    pub fn cells_iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.cells.iter().filter_map(|(&(r, c), cell)| Col::new(c).map(|col| (CellRef::new(r, col), cell)))
    }

    /// No cell in the row carries a value.
    pub fn row_is_empty(&self, row: u32) -> bool {
        (1..=self.cols).all(|c| self.cells.get(&(row, c)).is_none_or(|cell| matches!(cell.value, CellValue::Empty)))
    }

    // =========================================================================
    // Column widths
    // =========================================================================

    pub fn col_width(&self, col: Col) -> Option<f64> {
        self.col_widths.get(&col.index()).copied()
    }

    pub fn set_col_width(&mut self, col: Col, width: f64) {
        self.col_widths.insert(col.index(), width);
    }

    pub fn col_widths(&self) -> impl Iterator<Item = (Col, f64)> + '_ {
        self.col_widths.iter().filter_map(|(&c, &w)| Col::new(c).map(|col| (col, w)))
    }

    // =========================================================================
    // Merges
    // =========================================================================

    /// Add a merged region. Fails if it overlaps an existing merge.
    pub fn add_merge(&mut self, region: MergedRegion) -> Result<(), String> {
        if let Some(existing) = self.merged_regions.iter().find(|m| m.overlaps(&region)) {
            return Err(format!("merge {} overlaps existing merge {}", region, existing));
        }
        self.touch(region.last_row, region.last_col);
        self.merged_regions.push(region);
        Ok(())
    }

    /// Remove every merge that overlaps `region`. Returns how many were removed.
    pub fn remove_merges_in(&mut self, region: &MergedRegion) -> usize {
        let before = self.merged_regions.len();
        self.merged_regions.retain(|m| !m.overlaps(region));
        before - self.merged_regions.len()
    }

    /// The merge covering a cell, if any.
    pub fn merge_at(&self, row: u32, col: Col) -> Option<&MergedRegion> {
        self.merged_regions.iter().find(|m| m.contains(row, col))
    }

    pub fn set_autofilter(&mut self, range: MergedRegion) {
        self.autofilter = Some(range);
    }

    // =========================================================================
    // Structural edits
    // =========================================================================

    /// Insert columns at `at`, shifting every column >= `at` right by `count`.
    ///
    /// Merges entirely at or right of `at` move; merges straddling `at` widen.
    pub fn insert_cols(&mut self, at: Col, count: u32) {
        if count == 0 {
            return;
        }
        let at = at.index();

        let cells_to_shift: Vec<_> = self
            .cells
            .iter()
            .filter(|((_, c), _)| *c >= at)
            .map(|((r, c), cell)| ((*r, *c), cell.clone()))
            .collect();
        for ((r, c), _) in &cells_to_shift {
            self.cells.remove(&(*r, *c));
        }
        for ((r, c), cell) in cells_to_shift {
            self.cells.insert((r, c + count), cell);
        }

        let widths_to_shift: Vec<_> = self.col_widths.iter().filter(|(c, _)| **c >= at).map(|(c, w)| (*c, *w)).collect();
        for (c, _) in &widths_to_shift {
            self.col_widths.remove(c);
        }
        for (c, w) in widths_to_shift {
            self.col_widths.insert(c + count, w);
        }

        let shift = |region: &mut MergedRegion| {
            if region.first_col.index() >= at {
                region.first_col = region.first_col.offset(count);
                region.last_col = region.last_col.offset(count);
            } else if region.last_col.index() >= at {
                region.last_col = region.last_col.offset(count);
            }
        };
        for region in self.merged_regions.iter_mut() {
            shift(region);
        }
        if let Some(filter) = self.autofilter.as_mut() {
            shift(filter);
        }

        if self.cols >= at {
            self.cols += count;
        }
    }

    /// Insert rows at `at`, shifting every row >= `at` down by `count`.
    pub fn insert_rows(&mut self, at: u32, count: u32) {
        if count == 0 {
            return;
        }

        let cells_to_shift: Vec<_> = self
            .cells
            .iter()
            .filter(|((r, _), _)| *r >= at)
            .map(|((r, c), cell)| ((*r, *c), cell.clone()))
            .collect();
        for ((r, c), _) in &cells_to_shift {
            self.cells.remove(&(*r, *c));
        }
        for ((r, c), cell) in cells_to_shift {
            self.cells.insert((r + count, c), cell);
        }

        let shift = |region: &mut MergedRegion| {
            if region.first_row >= at {
                region.first_row += count;
                region.last_row += count;
            } else if region.last_row >= at {
                region.last_row += count;
            }
        };
        for region in self.merged_regions.iter_mut() {
            shift(region);
        }
        if let Some(filter) = self.autofilter.as_mut() {
            shift(filter);
        }

        if self.rows >= at {
            self.rows += count;
        }
    }

    /// Claim the column right of the current last one.
    pub fn append_col(&mut self) -> Col {
        self.cols += 1;
        Col::new(self.cols).unwrap_or_else(|| unreachable!("cols was just incremented"))
    }
}
