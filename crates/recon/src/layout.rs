//! Side-by-side layout: one companion column right of every paired field,
//! a label row under the headers, and a trailing status column.
//!
//! Positions are planned once from the untouched sheet ([`plan_layout`]) and
//! only then applied ([`apply_layout`]); nothing reads coordinates across the
//! structural edit without going through the plan.

use log::debug;
use partcheck_grid::{Alignment, Col, MergedRegion, Sheet, VerticalAlignment};

use crate::config::{FieldColumn, LayoutConfig};
use crate::model::{ColumnPair, ColumnRemap, FieldKind};
use crate::paint::Paint;

#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Pairs in column order.
    pub pairs: Vec<ColumnPair>,
    /// Every other original column up to the sheet's last column.
    pub remap: ColumnRemap,
    /// Fields whose column is past the sheet's last column.
    pub skipped: Vec<FieldKind>,
}

impl Layout {
    /// Column an original column ends up in after [`apply_layout`].
    pub fn new_position(&self, original: Col) -> Option<Col> {
        self.pairs
            .iter()
            .find(|p| p.original == original)
            .map(|p| p.source)
            .or_else(|| self.remap.get(original))
    }
}

/// Compute pair positions and the remap for a sheet with `last_col` columns.
pub fn plan_layout(fields: &[FieldColumn], last_col: u32) -> Layout {
    let mut sorted = fields.to_vec();
    sorted.sort_by_key(|f| f.column);
    let (present, skipped): (Vec<FieldColumn>, Vec<FieldColumn>) =
        sorted.into_iter().partition(|f| f.column.index() <= last_col);

    // Each earlier pair has already pushed this one right by one column
    let pairs = present
        .iter()
        .enumerate()
        .map(|(inserted, f)| {
            let source = f.column.offset(inserted as u32);
            ColumnPair {
                kind: f.kind,
                original: f.column,
                source,
                reference: source.offset(1),
            }
        })
        .collect();

    let mut remap = ColumnRemap::default();
    for col in (1..=last_col).filter_map(Col::new) {
        if present.iter().any(|f| f.column == col) {
            continue;
        }
        let shift = present.iter().filter(|f| f.column < col).count() as u32;
        remap.insert(col, col.offset(shift));
    }

    Layout {
        pairs,
        remap,
        skipped: skipped.into_iter().map(|f| f.kind).collect(),
    }
}

/// Apply a plan to the sheet it was computed from. Returns the status column.
pub fn apply_layout(sheet: &mut Sheet, layout: &Layout, config: &LayoutConfig) -> Col {
    // Right to left so every original position is still valid when used
    for pair in layout.pairs.iter().rev() {
        sheet.insert_cols(pair.original.offset(1), 1);
    }

    sheet.insert_rows(config.label_row, 1);

    let header_rows = config.header_rows();
    for pair in &layout.pairs {
        // Formatting of every row above the labels, values of the two header rows
        for row in 1..config.label_row {
            if let Some(format) = sheet.format(row, pair.source).cloned() {
                sheet.set_format(row, pair.reference, format);
            }
        }
        for row in header_rows {
            let value = sheet.value(row, pair.source).clone();
            sheet.set_value(row, pair.reference, value);
        }
        if let Some(width) = sheet.col_width(pair.source) {
            sheet.set_col_width(pair.reference, width);
        }

        write_label(sheet, config.label_row, pair.source, &config.source_label, Paint::SourceLabel);
        write_label(sheet, config.label_row, pair.reference, &config.reference_label, Paint::ReferenceLabel);
    }

    for pair in &layout.pairs {
        for row in header_rows {
            merge_pair_header(sheet, row, pair.source, pair.reference);
        }
    }

    let status = sheet.append_col();
    let [code_row, name_row] = header_rows;
    for (row, text) in [(code_row, &config.status_code), (name_row, &config.status_title)] {
        sheet.set_value(row, status, text.as_str());
        let format = sheet.format_mut(row, status);
        format.alignment = Alignment::Center;
        format.vertical_alignment = VerticalAlignment::Middle;
        format.wrap = true;
    }
    write_label(sheet, config.label_row, status, &config.status_label, Paint::SourceLabel);

    sheet.set_autofilter(MergedRegion::new(config.label_row, Col::MIN, config.label_row, status));

    debug!(
        "sheet '{}': {} pairs inserted, status column {}",
        sheet.name,
        layout.pairs.len(),
        status
    );
    status
}

/// Span one header cell across source and reference. A merge confined to the
/// source column (e.g. a vertical C2:C3) is widened instead.
fn merge_pair_header(sheet: &mut Sheet, row: u32, source: Col, reference: Col) {
    let region = match sheet.merge_at(row, source).copied() {
        Some(existing) if existing.first_col == source && existing.last_col == source => {
            sheet.remove_merges_in(&existing);
            let widened = MergedRegion::new(existing.first_row, source, existing.last_row, reference);
            if let Err(msg) = sheet.add_merge(widened) {
                debug!("sheet '{}': header merge {} not widened: {}", sheet.name, existing, msg);
                let _ = sheet.add_merge(existing);
            }
            return;
        }
        // Already spans the pair, e.g. widened for the row above
        Some(existing) if existing.contains(row, reference) => return,
        _ => MergedRegion::new(row, source, row, reference),
    };
    if let Err(msg) = sheet.add_merge(region) {
        debug!("sheet '{}': pair header not merged: {}", sheet.name, msg);
    }
}

fn write_label(sheet: &mut Sheet, row: u32, col: Col, text: &str, paint: Paint) {
    sheet.set_value(row, col, text);
    let format = sheet.format_mut(row, col);
    format.bold = true;
    format.fill = Some(paint.argb());
    format.alignment = Alignment::Center;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckConfig;
    use proptest::prelude::*;

    fn col(letters: &str) -> Col {
        Col::from_letters(letters).unwrap()
    }

    fn default_fields() -> Vec<FieldColumn> {
        CheckConfig::default().layout.fields
    }

    #[test]
    fn pairs_accumulate_offsets() {
        let layout = plan_layout(&default_fields(), 28);
        let positions: Vec<(String, String)> = layout
            .pairs
            .iter()
            .map(|p| (p.source.letters(), p.reference.letters()))
            .collect();
        let expected = [
            ("C", "D"),
            ("F", "G"),
            ("P", "Q"),
            ("S", "T"),
            ("W", "X"),
            ("Z", "AA"),
            ("AB", "AC"),
            ("AD", "AE"),
        ];
        let expected: Vec<(String, String)> =
            expected.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect();
        assert_eq!(positions, expected);
        assert!(layout.skipped.is_empty());
    }

    #[test]
    fn remap_shifts_unpaired_columns() {
        let layout = plan_layout(&default_fields(), 28);
        assert_eq!(layout.remap.get(col("A")), Some(col("A")));
        assert_eq!(layout.remap.get(col("D")), Some(col("E")));
        assert_eq!(layout.remap.get(col("X")), Some(col("AF")));
        assert_eq!(layout.remap.get(col("Z")), Some(col("AH")));
        assert_eq!(layout.remap.get(col("AB")), Some(col("AJ")));
        // Paired columns are not remapped, only positioned
        assert_eq!(layout.remap.get(col("E")), None);
        assert_eq!(layout.new_position(col("E")), Some(col("F")));
        assert_eq!(layout.remap.len(), 28 - 8);
    }

    #[test]
    fn short_sheet_skips_missing_fields() {
        let layout = plan_layout(&default_fields(), 19);
        let kinds: Vec<FieldKind> = layout.pairs.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![FieldKind::Title, FieldKind::Identifier, FieldKind::CompositeCode, FieldKind::Material, FieldKind::Weight]
        );
        assert_eq!(layout.skipped, vec![FieldKind::Length, FieldKind::Width, FieldKind::Height]);
    }

    #[test]
    fn unsorted_fields_are_planned_in_column_order() {
        let mut fields = default_fields();
        fields.reverse();
        let reversed = plan_layout(&fields, 28);
        let sorted = plan_layout(&default_fields(), 28);
        assert_eq!(reversed.pairs, sorted.pairs);
    }

    #[test]
    fn vertical_header_merge_is_widened_to_the_pair() {
        let config = CheckConfig::default().layout;
        let mut sheet = header_sheet();
        sheet.add_merge(MergedRegion::parse("C2:C3").unwrap()).unwrap();
        let layout = plan_layout(&config.fields, sheet.cols);
        apply_layout(&mut sheet, &layout, &config);

        let title = sheet.merge_at(2, col("C")).copied();
        assert_eq!(title, Some(MergedRegion::parse("C2:D3").unwrap()));
        assert_eq!(sheet.merge_at(3, col("D")).copied(), title);
        assert!(!sheet.merged_regions.contains(&MergedRegion::parse("C2:C3").unwrap()));
        // Other pairs still get one merge per header row
        assert!(sheet.merged_regions.contains(&MergedRegion::parse("F2:G2").unwrap()));
        assert!(sheet.merged_regions.contains(&MergedRegion::parse("F3:G3").unwrap()));
    }

    fn header_sheet() -> Sheet {
        let mut sheet = Sheet::new("Daten");
        for c in 1..=26 {
            let col = Col::new(c).unwrap();
            sheet.set_value(2, col, format!("T{c}"));
            sheet.set_value(3, col, format!("Name {c}"));
            sheet.set_value(4, col, format!("r4c{c}"));
        }
        sheet.format_mut(3, col("S")).bold = true;
        sheet.format_mut(1, col("S")).fill = Some(0xFF123456);
        sheet.set_col_width(col("S"), 14.0);
        sheet.set_value(1, col("B"), "Titel");
        sheet.add_merge(MergedRegion::parse("B1:X1").unwrap()).unwrap();
        sheet
    }

    #[test]
    fn apply_inserts_pairs_labels_and_status() {
        let config = CheckConfig::default().layout;
        let mut sheet = header_sheet();
        let layout = plan_layout(&config.fields, sheet.cols);
        let status = apply_layout(&mut sheet, &layout, &config);

        // 26 original + 8 companions + status
        assert_eq!(status, col("AI"));
        assert_eq!(sheet.cols, 35);

        // Weight (original S) lands on W/X, header copied and merged
        let weight = layout.pairs.iter().find(|p| p.kind == FieldKind::Weight).unwrap();
        assert_eq!((weight.source, weight.reference), (col("W"), col("X")));
        assert_eq!(sheet.value(2, col("X")).as_text(), "T19");
        assert_eq!(sheet.value(3, col("X")).as_text(), "Name 19");
        assert!(sheet.format(3, col("X")).unwrap().bold);
        assert_eq!(sheet.format(1, col("X")).unwrap().fill, Some(0xFF123456));
        assert_eq!(sheet.col_width(col("X")), Some(14.0));
        assert!(sheet.merged_regions.contains(&MergedRegion::parse("W2:X2").unwrap()));
        assert!(sheet.merged_regions.contains(&MergedRegion::parse("W3:X3").unwrap()));

        // Labels in the inserted row; old row 4 moved to 5
        assert_eq!(sheet.value(4, col("W")).as_text(), "DB-Wert");
        assert_eq!(sheet.value(4, col("X")).as_text(), "Web-Wert");
        assert_eq!(sheet.format(4, col("X")).unwrap().fill, Some(Paint::ReferenceLabel.argb()));
        assert_eq!(sheet.value(5, col("W")).as_text(), "r4c19");
        assert_eq!(sheet.value(5, col("X")).as_text(), "");

        // Unpaired Z moved to AH
        assert_eq!(sheet.value(5, col("AH")).as_text(), "r4c26");

        // Status column
        assert_eq!(sheet.value(2, status).as_text(), "AMP");
        assert_eq!(sheet.value(3, status).as_text(), "Ampelbewertung");
        assert_eq!(sheet.value(4, status).as_text(), "Status");
        assert!(sheet.format(3, status).unwrap().wrap);

        // Every companion is inserted inside B..X, so the title merge widens by eight
        assert!(sheet.merged_regions.contains(&MergedRegion::parse("B1:AF1").unwrap()));
        assert_eq!(sheet.autofilter, Some(MergedRegion::new(4, Col::MIN, 4, status)));
    }

    proptest! {
        #[test]
        fn remap_is_strictly_increasing(
            columns in proptest::collection::btree_set(1u32..60, 0..12),
            last_col in 1u32..80,
        ) {
            let fields: Vec<FieldColumn> = columns
                .iter()
                .map(|&c| FieldColumn { kind: FieldKind::Title, column: Col::new(c).unwrap() })
                .collect();
            let layout = plan_layout(&fields, last_col);
            prop_assert!(layout.remap.is_strictly_increasing());

            // Every present field appears once with adjacent columns, and no
            // remapped column lands on a pair slot
            let present = columns.iter().filter(|&&c| c <= last_col).count();
            prop_assert_eq!(layout.pairs.len(), present);
            for pair in &layout.pairs {
                prop_assert_eq!(pair.reference.index(), pair.source.index() + 1);
                prop_assert!(layout.remap.iter().all(|(_, new)| new != pair.source && new != pair.reference));
            }
        }
    }
}
