// Excel workbook load (values through calamine, formatting through the raw
// archive) and serialize (rust_xlsxwriter).
//
// Only what the master-data workflow needs survives a round trip: typed values,
// fonts, fills, borders, alignment, number formats, merges, column widths and
// the autofilter range. Formulas come in as their cached values.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use log::{debug, warn};
use partcheck_grid::{
    Alignment, BorderStyle, CellFormat, CellValue, Col, MergedRegion, Sheet, VerticalAlignment, Workbook,
};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatUnderline, Workbook as XlsxWorkbook, Worksheet};

use crate::error::IoError;
use crate::xlsx_styles;

/// Excel stores column widths with ~5px of padding on a 7px digit.
const WIDTH_PADDING: f64 = 5.0 / 7.0;

// =============================================================================
// Load
// =============================================================================

/// Load an xlsx workbook from memory.
pub fn load(bytes: &[u8]) -> Result<Workbook, IoError> {
    let mut xlsx: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| IoError::Open(e.to_string()))?;

    let sheet_names: Vec<String> = xlsx.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IoError::NoSheets);
    }

    let mut workbook = Workbook::new();
    for name in &sheet_names {
        let range = xlsx.worksheet_range(name).map_err(|e| IoError::Sheet {
            name: name.clone(),
            message: e.to_string(),
        })?;

        let mut sheet = Sheet::new(name.as_str());

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (row_idx, row) in range.rows().enumerate() {
            let target_row = start_row + row_idx as u32 + 1;
            for (col_idx, data) in row.iter().enumerate() {
                let Some(col) = Col::new(start_col + col_idx as u32 + 1) else {
                    continue;
                };
                let value = convert_data(data);
                if !matches!(value, CellValue::Empty) {
                    sheet.set_value(target_row, col, value);
                }
            }
        }

        debug!("loaded sheet '{}' ({} rows x {} cols)", name, sheet.rows, sheet.cols);
        workbook.add_sheet(sheet);
    }

    import_formatting(bytes, &sheet_names, &mut workbook);
    Ok(workbook)
}

/// Read and load an xlsx file.
pub fn load_path(path: &Path) -> Result<Workbook, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::Open(format!("{}: {}", path.display(), e)))?;
    load(&bytes)
}

fn convert_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::Error(e) => CellValue::Text(format!("#{:?}", e)),
        other => CellValue::from(other.to_string()),
    }
}

/// Apply styles, merges, column widths and the autofilter read from the raw
/// archive. Any failure here leaves the values-only workbook intact.
fn import_formatting(bytes: &[u8], sheet_names: &[String], workbook: &mut Workbook) {
    let mut archive = match zip::ZipArchive::new(Cursor::new(bytes)) {
        Ok(archive) => archive,
        Err(e) => {
            warn!("formatting not imported: {}", e);
            return;
        }
    };

    let (style_table, sheet_formats) = xlsx_styles::parse_xlsx_formatting(&mut archive, sheet_names);

    for (sheet, sheet_fmt) in workbook.sheets_mut().iter_mut().zip(sheet_formats) {
        let mut styled = 0usize;
        for &(row, col, style_id) in &sheet_fmt.cell_styles {
            let (Some(format), Some(col)) = (style_table.get(style_id), Col::new(col)) else {
                continue;
            };
            if format.is_default() {
                continue;
            }
            // Styled-empty cells only matter when they are visible
            let has_value = !matches!(sheet.value(row, col), CellValue::Empty);
            if has_value || format.fill.is_some() || !format.borders.is_none() {
                sheet.set_format(row, col, format.clone());
                styled += 1;
            }
        }

        let mut merges_dropped = 0usize;
        for &(first_row, first_col, last_row, last_col) in &sheet_fmt.merged_regions {
            let (Some(first_col), Some(last_col)) = (Col::new(first_col), Col::new(last_col)) else {
                merges_dropped += 1;
                continue;
            };
            if let Err(msg) = sheet.add_merge(MergedRegion::new(first_row, first_col, last_row, last_col)) {
                debug!("sheet '{}': dropped merge: {}", sheet.name, msg);
                merges_dropped += 1;
            }
        }

        for (&col, &raw_width) in &sheet_fmt.col_widths {
            if let Some(col) = Col::new(col) {
                sheet.set_col_width(col, (raw_width - WIDTH_PADDING).max(0.0));
            }
        }

        if let Some((first_row, first_col, last_row, last_col)) = sheet_fmt.autofilter {
            if let (Some(first_col), Some(last_col)) = (Col::new(first_col), Col::new(last_col)) {
                sheet.set_autofilter(MergedRegion::new(first_row, first_col, last_row, last_col));
            }
        }

        debug!(
            "sheet '{}': {} styled cells, {} merges ({} dropped), {} column widths",
            sheet.name,
            styled,
            sheet.merged_regions.len(),
            merges_dropped,
            sheet_fmt.col_widths.len()
        );
    }
}

// =============================================================================
// Serialize
// =============================================================================

/// Serialize a workbook to xlsx bytes.
pub fn serialize(workbook: &Workbook) -> Result<Vec<u8>, IoError> {
    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx_workbook.add_worksheet();
        worksheet.set_name(&sheet.name).map_err(|e| IoError::Sheet {
            name: sheet.name.clone(),
            message: e.to_string(),
        })?;
        export_sheet(sheet, worksheet).map_err(|message| IoError::Sheet {
            name: sheet.name.clone(),
            message,
        })?;
    }

    xlsx_workbook
        .save_to_buffer()
        .map_err(|e| IoError::Write(e.to_string()))
}

/// Serialize a workbook and write it to `path`.
pub fn save_path(workbook: &Workbook, path: &Path) -> Result<(), IoError> {
    let bytes = serialize(workbook)?;
    std::fs::write(path, bytes).map_err(|e| IoError::Write(format!("{}: {}", path.display(), e)))
}

fn export_sheet(sheet: &Sheet, worksheet: &mut Worksheet) -> Result<(), String> {
    // Merges first: merge_range() writes blanks over the whole range, then the
    // origin cell is overwritten below with its typed value.
    for merge in &sheet.merged_regions {
        if merge.is_single_cell() {
            continue;
        }
        let origin = merge.origin();
        let format = sheet
            .format(origin.row, origin.col)
            .map(build_format)
            .unwrap_or_else(Format::new);
        worksheet
            .merge_range(
                merge.first_row - 1,
                (merge.first_col.index() - 1) as u16,
                merge.last_row - 1,
                (merge.last_col.index() - 1) as u16,
                "",
                &format,
            )
            .map_err(|e| format!("failed to write merge {}: {}", merge, e))?;
    }

    // Skip merge-hidden cells; only the origin carries a value
    for (cell_ref, cell) in sheet.cells_iter() {
        if let Some(merge) = sheet.merge_at(cell_ref.row, cell_ref.col) {
            if !merge.is_single_cell() && merge.origin() != cell_ref {
                continue;
            }
        }

        let row = cell_ref.row - 1;
        let col = (cell_ref.col.index() - 1) as u16;
        let format = build_format(&cell.format);
        let written = match &cell.value {
            CellValue::Empty => {
                if cell.format.is_default() {
                    continue;
                }
                worksheet.write_blank(row, col, &format).map(|_| ())
            }
            CellValue::Text(s) => worksheet.write_string_with_format(row, col, s, &format).map(|_| ()),
            CellValue::Number(n) => worksheet.write_number_with_format(row, col, *n, &format).map(|_| ()),
        };
        written.map_err(|e| format!("failed to write cell {}: {}", cell_ref, e))?;
    }

    for (col, width) in sheet.col_widths() {
        worksheet
            .set_column_width((col.index() - 1) as u16, width)
            .map_err(|e| format!("failed to set column {} width: {}", col, e))?;
    }

    if let Some(range) = &sheet.autofilter {
        worksheet
            .autofilter(
                range.first_row - 1,
                (range.first_col.index() - 1) as u16,
                range.last_row - 1,
                (range.last_col.index() - 1) as u16,
            )
            .map_err(|e| format!("failed to set autofilter: {}", e))?;
    }

    Ok(())
}

/// Map a grid format onto a rust_xlsxwriter format.
pub fn build_format(cell_format: &CellFormat) -> Format {
    let mut format = Format::new();

    if cell_format.bold {
        format = format.set_bold();
    }
    if cell_format.italic {
        format = format.set_italic();
    }
    if cell_format.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if let Some(size) = cell_format.font_size {
        format = format.set_font_size(size as f64);
    }
    if let Some(argb) = cell_format.font_color {
        format = format.set_font_color(Color::RGB(argb & 0x00FF_FFFF));
    }
    if let Some(ref family) = cell_format.font_family {
        format = format.set_font_name(family);
    }

    format = match cell_format.alignment {
        Alignment::General => format,
        Alignment::Left => format.set_align(FormatAlign::Left),
        Alignment::Center => format.set_align(FormatAlign::Center),
        Alignment::Right => format.set_align(FormatAlign::Right),
    };

    // Bottom is the Excel default
    format = match cell_format.vertical_alignment {
        VerticalAlignment::Top => format.set_align(FormatAlign::Top),
        VerticalAlignment::Middle => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlignment::Bottom => format,
    };

    if cell_format.wrap {
        format = format.set_text_wrap();
    }

    // rust_xlsxwriter takes RGB; alpha is dropped
    if let Some(argb) = cell_format.fill {
        format = format.set_background_color(Color::RGB(argb & 0x00FF_FFFF));
    }

    let borders = &cell_format.borders;
    if borders.top != BorderStyle::None {
        format = format.set_border_top(border_style_to_xlsx(borders.top));
    }
    if borders.right != BorderStyle::None {
        format = format.set_border_right(border_style_to_xlsx(borders.right));
    }
    if borders.bottom != BorderStyle::None {
        format = format.set_border_bottom(border_style_to_xlsx(borders.bottom));
    }
    if borders.left != BorderStyle::None {
        format = format.set_border_left(border_style_to_xlsx(borders.left));
    }

    if let Some(ref code) = cell_format.number_format {
        format = format.set_num_format(code);
    }

    format
}

fn border_style_to_xlsx(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(letters: &str) -> Col {
        Col::from_letters(letters).unwrap()
    }

    #[test]
    fn test_convert_data() {
        assert_eq!(convert_data(&Data::Empty), CellValue::Empty);
        assert_eq!(convert_data(&Data::String(String::new())), CellValue::Empty);
        assert_eq!(convert_data(&Data::String("A2V1".into())), CellValue::Text("A2V1".into()));
        assert_eq!(convert_data(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(convert_data(&Data::Float(1.5)), CellValue::Number(1.5));
        assert_eq!(convert_data(&Data::Bool(true)), CellValue::Text("TRUE".into()));
    }

    #[test]
    fn test_serialize_basic() {
        let mut sheet = Sheet::new("Daten");
        sheet.set_value(1, col("A"), "Header");
        sheet.set_value(2, col("A"), 42.0);
        let bytes = serialize(&Workbook::from_sheets(vec![sheet])).unwrap();
        // xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_serialize_rejects_invalid_sheet_name() {
        let sheet = Sheet::new("bad[name]");
        let err = serialize(&Workbook::from_sheets(vec![sheet])).unwrap_err();
        assert!(matches!(err, IoError::Sheet { .. }));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let err = load(b"not a zip").unwrap_err();
        assert!(matches!(err, IoError::Open(_)));
    }

    #[test]
    fn test_serialize_with_merges_and_autofilter() {
        let mut sheet = Sheet::new("Daten");
        sheet.set_value(1, col("B"), "Title");
        sheet.set_value(1, col("C"), "hidden");
        sheet.add_merge(MergedRegion::parse("B1:D1").unwrap()).unwrap();
        sheet.set_autofilter(MergedRegion::parse("A4:D4").unwrap());
        sheet.set_col_width(col("B"), 20.0);
        assert!(serialize(&Workbook::from_sheets(vec![sheet])).is_ok());
    }
}
