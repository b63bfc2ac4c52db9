//! Serialize → load round trips through a real xlsx archive.

use partcheck_grid::{Alignment, BorderStyle, CellFormat, CellValue, Col, MergedRegion, Sheet, Workbook};
use partcheck_io::{load, load_path, save_path, serialize, IoError};

fn col(letters: &str) -> Col {
    Col::from_letters(letters).unwrap()
}

fn sample_sheet() -> Sheet {
    let mut sheet = Sheet::new("Stammdaten");
    sheet.set_value(1, col("B"), "DB AG SAP R/3 K MARA Stammdaten");
    sheet.add_merge(MergedRegion::parse("B1:D1").unwrap()).unwrap();
    sheet.set_value(3, col("C"), "Materialkurztext");
    sheet.set_value(5, col("C"), "Schraube M8");
    sheet.set_value(5, col("S"), 0.125);
    sheet.set_value(5, col("Z"), "A2V00001234567");
    sheet.set_fill(5, col("S"), 0xFFC6EFCE);
    sheet.set_fill(5, col("T"), 0xFFFFE0B2);
    sheet
}

fn roundtrip(workbook: &Workbook) -> Workbook {
    let bytes = serialize(workbook).expect("serialize");
    load(&bytes).expect("load")
}

#[test]
fn values_survive_roundtrip() {
    let loaded = roundtrip(&Workbook::from_sheets(vec![sample_sheet()]));
    let sheet = loaded.first_sheet().unwrap();

    assert_eq!(sheet.name, "Stammdaten");
    assert_eq!(sheet.value(5, col("C")), &CellValue::Text("Schraube M8".into()));
    assert_eq!(sheet.value(5, col("S")), &CellValue::Number(0.125));
    assert_eq!(sheet.value(5, col("Z")).as_text(), "A2V00001234567");
    assert_eq!(sheet.value(1, col("B")).as_text(), "DB AG SAP R/3 K MARA Stammdaten");
}

#[test]
fn fills_survive_roundtrip_exactly() {
    let loaded = roundtrip(&Workbook::from_sheets(vec![sample_sheet()]));
    let sheet = loaded.first_sheet().unwrap();

    assert_eq!(sheet.format(5, col("S")).and_then(|f| f.fill), Some(0xFFC6EFCE));
    // Blank but painted
    assert_eq!(sheet.format(5, col("T")).and_then(|f| f.fill), Some(0xFFFFE0B2));
    assert_eq!(sheet.value(5, col("T")), &CellValue::Empty);
    // Unpainted cell has no fill
    assert_eq!(sheet.format(5, col("C")).and_then(|f| f.fill), None);
}

#[test]
fn merges_widths_and_autofilter_survive_roundtrip() {
    let mut sheet = sample_sheet();
    sheet.set_col_width(col("C"), 24.0);
    sheet.set_autofilter(MergedRegion::parse("A4:Z4").unwrap());

    let loaded = roundtrip(&Workbook::from_sheets(vec![sheet]));
    let sheet = loaded.first_sheet().unwrap();

    assert_eq!(sheet.merged_regions, vec![MergedRegion::parse("B1:D1").unwrap()]);
    let width = sheet.col_width(col("C")).unwrap();
    assert!((width - 24.0).abs() < 0.5, "width {width}");
    assert_eq!(sheet.autofilter, MergedRegion::parse("A4:Z4"));
}

#[test]
fn formatting_survives_roundtrip() {
    let mut sheet = Sheet::new("Daten");
    sheet.set_value(2, col("AA"), "AMP");
    sheet.set_format(
        2,
        col("AA"),
        CellFormat {
            bold: true,
            alignment: Alignment::Center,
            wrap: true,
            fill: Some(0xFFDDEBF7),
            ..Default::default()
        },
    );
    sheet.set_value(5, col("B"), 12.5);
    sheet.format_mut(5, col("B")).borders.bottom = BorderStyle::Thin;
    sheet.format_mut(5, col("B")).number_format = Some("0.00".to_string());

    let loaded = roundtrip(&Workbook::from_sheets(vec![sheet]));
    let sheet = loaded.first_sheet().unwrap();

    let header = sheet.format(2, col("AA")).unwrap();
    assert!(header.bold);
    assert!(header.wrap);
    assert_eq!(header.alignment, Alignment::Center);
    assert_eq!(header.fill, Some(0xFFDDEBF7));

    let number = sheet.format(5, col("B")).unwrap();
    assert_eq!(number.borders.bottom, BorderStyle::Thin);
    assert_eq!(number.number_format.as_deref(), Some("0.00"));
}

#[test]
fn multiple_sheets_keep_order() {
    let workbook = Workbook::from_sheets(vec![Sheet::new("Erste"), sample_sheet(), Sheet::new("Qualitätsbericht")]);
    let loaded = roundtrip(&workbook);
    assert_eq!(loaded.sheet_names(), vec!["Erste", "Stammdaten", "Qualitätsbericht"]);
}

#[test]
fn save_and_load_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xlsx");

    save_path(&Workbook::from_sheets(vec![sample_sheet()]), &path).unwrap();
    let loaded = load_path(&path).unwrap();
    assert_eq!(loaded.sheet_count(), 1);
}

#[test]
fn load_path_missing_file_is_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_path(&dir.path().join("missing.xlsx")).unwrap_err();
    assert!(matches!(err, IoError::Open(_)));
}
