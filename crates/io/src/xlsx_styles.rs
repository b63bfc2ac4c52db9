//! XLSX style parser: extracts formatting from styles.xml and per-cell style IDs,
//! merges and column widths from worksheet XML within the XLSX (ZIP) archive.
//!
//! Everything here is best-effort. A part that is missing or malformed yields
//! empty formatting; values are read separately through calamine.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use partcheck_grid::{Alignment, BorderStyle, Borders, CellFormat, VerticalAlignment};
use zip::ZipArchive;

// =============================================================================
// Public types
// =============================================================================

/// Parsed style table from styles.xml, mapping cellXfs index to CellFormat.
#[derive(Debug, Default)]
pub struct StyleTable {
    pub styles: Vec<CellFormat>,
}

impl StyleTable {
    pub fn get(&self, id: usize) -> Option<&CellFormat> {
        self.styles.get(id)
    }
}

/// Per-sheet formatting extracted from a worksheet XML. Coordinates are 1-based.
#[derive(Debug, Default)]
pub struct SheetFormatting {
    /// (row, col, style_id) triples
    pub cell_styles: Vec<(u32, u32, usize)>,
    /// Column widths in raw Excel character-width units
    pub col_widths: HashMap<u32, f64>,
    /// Merged cell regions: (first_row, first_col, last_row, last_col)
    pub merged_regions: Vec<(u32, u32, u32, u32)>,
    /// `<autoFilter ref>` range, same tuple layout as merges
    pub autofilter: Option<(u32, u32, u32, u32)>,
}

// =============================================================================
// XML entity unescaping
// =============================================================================

/// Unescape the 5 predefined XML entities: &amp; &lt; &gt; &quot; &apos;
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Format codes for the built-in numFmtIds that matter for master data.
fn builtin_number_format(id: u16) -> Option<String> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        14 => "mm-dd-yy",
        22 => "m/d/yy h:mm",
        49 => "@",
        _ => return None,
    };
    Some(code.to_string())
}

// =============================================================================
// Colors
// =============================================================================

/// Standard Excel indexed palette, first 8 entries plus system colours (ARGB).
fn indexed_color(idx: u8) -> Option<u32> {
    let rgb: u32 = match idx {
        0 | 8 | 64 => 0x000000,
        1 | 9 | 65 => 0xFFFFFF,
        2 | 10 => 0xFF0000,
        3 | 11 => 0x00FF00,
        4 | 12 => 0x0000FF,
        5 | 13 => 0xFFFF00,
        6 | 14 => 0xFF00FF,
        7 | 15 => 0x00FFFF,
        22 => 0xC0C0C0,
        23 => 0x808080,
        _ => return None,
    };
    Some(0xFF00_0000 | rgb)
}

/// Flat theme colour defaults (no tint math).
fn theme_color_default(idx: u8) -> Option<u32> {
    let rgb: u32 = match idx {
        0 => 0xFFFFFF,
        1 => 0x000000,
        2 => 0xEEECE1,
        3 => 0x1F497D,
        4 => 0x4F81BD,
        5 => 0xC0504D,
        6 => 0x9BBB59,
        7 => 0x8064A2,
        8 => 0x4BACC6,
        9 => 0xF79646,
        _ => return None,
    };
    Some(0xFF00_0000 | rgb)
}

/// Parse a colour from element attributes. Prefers rgb > indexed > theme.
fn parse_color(e: &BytesStart) -> Option<u32> {
    let mut rgb_val = None;
    let mut indexed_val = None;
    let mut theme_val = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"rgb" => rgb_val = parse_argb_hex(&attr.value),
            b"indexed" => indexed_val = parse_attr::<u8>(&attr.value),
            b"theme" => theme_val = parse_attr::<u8>(&attr.value),
            _ => {}
        }
    }

    rgb_val
        .or_else(|| indexed_val.and_then(indexed_color))
        .or_else(|| theme_val.and_then(theme_color_default))
}

/// Parse AARRGGBB (or RRGGBB, alpha = FF) into an ARGB u32.
fn parse_argb_hex(hex: &[u8]) -> Option<u32> {
    let s = std::str::from_utf8(hex).ok()?.trim_start_matches('#');
    match s.len() {
        8 => u32::from_str_radix(s, 16).ok(),
        6 => u32::from_str_radix(s, 16).ok().map(|rgb| 0xFF00_0000 | rgb),
        _ => None,
    }
}

fn parse_attr<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

fn is_true(value: &[u8]) -> bool {
    value == b"1" || value == b"true"
}

// =============================================================================
// Internal parsed components
// =============================================================================

#[derive(Debug, Clone, Default)]
struct ParsedFont {
    bold: bool,
    italic: bool,
    underline: bool,
    size: Option<f32>,
    color: Option<u32>,
    family: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ParsedFill {
    fg_color: Option<u32>,
}

#[derive(Debug, Default)]
struct XfEntry {
    num_fmt_id: Option<u16>,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    h_align: Option<String>,
    v_align: Option<String>,
    wrap_text: bool,
}

impl XfEntry {
    fn from_element(e: &BytesStart) -> Self {
        let mut xf = XfEntry::default();
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"numFmtId" => xf.num_fmt_id = parse_attr(&attr.value),
                b"fontId" => xf.font_id = parse_attr(&attr.value),
                b"fillId" => xf.fill_id = parse_attr(&attr.value),
                b"borderId" => xf.border_id = parse_attr(&attr.value),
                _ => {}
            }
        }
        xf
    }

    fn read_alignment(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"horizontal" => self.h_align = Some(String::from_utf8_lossy(&attr.value).to_string()),
                b"vertical" => self.v_align = Some(String::from_utf8_lossy(&attr.value).to_string()),
                b"wrapText" => self.wrap_text = is_true(&attr.value),
                _ => {}
            }
        }
    }
}

// =============================================================================
// styles.xml parser
// =============================================================================

/// Parse styles.xml content into a StyleTable.
pub fn parse_styles_xml(xml: &str) -> StyleTable {
    let custom_num_fmts = parse_num_fmts(xml);
    let fonts = parse_fonts(xml);
    let fills = parse_fills(xml);
    let borders = parse_borders(xml);

    let styles = parse_cell_xfs(xml)
        .iter()
        .map(|xf| resolve_xf(xf, &custom_num_fmts, &fonts, &fills, &borders))
        .collect();

    StyleTable { styles }
}

/// Parse <numFmts> section → HashMap<formatId, formatCode>
fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_num_fmts = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"numFmts" => in_num_fmts = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"numFmts" => break,
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_num_fmts && e.name().as_ref() == b"numFmt" =>
            {
                let mut id: Option<u16> = None;
                let mut code: Option<String> = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => id = parse_attr(&attr.value),
                        b"formatCode" => {
                            let raw = String::from_utf8_lossy(&attr.value).to_string();
                            code = Some(unescape_xml(&raw));
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    map.insert(id, code);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    map
}

fn parse_fonts(xml: &str) -> Vec<ParsedFont> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = ParsedFont::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = ParsedFont::default();
                }
                b"color" if depth == 2 => current.color = parse_color(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"b" => current.bold = !e.attributes().flatten().any(|a| a.key.as_ref() == b"val" && !is_true(&a.value)),
                b"i" => current.italic = true,
                b"u" => current.underline = true,
                b"sz" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.size = parse_attr(&attr.value);
                        }
                    }
                }
                b"color" => current.color = parse_color(e),
                b"name" | b"rFont" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.family = Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 1 && e.name().as_ref() == b"font" => {
                fonts.push(ParsedFont::default());
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fonts
}

/// Only solid pattern fills carry a colour; gradients come through as no fill.
fn parse_fills(xml: &str) -> Vec<ParsedFill> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fills>, 2 = inside <fill>
    let mut in_pattern_fill = false;
    let mut solid = false;
    let mut current = ParsedFill::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fills" if depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    current = ParsedFill::default();
                }
                b"patternFill" if depth == 2 => {
                    in_pattern_fill = true;
                    solid = e
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"patternType" && a.value.as_ref() == b"solid");
                }
                b"fgColor" if in_pattern_fill && solid => current.fg_color = parse_color(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"fgColor" && in_pattern_fill && solid {
                    current.fg_color = parse_color(e);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"patternFill" => in_pattern_fill = false,
                b"fill" if depth == 2 => {
                    fills.push(std::mem::take(&mut current));
                    depth = 1;
                    in_pattern_fill = false;
                }
                b"fills" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

fn parse_borders(xml: &str) -> Vec<Borders> {
    let mut borders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <borders>, 2 = inside <border>
    let mut current = Borders::default();

    let side_style = |e: &BytesStart| -> BorderStyle {
        e.attributes()
            .flatten()
            .find(|a| a.key.as_ref() == b"style")
            .map(|a| parse_border_style(&String::from_utf8_lossy(&a.value)))
            .unwrap_or_default()
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) if depth == 1 && e.name().as_ref() == b"border" => {
                borders.push(Borders::default());
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"borders" if depth == 0 => depth = 1,
                b"border" if depth == 1 => {
                    current = Borders::default();
                    depth = 2;
                }
                b"left" if depth == 2 => current.left = side_style(e),
                b"right" if depth == 2 => current.right = side_style(e),
                b"top" if depth == 2 => current.top = side_style(e),
                b"bottom" if depth == 2 => current.bottom = side_style(e),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"border" if depth == 2 => {
                    borders.push(current);
                    depth = 1;
                }
                b"borders" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    borders
}

fn parse_border_style(s: &str) -> BorderStyle {
    match s {
        "thin" | "hair" | "dotted" | "dashed" => BorderStyle::Thin,
        "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => BorderStyle::Medium,
        "thick" | "double" => BorderStyle::Thick,
        _ => BorderStyle::None,
    }
}

/// Parse the <xf> entries of <cellXfs> (not <cellStyleXfs>).
fn parse_cell_xfs(xml: &str) -> Vec<XfEntry> {
    let mut entries = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut current: Option<XfEntry> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => current = Some(XfEntry::from_element(e)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"xf" if in_cell_xfs => entries.push(XfEntry::from_element(e)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"xf" => {
                    if let Some(xf) = current.take() {
                        entries.push(xf);
                    }
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    entries
}

/// Resolve an XfEntry into a CellFormat using the parsed component tables.
fn resolve_xf(
    xf: &XfEntry,
    custom_num_fmts: &HashMap<u16, String>,
    fonts: &[ParsedFont],
    fills: &[ParsedFill],
    borders: &[Borders],
) -> CellFormat {
    let mut format = CellFormat::default();

    if let Some(font) = xf.font_id.and_then(|id| fonts.get(id)) {
        format.bold = font.bold;
        format.italic = font.italic;
        format.underline = font.underline;
        format.font_size = font.size;
        format.font_color = font.color;
        format.font_family = font.family.clone();
    }

    if let Some(fill) = xf.fill_id.and_then(|id| fills.get(id)) {
        format.fill = fill.fg_color;
    }

    if let Some(border) = xf.border_id.and_then(|id| borders.get(id)) {
        format.borders = *border;
    }

    if let Some(num_fmt_id) = xf.num_fmt_id {
        format.number_format = custom_num_fmts
            .get(&num_fmt_id)
            .cloned()
            .or_else(|| builtin_number_format(num_fmt_id));
    }

    if let Some(ref h) = xf.h_align {
        format.alignment = match h.as_str() {
            "left" => Alignment::Left,
            "center" | "centerContinuous" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::General,
        };
    }

    if let Some(ref v) = xf.v_align {
        format.vertical_alignment = match v.as_str() {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Middle,
            _ => VerticalAlignment::Bottom,
        };
    }

    format.wrap = xf.wrap_text;
    format
}

// =============================================================================
// Worksheet XML parser: per-cell style IDs + layout
// =============================================================================

pub fn parse_sheet_formatting(xml: &str) -> SheetFormatting {
    let mut formatting = SheetFormatting::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"c" => {
                    let mut style_id: Option<usize> = None;
                    let mut cell_ref: Option<String> = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"s" => style_id = parse_attr(&attr.value),
                            b"r" => cell_ref = Some(String::from_utf8_lossy(&attr.value).to_string()),
                            _ => {}
                        }
                    }
                    // style 0 is the workbook default
                    if let (Some(style_id), Some(cell_ref)) = (style_id, cell_ref) {
                        if style_id > 0 {
                            if let Some(r) = partcheck_grid::CellRef::parse(&cell_ref) {
                                formatting.cell_styles.push((r.row, r.col.index(), style_id));
                            }
                        }
                    }
                }
                b"col" => {
                    let mut min_col: Option<u32> = None;
                    let mut max_col: Option<u32> = None;
                    let mut width: Option<f64> = None;
                    let mut custom_width = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"min" => min_col = parse_attr(&attr.value),
                            b"max" => max_col = parse_attr(&attr.value),
                            b"width" => width = parse_attr(&attr.value),
                            b"customWidth" => custom_width = is_true(&attr.value),
                            _ => {}
                        }
                    }
                    if custom_width {
                        if let (Some(min), Some(max), Some(w)) = (min_col, max_col, width) {
                            // A trailing <col max="16384"> covers the rest of the sheet; skip it
                            for col in min..=max.min(min + 1024) {
                                formatting.col_widths.insert(col, w);
                            }
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(range) = parse_range_attr(e) {
                        formatting.merged_regions.push(range);
                    }
                }
                b"autoFilter" => formatting.autofilter = parse_range_attr(e),
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    formatting
}

/// Read a `ref="B1:X1"` attribute into (first_row, first_col, last_row, last_col).
fn parse_range_attr(e: &BytesStart) -> Option<(u32, u32, u32, u32)> {
    let attr = e.attributes().flatten().find(|a| a.key.as_ref() == b"ref")?;
    let region = partcheck_grid::MergedRegion::parse(&String::from_utf8_lossy(&attr.value))?;
    Some((region.first_row, region.first_col.index(), region.last_row, region.last_col.index()))
}

// =============================================================================
// Top-level import entry point
// =============================================================================

/// Parse all formatting data from an XLSX archive.
/// `sheet_names` must match the order of sheets in the workbook.
pub fn parse_xlsx_formatting<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_names: &[String],
) -> (StyleTable, Vec<SheetFormatting>) {
    let style_table = read_zip_file(archive, "xl/styles.xml")
        .map(|xml| parse_styles_xml(&xml))
        .unwrap_or_default();

    let workbook_xml = read_zip_file(archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let worksheet_paths = resolve_worksheet_paths(&workbook_xml, &rels_xml, sheet_names);

    let sheet_formats = worksheet_paths
        .iter()
        .map(|path| {
            read_zip_file(archive, path)
                .map(|xml| parse_sheet_formatting(&xml))
                .unwrap_or_default()
        })
        .collect();

    (style_table, sheet_formats)
}

// =============================================================================
// Helpers
// =============================================================================

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Resolve worksheet XML paths for specific sheet names (in order).
fn resolve_worksheet_paths(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<String> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rid = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(unescape_xml(&String::from_utf8_lossy(&attr.value))),
                        b"r:id" => rid = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if let (Some(name), Some(rid)) = (name, rid) {
                    name_to_rid.insert(name, rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => target = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rid_to_target.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    sheet_names
        .iter()
        .map(|name| {
            name_to_rid
                .get(name)
                .and_then(|rid| rid_to_target.get(rid))
                .map(|target| match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                })
                .unwrap_or_default()
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
