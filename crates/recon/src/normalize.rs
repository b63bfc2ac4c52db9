//! Canonical forms for cell text. Every function is total: unparseable input
//! yields `None` (or an empty string), never a panic.

use std::sync::LazyLock;

use partcheck_grid::CellValue;
use regex::Regex;

use crate::model::Axis;

static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d[\d.,]*)\s*(?:(kilogramm|kilograms?|kgs?|mg|gramm|grams?|g|lbs|lb|t)\b)?")
        .expect("weight regex")
});

static MEASURE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(mm|cm|m)?").expect("measure regex"));

const DIMENSION_SEPARATORS: [char; 5] = ['×', 'x', 'X', '*', '/'];

/// Parse a number with decimal point or decimal comma. Whitespace is ignored;
/// when both separators appear the last one is the decimal separator.
pub fn parse_number(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let canonical = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(_), None) => compact.replace(',', "."),
        _ => compact,
    };

    // Rust accepts "inf" and "NaN"; spreadsheets don't
    if !canonical.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
        return None;
    }
    canonical.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric content of a cell: numbers as-is, text through [`parse_number`].
pub fn value_number(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => parse_number(s),
        CellValue::Empty => None,
    }
}

/// Weight in kilograms from free text ("0,125 kg", "125 g", "10"). No unit means kg.
pub fn parse_weight(text: &str) -> Option<f64> {
    let caps = WEIGHT_RE.captures(text)?;
    let magnitude = parse_number(caps.get(1)?.as_str().trim_end_matches(['.', ',']))?;
    let factor = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
        Some("g" | "gram" | "grams" | "gramm") => 0.001,
        Some("mg") => 0.000_001,
        Some("t") => 1000.0,
        Some("lb") | Some("lbs") => 0.453_592_37,
        _ => 1.0,
    };
    Some(magnitude * factor)
}

/// Weight of a source cell: numbers are kilograms, text through [`parse_weight`].
pub fn value_weight(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => parse_weight(s),
        CellValue::Empty => None,
    }
}

/// Length × width × height in millimetres; absent members are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Dimensions {
    pub fn get(&self, axis: Axis) -> Option<f64> {
        match axis {
            Axis::Length => self.length,
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }
}

/// Parse "120x80x60 mm", "12 cm × 8 cm", "120 / 80". The first number is the
/// length, the second the width, the third the height. Members without their
/// own unit take the last unit seen; the default unit is mm.
pub fn parse_dimensions(text: &str) -> Dimensions {
    let mut magnitudes: Vec<(f64, Option<String>)> = Vec::with_capacity(3);
    let mut last_end: Option<usize> = None;

    for caps in MEASURE_RE.captures_iter(text) {
        let Some(number) = caps.get(1) else { continue };
        if let Some(end) = last_end {
            if end > number.start() || !is_dimension_separator(&text[end..number.start()]) {
                // A new number without separator ends the chain
                break;
            }
        }
        let Some(n) = parse_number(number.as_str()) else {
            break;
        };
        // A unit only counts when no other word letter follows ("120mmx80" yes, "12 max" no)
        let unit = caps.get(2).filter(|unit| {
            text[unit.end()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphabetic() || matches!(c, 'x' | 'X'))
        });
        magnitudes.push((n, unit.map(|m| m.as_str().to_ascii_lowercase())));
        last_end = Some(unit.map_or(number.end(), |m| m.end()));
        if magnitudes.len() == 3 {
            break;
        }
    }

    let trailing_unit = magnitudes.iter().rev().find_map(|(_, unit)| unit.clone());
    let mut mm = magnitudes.into_iter().map(|(n, unit)| {
        let factor = match unit.or_else(|| trailing_unit.clone()).as_deref() {
            Some("cm") => 10.0,
            Some("m") => 1000.0,
            _ => 1.0,
        };
        n * factor
    });

    Dimensions {
        length: mm.next(),
        width: mm.next(),
        height: mm.next(),
    }
}

/// A gap like " x ", "x" or " x B " (one axis label, L/B/W/H, after the separator).
fn is_dimension_separator(gap: &str) -> bool {
    let is_separator = |token: &str| token.chars().all(|c| DIMENSION_SEPARATORS.contains(&c));
    let is_label = |token: &str| matches!(token, "L" | "B" | "W" | "H" | "l" | "b" | "w" | "h");

    let tokens: Vec<&str> = gap.split_whitespace().collect();
    match tokens.as_slice() {
        [sep] => sep.chars().count() <= 2 && is_separator(sep),
        [sep, label] => sep.chars().count() <= 2 && is_separator(sep) && is_label(label),
        _ => false,
    }
}

/// Single measurement of a source cell in mm ("120", "12 cm", 120.0).
pub fn value_measure(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
        CellValue::Text(s) => parse_number(s).or_else(|| parse_dimensions(s).length),
        CellValue::Empty => None,
    }
}

/// Uppercase and drop everything that is not a letter or digit.
pub fn normalize_part_number(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Trim and uppercase each slash-separated segment.
pub fn normalize_composite_code(text: &str) -> String {
    text.trim()
        .split('/')
        .map(|segment| segment.trim().to_uppercase())
        .collect::<Vec<_>>()
        .join("/")
}

/// Map a material-classification label onto the first segment of the
/// inspection code (`OHNE`, `1`, `2`, `3`). `None` when no rule matches.
pub fn map_classification_to_code(label: &str) -> Option<&'static str> {
    static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?i)(?:klasse|kl\.|kategorie|kat\.|stufe|class|category)\s*([123])\b")
            .expect("classification regex")
    });

    let lower = label.trim().to_lowercase();
    if lower.contains("ohne") || lower.contains("keine") {
        return Some("OHNE");
    }
    let token = match CLASS_RE.captures(&lower).and_then(|caps| caps.get(1)) {
        Some(digit) => digit.as_str().to_string(),
        // A bare code or a full composite code: its first segment
        None => normalize_composite_code(&lower)
            .split('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    match token.as_str() {
        "1" => Some("1"),
        "2" => Some("2"),
        "3" => Some("3"),
        _ => None,
    }
}

/// Case-fold and collapse runs of whitespace.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
