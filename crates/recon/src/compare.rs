use partcheck_grid::CellValue;

use crate::model::{FieldKind, FieldVerdict, ReferenceRecord};
use crate::normalize::{
    map_classification_to_code, normalize_composite_code, normalize_part_number, normalize_text,
    parse_dimensions, parse_weight, value_measure, value_weight,
};

/// Settings the comparators need from the run configuration.
#[derive(Debug, Clone)]
pub struct CompareSettings {
    pub identifier_prefix: String,
    /// 0 = near-exact.
    pub weight_tolerance_percent: f64,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            identifier_prefix: "A2V".into(),
            weight_tolerance_percent: 0.0,
        }
    }
}

/// Result of one comparator: the value to write into the companion column
/// (`None` = no reference value) and whether it equals the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub reference: Option<CellValue>,
    pub equal: bool,
}

impl Comparison {
    fn missing() -> Self {
        Self { reference: None, equal: false }
    }

    /// Classify against the source cell.
    pub fn verdict(&self, source: &CellValue) -> FieldVerdict {
        match (&self.reference, source.is_blank()) {
            (None, _) => FieldVerdict::ReferenceMissing,
            (Some(_), true) => FieldVerdict::SourceMissing,
            (Some(_), false) if self.equal => FieldVerdict::Match,
            (Some(_), false) => FieldVerdict::Mismatch,
        }
    }
}

/// Run the comparison rule for `kind`.
///
/// `row_id` is the uppercase, trimmed identifier of the row (may be empty).
pub fn compare_field(
    kind: FieldKind,
    source: &CellValue,
    row_id: &str,
    record: &ReferenceRecord,
    settings: &CompareSettings,
) -> Comparison {
    match kind {
        FieldKind::Title => compare_text(source, record.title.as_deref()),
        FieldKind::Material => compare_text(source, record.material.as_deref()),
        FieldKind::Identifier => compare_identifier(source, row_id, record, &settings.identifier_prefix),
        FieldKind::CompositeCode => compare_composite_code(source, record.classification.as_deref()),
        FieldKind::Weight => compare_weight(source, record.weight.as_deref(), settings.weight_tolerance_percent),
        FieldKind::Length | FieldKind::Width | FieldKind::Height => {
            let Some(axis) = kind.axis() else {
                return Comparison::missing();
            };
            let Some(reference) = record.dimensions.as_deref().and_then(|d| parse_dimensions(d).get(axis)) else {
                return Comparison::missing();
            };
            let equal = value_measure(source).is_some_and(|s| near_equal(s, reference, 0.0));
            Comparison { reference: Some(CellValue::Number(reference)), equal }
        }
    }
}

/// Free text: case-folded, whitespace-collapsed equality.
fn compare_text(source: &CellValue, reference: Option<&str>) -> Comparison {
    let Some(reference) = reference else {
        return Comparison::missing();
    };
    Comparison {
        reference: Some(CellValue::from(reference)),
        equal: normalize_text(&source.as_text()) == normalize_text(reference),
    }
}

/// A source that already carries the canonical prefix is its own reference;
/// this wins over any alternate part number the lookup returns.
fn compare_identifier(source: &CellValue, row_id: &str, record: &ReferenceRecord, prefix: &str) -> Comparison {
    let source_text = source.as_text().trim().to_uppercase();

    if !prefix.is_empty() && source_text.starts_with(&prefix.to_uppercase()) {
        let reference = if row_id.is_empty() { source_text } else { row_id.to_string() };
        return Comparison { reference: Some(CellValue::from(reference)), equal: true };
    }

    let reference = match record.alternate_part_number.as_deref() {
        Some(alternate) => alternate.to_string(),
        None if !row_id.is_empty() => row_id.to_string(),
        None => return Comparison::missing(),
    };
    let compared = if source_text.is_empty() { row_id } else { source_text.as_str() };
    Comparison {
        equal: normalize_part_number(compared) == normalize_part_number(&reference),
        reference: Some(CellValue::from(reference)),
    }
}

/// The classification maps onto the first code segment; only that segment
/// of the source code is compared.
fn compare_composite_code(source: &CellValue, classification: Option<&str>) -> Comparison {
    let Some(code) = classification.and_then(map_classification_to_code) else {
        return Comparison::missing();
    };
    let normalized = normalize_composite_code(&source.as_text());
    let first_segment = normalized.split('/').next().unwrap_or_default();
    Comparison {
        reference: Some(CellValue::from(code)),
        equal: first_segment == code,
    }
}

fn compare_weight(source: &CellValue, reference: Option<&str>, tolerance_percent: f64) -> Comparison {
    let Some(reference) = reference.and_then(parse_weight) else {
        return Comparison::missing();
    };
    Comparison {
        reference: Some(CellValue::Number(reference)),
        equal: eq_weight(source, reference, tolerance_percent),
    }
}

/// Weight equality within 1e-9 kg, widened by `tolerance_percent` of the
/// larger magnitude when configured.
pub fn eq_weight(source: &CellValue, reference_kg: f64, tolerance_percent: f64) -> bool {
    value_weight(source).is_some_and(|kg| {
        let relative = reference_kg.abs().max(kg.abs()) * tolerance_percent.max(0.0) / 100.0;
        near_equal(kg, reference_kg, 1e-9 + relative)
    })
}

/// `|a - b| <= tolerance`, forgiving one ulp of representation error.
fn near_equal(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() - tolerance <= f64::EPSILON * a.abs().max(b.abs())
}
