use std::collections::BTreeMap;

use partcheck_grid::Col;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Semantic kind of a paired column. Selects the comparison rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Product title / short material text.
    Title,
    /// Manufacturer part number.
    Identifier,
    /// Five-segment inspection code ("Fert./Prüfhinweis").
    CompositeCode,
    Material,
    /// Net weight in kilograms.
    Weight,
    Length,
    Width,
    Height,
}

impl FieldKind {
    /// Dimension-triple member for the L/B/H kinds.
    pub fn axis(self) -> Option<Axis> {
        match self {
            FieldKind::Length => Some(Axis::Length),
            FieldKind::Width => Some(Axis::Width),
            FieldKind::Height => Some(Axis::Height),
            _ => None,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Identifier => write!(f, "identifier"),
            Self::CompositeCode => write!(f, "composite_code"),
            Self::Material => write!(f, "material"),
            Self::Weight => write!(f, "weight"),
            Self::Length => write!(f, "length"),
            Self::Width => write!(f, "width"),
            Self::Height => write!(f, "height"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Length,
    Width,
    Height,
}

// ---------------------------------------------------------------------------
// Reference record
// ---------------------------------------------------------------------------

/// Attributes returned by the product lookup for one identifier.
///
/// "Not found" markers are folded into `None` while deserializing, so nothing
/// downstream compares against sentinel strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(rename = "Produkttitel", alias = "title", default, deserialize_with = "present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        rename = "Weitere Artikelnummer",
        alias = "alternate_part_number",
        default,
        deserialize_with = "present"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_part_number: Option<String>,
    #[serde(
        rename = "Materialklassifizierung",
        alias = "classification",
        default,
        deserialize_with = "present"
    )]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    #[serde(rename = "Werkstoff", alias = "material", default, deserialize_with = "present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(rename = "Gewicht", alias = "weight", default, deserialize_with = "present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(rename = "Abmessung", alias = "dimensions", default, deserialize_with = "present")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
}

impl ReferenceRecord {
    pub fn is_empty(&self) -> bool {
        *self == ReferenceRecord::default()
    }
}

/// `None` for blank text and the lookup's not-found markers.
pub fn present_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("nicht gefunden")
        || trimmed.eq_ignore_ascii_case("not found")
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accepts strings and numbers; anything else is treated as absent.
fn present<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => present_value(&s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// Outcome for one paired field in one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldVerdict {
    Match,
    Mismatch,
    /// No reference value; never a deviation.
    ReferenceMissing,
    /// Reference present, source cell empty.
    SourceMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Ok,
    Deviation,
}

/// Completeness state of one checked cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityFlag {
    Valid,
    /// Mandatory cell is empty.
    Missing,
    /// Value present but fails a rule.
    Invalid,
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// A source column and the injected companion column to its right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnPair {
    pub kind: FieldKind,
    /// Column in the untouched sheet.
    pub original: Col,
    /// Column of the source value after all insertions.
    pub source: Col,
    /// Companion column holding the reference value (`source + 1`).
    pub reference: Col,
}

/// New position of every non-paired original column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnRemap {
    map: BTreeMap<Col, Col>,
}

impl ColumnRemap {
    pub fn insert(&mut self, original: Col, new: Col) {
        self.map.insert(original, new);
    }

    pub fn get(&self, original: Col) -> Option<Col> {
        self.map.get(&original).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// (original, new) in original-column order.
    pub fn iter(&self) -> impl Iterator<Item = (Col, Col)> + '_ {
        self.map.iter().map(|(&o, &n)| (o, n))
    }

    pub fn is_strictly_increasing(&self) -> bool {
        self.map.values().zip(self.map.values().skip(1)).all(|(a, b)| a < b)
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct SheetReport {
    pub sheet: String,
    pub rows: usize,
    pub ok_rows: usize,
    pub deviation_rows: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub reference_missing: usize,
    pub source_missing: usize,
    /// Fields whose column lies beyond the sheet's last column.
    pub skipped_fields: Vec<FieldKind>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconReport {
    /// Identifiers sent to the lookup.
    pub identifiers_requested: usize,
    /// Identifiers that came back with at least one attribute.
    pub identifiers_found: usize,
    pub sheets: Vec<SheetReport>,
}

impl ReconReport {
    pub fn deviation_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.deviation_rows).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CompletenessReport {
    pub sheet: String,
    pub rows_checked: usize,
    pub complete_rows: usize,
    pub incomplete_rows: usize,
    pub missing_cells: usize,
    pub invalid_cells: usize,
}
