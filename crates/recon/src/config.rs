use std::collections::HashSet;
use std::path::Path;

use partcheck_grid::{Col, MergedRegion};
use serde::{Deserialize, Serialize};

use crate::compare::CompareSettings;
use crate::error::CheckError;
use crate::model::FieldKind;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the engines read. Passed explicitly to every entry point;
/// every field has a default so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    pub lookup: LookupConfig,
    pub compare: CompareConfig,
    pub layout: LayoutConfig,
    pub completeness: CompletenessConfig,
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Upper bound on lookups in flight.
    pub concurrency: usize,
    /// Only identifiers starting with this prefix are looked up.
    pub identifier_prefix: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            identifier_prefix: "A2V".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Compare
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub weight_tolerance_percent: f64,
    /// Fields whose mismatch turns the row status into a deviation.
    pub required_fields: Vec<FieldKind>,
    /// Count "reference present, source empty" in a required field as a deviation.
    pub source_missing_is_deviation: bool,
    /// Write the verdict text into the status cell; `false` paints only.
    pub status_text: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            weight_tolerance_percent: 0.0,
            required_fields: vec![
                FieldKind::Identifier,
                FieldKind::CompositeCode,
                FieldKind::Weight,
                FieldKind::Length,
                FieldKind::Width,
                FieldKind::Height,
            ],
            source_missing_is_deviation: false,
            status_text: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldColumn {
    pub kind: FieldKind,
    pub column: Col,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Column holding the row identifier, before any insertion.
    pub identifier_column: Col,
    pub fields: Vec<FieldColumn>,
    /// Row inserted for the source/reference labels. The two rows above it
    /// are the code and name header rows.
    pub label_row: u32,
    pub source_label: String,
    pub reference_label: String,
    pub status_label: String,
    pub status_code: String,
    pub status_title: String,
    pub ok_text: String,
    pub deviation_text: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let field = |kind, letters| FieldColumn {
            kind,
            column: Col::from_letters(letters).unwrap_or(Col::MIN),
        };
        Self {
            identifier_column: Col::from_letters("Z").unwrap_or(Col::MIN),
            fields: vec![
                field(FieldKind::Title, "C"),
                field(FieldKind::Identifier, "E"),
                field(FieldKind::CompositeCode, "N"),
                field(FieldKind::Material, "P"),
                field(FieldKind::Weight, "S"),
                field(FieldKind::Length, "U"),
                field(FieldKind::Width, "V"),
                field(FieldKind::Height, "W"),
            ],
            label_row: 4,
            source_label: "DB-Wert".into(),
            reference_label: "Web-Wert".into(),
            status_label: "Status".into(),
            status_code: "AMP".into(),
            status_title: "Ampelbewertung".into(),
            ok_text: "OK".into(),
            deviation_text: "Abweichung".into(),
        }
    }
}

impl LayoutConfig {
    /// Rows copied to companion columns and merged per pair.
    pub fn header_rows(&self) -> [u32; 2] {
        [self.label_row - 2, self.label_row - 1]
    }
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

/// Inclusive column range written as "B:J" (or "N" for one column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnRange {
    pub first: Col,
    pub last: Col,
}

impl ColumnRange {
    pub fn cols(&self) -> impl Iterator<Item = Col> {
        (self.first.index()..=self.last.index()).filter_map(Col::new)
    }
}

impl TryFrom<String> for ColumnRange {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let (first, last) = s.split_once(':').unwrap_or((s.as_str(), s.as_str()));
        let parse = |letters: &str| {
            Col::from_letters(letters).ok_or_else(|| format!("invalid column letters in range '{s}'"))
        };
        Ok(ColumnRange {
            first: parse(first)?,
            last: parse(last)?,
        })
    }
}

impl From<ColumnRange> for String {
    fn from(range: ColumnRange) -> String {
        format!("{}:{}", range.first, range.last)
    }
}

/// Header names (exact, trimmed) that locate the rule columns in the header row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderNames {
    pub composite_code: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub description: String,
    pub net_weight: String,
    pub gross_weight: String,
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self {
            composite_code: "Fert./Prüfhinweis".into(),
            length: "Länge".into(),
            width: "Breite".into(),
            height: "Höhe".into(),
            description: "Materialkurztext".into(),
            net_weight: "Nettogewicht".into(),
            gross_weight: "Bruttogewicht".into(),
        }
    }
}

/// Merged title cell written into the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleBlock {
    /// A1-style range ("B1:X1") or single cell ("Y1").
    pub range: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessConfig {
    pub header_row: u32,
    pub first_data_row: u32,
    pub mandatory_ranges: Vec<ColumnRange>,
    pub headers: HeaderNames,
    pub report_sheet: String,
    pub title_blocks: Vec<TitleBlock>,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        let range = |s: &str| ColumnRange::try_from(s.to_string()).ok();
        let title = |range: &str, text: &str| TitleBlock {
            range: range.into(),
            text: text.into(),
        };
        Self {
            header_row: 3,
            first_data_row: 4,
            mandatory_ranges: ["B:J", "N:N", "R:W"].into_iter().filter_map(range).collect(),
            headers: HeaderNames::default(),
            report_sheet: "Qualitätsbericht".into(),
            title_blocks: vec![
                title("B1:X1", "DB AG SAP R/3 K MARA Stammdaten Stand 20.Mai 2025"),
                title("Y1", "SAP Klassifizierung aus Okt24"),
                title("Z1:AB1", "Zusatz Herstellerdaten aus Abfragen in 2024"),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CheckConfig {
    pub fn from_toml(input: &str) -> Result<Self, CheckError> {
        let config: CheckConfig = toml::from_str(input).map_err(|e| CheckError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, CheckError> {
        let input =
            std::fs::read_to_string(path).map_err(|e| CheckError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&input)
    }

    pub fn to_toml(&self) -> Result<String, CheckError> {
        toml::to_string_pretty(self).map_err(|e| CheckError::ConfigParse(e.to_string()))
    }

    pub fn compare_settings(&self) -> CompareSettings {
        CompareSettings {
            identifier_prefix: self.lookup.identifier_prefix.clone(),
            weight_tolerance_percent: self.compare.weight_tolerance_percent,
        }
    }

    pub fn validate(&self) -> Result<(), CheckError> {
        let invalid = |msg: String| Err(CheckError::ConfigValidation(msg));

        if self.lookup.concurrency == 0 {
            return invalid("lookup.concurrency must be at least 1".into());
        }

        let tolerance = self.compare.weight_tolerance_percent;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return invalid(format!("compare.weight_tolerance_percent must be >= 0, got {tolerance}"));
        }

        let layout = &self.layout;
        if layout.label_row < 3 {
            return invalid(format!("layout.label_row must be >= 3, got {}", layout.label_row));
        }

        let mut columns = HashSet::new();
        let mut kinds = HashSet::new();
        for field in &layout.fields {
            if !columns.insert(field.column) {
                return invalid(format!("layout.fields: column {} is used twice", field.column));
            }
            if !kinds.insert(field.kind) {
                return invalid(format!("layout.fields: field '{}' is listed twice", field.kind));
            }
        }
        if columns.contains(&layout.identifier_column) {
            return invalid(format!(
                "layout.identifier_column {} is also a paired field column",
                layout.identifier_column
            ));
        }

        let completeness = &self.completeness;
        if completeness.first_data_row <= completeness.header_row {
            return invalid(format!(
                "completeness.first_data_row ({}) must be below header_row ({})",
                completeness.first_data_row, completeness.header_row
            ));
        }
        for range in &completeness.mandatory_ranges {
            if range.first > range.last {
                return invalid(format!("completeness.mandatory_ranges: empty range {}:{}", range.first, range.last));
            }
        }
        for block in &completeness.title_blocks {
            if MergedRegion::parse(&block.range).is_none() {
                return invalid(format!("completeness.title_blocks: invalid range '{}'", block.range));
            }
        }
        if completeness.report_sheet.trim().is_empty() {
            return invalid("completeness.report_sheet must not be empty".into());
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
