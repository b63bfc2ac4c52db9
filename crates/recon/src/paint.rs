//! Fill colours written by both engines.
//!
//! The colours are part of the output contract: statistics are computed by
//! reading them back, so every variant maps to exactly one ARGB value.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    /// Reference value equals source value.
    Match,
    /// Reference value differs from source value.
    Mismatch,
    /// No reference value for the field.
    ReferenceMissing,
    StatusOk,
    StatusDeviation,
    /// Completeness: whole row passed every rule.
    Complete,
    /// Completeness: this cell failed a rule.
    Invalid,
    SourceLabel,
    ReferenceLabel,
}

impl Paint {
    pub const ALL: [Paint; 9] = [
        Paint::Match,
        Paint::Mismatch,
        Paint::ReferenceMissing,
        Paint::StatusOk,
        Paint::StatusDeviation,
        Paint::Complete,
        Paint::Invalid,
        Paint::SourceLabel,
        Paint::ReferenceLabel,
    ];

    pub const fn argb(self) -> u32 {
        match self {
            Paint::Match => 0xFFC6EFCE,
            Paint::Mismatch => 0xFFFFC7CE,
            Paint::ReferenceMissing => 0xFFFFE0B2,
            Paint::StatusOk => 0xFF92D050,
            Paint::StatusDeviation => 0xFFFF5050,
            Paint::Complete => 0xFFCCFFCC,
            Paint::Invalid => 0xFFFFCCCC,
            Paint::SourceLabel => 0xFFDDEBF7,
            Paint::ReferenceLabel => 0xFFE2EFDA,
        }
    }

    pub fn from_argb(argb: u32) -> Option<Paint> {
        Paint::ALL.into_iter().find(|p| p.argb() == argb)
    }
}
