//! Column and cell addressing.
//!
//! `Col` is the only place where column numbers and spreadsheet letters are
//! converted; nothing else does character arithmetic on column names.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 1-based column index (A = 1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Col(u32);

impl Col {
    /// Column A.
    pub const MIN: Col = Col(1);

    /// Returns `None` for 0.
    pub fn new(index: u32) -> Option<Col> {
        (index > 0).then_some(Col(index))
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Column `n` places to the right.
    #[inline]
    pub fn offset(self, n: u32) -> Col {
        Col(self.0 + n)
    }

    /// Parse spreadsheet letters ("A", "z", "AB"). Case-insensitive.
    pub fn from_letters(letters: &str) -> Option<Col> {
        let letters = letters.trim();
        if letters.is_empty() || letters.len() > 3 {
            return None;
        }
        let mut n: u32 = 0;
        for ch in letters.chars() {
            if !ch.is_ascii_alphabetic() {
                return None;
            }
            n = n * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        Col::new(n)
    }

    pub fn letters(self) -> String {
        let mut result = String::new();
        let mut n = self.0 - 1;
        loop {
            result.insert(0, (b'A' + (n % 26) as u8) as char);
            if n < 26 {
                break;
            }
            n = n / 26 - 1;
        }
        result
    }
}

impl fmt::Display for Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

impl Serialize for Col {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.letters())
    }
}

impl<'de> Deserialize<'de> for Col {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Col::from_letters(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid column letters: {s:?}")))
    }
}

/// A single cell address, 1-based row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: Col,
}

impl CellRef {
    pub fn new(row: u32, col: Col) -> Self {
        Self { row, col }
    }

    /// Parse an A1-style reference ("B5", "$AB$12").
    pub fn parse(s: &str) -> Option<CellRef> {
        let s = s.trim();
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = s.split_at(split);
        let col = Col::from_letters(letters.trim_matches('$'))?;
        let row: u32 = digits.parse().ok()?;
        (row > 0).then_some(CellRef { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}
