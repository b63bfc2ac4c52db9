//! `partcheck-grid`: addressable sheet model shared by the codec and the engine.
//!
//! Rows and columns are 1-based everywhere. Structural edits (`insert_cols`,
//! `insert_rows`) shift cells, merges and column widths; callers holding
//! coordinates from before an edit must remap them explicitly.

pub mod cell;
pub mod cell_id;
pub mod sheet;
pub mod workbook;

pub use cell::{Alignment, BorderStyle, Borders, Cell, CellFormat, CellValue, VerticalAlignment};
pub use cell_id::{CellRef, Col};
pub use sheet::{MergedRegion, Sheet};
pub use workbook::Workbook;
