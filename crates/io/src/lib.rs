//! `partcheck-io`: xlsx codec for the grid model.
//!
//! [`xlsx::load`] reads values with calamine and formatting straight from the
//! archive; [`xlsx::serialize`] writes through rust_xlsxwriter.

pub mod error;
pub mod xlsx;
mod xlsx_styles;

pub use error::IoError;
pub use xlsx::{load, load_path, save_path, serialize};
