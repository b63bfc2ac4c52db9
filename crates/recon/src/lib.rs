//! `partcheck-recon`: master-data reconciliation and completeness engine.
//!
//! Pure engine crate: receives loaded workbooks and a lookup, returns the
//! annotated workbook and a summary. No CLI or file-format dependencies.

pub mod compare;
pub mod completeness;
pub mod config;
pub mod error;
pub mod layout;
pub mod lookup;
pub mod model;
pub mod normalize;
pub mod paint;
pub mod reconcile;
pub mod stats;

pub use completeness::check_completeness;
pub use config::CheckConfig;
pub use error::{CheckError, LookupError};
pub use lookup::{lookup_many, ProductLookup, StaticLookup};
pub use model::{CompletenessReport, FieldKind, ReconReport, ReferenceRecord};
pub use paint::Paint;
pub use reconcile::reconcile_workbook;
pub use stats::{completeness_stats, reconciliation_stats};
