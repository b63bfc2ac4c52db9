//! Reference lookups: the trait the engine calls, a bounded fan-out over a
//! set of identifiers, and an in-memory implementation.

use std::collections::{BTreeSet, HashMap};

use log::{debug, warn};
use rayon::prelude::*;

use crate::error::LookupError;
use crate::model::ReferenceRecord;

/// External product lookup. `Ok(None)` means the identifier is unknown.
pub trait ProductLookup: Sync {
    fn lookup(&self, id: &str) -> Result<Option<ReferenceRecord>, LookupError>;
}

/// Look up every identifier with at most `concurrency` calls in flight.
///
/// The result has one entry per identifier. Failed or unknown identifiers map
/// to an empty record so every field of those rows reads as reference-missing.
pub fn lookup_many(
    lookup: &dyn ProductLookup,
    ids: &BTreeSet<String>,
    concurrency: usize,
) -> HashMap<String, ReferenceRecord> {
    let fetch = |id: &String| {
        let record = match lookup.lookup(id) {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("lookup: '{}' not found", id);
                ReferenceRecord::default()
            }
            Err(e) => {
                warn!("lookup failed for '{}': {}", id, e);
                ReferenceRecord::default()
            }
        };
        (id.clone(), record)
    };

    if concurrency <= 1 || ids.len() <= 1 {
        return ids.iter().map(fetch).collect();
    }

    match rayon::ThreadPoolBuilder::new().num_threads(concurrency).build() {
        Ok(pool) => pool.install(|| ids.par_iter().map(fetch).collect()),
        Err(e) => {
            warn!("lookup pool unavailable ({}), running sequentially", e);
            ids.iter().map(fetch).collect()
        }
    }
}

/// Fixed set of records keyed by uppercase identifier.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    records: HashMap<String, ReferenceRecord>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, record: ReferenceRecord) {
        self.records.insert(key(id), record);
    }

    /// Parse `{ "<id>": { "Produkttitel": ..., ... }, ... }`.
    pub fn from_json(input: &str) -> Result<Self, LookupError> {
        let parsed: HashMap<String, ReferenceRecord> =
            serde_json::from_str(input).map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(Self {
            records: parsed.into_iter().map(|(id, record)| (key(&id), record)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ProductLookup for StaticLookup {
    fn lookup(&self, id: &str) -> Result<Option<ReferenceRecord>, LookupError> {
        Ok(self.records.get(&key(id)).cloned())
    }
}

fn key(id: &str) -> String {
    id.trim().to_uppercase()
}
