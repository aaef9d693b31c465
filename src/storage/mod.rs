pub mod cache_dir;
pub mod rocks;

pub use cache_dir::state_dir;
pub use rocks::RocksCacheStore;

use crate::build::{ReferencedObject, Step};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persistent record of which steps and objects have been built
///
/// Records are only ever inserted or replaced; nothing is pruned.
pub trait CacheStore {
    /// True when the step at this index was last built with this exact
    /// definition and every object in `objects` still has its recorded hash.
    /// An empty `objects` list is always a miss.
    fn is_cached(&self, step: &Step, objects: &[ReferencedObject]) -> Result<bool>;

    /// Upsert the step record, then one object record per entry
    fn save(&self, step: &Step, objects: &[ReferencedObject]) -> Result<()>;

    /// Get cache statistics
    fn stats(&self) -> Result<CacheStats>;
}

/// A `(definition, index)` pair that built successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub definition: String,
    pub index: usize,
    pub updated_at: DateTime<Utc>,
}

/// Last known content hash of a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub path: String,
    pub sha: String,
    pub updated_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub step_records: u64,
    pub object_records: u64,
}
