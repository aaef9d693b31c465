use super::{CacheStats, CacheStore, ObjectRecord, StepRecord};
use crate::build::{ReferencedObject, Step};
use anyhow::{Context, Result};
use chrono::Utc;
use rocksdb::{ColumnFamily, IteratorMode, Options, WriteBatch, DB};
use std::fs;
use std::path::Path;
use tracing::debug;

/// RocksDB column families, one per record kind
///
/// - "steps": big-endian step index -> `StepRecord` (JSON)
/// - "objects": path bytes -> `ObjectRecord` (JSON)
///
/// The key of each family is its uniqueness constraint, and `put` replaces
/// whatever was stored under it.
const CF_STEPS: &str = "steps";
const CF_OBJECTS: &str = "objects";

/// File name of the database inside the state directory
pub const DB_NAME: &str = "snb.db";

/// Cache store backed by an embedded RocksDB database
///
/// Layout:
/// - `<build_root>/.snb/snb.db/` - RocksDB database with the two column families
///
/// The database is opened once per build and used from a single thread.
/// Nothing guards against two processes sharing a state directory.
pub struct RocksCacheStore {
    db: DB,
}

impl RocksCacheStore {
    /// Open (or create) the store inside `state_dir`
    pub fn open<P: AsRef<Path>>(state_dir: P) -> Result<Self> {
        let state_dir = state_dir.as_ref();
        fs::create_dir_all(state_dir).with_context(|| {
            format!("Failed to create state directory: {}", state_dir.display())
        })?;

        let path = state_dir.join(DB_NAME);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        // Small metadata only, no need for background statistics
        opts.set_statistics_level(rocksdb::statistics::StatsLevel::DisableAll);

        let db = DB::open_cf(&opts, &path, [CF_STEPS, CF_OBJECTS])
            .with_context(|| format!("Failed to open cache database: {}", path.display()))?;

        debug!(operation = "open", path = %path.display(), "opened cache store");

        Ok(Self { db })
    }

    /// Record stored for the step at `index`, if any
    pub fn step_record(&self, index: usize) -> Result<Option<StepRecord>> {
        let cf = self.cf(CF_STEPS)?;
        match self
            .db
            .get_cf(cf, step_key(index))
            .context("Failed to read step record")?
        {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Failed to decode step record")?,
            )),
            None => Ok(None),
        }
    }

    /// Record stored for `path`, if any
    pub fn object_record(&self, path: &str) -> Result<Option<ObjectRecord>> {
        let cf = self.cf(CF_OBJECTS)?;
        match self
            .db
            .get_cf(cf, path.as_bytes())
            .context("Failed to read object record")?
        {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Failed to decode object record")?,
            )),
            None => Ok(None),
        }
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .with_context(|| format!("Missing column family: {}", name))
    }

    fn count(&self, name: &str) -> Result<u64> {
        let mut total = 0u64;
        for item in self.db.iterator_cf(self.cf(name)?, IteratorMode::Start) {
            item.with_context(|| format!("Failed to iterate column family: {}", name))?;
            total += 1;
        }
        Ok(total)
    }
}

impl CacheStore for RocksCacheStore {
    fn is_cached(&self, step: &Step, objects: &[ReferencedObject]) -> Result<bool> {
        // Nothing to invalidate on, never reuse blindly
        if objects.is_empty() {
            debug!(
                operation = "is_cached",
                step = step.index,
                status = "miss",
                reason = "no_references",
                "cache miss"
            );
            return Ok(false);
        }

        let step_matches = self
            .step_record(step.index)?
            .is_some_and(|record| record.definition == step.definition);

        if !step_matches {
            debug!(
                operation = "is_cached",
                step = step.index,
                status = "miss",
                reason = "step_changed",
                "cache miss"
            );
            return Ok(false);
        }

        for object in objects {
            let unchanged = self
                .object_record(&object.path)?
                .is_some_and(|record| record.sha == object.sha);

            if !unchanged {
                debug!(
                    operation = "is_cached",
                    step = step.index,
                    status = "miss",
                    path = %object.path,
                    reason = "object_changed",
                    "cache miss"
                );
                return Ok(false);
            }
        }

        debug!(
            operation = "is_cached",
            step = step.index,
            status = "success",
            object_count = objects.len(),
            "cache hit"
        );
        Ok(true)
    }

    fn save(&self, step: &Step, objects: &[ReferencedObject]) -> Result<()> {
        let now = Utc::now();
        let mut batch = WriteBatch::default();

        let step_record = StepRecord {
            definition: step.definition.clone(),
            index: step.index,
            updated_at: now,
        };
        batch.put_cf(
            self.cf(CF_STEPS)?,
            step_key(step.index),
            serde_json::to_vec(&step_record).context("Failed to encode step record")?,
        );

        let cf_objects = self.cf(CF_OBJECTS)?;
        for object in objects {
            let record = ObjectRecord {
                path: object.path.clone(),
                sha: object.sha.clone(),
                updated_at: now,
            };
            batch.put_cf(
                cf_objects,
                object.path.as_bytes(),
                serde_json::to_vec(&record).context("Failed to encode object record")?,
            );
        }

        self.db
            .write(batch)
            .context("Failed to write cache records")?;

        debug!(
            operation = "save",
            step = step.index,
            status = "success",
            object_count = objects.len(),
            "saved cache records"
        );

        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        Ok(CacheStats {
            step_records: self.count(CF_STEPS)?,
            object_records: self.count(CF_OBJECTS)?,
        })
    }
}

impl Drop for RocksCacheStore {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            debug!("Failed to flush cache database on shutdown: {}", e);
        }
        self.db.cancel_all_background_work(true);
    }
}

/// Big-endian so iteration follows build order
fn step_key(index: usize) -> [u8; 8] {
    (index as u64).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn object(path: &str, sha: &str) -> ReferencedObject {
        ReferencedObject {
            path: path.to_string(),
            sha: sha.to_string(),
        }
    }

    #[test]
    fn test_save_then_hit() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let step = Step::new("./cmd a.txt", 0);
        let objects = vec![object("a.txt", "aaaa")];

        assert!(!store.is_cached(&step, &objects).unwrap());

        store.save(&step, &objects).unwrap();
        assert!(store.is_cached(&step, &objects).unwrap());
    }

    #[test]
    fn test_empty_objects_never_hit() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let step = Step::new("echo hello", 0);

        store.save(&step, &[]).unwrap();
        store.save(&step, &[]).unwrap();

        assert!(!store.is_cached(&step, &[]).unwrap());
        assert!(store.step_record(0).unwrap().is_some());
    }

    #[test]
    fn test_changed_hash_misses() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let step = Step::new("./cmd a.txt b.txt", 0);

        store
            .save(&step, &[object("a.txt", "aaaa"), object("b.txt", "bbbb")])
            .unwrap();

        assert!(!store
            .is_cached(&step, &[object("a.txt", "aaaa"), object("b.txt", "cccc")])
            .unwrap());
        assert!(!store
            .is_cached(&step, &[object("a.txt", "aaaa"), object("c.txt", "bbbb")])
            .unwrap());
    }

    #[test]
    fn test_same_definition_at_different_index_misses() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let objects = vec![object("a.txt", "aaaa")];

        store.save(&Step::new("./cmd a.txt", 0), &objects).unwrap();

        assert!(!store
            .is_cached(&Step::new("./cmd a.txt", 1), &objects)
            .unwrap());
    }

    #[test]
    fn test_save_replaces_step_at_index() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let objects = vec![object("a.txt", "aaaa")];

        store.save(&Step::new("./old a.txt", 0), &objects).unwrap();
        store.save(&Step::new("./new a.txt", 0), &objects).unwrap();

        assert!(!store
            .is_cached(&Step::new("./old a.txt", 0), &objects)
            .unwrap());
        assert!(store
            .is_cached(&Step::new("./new a.txt", 0), &objects)
            .unwrap());

        let stats = store.stats().unwrap();
        assert_eq!(stats.step_records, 1);
        assert_eq!(stats.object_records, 1);
    }

    #[test]
    fn test_objects_keep_latest_hash_only() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();

        store
            .save(&Step::new("./a a.txt", 0), &[object("a.txt", "v1")])
            .unwrap();
        store
            .save(&Step::new("./b a.txt", 1), &[object("a.txt", "v2")])
            .unwrap();

        let record = store.object_record("a.txt").unwrap().unwrap();
        assert_eq!(record.sha, "v2");

        // Step 0 was recorded against v1, which is no longer the latest hash
        assert!(!store
            .is_cached(&Step::new("./a a.txt", 0), &[object("a.txt", "v1")])
            .unwrap());
    }

    #[test]
    fn test_stale_objects_outside_the_list_are_irrelevant() {
        let temp = TempDir::new().unwrap();
        let store = RocksCacheStore::open(temp.path()).unwrap();
        let step = Step::new("./cmd a.txt", 0);

        store
            .save(&step, &[object("a.txt", "aaaa"), object("gone.txt", "old")])
            .unwrap();

        assert!(store.is_cached(&step, &[object("a.txt", "aaaa")]).unwrap());
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let step = Step::new("./cmd a.txt", 3);
        let objects = vec![object("a.txt", "aaaa")];

        {
            let store = RocksCacheStore::open(temp.path()).unwrap();
            store.save(&step, &objects).unwrap();
        }

        let store = RocksCacheStore::open(temp.path()).unwrap();
        assert!(store.is_cached(&step, &objects).unwrap());

        let record = store.step_record(3).unwrap().unwrap();
        assert_eq!(record.definition, "./cmd a.txt");
        assert_eq!(record.index, 3);
    }
}
