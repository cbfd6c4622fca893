//! The public split table: construction, lifecycle, and the dispatch layer.

use crate::error::SplitTableError;
use crate::executor::WorkerPool;
use crate::merge;
use crate::registry::Registry;
use crate::rollover::RolloverPolicy;
use crate::rowdef::{Row, RowDef};
use crate::store::{CloneableKeyStream, CloneableRowStream, PartitionStoreFactory};
use micromegas_tracing::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Construction-time configuration for a [`SplitTable`]. No CLI, no environment
/// variables, no config-file format — all of that is explicitly out of scope; this struct is
/// the entire configuration surface.
#[derive(Debug, Clone)]
pub struct SplitTableConfig {
    pub dir: PathBuf,
    pub prefix: String,
    pub age_limit: Duration,
    pub size_limit: u64,
    pub use_tail_cache: bool,
    pub exceed_large_limit: bool,
}

/// A single logical, ordered, primary-key-indexed table backed by multiple time-partitioned
/// on-disk files.
pub struct SplitTable {
    prefix: String,
    rowdef: RowDef,
    factory: Arc<dyn PartitionStoreFactory>,
    registry: Registry,
    rollover: RolloverPolicy,
    pool: Mutex<Option<WorkerPool>>,
    closed: AtomicBool,
}

impl SplitTable {
    /// Opens (creating if necessary) the split table described by `config`. Migrates any legacy
    /// partitions, opens every modern one (largest predicted RAM footprint first), warms them
    /// all up behind a barrier, and returns only once the table is in steady state.
    #[span_fn]
    pub fn open(
        config: SplitTableConfig,
        rowdef: RowDef,
        store_factory: Arc<dyn PartitionStoreFactory>,
    ) -> Result<Self, SplitTableError> {
        std::fs::create_dir_all(&config.dir)?;

        let registry = Registry::new(
            config.dir.clone(),
            config.prefix.clone(),
            rowdef.clone(),
            store_factory.clone(),
            config.use_tail_cache,
            config.exceed_large_limit,
        );

        let discovered = registry.scan()?;

        // Executor size is pinned at open as max(partitionCount, hardwareParallelism) + 1, so the
        // warm-up barrier always has at least one thread per partition plus one spare for later
        // parallel probes, regardless of how many cores the host has.
        let hardware_parallelism = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let pool_size = discovered.len().max(hardware_parallelism) + 1;
        let pool = WorkerPool::new(pool_size, &config.prefix);

        registry.open_all(&pool, discovered)?;

        let rollover = RolloverPolicy::new(config.age_limit, config.size_limit);

        Ok(Self {
            prefix: config.prefix,
            rowdef,
            factory: store_factory,
            registry,
            rollover,
            pool: Mutex::new(Some(pool)),
            closed: AtomicBool::new(false),
        })
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), SplitTableError> {
        if self.is_closed() {
            Err(SplitTableError::Closed)
        } else {
            Ok(())
        }
    }

    // ---- single-key dispatch ----

    pub fn has(&self, key: &[u8]) -> bool {
        if self.is_closed() {
            return false;
        }
        self.registry.find_keeper(key).is_some()
    }

    pub fn get(&self, key: &[u8], force_copy: bool) -> Option<Row> {
        if self.is_closed() {
            return None;
        }
        self.registry.find_keeper(key)?.get(key, force_copy)
    }

    /// Batch lookup, returned ordered by the row-def's key order; missing keys are omitted.
    /// Each key's fetch runs on the warm-up pool so a slow partition doesn't stall the others;
    /// a worker that unwinds mid-fetch is surfaced as `Interrupted` rather than swallowed, unlike
    /// the best-effort warm-up barrier.
    #[span_fn]
    pub fn get_many(&self, keys: &[&[u8]]) -> Result<Vec<(Row, Row)>, SplitTableError> {
        if self.is_closed() {
            return Ok(Vec::new());
        }
        let resolved: Vec<(Vec<u8>, Arc<dyn crate::store::PartitionStore>)> = keys
            .iter()
            .filter_map(|key| self.registry.find_keeper(key).map(|store| (key.to_vec(), store)))
            .collect();

        let pool_guard = self.pool.lock().unwrap();
        let Some(pool) = pool_guard.as_ref() else {
            return Ok(Vec::new());
        };

        let jobs: Vec<_> = resolved
            .into_iter()
            .map(|(key, store)| {
                move || store.get(&key, false).map(|row| (bytes::Bytes::copy_from_slice(&key), row))
            })
            .collect();
        let results = pool.try_run_to_completion(jobs).ok_or(SplitTableError::Interrupted)?;
        drop(pool_guard);

        let mut found: Vec<(Row, Row)> = results.into_iter().flatten().collect();
        found.sort_by(|(a, _), (b, _)| self.rowdef.compare_keys(a, b));
        Ok(found)
    }

    pub fn put(&self, row: Row) -> Result<bool, SplitTableError> {
        self.ensure_open()?;
        let key = self.rowdef.key_of(&row).to_vec();
        self.registry.write_with_lock(|registry| {
            if let Some(store) = registry.find_keeper(&key) {
                return store.put(row).map_err(SplitTableError::Store);
            }
            let target = registry.write_target(&self.rollover)?;
            let was_new = target.put(row).map_err(SplitTableError::Store)?;
            debug_assert!(was_new, "a freshly targeted write partition must not already hold this key");
            Ok(was_new)
        })
    }

    pub fn replace(&self, row: Row) -> Result<Option<Row>, SplitTableError> {
        self.ensure_open()?;
        let key = self.rowdef.key_of(&row).to_vec();
        self.registry.write_with_lock(|registry| {
            if let Some(store) = registry.find_keeper(&key) {
                return store.replace(row).map_err(SplitTableError::Store);
            }
            let target = registry.write_target(&self.rollover)?;
            target.put(row).map_err(SplitTableError::Store)?;
            Ok(None)
        })
    }

    /// Caller guarantees `row`'s key is not present anywhere in the table.
    pub fn add_unique(&self, row: Row) -> Result<(), SplitTableError> {
        self.ensure_open()?;
        self.registry.write_with_lock(|registry| {
            let target = registry.write_target(&self.rollover)?;
            target.add_unique(row).map_err(SplitTableError::Store)
        })
    }

    pub fn delete(&self, key: &[u8]) -> Result<bool, SplitTableError> {
        if self.is_closed() {
            return Ok(false);
        }
        match self.registry.find_keeper(key) {
            Some(store) => store.delete(key).map_err(SplitTableError::Store),
            None => Ok(false),
        }
    }

    pub fn remove(&self, key: &[u8]) -> Result<Option<Row>, SplitTableError> {
        if self.is_closed() {
            return Ok(None);
        }
        match self.registry.find_keeper(key) {
            Some(store) => store.remove(key).map_err(SplitTableError::Store),
            None => Ok(None),
        }
    }

    /// Delegates to the largest partition by `size()` (ties broken by snapshot order).
    pub fn remove_one(&self) -> Result<Option<Row>, SplitTableError> {
        if self.is_closed() {
            return Ok(None);
        }
        match self.largest_partition() {
            Some(store) => store.remove_one().map_err(SplitTableError::Store),
            None => Ok(None),
        }
    }

    /// Delegates to the largest partition by `size()`. Not a true global top-`n`: a caller
    /// wanting a representative sample of "most heavily used" rows rather than a cross-partition
    /// statistic is the documented use case, preserved as specified.
    pub fn top(&self, n: usize) -> Result<Vec<Row>, SplitTableError> {
        if self.is_closed() {
            return Ok(Vec::new());
        }
        match self.largest_partition() {
            Some(store) => store.top(n).map_err(SplitTableError::Store),
            None => Ok(Vec::new()),
        }
    }

    fn largest_partition(&self) -> Option<Arc<dyn crate::store::PartitionStore>> {
        self.registry
            .snapshot()
            .into_iter()
            .max_by_key(|(_, store)| store.size())
            .map(|(_, store)| store)
    }

    /// Doubles cannot occur across partitions; this concatenates each partition's
    /// own `remove_doubles()` result.
    pub fn remove_doubles(&self) -> Result<Vec<Vec<Row>>, SplitTableError> {
        if self.is_closed() {
            return Ok(Vec::new());
        }
        let mut all = Vec::new();
        for (name, store) in self.registry.snapshot() {
            match store.remove_doubles() {
                Ok(groups) => all.extend(groups),
                Err(err) => warn!("remove_doubles failed for partition {name}: {err}"),
            }
        }
        Ok(all)
    }

    /// Number of currently open partitions. Not part of the dispatch contract itself, but
    /// useful for observability and for driving the rollover-triggered scenarios in tests.
    pub fn partition_count(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.registry.snapshot().len()
    }

    // ---- aggregates ----

    pub fn size(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        self.registry.snapshot().iter().map(|(_, s)| s.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        if self.is_closed() {
            return true;
        }
        self.registry.snapshot().iter().all(|(_, s)| s.is_empty())
    }

    pub fn mem(&self) -> u64 {
        if self.is_closed() {
            return 0;
        }
        self.registry.snapshot().iter().map(|(_, s)| s.mem()).sum()
    }

    pub fn write_buffer_size(&self) -> u64 {
        if self.is_closed() {
            return 0;
        }
        self.registry.snapshot().iter().map(|(_, s)| s.write_buffer_size()).sum()
    }

    pub fn smallest_key(&self) -> Option<Row> {
        if self.is_closed() {
            return None;
        }
        let mut best: Option<Row> = None;
        for (name, store) in self.registry.snapshot() {
            match store.smallest_key() {
                Ok(Some(key)) => {
                    best = Some(match best {
                        Some(current) if self.rowdef.compare_keys(&current, &key).is_le() => current,
                        _ => key,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!("failed to read smallest key from partition {name}: {err}"),
            }
        }
        best
    }

    pub fn largest_key(&self) -> Option<Row> {
        if self.is_closed() {
            return None;
        }
        let mut best: Option<Row> = None;
        for (name, store) in self.registry.snapshot() {
            match store.largest_key() {
                Ok(Some(key)) => {
                    best = Some(match best {
                        Some(current) if self.rowdef.compare_keys(&current, &key).is_ge() => current,
                        _ => key,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!("failed to read largest key from partition {name}: {err}"),
            }
        }
        best
    }

    // ---- ordered merge iteration ----

    pub fn keys(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableKeyStream> {
        if self.is_closed() {
            return merge::merge_keys(Vec::new(), &self.rowdef, ascending);
        }
        let cursors: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|(_, store)| store.keys(ascending, start_key))
            .collect();
        merge::merge_keys(cursors, &self.rowdef, ascending)
    }

    pub fn rows(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableRowStream> {
        if self.is_closed() {
            return merge::merge_rows(Vec::new(), &self.rowdef, ascending);
        }
        let cursors: Vec<_> = self
            .registry
            .snapshot()
            .into_iter()
            .map(|(_, store)| store.rows(ascending, start_key))
            .collect();
        merge::merge_rows(cursors, &self.rowdef, ascending)
    }

    /// Unordered stacked iteration: concatenates every partition's key stream in registry order
    /// with no merge cost.
    pub fn unordered_keys(&self) -> Result<merge::UnorderedStream, SplitTableError> {
        if self.is_closed() {
            return Ok(Box::new(std::iter::empty()));
        }
        merge::unordered_keys(&self.registry)
    }

    pub fn unordered_rows(&self) -> Result<merge::UnorderedStream, SplitTableError> {
        if self.is_closed() {
            return Ok(Box::new(std::iter::empty()));
        }
        merge::unordered_rows(&self.registry)
    }

    // ---- lifecycle & concurrency ----

    /// Idempotent. Shuts the executor down (up to 3s for in-flight tasks), closes every
    /// partition, and marks the table closed.
    #[span_fn]
    pub fn close(&self) -> Result<(), SplitTableError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(pool) = self.pool.lock().unwrap().take() {
            pool.shutdown(Duration::from_secs(3));
        }
        self.registry.close_all()
    }

    /// Closes, physically deletes every partition file, then reopens with a fresh, empty active
    /// partition. If even the low-memory fallback fails to reopen, tail cache is permanently
    /// disabled for this table and the open is retried once more.
    #[span_fn]
    pub fn clear(&self) -> Result<(), SplitTableError> {
        self.ensure_open()?;
        self.registry.clear_all()
    }

    /// Marks every currently open partition (and, since `delete_on_exit` on the underlying
    /// reference store is sticky, any future replacement) for deletion once dropped.
    pub fn delete_on_exit(&self) {
        self.registry.mark_delete_on_exit();
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn factory(&self) -> &Arc<dyn PartitionStoreFactory> {
        &self.factory
    }
}
