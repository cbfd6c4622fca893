//! Partition registry and warm-up orchestrator: tracks every open partition store,
//! which one is active (receives new writes), and brings the whole set up at `open()` time.
//!
//! A single mutex (`structural`) guards every change to the partition *set* — creating a new
//! partition, reassigning which one is active. Reads (`get`, `snapshot`, iteration) never take
//! it: they clone `Arc`s out of the map under its much cheaper `RwLock`, so a merge cursor or a
//! probe in flight is unaffected by a rollover that happens to land mid-read (the "partition-set
//! stability during keeper_of" contract: a snapshot taken before a rollover never observes a
//! partition disappear or mutate out from under it).

use crate::error::{SplitTableError, StoreError};
use crate::executor::WorkerPool;
use crate::filename;
use crate::rowdef::RowDef;
use crate::scanner;
use crate::store::{OpenOptions, PartitionStore, PartitionStoreFactory};
use chrono::Utc;
use micromegas_tracing::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;
const DEFAULT_INITIAL_CAPACITY: usize = 1024;

pub struct Registry {
    dir: PathBuf,
    prefix: String,
    rowdef: RowDef,
    factory: Arc<dyn PartitionStoreFactory>,
    partitions: RwLock<HashMap<String, Arc<dyn PartitionStore>>>,
    active: Mutex<Option<String>>,
    structural: Mutex<()>,
    use_tail_cache: AtomicBool,
    exceed_large_limit: bool,
}

impl Registry {
    pub fn new(
        dir: PathBuf,
        prefix: String,
        rowdef: RowDef,
        factory: Arc<dyn PartitionStoreFactory>,
        use_tail_cache: bool,
        exceed_large_limit: bool,
    ) -> Self {
        Self {
            dir,
            prefix,
            rowdef,
            factory,
            partitions: RwLock::new(HashMap::new()),
            active: Mutex::new(None),
            structural: Mutex::new(()),
            use_tail_cache: AtomicBool::new(use_tail_cache),
            exceed_large_limit,
        }
    }

    /// Permanently disables the tail cache for every future open on this table. Used by
    /// `clear()` when even the low-memory fallback fails to reopen after a wipe.
    pub fn disable_tail_cache(&self) {
        self.use_tail_cache.store(false, AtomicOrdering::Relaxed);
    }

    /// Migrates legacy files and discovers every modern partition belonging to this table,
    /// without opening or warming any of them up. Callers use the returned count to size the
    /// warm-up pool before calling [`Registry::open_all`].
    #[span_fn]
    pub fn scan(&self) -> Result<Vec<scanner::DiscoveredPartition>, SplitTableError> {
        scanner::migrate_legacy(&self.dir, &self.prefix).map_err(SplitTableError::Io)?;
        scanner::discover(&self.dir, &self.prefix, &self.rowdef, self.factory.as_ref()).map_err(SplitTableError::Io)
    }

    /// Opens every partition in `discovered` (largest predicted RAM first — it is the one most
    /// likely to be touched during warm-up), warms them all up behind one barrier using `pool`,
    /// and designates the chronologically newest as active. If `discovered` is empty, creates
    /// the table's first partition instead. `discovered` should come from a prior call to
    /// [`Registry::scan`] on this same directory.
    #[span_fn]
    pub fn open_all(&self, pool: &WorkerPool, mut discovered: Vec<scanner::DiscoveredPartition>) -> Result<(), SplitTableError> {
        let _guard = self.structural.lock().unwrap();

        if discovered.is_empty() {
            let (filename, store) = self.create_fresh_locked()?;
            self.partitions.write().unwrap().insert(filename.clone(), store);
            *self.active.lock().unwrap() = Some(filename);
            return Ok(());
        }

        discovered.sort_by_key(|d| std::cmp::Reverse(d.predicted_ram));
        let mut opened = Vec::with_capacity(discovered.len());
        for d in &discovered {
            let store = self.open_one(&d.filename, false)?;
            opened.push((d.filename.clone(), store));
        }

        let jobs: Vec<_> = opened
            .iter()
            .map(|(name, store)| {
                let store = store.clone();
                let name = name.clone();
                move || {
                    if let Err(err) = store.warm_up() {
                        warn!("warm-up failed for partition {name}: {err}");
                    }
                }
            })
            .collect();
        pool.run_to_completion(jobs);

        let newest = discovered
            .iter()
            .max_by_key(|d| d.created_at)
            .map(|d| d.filename.clone())
            .expect("discovered is non-empty");

        let mut map = self.partitions.write().unwrap();
        for (name, store) in opened {
            map.insert(name, store);
        }
        drop(map);
        *self.active.lock().unwrap() = Some(newest);

        Ok(())
    }

    fn open_one(&self, filename: &str, create_new: bool) -> Result<Arc<dyn PartitionStore>, SplitTableError> {
        let path = self.dir.join(filename);
        let primary = OpenOptions {
            buffer_size: DEFAULT_BUFFER_SIZE,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            use_tail_cache: self.use_tail_cache.load(AtomicOrdering::Relaxed),
            exceed_large_limit: self.exceed_large_limit,
            create_new,
        };
        match self.factory.open(&path, &self.rowdef, &primary) {
            Ok(store) => Ok(store),
            Err(StoreError::CapacityExceeded) => {
                warn!("partition {filename} exceeded capacity with tail cache enabled, retrying without it");
                let fallback = OpenOptions {
                    use_tail_cache: false,
                    exceed_large_limit: true,
                    ..primary
                };
                self.factory
                    .open(&path, &self.rowdef, &fallback)
                    .map_err(|err| match err {
                        StoreError::CapacityExceeded => SplitTableError::Capacity,
                        other => SplitTableError::Store(other),
                    })
            }
            Err(other) => Err(SplitTableError::Store(other)),
        }
    }

    fn create_fresh_locked(&self) -> Result<(String, Arc<dyn PartitionStore>), SplitTableError> {
        let mut now = Utc::now();
        loop {
            let filename = filename::format(&self.prefix, now);
            if !self.dir.join(&filename).exists() {
                let store = self.open_one(&filename, true)?;
                info!("created partition {filename}");
                return Ok((filename, store));
            }
            now += chrono::Duration::milliseconds(1);
        }
    }

    /// A consistent snapshot of every open partition, oldest-filename-first. Safe to iterate
    /// without holding any lock: a concurrent rollover only adds a new entry or changes which
    /// filename is active, it never removes or mutates an entry this snapshot already holds.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn PartitionStore>)> {
        let map = self.partitions.read().unwrap();
        let mut entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn get(&self, filename: &str) -> Option<Arc<dyn PartitionStore>> {
        self.partitions.read().unwrap().get(filename).cloned()
    }

    pub fn active_filename(&self) -> Option<String> {
        self.active.lock().unwrap().clone()
    }

    pub fn active_store(&self) -> Option<Arc<dyn PartitionStore>> {
        let name = self.active_filename()?;
        self.get(&name)
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.read().unwrap().is_empty()
    }

    /// The first partition in the current snapshot whose `has(key)` is true (the
    /// "keeper of" that key). At most one partition can ever match.
    pub fn find_keeper(&self, key: &[u8]) -> Option<Arc<dyn PartitionStore>> {
        self.snapshot().into_iter().find(|(_, store)| store.has(key)).map(|(_, store)| store)
    }

    /// Runs `f` with the structural lock held for its entire duration, so a write can probe for
    /// an existing keeper, pick (and possibly create) a write target, and delegate to it as one
    /// atomic structural step (the "double-checked insert" pattern). `f` may call
    /// [`Self::create_fresh_locked`]-backed helpers like [`Self::write_target`] but must not
    /// call any method that re-acquires this lock.
    pub fn write_with_lock<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        let _guard = self.structural.lock().unwrap();
        f(self)
    }

    /// The partition a new key should be written to: the active partition, rolling it over
    /// first if it is due, or a brand-new partition if none is active yet. Caller must already
    /// hold the structural lock (i.e. call only from inside [`Self::write_with_lock`]).
    pub fn write_target(
        &self,
        rollover: &crate::rollover::RolloverPolicy,
    ) -> Result<Arc<dyn PartitionStore>, SplitTableError> {
        match self.active_filename() {
            None => Ok(self.create_fresh_locked()?.1),
            Some(active_name) => {
                let active_store = self
                    .get(&active_name)
                    .expect("partitions[active] exists whenever active is set");
                if rollover.is_due(&self.prefix, &active_name, active_store.as_ref(), Utc::now()) {
                    Ok(self.create_fresh_locked()?.1)
                } else {
                    Ok(active_store)
                }
            }
        }
    }

    #[span_fn]
    pub fn close_all(&self) -> Result<(), SplitTableError> {
        let _guard = self.structural.lock().unwrap();
        let map = self.partitions.read().unwrap();
        for (name, store) in map.iter() {
            if let Err(err) = store.close() {
                warn!("failed to close partition {name}: {err}");
            }
        }
        Ok(())
    }

    /// Deletes every on-disk entry under `dir` whose name begins with `prefix`, then leaves the
    /// table with one fresh, empty active partition.
    ///
    /// Deletion walks `dir` directly rather than relying on `store.delete_on_exit()` plus an
    /// `Arc` refcount eventually reaching zero: that would leave a partition file on disk for as
    /// long as any other caller's `find_keeper`/`snapshot`/`get` reference to it stays alive
    /// (those methods intentionally don't take `structural`), and would never touch an on-disk
    /// entry that was never tracked in `partitions` in the first place (e.g. a legacy file whose
    /// migration rename failed and was logged-and-skipped). Walking `dir` catches both.
    #[span_fn]
    pub fn clear_all(&self) -> Result<(), SplitTableError> {
        let _guard = self.structural.lock().unwrap();
        let mut map = self.partitions.write().unwrap();
        for (name, store) in map.drain() {
            if let Err(err) = store.close() {
                warn!("failed to close partition {name} during clear: {err}");
            }
        }
        drop(map);
        *self.active.lock().unwrap() = None;

        delete_prefixed_entries(&self.dir, &self.prefix);

        let (filename, store) = match self.create_fresh_locked() {
            Ok(opened) => opened,
            Err(SplitTableError::Capacity) => {
                warn!(
                    "clear: fresh partition still exceeds capacity after fallback, disabling tail cache for {} permanently",
                    self.prefix
                );
                self.disable_tail_cache();
                self.create_fresh_locked()?
            }
            Err(other) => return Err(other),
        };
        self.partitions.write().unwrap().insert(filename.clone(), store);
        *self.active.lock().unwrap() = Some(filename);
        Ok(())
    }

    pub fn mark_delete_on_exit(&self) {
        let map = self.partitions.read().unwrap();
        for store in map.values() {
            store.delete_on_exit();
        }
    }
}

/// Removes every entry directly under `dir` whose filename starts with `prefix`, tracked or not.
/// Best-effort: a single unreadable entry or failed removal is logged and does not stop the rest
/// of the sweep.
fn delete_prefixed_entries(dir: &std::path::Path, prefix: &str) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to read directory {dir:?} while clearing {prefix}: {err}");
            return;
        }
    };
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read directory entry while clearing {prefix}: {err}");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        if let Err(err) = result {
            warn!("failed to delete {name} during clear: {err}");
        }
    }
}
