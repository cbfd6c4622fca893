//! A reference [`PartitionStore`] implementation: fixed-size rows held in a flat file, fully
//! indexed in memory as an ordered map. Grounded directly on sui's
//! `crates/typed-store/src/test_db.rs::TestDB`, which backs the same `Map` trait with
//! `Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>` for tests and benchmarks — the same idea, just
//! with a real file behind it so partitions actually survive a close/reopen cycle.
//!
//! This store assumes the [`RowDef`] it is opened with uses (or is compatible with) plain
//! byte-lexicographic key order, since its index is a plain `BTreeMap<Bytes, Bytes>` ordered by
//! `Bytes`'s natural `Ord`. A store meant to serve a custom [`crate::rowdef::KeyOrder`] would
//! need a different internal structure; that is not a limitation of the split table itself,
//! whose dispatch and merge code go through [`PartitionStore`]/[`RowDef`] generically.

use crate::error::StoreError;
use crate::rowdef::{Row, RowDef};
use crate::store::{CloneableKeyStream, CloneableRowStream, OpenOptions, PartitionStore, PartitionStoreFactory};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Opens [`FixedRowStore`]s.
#[derive(Debug, Default)]
pub struct FixedRowStoreFactory;

impl PartitionStoreFactory for FixedRowStoreFactory {
    fn open(
        &self,
        path: &Path,
        rowdef: &RowDef,
        options: &OpenOptions,
    ) -> Result<Arc<dyn PartitionStore>, StoreError> {
        let store = FixedRowStore::open(path, rowdef.clone(), options.create_new)?;
        Ok(Arc::new(store))
    }

    fn static_ram_index_need(&self, path: &Path, rowdef: &RowDef) -> Result<u64, StoreError> {
        let file_size = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(err) => return Err(StoreError::Io(err)),
        };
        if rowdef.row_size == 0 {
            return Ok(0);
        }
        let row_count = file_size / rowdef.row_size as u64;
        // A BTreeMap entry costs roughly one row's worth of bytes once indexed (key + value
        // share the row's backing buffer in this implementation) plus a small fixed overhead.
        Ok(row_count * (rowdef.row_size as u64 + 48))
    }
}

#[derive(Debug)]
pub struct FixedRowStore {
    path: PathBuf,
    filename: String,
    rowdef: RowDef,
    rows: RwLock<BTreeMap<Bytes, Bytes>>,
    file_size: AtomicU64,
    delete_on_exit: AtomicBool,
}

impl FixedRowStore {
    pub fn open(path: &Path, rowdef: RowDef, create_new: bool) -> Result<Self, StoreError> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut rows = BTreeMap::new();
        let mut file_size = 0u64;
        if create_new {
            fs::File::create(path)?;
        } else {
            let bytes = fs::read(path)?;
            file_size = bytes.len() as u64;
            if rowdef.row_size > 0 {
                for chunk in bytes.chunks(rowdef.row_size) {
                    if chunk.len() != rowdef.row_size {
                        return Err(StoreError::Corrupt(format!(
                            "{filename}: trailing {} bytes do not form a whole row",
                            chunk.len()
                        )));
                    }
                    let row = Bytes::copy_from_slice(chunk);
                    let key = row.slice(..rowdef.key_len);
                    rows.insert(key, row);
                }
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            filename,
            rowdef,
            rows: RwLock::new(rows),
            file_size: AtomicU64::new(file_size),
            delete_on_exit: AtomicBool::new(false),
        })
    }

    fn key_of(&self, row: &Row) -> Bytes {
        row.slice(..self.rowdef.key_len)
    }

    /// Rewrites the whole file from the in-memory map. Simple and correct; this reference
    /// implementation favors correctness over write amplification.
    fn persist(&self, rows: &BTreeMap<Bytes, Bytes>) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("table.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            for row in rows.values() {
                file.write_all(row)?;
            }
            file.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        self.file_size
            .store((rows.len() * self.rowdef.row_size) as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for FixedRowStore {
    fn drop(&mut self) {
        if self.delete_on_exit.load(Ordering::Relaxed) {
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl PartitionStore for FixedRowStore {
    fn has(&self, key: &[u8]) -> bool {
        self.rows.read().unwrap().contains_key(key)
    }

    fn get(&self, key: &[u8], force_copy: bool) -> Option<Row> {
        let row = self.rows.read().unwrap().get(key).cloned()?;
        Some(if force_copy {
            Bytes::copy_from_slice(&row)
        } else {
            row
        })
    }

    fn put(&self, row: Row) -> Result<bool, StoreError> {
        let key = self.key_of(&row);
        let mut rows = self.rows.write().unwrap();
        let was_new = rows.insert(key, row).is_none();
        self.persist(&rows)?;
        Ok(was_new)
    }

    fn replace(&self, row: Row) -> Result<Option<Row>, StoreError> {
        let key = self.key_of(&row);
        let mut rows = self.rows.write().unwrap();
        let previous = rows.insert(key, row);
        self.persist(&rows)?;
        Ok(previous)
    }

    fn add_unique(&self, row: Row) -> Result<(), StoreError> {
        let key = self.key_of(&row);
        let mut rows = self.rows.write().unwrap();
        debug_assert!(
            !rows.contains_key(&key),
            "add_unique called with an already-present key"
        );
        rows.insert(key, row);
        self.persist(&rows)
    }

    fn delete(&self, key: &[u8]) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let existed = rows.remove(key).is_some();
        if existed {
            self.persist(&rows)?;
        }
        Ok(existed)
    }

    fn remove(&self, key: &[u8]) -> Result<Option<Row>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let removed = rows.remove(key);
        if removed.is_some() {
            self.persist(&rows)?;
        }
        Ok(removed)
    }

    fn remove_one(&self) -> Result<Option<Row>, StoreError> {
        let mut rows = self.rows.write().unwrap();
        let removed = rows.pop_first().map(|(_, row)| row);
        if removed.is_some() {
            self.persist(&rows)?;
        }
        Ok(removed)
    }

    fn top(&self, n: usize) -> Result<Vec<Row>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap()
            .values()
            .rev()
            .take(n)
            .cloned()
            .collect())
    }

    fn remove_doubles(&self) -> Result<Vec<Vec<Row>>, StoreError> {
        // A BTreeMap cannot hold two entries for the same key, so a store that only ever went
        // through put/replace/add_unique never has doubles to report.
        Ok(Vec::new())
    }

    fn size(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    fn mem(&self) -> u64 {
        (self.size() * self.rowdef.row_size) as u64
    }

    fn file_size(&self) -> u64 {
        self.file_size.load(Ordering::Relaxed)
    }

    fn smallest_key(&self) -> Result<Option<Row>, StoreError> {
        Ok(self.rows.read().unwrap().keys().next().cloned())
    }

    fn largest_key(&self) -> Result<Option<Row>, StoreError> {
        Ok(self.rows.read().unwrap().keys().next_back().cloned())
    }

    fn keys(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableKeyStream> {
        let guard = self.rows.read().unwrap();
        let items: Vec<Row> = collect_ordered(&guard, ascending, start_key, |_, k, _| k.clone());
        Box::new(VecCursor::<KeyTag>::new(items))
    }

    fn rows(&self, ascending: bool, start_key: Option<&[u8]>) -> Box<dyn CloneableRowStream> {
        let guard = self.rows.read().unwrap();
        let items: Vec<Row> = collect_ordered(&guard, ascending, start_key, |_, _, v| v.clone());
        Box::new(VecCursor::<RowTag>::new(items))
    }

    fn warm_up(&self) -> Result<(), StoreError> {
        // Already fully resident; nothing to prefetch.
        Ok(())
    }

    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete_on_exit(&self) {
        self.delete_on_exit.store(true, Ordering::Relaxed);
    }

    fn filename(&self) -> &str {
        &self.filename
    }
}

fn collect_ordered(
    rows: &BTreeMap<Bytes, Bytes>,
    ascending: bool,
    start_key: Option<&[u8]>,
    pick: impl Fn(usize, &Bytes, &Bytes) -> Row,
) -> Vec<Row> {
    let mut out = Vec::with_capacity(rows.len());
    match (ascending, start_key) {
        (true, Some(start)) => {
            for (k, v) in rows.range(Bytes::copy_from_slice(start)..) {
                out.push(pick(0, k, v));
            }
        }
        (true, None) => {
            for (k, v) in rows.iter() {
                out.push(pick(0, k, v));
            }
        }
        (false, Some(start)) => {
            for (k, v) in rows.range(..=Bytes::copy_from_slice(start)).rev() {
                out.push(pick(0, k, v));
            }
        }
        (false, None) => {
            for (k, v) in rows.iter().rev() {
                out.push(pick(0, k, v));
            }
        }
    }
    out
}

/// Marker types so the same `VecCursor<T>` body can implement both cloneable-stream traits
/// without one blanket impl colliding with the other.
struct KeyTag;
struct RowTag;

struct VecCursor<Tag> {
    items: Arc<Vec<Row>>,
    pos: usize,
    _tag: std::marker::PhantomData<Tag>,
}

impl<Tag> VecCursor<Tag> {
    fn new(items: Vec<Row>) -> Self {
        Self {
            items: Arc::new(items),
            pos: 0,
            _tag: std::marker::PhantomData,
        }
    }
}

impl<Tag> Clone for VecCursor<Tag> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            pos: self.pos,
            _tag: std::marker::PhantomData,
        }
    }
}

impl<Tag> Iterator for VecCursor<Tag> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let item = self.items.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }
}

impl CloneableKeyStream for VecCursor<KeyTag> {
    fn box_clone(&self) -> Box<dyn CloneableKeyStream> {
        Box::new(self.clone())
    }
}

impl CloneableRowStream for VecCursor<RowTag> {
    fn box_clone(&self) -> Box<dyn CloneableRowStream> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rowdef::RowDef;

    fn rowdef() -> RowDef {
        RowDef::new(8, 4)
    }

    fn row(key: u32, value: u32) -> Row {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&key.to_be_bytes());
        buf.extend_from_slice(&value.to_be_bytes());
        Bytes::from(buf)
    }

    #[test]
    fn put_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.20240101000000000.table");
        let store = FixedRowStore::open(&path, rowdef(), true).unwrap();
        assert!(store.put(row(1, 100)).unwrap());
        assert!(!store.put(row(1, 200)).unwrap());
        assert_eq!(store.get(&1u32.to_be_bytes(), false).unwrap(), row(1, 200));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.20240101000000000.table");
        {
            let store = FixedRowStore::open(&path, rowdef(), true).unwrap();
            store.put(row(1, 100)).unwrap();
            store.put(row(2, 200)).unwrap();
        }
        let reopened = FixedRowStore::open(&path, rowdef(), false).unwrap();
        assert_eq!(reopened.size(), 2);
        assert_eq!(reopened.get(&1u32.to_be_bytes(), false).unwrap(), row(1, 100));
    }

    #[test]
    fn ordered_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.20240101000000000.table");
        let store = FixedRowStore::open(&path, rowdef(), true).unwrap();
        for k in [3u32, 1, 2] {
            store.put(row(k, 0)).unwrap();
        }
        let keys: Vec<_> = store.keys(true, None).collect();
        assert_eq!(
            keys,
            vec![
                Bytes::copy_from_slice(&1u32.to_be_bytes()),
                Bytes::copy_from_slice(&2u32.to_be_bytes()),
                Bytes::copy_from_slice(&3u32.to_be_bytes()),
            ]
        );
    }
}
