//! Ordered merge iterator: merges the per-partition key/row streams of every open
//! partition into one globally ordered stream, plus an unordered variant for callers that don't
//! care about order and would rather avoid the heap.

use crate::error::SplitTableError;
use crate::registry::Registry;
use crate::rowdef::{Row, RowDef};
use crate::store::{CloneableKeyStream, CloneableRowStream};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

type Comparator = Arc<dyn Fn(&[u8], &[u8]) -> Ordering + Send + Sync>;

struct HeapEntry<T> {
    head: Row,
    cursor: T,
    compare: Comparator,
    ascending: bool,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let order = (self.compare)(&self.head, &other.head);
        // BinaryHeap is a max-heap; invert so the smallest head surfaces first when ascending.
        if self.ascending {
            order.reverse()
        } else {
            order
        }
    }
}

impl<T: Clone> Clone for HeapEntry<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            cursor: self.cursor.clone(),
            compare: self.compare.clone(),
            ascending: self.ascending,
        }
    }
}

/// A k-way merge over already-ordered per-partition cursors. Duplicate keys across
/// partitions cannot occur, so ties are broken arbitrarily ("simple merge").
pub struct KWayMerge<T> {
    heap: BinaryHeap<HeapEntry<T>>,
}

impl<T: Iterator<Item = Row> + Clone + Send + 'static> KWayMerge<T> {
    fn new(cursors: Vec<T>, compare: Comparator, ascending: bool) -> Self {
        let mut heap = BinaryHeap::with_capacity(cursors.len());
        for mut cursor in cursors {
            if let Some(head) = cursor.next() {
                heap.push(HeapEntry {
                    head,
                    cursor,
                    compare: compare.clone(),
                    ascending,
                });
            }
        }
        Self { heap }
    }
}

impl<T: Iterator<Item = Row> + Clone + Send + 'static> Iterator for KWayMerge<T> {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let mut top = self.heap.pop()?;
        let result = top.head.clone();
        if let Some(next_head) = top.cursor.next() {
            top.head = next_head;
            self.heap.push(top);
        }
        Some(result)
    }
}

impl<T: Clone> Clone for KWayMerge<T> {
    fn clone(&self) -> Self {
        Self {
            heap: self.heap.clone(),
        }
    }
}

impl<T: Iterator<Item = Row> + Clone + Send + 'static> CloneableKeyStream for KWayMerge<T> {
    fn box_clone(&self) -> Box<dyn CloneableKeyStream> {
        Box::new(self.clone())
    }
}

impl<T: Iterator<Item = Row> + Clone + Send + 'static> CloneableRowStream for KWayMerge<T> {
    fn box_clone(&self) -> Box<dyn CloneableRowStream> {
        Box::new(self.clone())
    }
}

/// Merges one ascending-or-descending key cursor per partition into one globally ordered
/// key stream, using the row-def's key order.
pub fn merge_keys(
    cursors: Vec<Box<dyn CloneableKeyStream>>,
    rowdef: &RowDef,
    ascending: bool,
) -> Box<dyn CloneableKeyStream> {
    let rowdef = rowdef.clone();
    let compare: Comparator = Arc::new(move |a, b| rowdef.compare_keys(a, b));
    Box::new(KWayMerge::new(cursors, compare, ascending))
}

/// Merges one ascending-or-descending row cursor per partition into one globally ordered row
/// stream, using the row-def's derived row order (key order, then remaining bytes).
pub fn merge_rows(
    cursors: Vec<Box<dyn CloneableRowStream>>,
    rowdef: &RowDef,
    ascending: bool,
) -> Box<dyn CloneableRowStream> {
    let rowdef = rowdef.clone();
    let compare: Comparator = Arc::new(move |a, b| rowdef.compare_rows(a, b));
    Box::new(KWayMerge::new(cursors, compare, ascending))
}

/// An item of the unordered stacked iterator: `Ok` for a row actually read, `Err` for a
/// partition that could not be iterated. Today every [`crate::store::PartitionStore`] cursor
/// construction is infallible, so callers will only ever see `Ok`, but the `Result` keeps the
/// contract honest for a store implementation that isn't.
pub type UnorderedStream = Box<dyn Iterator<Item = Result<Row, SplitTableError>> + Send>;

/// Concatenates every open partition's key stream in registry order, with no merging. Callers
/// accept arbitrary ordering in exchange for skipping the heap entirely.
pub fn unordered_keys(registry: &Registry) -> Result<UnorderedStream, SplitTableError> {
    let cursors: Vec<_> = registry
        .snapshot()
        .into_iter()
        .map(|(_, store)| store.keys(true, None))
        .collect();
    Ok(Box::new(cursors.into_iter().flatten().map(Ok)))
}

/// Concatenates every open partition's row stream in registry order, with no merging.
pub fn unordered_rows(registry: &Registry) -> Result<UnorderedStream, SplitTableError> {
    let cursors: Vec<_> = registry
        .snapshot()
        .into_iter()
        .map(|(_, store)| store.rows(true, None))
        .collect();
    Ok(Box::new(cursors.into_iter().flatten().map(Ok)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_row_store::FixedRowStoreFactory;
    use crate::store::{OpenOptions, PartitionStoreFactory};
    use bytes::Bytes;

    fn row(key: u32) -> Row {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&key.to_be_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        Bytes::from(buf)
    }

    #[test]
    fn merges_two_partitions_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let rowdef = RowDef::new(8, 4);
        let factory = FixedRowStoreFactory;
        let opts = OpenOptions {
            buffer_size: 4096,
            initial_capacity: 16,
            use_tail_cache: true,
            exceed_large_limit: false,
            create_new: true,
        };

        let a = factory.open(&dir.path().join("a.table"), &rowdef, &opts).unwrap();
        a.put(row(1)).unwrap();
        a.put(row(3)).unwrap();

        let b = factory.open(&dir.path().join("b.table"), &rowdef, &opts).unwrap();
        b.put(row(2)).unwrap();
        b.put(row(4)).unwrap();

        let merged = merge_keys(vec![a.keys(true, None), b.keys(true, None)], &rowdef, true);
        let keys: Vec<_> = merged.collect();
        assert_eq!(
            keys,
            vec![1u32, 2, 3, 4]
                .into_iter()
                .map(|k| Bytes::copy_from_slice(&k.to_be_bytes()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn cloned_merge_iterator_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let rowdef = RowDef::new(8, 4);
        let factory = FixedRowStoreFactory;
        let opts = OpenOptions {
            buffer_size: 4096,
            initial_capacity: 16,
            use_tail_cache: true,
            exceed_large_limit: false,
            create_new: true,
        };
        let a = factory.open(&dir.path().join("a.table"), &rowdef, &opts).unwrap();
        a.put(row(1)).unwrap();
        a.put(row(2)).unwrap();

        let mut merged = merge_keys(vec![a.keys(true, None)], &rowdef, true);
        assert_eq!(merged.next(), Some(Bytes::copy_from_slice(&1u32.to_be_bytes())));
        let mut cloned = merged.clone();
        assert_eq!(merged.next(), Some(Bytes::copy_from_slice(&2u32.to_be_bytes())));
        assert_eq!(cloned.next(), Some(Bytes::copy_from_slice(&2u32.to_be_bytes())));
    }
}
