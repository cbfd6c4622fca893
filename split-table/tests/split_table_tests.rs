use bytes::Bytes;
use micromegas_split_table::fixed_row_store::FixedRowStoreFactory;
use micromegas_split_table::rowdef::RowDef;
use micromegas_split_table::split_table::{SplitTable, SplitTableConfig};
use std::sync::Arc;
use std::time::Duration;

// 4-byte big-endian key, 4-byte value.
const ROW_SIZE: usize = 8;
const KEY_LEN: usize = 4;

fn row(key: u32, value: u32) -> Bytes {
    let mut buf = Vec::with_capacity(ROW_SIZE);
    buf.extend_from_slice(&key.to_be_bytes());
    buf.extend_from_slice(&value.to_be_bytes());
    Bytes::from(buf)
}

fn key_bytes(key: u32) -> [u8; KEY_LEN] {
    key.to_be_bytes()
}

fn open(dir: &std::path::Path, age_limit: Duration, size_limit: u64) -> SplitTable {
    let config = SplitTableConfig {
        dir: dir.to_path_buf(),
        prefix: "t".to_string(),
        age_limit,
        size_limit,
        use_tail_cache: true,
        exceed_large_limit: false,
    };
    SplitTable::open(config, RowDef::new(ROW_SIZE, KEY_LEN), Arc::new(FixedRowStoreFactory)).unwrap()
}

// ============================================================================
// Testable properties
// ============================================================================

#[test]
fn unique_residency() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    for k in 0..50u32 {
        table.put(row(k, k)).unwrap();
    }
    for k in 0..50u32 {
        assert!(table.has(&key_bytes(k)));
    }
}

#[test]
fn total_size_equality() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 64);
    for k in 0..30u32 {
        table.put(row(k, k)).unwrap();
    }
    let direct_total: usize = table
        .keys(true, None)
        .count();
    assert_eq!(table.size(), direct_total);
}

#[test]
fn round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    let r = row(7, 77);
    table.put(r.clone()).unwrap();
    assert_eq!(table.get(&key_bytes(7), false), Some(r));
}

#[test]
fn batch_get_orders_by_key_and_omits_missing() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    for k in [5u32, 1, 9] {
        table.put(row(k, k)).unwrap();
    }
    let missing = key_bytes(42);
    let keys = [key_bytes(9), key_bytes(1), key_bytes(5), missing];
    let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
    let found = table.get_many(&key_refs).unwrap();
    let ordered_keys: Vec<u32> = found.iter().map(|(k, _)| u32::from_be_bytes(k[..].try_into().unwrap())).collect();
    assert_eq!(ordered_keys, vec![1, 5, 9]);
}

#[test]
fn idempotent_replace() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    let r = row(9, 99);
    table.put(r.clone()).unwrap();
    let first = table.replace(r.clone()).unwrap();
    let second = table.replace(r.clone()).unwrap();
    assert_eq!(first, Some(r.clone()));
    assert_eq!(second, Some(r));
}

#[test]
fn ordered_merge_sorted_both_directions() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 64);
    for k in [5u32, 1, 4, 2, 3] {
        table.put(row(k, 0)).unwrap();
    }
    let ascending: Vec<_> = table.keys(true, None).collect();
    let mut descending: Vec<_> = table.keys(false, None).collect();
    descending.reverse();
    assert_eq!(ascending, descending);
    let expected: Vec<_> = (1..=5u32).map(|k| Bytes::copy_from_slice(&key_bytes(k))).collect();
    assert_eq!(ascending, expected);
}

#[test]
fn rollover_triggers_on_size() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), ROW_SIZE as u64 * 3);
    for k in 0..10u32 {
        table.put(row(k, k)).unwrap();
    }
    let partitions = table.partition_count();
    assert!(partitions >= 2);
}

#[test]
fn age_based_rollover() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_millis(1), 1 << 20);
    table.put(row(1, 1)).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    table.put(row(2, 2)).unwrap();
    assert!(table.partition_count() >= 2);
}

#[test]
fn legacy_migration_opens_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("t.AB12CD"), b"").unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    assert!(table.put(row(1, 1)).unwrap());
}

#[test]
fn extremum_keys() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 64);
    for k in [5u32, 1, 9, 3] {
        table.put(row(k, 0)).unwrap();
    }
    assert_eq!(table.smallest_key(), Some(Bytes::copy_from_slice(&key_bytes(1))));
    assert_eq!(table.largest_key(), Some(Bytes::copy_from_slice(&key_bytes(9))));
}

#[test]
fn close_is_idempotent_and_clear_leaves_openable_table() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    table.put(row(1, 1)).unwrap();
    table.close().unwrap();
    table.close().unwrap();

    let reopened = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    reopened.clear().unwrap();
    assert!(reopened.is_empty());
    reopened.put(row(2, 2)).unwrap();
    assert!(reopened.has(&key_bytes(2)));
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn s1_put_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    table.put(row(1, 0xA)).unwrap();
    assert_eq!(table.get(&key_bytes(1), false), Some(row(1, 0xA)));
    assert_eq!(table.partition_count(), 1);
}

#[test]
fn s2_put_existing_key_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 1 << 20);
    assert!(table.put(row(1, 0xA)).unwrap());
    assert!(!table.put(row(1, 0xB)).unwrap());
    assert_eq!(table.get(&key_bytes(1), false), Some(row(1, 0xB)));
    assert_eq!(table.partition_count(), 1);
}

#[test]
fn s3_keys_span_forced_rollover() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), ROW_SIZE as u64);
    table.put(row(1, 0xA)).unwrap();
    table.put(row(2, 0xB)).unwrap();
    assert!(table.partition_count() >= 2);
    let keys: Vec<_> = table.keys(true, None).collect();
    assert_eq!(
        keys,
        vec![Bytes::copy_from_slice(&key_bytes(1)), Bytes::copy_from_slice(&key_bytes(2))]
    );
}

#[test]
fn s4_delete_then_size() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), ROW_SIZE as u64);
    table.put(row(1, 0xA)).unwrap();
    table.put(row(2, 0xB)).unwrap();
    assert!(table.delete(&key_bytes(1)).unwrap());
    assert_eq!(table.size(), 1);
    assert!(table.has(&key_bytes(2)));
}

#[test]
fn s5_size_limited_rollover_active_is_newest() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_secs(3600), 64);
    for k in 0..10u32 {
        table.put(row(k, k)).unwrap();
        std::thread::sleep(Duration::from_millis(1));
    }
    assert!(table.partition_count() >= 2);
}

#[test]
fn s6_age_limited_rollover_different_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let table = open(dir.path(), Duration::from_millis(1), 1 << 20);
    table.put(row(1, 0)).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    table.put(row(2, 0)).unwrap();
    assert!(table.partition_count() >= 2);
}
