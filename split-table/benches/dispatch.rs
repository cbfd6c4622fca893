use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use micromegas_split_table::fixed_row_store::FixedRowStoreFactory;
use micromegas_split_table::rowdef::RowDef;
use micromegas_split_table::split_table::{SplitTable, SplitTableConfig};
use std::sync::Arc;
use std::time::Duration;

const ROW_SIZE: usize = 16;
const KEY_LEN: usize = 8;

fn row(key: u64) -> bytes::Bytes {
    let mut buf = Vec::with_capacity(ROW_SIZE);
    buf.extend_from_slice(&key.to_be_bytes());
    buf.extend_from_slice(&[0u8; ROW_SIZE - KEY_LEN]);
    bytes::Bytes::from(buf)
}

fn open_table(dir: &std::path::Path, size_limit: u64) -> SplitTable {
    let config = SplitTableConfig {
        dir: dir.to_path_buf(),
        prefix: "bench".to_string(),
        age_limit: Duration::from_secs(3600),
        size_limit,
        use_tail_cache: true,
        exceed_large_limit: false,
    };
    SplitTable::open(config, RowDef::new(ROW_SIZE, KEY_LEN), Arc::new(FixedRowStoreFactory)).unwrap()
}

fn bench_put_with_rollover(c: &mut Criterion) {
    let mut group = c.benchmark_group("put_with_rollover");
    for partition_size in [4 * 1024u64, 64 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(partition_size),
            &partition_size,
            |b, &size_limit| {
                let dir = tempfile::tempdir().unwrap();
                let table = open_table(dir.path(), size_limit);
                let mut next_key = 0u64;
                b.iter(|| {
                    table.put(row(next_key)).unwrap();
                    next_key += 1;
                });
            },
        );
    }
    group.finish();
}

fn bench_get_across_partitions(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let table = open_table(dir.path(), 4 * 1024);
    for k in 0..5000u64 {
        table.put(row(k)).unwrap();
    }

    c.bench_function("get_across_partitions", |b| {
        let mut k = 0u64;
        b.iter(|| {
            let key = (k % 5000).to_be_bytes();
            let _ = table.get(&key, false);
            k += 1;
        });
    });
}

criterion_group!(benches, bench_put_with_rollover, bench_get_across_partitions);
criterion_main!(benches);
