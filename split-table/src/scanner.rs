//! Directory scanner: turns a directory on disk into the set of partition filenames this
//! table owns, migrating legacy-shaped entries first.

use crate::filename;
use crate::rowdef::RowDef;
use crate::store::PartitionStoreFactory;
use chrono::{DateTime, Utc};
use micromegas_tracing::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// One partition discovered on disk, not yet opened.
#[derive(Debug, Clone)]
pub struct DiscoveredPartition {
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub predicted_ram: u64,
}

/// Renames every legacy-shaped (`<prefix>.XXXXXX`) entry in `dir` to the modern
/// `<prefix>.<timestamp>.table` shape, using [`filename::format`] stamped with the current time.
///
/// The legacy 6-character code carries no recoverable meaning (neither an ordering nor a
/// timestamp), so migration cannot preserve it; instead each legacy file is assigned a fresh
/// creation time, and collisions within the same pass are broken by bumping the clock forward by
/// a millisecond until the name is free. This keeps the filename-time bijection intact
/// for every file the scanner subsequently discovers.
///
/// Migration is best-effort: a failure to rename one file is logged and does not abort the scan
/// of the rest of the directory.
#[span_fn]
pub fn migrate_legacy(dir: &Path, prefix: &str) -> std::io::Result<usize> {
    let mut migrated = 0;
    let mut next_stamp = Utc::now();

    let entries = fs::read_dir(dir)?;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read directory entry while migrating {prefix}: {err}");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !filename::is_legacy_shape(prefix, &name) {
            continue;
        }

        let old_path = entry.path();
        let (new_path, used_stamp) = loop {
            let candidate = dir.join(filename::format(prefix, next_stamp));
            if !candidate.exists() {
                break (candidate, next_stamp);
            }
            next_stamp += chrono::Duration::milliseconds(1);
        };

        match fs::rename(&old_path, &new_path) {
            Ok(()) => {
                info!("migrated legacy partition {name} to {:?}", new_path.file_name().unwrap());
                migrated += 1;
                next_stamp = used_stamp + chrono::Duration::milliseconds(1);
            }
            Err(err) => {
                warn!("failed to migrate legacy partition {name}: {err}");
            }
        }
    }

    Ok(migrated)
}

/// Scans `dir` for well-formed modern partition files belonging to `prefix`, parsing each
/// filename's creation time and asking `factory` to predict its RAM footprint without opening
/// it. Malformed or unreadable entries are skipped and logged; a single bad file never aborts
/// discovery of the rest of the table.
#[span_fn]
pub fn discover(
    dir: &Path,
    prefix: &str,
    rowdef: &RowDef,
    factory: &dyn PartitionStoreFactory,
) -> std::io::Result<Vec<DiscoveredPartition>> {
    let mut found = Vec::new();
    let expected_len = filename::modern_len(prefix);

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("failed to read directory entry while scanning {prefix}: {err}");
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.len() != expected_len {
            continue;
        }
        let created_at = match filename::parse_time(prefix, &name) {
            Ok(t) => t,
            Err(err) => {
                warn!("skipping malformed partition filename {name}: {err}");
                continue;
            }
        };

        let path: PathBuf = entry.path();
        let predicted_ram = match factory.static_ram_index_need(&path, rowdef) {
            Ok(ram) => ram,
            Err(err) => {
                warn!("failed to predict ram need for {name}: {err}");
                continue;
            }
        };

        found.push(DiscoveredPartition {
            filename: name,
            created_at,
            predicted_ram,
        });
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_row_store::FixedRowStoreFactory;

    #[test]
    fn migrates_then_discovers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.AB12CD"), b"").unwrap();
        fs::write(dir.path().join("t.ZZ99XX"), b"").unwrap();
        fs::write(dir.path().join("unrelated.txt"), b"").unwrap();

        let migrated = migrate_legacy(dir.path(), "t").unwrap();
        assert_eq!(migrated, 2);

        let rowdef = RowDef::new(8, 4);
        let factory = FixedRowStoreFactory;
        let found = discover(dir.path(), "t", &rowdef, &factory).unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn skips_malformed_and_foreign_entries() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t.not-a-timestamp.table"), b"").unwrap();
        fs::write(dir.path().join("other.20240101000000000.table"), b"").unwrap();

        let rowdef = RowDef::new(8, 4);
        let factory = FixedRowStoreFactory;
        let found = discover(dir.path(), "t", &rowdef, &factory).unwrap();
        assert!(found.is_empty());
    }
}
