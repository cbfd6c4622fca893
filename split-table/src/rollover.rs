//! Rollover policy: decides when the active partition should be retired in favor of a
//! fresh one, based on its age and on-disk size.

use crate::filename;
use crate::store::PartitionStore;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Age and size thresholds past which the active partition is rolled over.
#[derive(Debug, Clone, Copy)]
pub struct RolloverPolicy {
    pub max_age: Duration,
    pub max_size: u64,
}

impl RolloverPolicy {
    pub fn new(max_age: Duration, max_size: u64) -> Self {
        Self { max_age, max_size }
    }

    /// `true` if the active partition named `filename` (created at the time encoded in its own
    /// name) has crossed either threshold as of `now`.
    pub(crate) fn is_due(&self, prefix: &str, filename_str: &str, store: &dyn PartitionStore, now: DateTime<Utc>) -> bool {
        let created_at = match filename::parse_time(prefix, filename_str) {
            Ok(t) => t,
            Err(_) => return false,
        };
        let age = (now - created_at).to_std().unwrap_or(Duration::ZERO);
        age >= self.max_age || store.file_size() >= self.max_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed_row_store::FixedRowStoreFactory;
    use crate::rowdef::RowDef;
    use crate::store::{OpenOptions, PartitionStoreFactory};
    use std::sync::Arc;

    fn open(dir: &std::path::Path, name: &str, rowdef: &RowDef) -> Arc<dyn PartitionStore> {
        let factory = FixedRowStoreFactory;
        factory
            .open(
                &dir.join(name),
                rowdef,
                &OpenOptions {
                    buffer_size: 4096,
                    initial_capacity: 16,
                    use_tail_cache: true,
                    exceed_large_limit: false,
                    create_new: true,
                },
            )
            .unwrap()
    }

    #[test]
    fn rolls_over_on_age() {
        let dir = tempfile::tempdir().unwrap();
        let rowdef = RowDef::new(8, 4);
        let old_name = crate::filename::format("t", Utc::now() - chrono::Duration::hours(2));
        let store = open(dir.path(), &old_name, &rowdef);

        let policy = RolloverPolicy::new(Duration::from_secs(3600), u64::MAX);
        assert!(policy.is_due("t", &old_name, store.as_ref(), Utc::now()));
    }

    #[test]
    fn does_not_roll_over_when_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let rowdef = RowDef::new(8, 4);
        let fresh_name = crate::filename::format("t", Utc::now());
        let store = open(dir.path(), &fresh_name, &rowdef);

        let policy = RolloverPolicy::new(Duration::from_secs(3600), u64::MAX);
        assert!(!policy.is_due("t", &fresh_name, store.as_ref(), Utc::now()));
    }
}
