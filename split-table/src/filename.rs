//! Filename codec: encodes and parses timestamped partition filenames.
//!
//! A modern partition filename has the shape `<prefix>.<timestamp17>.table`, where
//! `timestamp17` is a 17-character compact UTC timestamp with millisecond precision
//! (`yyyyMMddHHmmssSSS`). Total length is `len(prefix) + 1 + 17 + 6 == len(prefix) + 24`.
//!
//! A legacy partition filename has the shape `<prefix>.XXXXXX`, exactly `len(prefix) + 7`
//! characters; see [`crate::scanner`] for how those are migrated.

use crate::error::FilenameError;
use chrono::{DateTime, NaiveDateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const TIMESTAMP_LEN: usize = 17;
const SUFFIX: &str = ".table";

/// Formats a modern partition filename for `prefix` stamped with `now`.
///
/// Calling this with a monotonically increasing `now` (as the rollover path does, by
/// construction never rolling over twice within the same millisecond) produces strictly
/// increasing filenames.
pub fn format(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}.{}{SUFFIX}", now.format(TIMESTAMP_FORMAT))
}

/// The total length of a modern filename for the given prefix.
pub fn modern_len(prefix: &str) -> usize {
    prefix.len() + 1 + TIMESTAMP_LEN + SUFFIX.len()
}

/// The total length of a legacy filename for the given prefix.
pub fn legacy_len(prefix: &str) -> usize {
    prefix.len() + 1 + 6
}

/// Returns `true` if `filename` has the legacy `<prefix>.XXXXXX` shape (exact length, dot
/// separator, and nothing else checked — the 6-character code's contents are opaque).
pub fn is_legacy_shape(prefix: &str, filename: &str) -> bool {
    filename.len() == legacy_len(prefix)
        && filename.starts_with(prefix)
        && filename.as_bytes().get(prefix.len()) == Some(&b'.')
}

/// Parses the creation-time out of a modern filename. Fails with [`FilenameError`] on any shape
/// mismatch.
pub fn parse_time(prefix: &str, filename: &str) -> Result<DateTime<Utc>, FilenameError> {
    let malformed = || FilenameError::MalformedName(filename.to_string());

    if filename.len() != modern_len(prefix) {
        return Err(malformed());
    }
    if !filename.starts_with(prefix) || filename.as_bytes().get(prefix.len()) != Some(&b'.') {
        return Err(malformed());
    }
    if !filename.ends_with(SUFFIX) {
        return Err(malformed());
    }
    let timestamp_start = prefix.len() + 1;
    let timestamp_end = timestamp_start + TIMESTAMP_LEN;
    let timestamp = &filename[timestamp_start..timestamp_end];
    if &filename[timestamp_end..] != SUFFIX {
        return Err(malformed());
    }
    let naive = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|_| malformed())?;
    Ok(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trips() {
        let now = Utc.with_ymd_and_hms(2024, 3, 7, 12, 34, 56).unwrap() + chrono::Duration::milliseconds(789);
        let name = format("t", now);
        assert_eq!(name.len(), modern_len("t"));
        assert_eq!(parse_time("t", &name).unwrap(), now);
    }

    #[test]
    fn rejects_wrong_prefix() {
        let now = Utc::now();
        let name = format("t", now);
        assert!(parse_time("other", &name).is_err());
    }

    #[test]
    fn rejects_truncated_name() {
        assert!(parse_time("t", "t.20240307123456789.tabl").is_err());
    }

    #[test]
    fn legacy_shape_detected() {
        assert!(is_legacy_shape("t", "t.AB12CD"));
        assert!(!is_legacy_shape("t", "t.AB12CD.table"));
    }

    #[test]
    fn monotonic_clock_yields_increasing_names() {
        let base = Utc::now();
        let a = format("t", base);
        let b = format("t", base + chrono::Duration::milliseconds(1));
        assert!(b > a);
    }
}
