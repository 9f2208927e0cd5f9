//! Stat file parsing.
//!
//! DSI Studio writes tract statistics as one `key<TAB>value` pair per line.
//! Lines without a tab, or whose value is not a number, are dropped
//! individually so a partially written file still yields its good lines.

use crate::error::{Result, TractStatError};
use crate::models::StatRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::trace;

/// Parse the stat file at `path`.
///
/// Fails with [`TractStatError::StatFileMissing`] when the file does not exist.
pub fn parse_stat_file(path: &Path) -> Result<StatRecord> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => TractStatError::StatFileMissing {
            path: path.to_path_buf(),
        },
        _ => TractStatError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let record = parse_stat_str(&content);
    trace!("Parsed {} metrics from {}", record.len(), path.display());
    Ok(record)
}

/// Parse stat file content.
pub fn parse_stat_str(content: &str) -> StatRecord {
    let mut record = StatRecord::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let Some((key, value)) = line.split_once('\t') else {
            trace!("Line {}: no tab separator, skipped", index + 1);
            continue;
        };

        match value.trim().parse::<f64>() {
            Ok(value) => record.insert(key, value),
            Err(_) => trace!("Line {}: non-numeric value for '{}', skipped", index + 1, key),
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_skips_lines_without_tab() {
        let record = parse_stat_str("fa\t0.42\nbad_line\ncount\t10");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("fa"), Some(0.42));
        assert_eq!(record.get("count"), Some(10.0));
        assert!(!record.contains_key("bad_line"));
    }

    #[test]
    fn test_skips_non_numeric_values() {
        let record = parse_stat_str("tract name\tCST_L\nfa\t0.5\nqa\t\nmd\t0.0007");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("fa"), Some(0.5));
        assert_eq!(record.get("md"), Some(0.0007));
        assert!(!record.contains_key("tract name"));
    }

    #[test]
    fn test_trims_surrounding_whitespace() {
        let record = parse_stat_str("  number of tracts\t 1520 \r\n\n   \ntotal volume(mm^3)\t48213.5\n");

        assert_eq!(record.get("number of tracts"), Some(1520.0));
        assert_eq!(record.get("total volume(mm^3)"), Some(48213.5));
    }

    #[test]
    fn test_keeps_unknown_keys() {
        let record = parse_stat_str("branch volume(mm^3)\t12.5\nfa\t0.4");
        assert_eq!(record.get("branch volume(mm^3)"), Some(12.5));
    }

    #[test]
    fn test_empty_content() {
        assert!(parse_stat_str("").is_empty());
    }

    #[test]
    fn test_parse_file_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("CST_L.stat.txt");
        std::fs::write(
            &path,
            "number of tracts\t300\nmean length(mm)\t87.2\nfa\t0.7\ngarbage\n",
        )
        .unwrap();

        let first = parse_stat_file(&path).unwrap();
        let second = parse_stat_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let err = parse_stat_file(&temp_dir.path().join("absent.stat.txt")).unwrap_err();

        assert!(matches!(err, TractStatError::StatFileMissing { .. }));
        assert!(err.is_not_found());
    }
}
