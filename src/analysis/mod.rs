//! Single-pass aggregations over a scan cursor.
//!
//! All three algorithms consume any `Iterator<Item = DbResult<ScanRow>>`,
//! so they run identically against a live [`ScanCursor`] and in-memory
//! fixtures. Numeric interpretation of stored text happens here and only
//! here, through one shared parse routine, so "invalid" and "absent" mean
//! the same thing to every aggregator.
//!
//! [`ScanCursor`]: crate::storage::ScanCursor

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::DbResult;
use crate::storage::record::{Column, ScanRow};

/// One top-K result entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub name: String,
    pub value: f64,
}

/// Parse a cell's text as a base-10 integer or float. Anything else
/// (empty text, `N/A`, `nan`, infinities) is absent, never zero.
pub fn parse_metric(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Mean of `column` over all rows where the cell is present and parses
/// numerically. Rows that do not parse stay out of the denominator.
/// `None` when no cell parsed; an empty column is a valid outcome, not
/// an error.
pub fn average<I>(rows: I, column: Column) -> DbResult<Option<f64>>
where
    I: IntoIterator<Item = DbResult<ScanRow>>,
{
    let mut total = 0.0;
    let mut count = 0u64;
    for row in rows {
        let row = row?;
        if let Some(value) = row.cell(column).and_then(parse_metric) {
            total += value;
            count += 1;
        }
    }
    Ok((count > 0).then(|| total / count as f64))
}

/// The `k` highest values of `metric`, labeled by `name`. A row missing
/// either cell, or whose metric does not parse, is excluded from the
/// candidate set entirely. Candidates are materialized and stable-sorted
/// descending, so equal values keep their scan order and repeated runs
/// over the same table are reproducible. Callers targeting datasets too
/// large to materialize can substitute a bounded min-heap of size `k`
/// behind the same signature.
pub fn top_k<I>(rows: I, metric: Column, name: Column, k: usize) -> DbResult<Vec<RankedEntry>>
where
    I: IntoIterator<Item = DbResult<ScanRow>>,
{
    let mut candidates = Vec::new();
    for row in rows {
        let row = row?;
        let (Some(name), Some(value)) = (row.cell(name), row.cell(metric).and_then(parse_metric))
        else {
            continue;
        };
        candidates.push(RankedEntry {
            name: name.to_string(),
            value,
        });
    }
    candidates.sort_by(|a, b| b.value.total_cmp(&a.value));
    candidates.truncate(k);
    Ok(candidates)
}

/// Occurrence count per distinct text value of `column`, sorted by count
/// descending with ties in first-seen order. Absent cells count nothing.
pub fn frequency_count<I>(rows: I, column: Column) -> DbResult<Vec<(String, u64)>>
where
    I: IntoIterator<Item = DbResult<ScanRow>>,
{
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for row in rows {
        let row = row?;
        if let Some(value) = row.cell(column) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::storage::record::{GPU_USAGE, PLATFORM, PROMPT, SHARES};

    fn row(key: &str, cells: &[(Column, &str)]) -> DbResult<ScanRow> {
        Ok(ScanRow {
            key: key.to_string(),
            cells: cells
                .iter()
                .map(|(column, value)| (*column, value.to_string()))
                .collect(),
        })
    }

    #[test]
    fn test_parse_metric() {
        assert_eq!(parse_metric("42"), Some(42.0));
        assert_eq!(parse_metric("3.5"), Some(3.5));
        assert_eq!(parse_metric(" 7 "), Some(7.0));
        assert_eq!(parse_metric("-1.25"), Some(-1.25));
        assert_eq!(parse_metric("1e3"), Some(1000.0));
        assert_eq!(parse_metric(""), None);
        assert_eq!(parse_metric("   "), None);
        assert_eq!(parse_metric("N/A"), None);
        assert_eq!(parse_metric("12 KB"), None);
        assert_eq!(parse_metric("nan"), None);
        assert_eq!(parse_metric("inf"), None);
    }

    #[test]
    fn test_average_basic() {
        let rows = vec![
            row("img_0", &[(GPU_USAGE, "10")]),
            row("img_1", &[(GPU_USAGE, "40")]),
            row("img_2", &[(GPU_USAGE, "25")]),
        ];
        assert_eq!(average(rows, GPU_USAGE).unwrap(), Some(25.0));
    }

    #[test]
    fn test_average_skips_invalid_and_missing() {
        let rows = vec![
            row("img_0", &[(GPU_USAGE, "10")]),
            row("img_1", &[(GPU_USAGE, "N/A")]),
            row("img_2", &[]),
            row("img_3", &[(GPU_USAGE, "30")]),
        ];
        // Only the two valid cells make up the denominator.
        assert_eq!(average(rows, GPU_USAGE).unwrap(), Some(20.0));
    }

    #[test]
    fn test_average_empty_column_is_none() {
        let rows = vec![row("img_0", &[]), row("img_1", &[(GPU_USAGE, "oops")])];
        assert_eq!(average(rows, GPU_USAGE).unwrap(), None);
        assert_eq!(average(Vec::new(), GPU_USAGE).unwrap(), None);
    }

    #[test]
    fn test_top_k_orders_descending() {
        let rows = vec![
            row("img_0", &[(PROMPT, "x"), (GPU_USAGE, "10")]),
            row("img_1", &[(PROMPT, "y"), (GPU_USAGE, "40")]),
            row("img_2", &[(PROMPT, "z"), (GPU_USAGE, "25")]),
        ];
        let top = top_k(rows, GPU_USAGE, PROMPT, 2).unwrap();
        assert_eq!(
            top,
            vec![
                RankedEntry { name: "y".to_string(), value: 40.0 },
                RankedEntry { name: "z".to_string(), value: 25.0 },
            ]
        );
    }

    #[test]
    fn test_top_k_excludes_incomplete_rows() {
        let rows = vec![
            row("img_0", &[(PROMPT, "no metric")]),
            row("img_1", &[(GPU_USAGE, "99")]),
            row("img_2", &[(PROMPT, "bad metric"), (GPU_USAGE, "N/A")]),
            row("img_3", &[(PROMPT, "ok"), (GPU_USAGE, "5")]),
        ];
        let top = top_k(rows, GPU_USAGE, PROMPT, 10).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].name, "ok");
    }

    #[test]
    fn test_top_k_returns_fewer_than_k() {
        let rows = vec![
            row("img_0", &[(PROMPT, "a"), (SHARES, "1")]),
            row("img_1", &[(PROMPT, "b"), (SHARES, "2")]),
        ];
        let top = top_k(rows, SHARES, PROMPT, 10).unwrap();
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_top_k_equal_values_keep_scan_order() {
        let rows = vec![
            row("img_0", &[(PROMPT, "first"), (SHARES, "7")]),
            row("img_1", &[(PROMPT, "second"), (SHARES, "7")]),
            row("img_2", &[(PROMPT, "third"), (SHARES, "7")]),
        ];
        let top = top_k(rows, SHARES, PROMPT, 3).unwrap();
        let names: Vec<&str> = top.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_top_k_duplicate_names_are_kept() {
        let rows = vec![
            row("img_0", &[(PROMPT, "same prompt"), (SHARES, "3")]),
            row("img_1", &[(PROMPT, "same prompt"), (SHARES, "9")]),
        ];
        let top = top_k(rows, SHARES, PROMPT, 10).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].value, 9.0);
        assert_eq!(top[1].value, 3.0);
    }

    #[test]
    fn test_frequency_count() {
        let rows = ["A", "B", "A", "C", "B", "A"]
            .iter()
            .enumerate()
            .map(|(i, platform)| row(&format!("img_{}", i), &[(PLATFORM, *platform)]))
            .collect::<Vec<_>>();
        let counts = frequency_count(rows, PLATFORM).unwrap();
        assert_eq!(
            counts,
            vec![
                ("A".to_string(), 3),
                ("B".to_string(), 2),
                ("C".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_frequency_count_ties_keep_first_seen_order() {
        let rows = ["D", "E", "D", "E"]
            .iter()
            .enumerate()
            .map(|(i, platform)| row(&format!("img_{}", i), &[(PLATFORM, *platform)]))
            .collect::<Vec<_>>();
        let counts = frequency_count(rows, PLATFORM).unwrap();
        assert_eq!(counts, vec![("D".to_string(), 2), ("E".to_string(), 2)]);
    }

    #[test]
    fn test_cursor_error_is_surfaced() {
        let rows: Vec<DbResult<ScanRow>> = vec![
            row("img_0", &[(GPU_USAGE, "10")]),
            Err(DbError::StoreUnavailable("connection lost".to_string())),
        ];
        assert!(average(rows, GPU_USAGE).is_err());
    }
}
