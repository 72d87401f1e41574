//! Result merger: union-with-dedup and equi-join over already
//! fetched [`ExecutionResult`]s. No streaming — everything is materialized.

use crate::model::{ExecutionResult, RdfTerm, Row};

/// Join kind for [`join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    FullOuter,
}

/// Concatenate rows from each result in order. When `dedup` is set, rows
/// whose canonical tuple (values for the union's column list, in order)
/// already appeared are dropped.
pub fn union(results: &[ExecutionResult], dedup: bool) -> ExecutionResult {
    let columns = results
        .iter()
        .find(|r| !r.columns.is_empty())
        .map(|r| r.columns.clone())
        .unwrap_or_default();

    let mut rows = Vec::new();
    let mut seen = std::collections::HashSet::new();
    let mut total_wall_time_ms = 0u64;
    let mut sources = Vec::new();
    let mut partial = false;
    let mut truncated = false;

    for result in results {
        total_wall_time_ms = total_wall_time_ms.max(result.total_wall_time_ms);
        sources.extend(result.sources.clone());
        partial |= result.partial;
        truncated |= result.truncated;
        for row in &result.rows {
            if dedup {
                let key = canonical_tuple(row, &columns);
                if !seen.insert(key) {
                    continue;
                }
            }
            rows.push(row.clone());
        }
    }

    ExecutionResult { columns, rows, boolean: None, sources, total_wall_time_ms, partial, truncated }
}

fn canonical_tuple(row: &Row, columns: &[String]) -> Vec<Option<String>> {
    columns.iter().map(|c| row.get(c).map(|t| t.to_string())).collect()
}

/// Equi-join two results over `join_variables`. For left-outer/full-outer,
/// missing columns from the absent side are filled with `default`.
pub fn join(
    left: &ExecutionResult,
    right: &ExecutionResult,
    join_variables: &[String],
    kind: JoinKind,
    default: &RdfTerm,
) -> ExecutionResult {
    let mut columns = left.columns.clone();
    for c in &right.columns {
        if !columns.contains(c) {
            columns.push(c.clone());
        }
    }

    let key_of = |row: &Row| -> Vec<Option<RdfTerm>> {
        join_variables.iter().map(|v| row.get(v).cloned()).collect()
    };

    let mut rows = Vec::new();
    let mut matched_right = vec![false; right.rows.len()];

    for left_row in &left.rows {
        let left_key = key_of(left_row);
        let mut matched = false;
        for (i, right_row) in right.rows.iter().enumerate() {
            if key_of(right_row) == left_key {
                matched = true;
                matched_right[i] = true;
                rows.push(merge_rows(left_row, right_row));
            }
        }
        if !matched && matches!(kind, JoinKind::LeftOuter | JoinKind::FullOuter) {
            rows.push(pad_row(left_row, &right.columns, default));
        }
    }

    if matches!(kind, JoinKind::FullOuter) {
        for (i, right_row) in right.rows.iter().enumerate() {
            if !matched_right[i] {
                rows.push(pad_row_left(right_row, &left.columns, default));
            }
        }
    }

    let total_wall_time_ms = left.total_wall_time_ms.max(right.total_wall_time_ms);
    let mut sources = left.sources.clone();
    sources.extend(right.sources.clone());

    ExecutionResult {
        columns,
        rows,
        boolean: None,
        sources,
        total_wall_time_ms,
        partial: left.partial || right.partial,
        truncated: left.truncated || right.truncated,
    }
}

fn merge_rows(left: &Row, right: &Row) -> Row {
    let mut row = left.clone();
    for (k, v) in right {
        row.entry(k.clone()).or_insert_with(|| v.clone());
    }
    row
}

fn pad_row(row: &Row, missing_columns: &[String], default: &RdfTerm) -> Row {
    let mut out = row.clone();
    for c in missing_columns {
        out.entry(c.clone()).or_insert_with(|| default.clone());
    }
    out
}

fn pad_row_left(row: &Row, missing_columns: &[String], default: &RdfTerm) -> Row {
    pad_row(row, missing_columns, default)
}
