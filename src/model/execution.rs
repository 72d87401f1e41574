//! The result shape returned by the Query Executor and, after
//! merging, by the Federated Execution Orchestrator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::terms::RdfTerm;

/// One result row: a mapping from SPARQL variable name to bound term. A
/// variable absent from a row (rather than bound to some null sentinel)
/// means it was unbound for that row, matching SPARQL-results semantics.
pub type Row = BTreeMap<String, RdfTerm>;

/// Per-endpoint provenance and timing, carried alongside merged rows so a
/// federated result can still be attributed back to its sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTiming {
    pub endpoint_url: String,
    pub wall_time_ms: u64,
    pub row_count: usize,
    /// Set when this source's leg failed but was `SERVICE SILENT` (or the
    /// orchestrator otherwise chose to degrade rather than abort).
    pub degraded: bool,
}

/// The outcome of executing a [`crate::model::plan::QueryPlan`] or
/// [`crate::model::plan::FederatedPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Present only for ASK queries.
    pub boolean: Option<bool>,
    pub sources: Vec<SourceTiming>,
    pub total_wall_time_ms: u64,
    /// True if one or more `SERVICE SILENT` legs failed and were dropped
    /// rather than aborting the whole federation.
    pub partial: bool,
    /// True if the row count was capped by the plan's `LIMIT` rather than
    /// reflecting every matching row. When set, `rows.len()` equals the
    /// plan's limit.
    pub truncated: bool,
}

impl ExecutionResult {
    pub fn empty_select(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            boolean: None,
            sources: Vec::new(),
            total_wall_time_ms: 0,
            partial: false,
            truncated: false,
        }
    }

    pub fn ask(value: bool) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            boolean: Some(value),
            sources: Vec::new(),
            total_wall_time_ms: 0,
            partial: false,
            truncated: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.boolean.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_select_has_no_rows() {
        let result = ExecutionResult::empty_select(vec!["x".into()]);
        assert_eq!(result.row_count(), 0);
        assert!(result.is_empty());
        assert!(result.boolean.is_none());
    }

    #[test]
    fn ask_result_carries_boolean_not_rows() {
        let result = ExecutionResult::ask(true);
        assert_eq!(result.boolean, Some(true));
        assert!(result.rows.is_empty());
        assert!(!result.is_empty());
    }

    #[test]
    fn row_allows_partially_bound_variables() {
        let mut row: Row = BTreeMap::new();
        row.insert("x".into(), RdfTerm::iri("http://e/1"));
        let result = ExecutionResult {
            columns: vec!["x".into(), "y".into()],
            rows: vec![row],
            boolean: None,
            sources: Vec::new(),
            total_wall_time_ms: 5,
            partial: false,
            truncated: false,
        };
        assert!(!result.rows[0].contains_key("y"));
    }
}
