//! Query executor: send a rendered SPARQL query to one endpoint,
//! governed by its rate limiter, and parse the SPARQL-results JSON response
//! into an [`ExecutionResult`].

use std::sync::Arc;

use serde_json::Value;

use crate::config::EndpointDescriptor;
use crate::error::{Error, Result};
use crate::model::{ExecutionResult, Row, SourceTiming};
use crate::rate_limiter::RateLimiterRegistry;
use crate::transport::{RawResponse, Transport};

/// POST is used once the rendered query exceeds this many characters — long
/// enough to risk hitting a GET/URL length limit on some endpoints.
const POST_THRESHOLD_CHARS: usize = 2048;

pub struct QueryExecutor {
    transport: Arc<dyn Transport>,
    rate_limiters: Arc<RateLimiterRegistry>,
}

impl QueryExecutor {
    pub fn new(transport: Arc<dyn Transport>, rate_limiters: Arc<RateLimiterRegistry>) -> Self {
        Self { transport, rate_limiters }
    }

    /// Execute `sparql` against `endpoint`, acquiring a rate-limit token
    /// first if the descriptor carries one. `limit` is the plan's `LIMIT`,
    /// if any — when the row count comes back equal to it, the result is
    /// flagged `truncated` since a full result set and a capped one are
    /// indistinguishable from the response alone.
    pub async fn execute(&self, endpoint: &EndpointDescriptor, sparql: &str, limit: Option<u64>) -> Result<ExecutionResult> {
        if let Some((rate, burst)) = endpoint.rate_limit() {
            self.rate_limiters.get_or_create(endpoint.url(), rate, burst).acquire(1).await;
        }

        let raw = if sparql.len() > POST_THRESHOLD_CHARS {
            self.transport.query_post(endpoint, sparql).await?
        } else {
            self.transport.query(endpoint, sparql).await?
        };

        let result = parse_sparql_results(endpoint.url(), &raw, limit)?;
        Ok(result)
    }
}

/// Parse a SPARQL 1.1 Query Results JSON Format response body:
/// `{"head": {"vars": [...]}, "results": {"bindings": [...]}}` for SELECT,
/// or `{"head": {}, "boolean": true|false}` for ASK.
fn parse_sparql_results(endpoint_url: &str, raw: &RawResponse, limit: Option<u64>) -> Result<ExecutionResult> {
    let body: Value = raw.json().map_err(|e| Error::parse(endpoint_url, e))?;

    if let Some(boolean) = body.get("boolean").and_then(Value::as_bool) {
        let mut result = ExecutionResult::ask(boolean);
        result.total_wall_time_ms = raw.elapsed_ms;
        result.sources.push(SourceTiming {
            endpoint_url: endpoint_url.to_string(),
            wall_time_ms: raw.elapsed_ms,
            row_count: 0,
            degraded: false,
        });
        return Ok(result);
    }

    let columns: Vec<String> = body
        .get("head")
        .and_then(|h| h.get("vars"))
        .and_then(Value::as_array)
        .map(|vars| vars.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let bindings = body
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut rows: Vec<Row> = Vec::with_capacity(bindings.len());
    for binding in &bindings {
        let Some(obj) = binding.as_object() else { continue };
        let mut row: Row = Row::new();
        for (var, term_json) in obj {
            if let Some(term) = crate::model::RdfTerm::from_binding(term_json) {
                row.insert(var.clone(), term);
            }
        }
        rows.push(row);
    }

    let row_count = rows.len();
    let truncated = limit.is_some_and(|limit| row_count as u64 == limit);
    Ok(ExecutionResult {
        columns,
        rows,
        boolean: None,
        sources: vec![SourceTiming {
            endpoint_url: endpoint_url.to_string(),
            wall_time_ms: raw.elapsed_ms,
            row_count,
            degraded: false,
        }],
        total_wall_time_ms: raw.elapsed_ms,
        partial: false,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use std::collections::HashMap as StdHashMap;

    fn raw(body: &str) -> RawResponse {
        RawResponse { status: 200, headers: StdHashMap::new(), body: body.to_string(), elapsed_ms: 5 }
    }

    #[test]
    fn parses_select_bindings_into_rows() {
        let body = r#"{"head":{"vars":["s"]},"results":{"bindings":[{"s":{"type":"uri","value":"http://e/1"}}]}}"#;
        let result = parse_sparql_results("https://e", &raw(body), None).unwrap();
        assert_eq!(result.columns, vec!["s".to_string()]);
        assert_eq!(result.row_count(), 1);
        assert!(result.boolean.is_none());
        assert!(!result.truncated);
    }

    #[test]
    fn parses_ask_response_as_boolean() {
        let body = r#"{"head":{},"boolean":true}"#;
        let result = parse_sparql_results("https://e", &raw(body), None).unwrap();
        assert_eq!(result.boolean, Some(true));
        assert!(result.rows.is_empty());
    }

    #[test]
    fn row_count_matching_limit_flags_truncated() {
        let body = r#"{"head":{"vars":["s"]},"results":{"bindings":[{"s":{"type":"uri","value":"http://e/1"}}]}}"#;
        let result = parse_sparql_results("https://e", &raw(body), Some(1)).unwrap();
        assert!(result.truncated);

        let result = parse_sparql_results("https://e", &raw(body), Some(10)).unwrap();
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn execute_sends_long_queries_successfully() {
        let transport = Arc::new(MockTransport::new());
        let long_query = format!("SELECT * WHERE {{ ?s ?p ?o FILTER(?s = <{}>) }}", "x".repeat(3000));
        transport.push_json("https://e", serde_json::json!({"head": {"vars": ["s"]}, "results": {"bindings": []}}));

        let executor = QueryExecutor::new(transport.clone(), Arc::new(RateLimiterRegistry::new()));
        let endpoint = EndpointDescriptor::new("https://e");
        let result = executor.execute(&endpoint, &long_query, None).await.unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn execute_sends_short_queries_successfully() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json("https://e", serde_json::json!({"head": {"vars": ["s"]}, "results": {"bindings": []}}));

        let executor = QueryExecutor::new(transport.clone(), Arc::new(RateLimiterRegistry::new()));
        let endpoint = EndpointDescriptor::new("https://e");
        let result = executor.execute(&endpoint, "SELECT * WHERE { ?s ?p ?o }", None).await.unwrap();

        assert!(result.rows.is_empty());
        assert_eq!(transport.calls().len(), 1);
    }
}
