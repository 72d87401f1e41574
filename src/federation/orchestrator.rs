//! Resilient Orchestrator: wraps a [`QueryExecutor`] with retry,
//! fallback plans, and SILENT partial-result acceptance across federated
//! legs.

use std::sync::Arc;

use tokio::time::sleep;

use crate::config::{ConnectionConfig, EndpointDescriptor};
use crate::error::{Error, Result};
use crate::model::{ExecutionResult, FederatedPlan, QueryPlan, SourceTiming};
use crate::query::QueryExecutor;

/// Wraps [`QueryExecutor`] with the retry/fallback/partial-acceptance policy
/// Holds no state of its own beyond its dependencies, so it's
/// cheap to construct per call.
pub struct ResilientOrchestrator {
    executor: Arc<QueryExecutor>,
    connection: ConnectionConfig,
}

impl ResilientOrchestrator {
    pub fn new(executor: Arc<QueryExecutor>, connection: ConnectionConfig) -> Self {
        Self { executor, connection }
    }

    /// Execute `plan` against `endpoint`, retrying idempotent failures with
    /// exponential backoff, then trying `fallback_plans` in order if the
    /// primary plan is exhausted.
    pub async fn execute(
        &self,
        endpoint: &EndpointDescriptor,
        plan: &QueryPlan,
        fallback_plans: &[QueryPlan],
    ) -> Result<ExecutionResult> {
        match self.execute_with_retry(endpoint, &plan.render(), plan.limit).await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                for fallback in fallback_plans {
                    if let Ok(result) = self.execute_with_retry(endpoint, &fallback.render(), fallback.limit).await {
                        return Ok(result);
                    }
                }
                Err(primary_err)
            }
        }
    }

    async fn execute_with_retry(&self, endpoint: &EndpointDescriptor, sparql: &str, limit: Option<u64>) -> Result<ExecutionResult> {
        let mut last_err = None;
        for attempt in 0..=self.connection.retry_attempts {
            match self.executor.execute(endpoint, sparql, limit).await {
                Ok(result) => return Ok(result),
                Err(err) if err.is_retryable() && attempt < self.connection.retry_attempts => {
                    tracing::warn!(endpoint = endpoint.url(), attempt, error = %err, "retrying after retryable failure");
                    sleep(self.connection.delay_for_attempt(attempt)).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| Error::Internal("retry loop exited without an error".to_string())))
    }

    /// Execute every leg of a federated plan. Legs are tried in the plan's
    /// cost order; a `SILENT`-marked leg's failure degrades to an empty,
    /// `degraded` source rather than aborting the federation; a non-SILENT
    /// leg's failure is fatal.
    pub async fn execute_federated(
        &self,
        endpoints: &std::collections::HashMap<String, EndpointDescriptor>,
        plan: &FederatedPlan,
    ) -> Result<Vec<ExecutionResult>> {
        let mut results = Vec::with_capacity(plan.legs.len());
        for leg in plan.legs_by_cost() {
            let Some(endpoint) = endpoints.get(&leg.plan.endpoint_url) else {
                return Err(Error::config(format!("no endpoint descriptor for {}", leg.plan.endpoint_url)));
            };
            match self.execute_with_retry(endpoint, &leg.plan.render(), leg.plan.limit).await {
                Ok(mut result) => {
                    result.partial |= false;
                    results.push(result);
                }
                Err(err) if leg.silent => {
                    tracing::warn!(endpoint = endpoint.url(), error = %err, "SILENT federated leg failed, degrading to partial result");
                    results.push(ExecutionResult {
                        columns: Vec::new(),
                        rows: Vec::new(),
                        boolean: None,
                        sources: vec![SourceTiming {
                            endpoint_url: endpoint.url().to_string(),
                            wall_time_ms: 0,
                            row_count: 0,
                            degraded: true,
                        }],
                        total_wall_time_ms: 0,
                        partial: true,
                        truncated: false,
                    });
                }
                Err(err) => return Err(Error::FederationFatal { endpoint: endpoint.url().to_string(), message: err.to_string() }),
            }
        }
        Ok(results)
    }
}
