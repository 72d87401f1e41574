//! The Capability Detector: runs the fixed, ordered probe battery against
//! one endpoint.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DiscoveryConfig, EndpointDescriptor};
use crate::error::Error;
use crate::model::{DiscoveryKnowledge, DiscoveryMode, Feature};
use crate::transport::Transport;
use crate::vocab::{CollisionStrategy, VocabularyIndex};

use super::probes::{self, StatisticKind};

/// Invoked before each probe with `(step_index, step_count, label)`.
pub type ProgressCallback<'a> = dyn Fn(usize, usize, &str) + Send + Sync + 'a;

/// Runs the fixed, ordered probe battery against one endpoint at a time.
pub struct CapabilityDetector {
    transport: Arc<dyn Transport>,
}

impl CapabilityDetector {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Run the full probe battery, respecting `config.fast_mode` (skips
    /// namespace discovery, function probes, and statistics) and the
    /// overall wall-clock deadline (remaining probes are skipped and
    /// recorded once it elapses).
    pub async fn detect(
        &self,
        endpoint: &EndpointDescriptor,
        config: &DiscoveryConfig,
        on_progress: Option<&ProgressCallback<'_>>,
    ) -> DiscoveryKnowledge {
        let mode = if config.fast_mode { DiscoveryMode::Fast } else { DiscoveryMode::Full };
        let mut knowledge = DiscoveryKnowledge::empty(endpoint.url(), mode);
        let started = Instant::now();
        let deadline = config.overall_deadline;

        let step_count = if config.fast_mode {
            1 + 1 + Feature::ALL.len()
        } else {
            1 + 1 + 1 + Feature::ALL.len() + probes::PROBED_FUNCTIONS.len() + StatisticKind::ALL.len()
        };
        let mut step = 0usize;
        let mut report = |label: &str| {
            step += 1;
            if let Some(cb) = on_progress {
                cb(step, step_count, label);
            }
            tracing::debug!(endpoint = endpoint.url(), probe = label, step, step_count, "running probe");
        };

        let budget_exceeded = |started: Instant| started.elapsed() >= deadline;

        if budget_exceeded(started) {
            return self.finish_with_remaining(knowledge, started, config, &["version", "named_graphs", "namespace_discovery"]);
        }

        // 1. Version probe.
        report("version");
        let version_result = self.transport.query(endpoint, probes::version_probe_query()).await;
        let http_5xx = matches!(&version_result, Err(Error::HttpError { code, .. }) if (500..600).contains(code));
        knowledge.sparql_version = probes::classify_version(version_result.is_ok(), http_5xx);
        if let Err(err) = &version_result {
            if !http_5xx {
                note_outcome(&mut knowledge, "version", err);
            }
        }

        if budget_exceeded(started) {
            return self.finish_with_remaining(knowledge, started, config, &["named_graphs", "namespace_discovery"]);
        }

        // 2. Named graphs. Failure here never downgrades the version verdict.
        report("named_graphs");
        match self.transport.query(endpoint, probes::named_graphs_query()).await {
            Ok(response) => match response.json() {
                Ok(body) => knowledge.named_graphs = probes::named_graphs_from_bindings(&body),
                Err(err) => note_outcome(&mut knowledge, "named_graphs", &err),
            },
            Err(err) => note_outcome(&mut knowledge, "named_graphs", &err),
        }

        if budget_exceeded(started) {
            return self.finish_with_remaining(knowledge, started, config, &["namespace_discovery"]);
        }

        // 3. Namespace discovery — skipped entirely in fast mode.
        if !config.fast_mode {
            report("namespace_discovery");
            let query = probes::namespace_sample_query(config.max_samples);
            match self.transport.query(endpoint, &query).await {
                Ok(response) => match response.json() {
                    Ok(body) => {
                        knowledge.namespaces = probes::namespaces_from_bindings(&body).into_iter().collect();
                        let (classes, properties) = probes::classes_and_properties_from_bindings(&body);
                        knowledge.known_classes = classes;
                        knowledge.known_properties = properties;
                    }
                    Err(err) => note_outcome(&mut knowledge, "namespace_discovery", &err),
                },
                Err(err) => note_outcome(&mut knowledge, "namespace_discovery", &err),
            }
        }

        // 4. Feature probes.
        for feature in Feature::ALL {
            if budget_exceeded(started) {
                let remaining: Vec<String> = Feature::ALL
                    .iter()
                    .skip_while(|f| **f != feature)
                    .map(|f| format!("feature:{}", f.as_str()))
                    .collect();
                return self.finish_with_remaining(knowledge, started, config, &remaining.iter().map(String::as_str).collect::<Vec<_>>());
            }
            report(&format!("feature:{}", feature.as_str()));
            let supported = self.transport.query(endpoint, probes::feature_probe_query(feature)).await.is_ok();
            knowledge.features.insert(feature, supported);
        }

        // 5 & 6. Function probes and statistics — skipped in fast mode.
        if !config.fast_mode {
            for function in probes::PROBED_FUNCTIONS {
                if budget_exceeded(started) {
                    knowledge.metadata.timed_out_queries.push(format!("function:{function}"));
                    continue;
                }
                report(&format!("function:{function}"));
                let query = probes::function_probe_query(function);
                let supported = self.transport.query(endpoint, &query).await.is_ok();
                knowledge.functions.insert(function.to_string(), supported);
            }

            for kind in StatisticKind::ALL {
                if budget_exceeded(started) {
                    knowledge.metadata.timed_out_queries.push(kind.label().to_string());
                    continue;
                }
                report(kind.label());
                match self.transport.query(endpoint, probes::statistics_query(kind)).await {
                    Ok(response) => {
                        let count = response.json().ok().and_then(|b| probes::count_from_bindings(&b));
                        set_statistic(&mut knowledge, kind, count);
                        if count.is_none() {
                            knowledge.metadata.failed_queries.push(kind.label().to_string());
                        }
                    }
                    Err(err) if matches!(err, Error::Timeout { .. }) => {
                        knowledge.metadata.timed_out_queries.push(kind.label().to_string());
                    }
                    Err(err) => note_outcome(&mut knowledge, kind.label(), &err),
                }
            }
        }

        knowledge.metadata.fast_mode = config.fast_mode;
        knowledge.metadata.max_samples = config.max_samples;
        knowledge.metadata.wall_time_ms = started.elapsed().as_millis() as u64;
        populate_prefixes(&mut knowledge);
        knowledge
    }

    fn finish_with_remaining(
        &self,
        mut knowledge: DiscoveryKnowledge,
        started: Instant,
        config: &DiscoveryConfig,
        remaining_labels: &[&str],
    ) -> DiscoveryKnowledge {
        for label in remaining_labels {
            knowledge.metadata.timed_out_queries.push((*label).to_string());
        }
        knowledge.metadata.fast_mode = config.fast_mode;
        knowledge.metadata.max_samples = config.max_samples;
        knowledge.metadata.wall_time_ms = started.elapsed().as_millis() as u64;
        populate_prefixes(&mut knowledge);
        tracing::warn!(endpoint = %knowledge.endpoint_url, elapsed_ms = knowledge.metadata.wall_time_ms, "discovery overall deadline exceeded");
        knowledge
    }
}

/// Seed the standard vocabulary prefixes plus any discovered namespaces into
/// `knowledge.prefixes`, so the Query Builder's prefix-emission loop always
/// has a declaration for e.g. `wdt:` even when namespace discovery itself
/// was skipped or timed out.
fn populate_prefixes(knowledge: &mut DiscoveryKnowledge) {
    let mut index = VocabularyIndex::new();
    index.generate_for_namespaces(&knowledge.namespaces, CollisionStrategy::RenameSuffix);
    knowledge.prefixes = index.prefixes().clone();
}

fn note_outcome(knowledge: &mut DiscoveryKnowledge, label: &str, err: &Error) {
    if matches!(err, Error::Timeout { .. }) {
        knowledge.metadata.timed_out_queries.push(label.to_string());
    } else {
        knowledge.metadata.failed_queries.push(label.to_string());
    }
}

fn set_statistic(knowledge: &mut DiscoveryKnowledge, kind: StatisticKind, value: Option<u64>) {
    match kind {
        StatisticKind::TripleCount => knowledge.statistics.triple_count = value,
        StatisticKind::DistinctSubjects => knowledge.statistics.distinct_subjects = value,
        StatisticKind::DistinctPredicates => knowledge.statistics.distinct_predicates = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn fast_mode_skips_namespace_function_and_statistics_probes() {
        let mock = Arc::new(MockTransport::new());
        // version + named_graphs + 8 feature probes = 10 calls expected.
        for _ in 0..10 {
            mock.push_json("https://e", serde_json::json!({"results": {"bindings": []}}));
        }
        let detector = CapabilityDetector::new(mock.clone());
        let config = DiscoveryConfig { fast_mode: true, ..Default::default() };
        let knowledge = detector.detect(&EndpointDescriptor::new("https://e"), &config, None).await;

        assert!(knowledge.metadata.fast_mode);
        assert!(knowledge.namespaces.is_empty());
        assert!(knowledge.functions.is_empty());
        assert!(knowledge.statistics.triple_count.is_none());
        assert_eq!(knowledge.features.len(), 8);
    }

    #[tokio::test]
    async fn overall_deadline_skips_remaining_probes() {
        let mock = Arc::new(MockTransport::new());
        // No responses queued — a zero deadline must skip every probe before
        // any of them run.
        let detector = CapabilityDetector::new(mock);
        let config = DiscoveryConfig { fast_mode: false, max_samples: 10, overall_deadline: Duration::from_secs(0) };
        let knowledge = detector.detect(&EndpointDescriptor::new("https://e"), &config, None).await;

        assert!(knowledge.metadata.timed_out_queries.contains(&"version".to_string()));
        assert!(knowledge.metadata.timed_out_queries.contains(&"named_graphs".to_string()));
        assert!(knowledge.metadata.timed_out_queries.contains(&"namespace_discovery".to_string()));
    }

    #[tokio::test]
    async fn detect_populates_prefixes_from_seed_table() {
        let mock = Arc::new(MockTransport::new());
        for _ in 0..10 {
            mock.push_json("https://e", serde_json::json!({"results": {"bindings": []}}));
        }
        let detector = CapabilityDetector::new(mock);
        let config = DiscoveryConfig { fast_mode: true, ..Default::default() };
        let knowledge = detector.detect(&EndpointDescriptor::new("https://e"), &config, None).await;

        assert_eq!(
            knowledge.prefixes.get("wdt").map(String::as_str),
            Some("http://www.wikidata.org/prop/direct/")
        );
    }
}
