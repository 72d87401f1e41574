//! Federated planner: combines per-endpoint triple patterns into a
//! single `SERVICE`-bearing query, ordered by selectivity, with a cost
//! estimate attached.

use std::collections::{BTreeMap, HashSet};

use crate::model::TriplePattern;

const BASE_COST_SECONDS: f64 = 2.0;

/// Per-endpoint planning hints.
#[derive(Debug, Clone, Default)]
pub struct FederationHints {
    /// Estimated selectivity in (0, 1]; lower means more selective.
    pub selectivity: BTreeMap<String, f64>,
    pub use_optional_for: HashSet<String>,
    pub silent_for: HashSet<String>,
}

impl FederationHints {
    fn selectivity_of(&self, endpoint_url: &str) -> f64 {
        self.selectivity.get(endpoint_url).copied().unwrap_or(1.0).clamp(f64::MIN_POSITIVE, 1.0)
    }
}

/// Cost estimate returned alongside the rendered federated query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostEstimate {
    pub estimated_time_seconds: f64,
    pub complexity_score: u32,
    pub recommended_timeout_seconds: u64,
}

/// A rendered federated query plus its cost estimate.
#[derive(Debug, Clone)]
pub struct FederatedQuery {
    pub text: String,
    pub cost: CostEstimate,
}

/// Compose `patterns_by_endpoint` into one SPARQL text using `SERVICE`
/// blocks, ordered most-selective-first, wrapped in `SERVICE SILENT`/
/// `OPTIONAL` per `hints`.
pub fn plan(
    select_vars: &[String],
    patterns_by_endpoint: &BTreeMap<String, Vec<TriplePattern>>,
    hints: &FederationHints,
) -> FederatedQuery {
    let mut endpoints: Vec<&String> = patterns_by_endpoint.keys().collect();
    endpoints.sort_by(|a, b| {
        hints
            .selectivity_of(a)
            .partial_cmp(&hints.selectivity_of(b))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut out = String::new();
    out.push_str("SELECT ");
    out.push_str(&select_vars.iter().map(|v| format!("?{v}")).collect::<Vec<_>>().join(" "));
    out.push_str("\nWHERE {\n");

    for endpoint in &endpoints {
        let patterns = &patterns_by_endpoint[*endpoint];
        let silent = if hints.silent_for.contains(*endpoint) { " SILENT" } else { "" };
        let mut block = format!("  SERVICE{silent} <{endpoint}> {{\n");
        for pattern in patterns {
            block.push_str("    ");
            block.push_str(&pattern.render());
            block.push('\n');
        }
        block.push_str("  }\n");

        if hints.use_optional_for.contains(*endpoint) {
            out.push_str("  OPTIONAL {\n  ");
            out.push_str(&block);
            out.push_str("  }\n");
        } else {
            out.push_str(&block);
        }
    }
    out.push_str("}\n");

    let cost = estimate_cost(patterns_by_endpoint, hints);
    FederatedQuery { text: out, cost }
}

fn estimate_cost(patterns_by_endpoint: &BTreeMap<String, Vec<TriplePattern>>, hints: &FederationHints) -> CostEstimate {
    let services = patterns_by_endpoint.len();
    let total_patterns: usize = patterns_by_endpoint.values().map(Vec::len).sum();

    let estimated_time_seconds: f64 = patterns_by_endpoint
        .iter()
        .map(|(endpoint, patterns)| {
            let selectivity = hints.selectivity_of(endpoint);
            BASE_COST_SECONDS * (1.0 + patterns.len() as f64 * 0.2) / selectivity
        })
        .sum();

    let complexity_score = ((services * 10 + total_patterns * 5) as f64).round().clamp(0.0, 100.0) as u32;
    let recommended_timeout_seconds = (2.0 * estimated_time_seconds).max(60.0).round() as u64;

    CostEstimate { estimated_time_seconds, complexity_score, recommended_timeout_seconds }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TriplePattern;

    fn patterns_for(n: usize) -> Vec<TriplePattern> {
        (0..n).map(|i| TriplePattern::new("?s", format!("?p{i}"), "?o")).collect()
    }

    #[test]
    fn orders_services_by_ascending_selectivity() {
        let mut patterns = BTreeMap::new();
        patterns.insert("https://broad".to_string(), patterns_for(1));
        patterns.insert("https://narrow".to_string(), patterns_for(1));

        let mut hints = FederationHints::default();
        hints.selectivity.insert("https://broad".to_string(), 0.9);
        hints.selectivity.insert("https://narrow".to_string(), 0.1);

        let query = plan(&["s".to_string()], &patterns, &hints);
        let narrow_pos = query.text.find("https://narrow").unwrap();
        let broad_pos = query.text.find("https://broad").unwrap();
        assert!(narrow_pos < broad_pos);
    }

    #[test]
    fn wraps_silent_and_optional_services() {
        let mut patterns = BTreeMap::new();
        patterns.insert("https://e".to_string(), patterns_for(1));
        let mut hints = FederationHints::default();
        hints.silent_for.insert("https://e".to_string());
        hints.use_optional_for.insert("https://e".to_string());

        let query = plan(&["s".to_string()], &patterns, &hints);
        assert!(query.text.contains("SERVICE SILENT <https://e>"));
        assert!(query.text.contains("OPTIONAL {"));
    }

    #[test]
    fn cost_model_matches_spec_formula() {
        let mut patterns = BTreeMap::new();
        patterns.insert("https://a".to_string(), patterns_for(2));
        patterns.insert("https://b".to_string(), patterns_for(3));
        let mut hints = FederationHints::default();
        hints.selectivity.insert("https://a".to_string(), 0.5);
        hints.selectivity.insert("https://b".to_string(), 1.0);

        let query = plan(&["s".to_string()], &patterns, &hints);
        let expected_time = 2.0 * (1.0 + 2.0 * 0.2) / 0.5 + 2.0 * (1.0 + 3.0 * 0.2) / 1.0;
        assert!((query.cost.estimated_time_seconds - expected_time).abs() < 1e-9);
        assert_eq!(query.cost.complexity_score, (2 * 10 + 5 * 5) as u32);
        assert_eq!(query.cost.recommended_timeout_seconds, (2.0 * expected_time).max(60.0).round() as u64);
    }
}
