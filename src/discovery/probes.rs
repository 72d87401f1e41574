//! The probe queries the Capability Detector runs, and how to read their
//! results back into [`DiscoveryKnowledge`] fields.

use serde_json::Value;
use std::collections::BTreeSet;

use crate::model::{Feature, SparqlVersion};

/// The ~30 SPARQL functions probed by probe 5. Grouped loosely by family;
/// order doesn't matter for correctness, only for readable progress logs.
pub const PROBED_FUNCTIONS: &[&str] = &[
    "STRLEN", "SUBSTR", "UCASE", "LCASE", "STRSTARTS", "STRENDS", "CONTAINS",
    "STRBEFORE", "STRAFTER", "CONCAT", "REPLACE", "REGEX",
    "UUID", "STRUUID", "NOW", "YEAR", "MONTH", "DAY", "HOURS", "MINUTES",
    "SECONDS", "TZ", "MD5", "SHA1", "SHA256", "COUNT", "SUM",
    "AVG", "MIN", "MAX", "GROUP_CONCAT", "COALESCE", "IF", "BOUND",
];

/// Query for probe 1 — version detection via a 1.1-only construct (`BIND`).
pub fn version_probe_query() -> &'static str {
    "SELECT * WHERE { BIND(1 AS ?x) } LIMIT 1"
}

/// Classify the version probe's outcome.
pub fn classify_version(succeeded: bool, http_5xx: bool) -> SparqlVersion {
    if succeeded {
        SparqlVersion::V11
    } else if http_5xx {
        SparqlVersion::V10
    } else {
        SparqlVersion::Unknown
    }
}

pub fn named_graphs_query() -> &'static str {
    "SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } } LIMIT 100"
}

pub fn named_graphs_from_bindings(body: &Value) -> BTreeSet<String> {
    bindings(body)
        .iter()
        .filter_map(|b| b.get("g"))
        .filter_map(|g| g.get("value"))
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect()
}

pub fn namespace_sample_query(sample_size: usize) -> String {
    format!("SELECT DISTINCT ?s ?p ?o WHERE {{ ?s ?p ?o }} LIMIT {sample_size}")
}

/// Split an IRI at its last `#` or `/` to derive a namespace. IRIs with
/// neither separator after the scheme are discarded.
pub fn namespace_of(iri: &str) -> Option<String> {
    let scheme_end = iri.find("://").map(|i| i + 3)?;
    let rest = &iri[scheme_end..];
    let cut = rest.rfind(['#', '/'])?;
    Some(iri[..scheme_end + cut + 1].to_string())
}

pub fn namespaces_from_bindings(body: &Value) -> BTreeSet<String> {
    let mut namespaces = BTreeSet::new();
    for binding in bindings(body) {
        for term in ["s", "p", "o"] {
            if let Some(iri) = binding
                .get(term)
                .filter(|v| v.get("type").and_then(|t| t.as_str()) == Some("uri"))
                .and_then(|v| v.get("value"))
                .and_then(|v| v.as_str())
            {
                if let Some(ns) = namespace_of(iri) {
                    namespaces.insert(ns);
                }
            }
        }
    }
    namespaces
}

pub fn classes_and_properties_from_bindings(body: &Value) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut classes = BTreeSet::new();
    let mut properties = BTreeSet::new();
    for binding in bindings(body) {
        if let Some(p) = binding.get("p").and_then(|v| v.get("value")).and_then(|v| v.as_str()) {
            properties.insert(p.to_string());
            let is_rdf_type = p.ends_with("22-rdf-syntax-ns#type");
            if is_rdf_type {
                if let Some(o) = binding.get("o").and_then(|v| v.get("value")).and_then(|v| v.as_str()) {
                    classes.insert(o.to_string());
                }
            }
        }
    }
    (classes, properties)
}

pub fn feature_probe_query(feature: Feature) -> &'static str {
    feature.probe_query()
}

pub fn function_probe_query(function: &str) -> String {
    match function {
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "GROUP_CONCAT" => {
            format!("SELECT ({function}(?o) AS ?r) WHERE {{ ?s ?p ?o }} LIMIT 1")
        }
        "NOW" | "UUID" | "STRUUID" => format!("SELECT (({function}()) AS ?r) WHERE {{}} LIMIT 1"),
        "BOUND" => "SELECT * WHERE { ?s ?p ?o . FILTER(BOUND(?o)) } LIMIT 1".to_string(),
        "IF" => "SELECT (IF(true, 1, 0) AS ?r) WHERE {} LIMIT 1".to_string(),
        "REGEX" => "SELECT * WHERE { ?s ?p ?o . FILTER(REGEX(STR(?o), \".\")) } LIMIT 1".to_string(),
        "COALESCE" => "SELECT (COALESCE(?missing, 1) AS ?r) WHERE {} LIMIT 1".to_string(),
        "TZ" | "YEAR" | "MONTH" | "DAY" | "HOURS" | "MINUTES" | "SECONDS" => {
            format!("SELECT ({function}(NOW()) AS ?r) WHERE {{}} LIMIT 1")
        }
        "MD5" | "SHA1" | "SHA256" => format!("SELECT ({function}(\"x\") AS ?r) WHERE {{}} LIMIT 1"),
        _ => format!("SELECT ({function}(STR(?o)) AS ?r) WHERE {{ ?s ?p ?o }} LIMIT 1"),
    }
}

pub fn statistics_query(kind: StatisticKind) -> &'static str {
    match kind {
        StatisticKind::TripleCount => "SELECT (COUNT(*) AS ?n) WHERE { ?s ?p ?o }",
        StatisticKind::DistinctSubjects => "SELECT (COUNT(DISTINCT ?s) AS ?n) WHERE { ?s ?p ?o }",
        StatisticKind::DistinctPredicates => "SELECT (COUNT(DISTINCT ?p) AS ?n) WHERE { ?s ?p ?o }",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatisticKind {
    TripleCount,
    DistinctSubjects,
    DistinctPredicates,
}

impl StatisticKind {
    pub const ALL: [StatisticKind; 3] = [
        StatisticKind::TripleCount,
        StatisticKind::DistinctSubjects,
        StatisticKind::DistinctPredicates,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatisticKind::TripleCount => "statistics.triple_count",
            StatisticKind::DistinctSubjects => "statistics.distinct_subjects",
            StatisticKind::DistinctPredicates => "statistics.distinct_predicates",
        }
    }
}

pub fn count_from_bindings(body: &Value) -> Option<u64> {
    bindings(body)
        .first()?
        .get("n")?
        .get("value")?
        .as_str()?
        .parse()
        .ok()
}

fn bindings(body: &Value) -> &[Value] {
    body.get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_of_splits_at_last_hash_or_slash() {
        assert_eq!(
            namespace_of("http://xmlns.com/foaf/0.1/name").as_deref(),
            Some("http://xmlns.com/foaf/0.1/")
        );
        assert_eq!(
            namespace_of("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").as_deref(),
            Some("http://www.w3.org/1999/02/22-rdf-syntax-ns#")
        );
    }

    #[test]
    fn namespace_of_discards_iri_with_no_separator_after_scheme() {
        assert_eq!(namespace_of("http://example"), None);
    }

    #[test]
    fn count_from_bindings_parses_literal() {
        let body = json!({"results": {"bindings": [{"n": {"value": "42"}}]}});
        assert_eq!(count_from_bindings(&body), Some(42));
    }

    #[test]
    fn count_from_bindings_none_when_empty() {
        let body = json!({"results": {"bindings": []}});
        assert_eq!(count_from_bindings(&body), None);
    }

    #[test]
    fn probed_functions_has_about_thirty_entries() {
        assert!(PROBED_FUNCTIONS.len() >= 28 && PROBED_FUNCTIONS.len() <= 34);
    }
}
