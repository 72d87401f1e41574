//! The `DiscoveryKnowledge` record produced by the Capability Detector and
//! consumed by everything downstream (intent parsing, query building,
//! validation).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// SPARQL dialect version detected for an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparqlVersion {
    V10,
    V11,
    Unknown,
}

impl SparqlVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V10 => "1.0",
            Self::V11 => "1.1",
            Self::Unknown => "unknown",
        }
    }
}

/// Whether discovery ran in `fast` (cheap, lossy) or `full` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    Fast,
    Full,
}

/// Optional SPARQL features probed by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Feature {
    Bind,
    Exists,
    Minus,
    Service,
    Values,
    Subquery,
    PropertyPaths,
    NamedGraphs,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Bind,
        Feature::Exists,
        Feature::Minus,
        Feature::Service,
        Feature::Values,
        Feature::Subquery,
        Feature::PropertyPaths,
        Feature::NamedGraphs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Bind => "BIND",
            Feature::Exists => "EXISTS",
            Feature::Minus => "MINUS",
            Feature::Service => "SERVICE",
            Feature::Values => "VALUES",
            Feature::Subquery => "SUBQUERY",
            Feature::PropertyPaths => "PROPERTY_PATHS",
            Feature::NamedGraphs => "NAMED_GRAPHS",
        }
    }

    /// The minimal probe query issued to test support for this feature.
    pub fn probe_query(self) -> &'static str {
        match self {
            Feature::Bind => "SELECT * WHERE { BIND(1 AS ?x) } LIMIT 1",
            Feature::Exists => "ASK { FILTER EXISTS { ?s ?p ?o } }",
            Feature::Minus => "SELECT * WHERE { ?s ?p ?o MINUS { ?s ?p ?o } } LIMIT 1",
            Feature::Service => {
                "SELECT * WHERE { SERVICE SILENT <http://example.org/sparql> { ?s ?p ?o } } LIMIT 1"
            }
            Feature::Values => "SELECT * WHERE { VALUES ?x { 1 2 3 } } LIMIT 1",
            Feature::Subquery => {
                "SELECT * WHERE { { SELECT ?s WHERE { ?s ?p ?o } LIMIT 1 } } LIMIT 1"
            }
            Feature::PropertyPaths => "SELECT * WHERE { ?s ?p+ ?o } LIMIT 1",
            Feature::NamedGraphs => "SELECT ?g WHERE { GRAPH ?g { ?s ?p ?o } } LIMIT 1",
        }
    }
}

/// A probed statistic that may be unavailable (null) on timeout.
pub type Stat = Option<u64>;

/// Aggregate statistics from probe 6; any field may be `None` on timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub triple_count: Stat,
    pub distinct_subjects: Stat,
    pub distinct_predicates: Stat,
}

/// Bookkeeping for which probes didn't complete, and why — the invariant
/// that for every probe exactly one of {value populated, timed-out,
/// failed} holds is enforced by always recording a probe name in one of
/// these two lists whenever its field is left `None`/empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryMetadata {
    pub timed_out_queries: Vec<String>,
    pub failed_queries: Vec<String>,
    pub fast_mode: bool,
    pub max_samples: usize,
    pub wall_time_ms: u64,
}

/// An endpoint-specific triple-pattern hint, e.g. `"human" -> "?x wdt:P31 wd:Q5"`
/// (see the tie-break notes on retained heuristics).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternHint {
    pub label: String,
    pub pattern: String,
}

/// The full capability record for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryKnowledge {
    pub endpoint_url: String,
    pub mode: DiscoveryMode,
    pub sparql_version: SparqlVersion,
    pub named_graphs: BTreeSet<String>,
    pub namespaces: Vec<String>,
    pub prefixes: BTreeMap<String, String>,
    pub known_classes: BTreeSet<String>,
    pub known_properties: BTreeSet<String>,
    pub features: BTreeMap<Feature, bool>,
    pub functions: BTreeMap<String, bool>,
    pub statistics: Statistics,
    pub patterns: Vec<PatternHint>,
    pub metadata: DiscoveryMetadata,
}

impl DiscoveryKnowledge {
    pub fn empty(endpoint_url: impl Into<String>, mode: DiscoveryMode) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            mode,
            sparql_version: SparqlVersion::Unknown,
            named_graphs: BTreeSet::new(),
            namespaces: Vec::new(),
            prefixes: BTreeMap::new(),
            known_classes: BTreeSet::new(),
            known_properties: BTreeSet::new(),
            features: BTreeMap::new(),
            functions: BTreeMap::new(),
            statistics: Statistics::default(),
            patterns: Vec::new(),
            metadata: DiscoveryMetadata {
                fast_mode: matches!(mode, DiscoveryMode::Fast),
                ..Default::default()
            },
        }
    }

    pub fn supports_feature(&self, feature: Feature) -> bool {
        self.features.get(&feature).copied().unwrap_or(false)
    }

    pub fn supports_function(&self, function: &str) -> bool {
        self.functions
            .get(&function.to_ascii_uppercase())
            .copied()
            .unwrap_or(false)
    }

    pub fn pattern_for(&self, label: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.label.eq_ignore_ascii_case(label))
            .map(|p| p.pattern.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_knowledge_has_no_supported_features() {
        let k = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Fast);
        assert!(!k.supports_feature(Feature::Service));
        assert!(k.metadata.fast_mode);
    }

    #[test]
    fn round_trips_through_json() {
        use pretty_assertions::assert_eq;

        let mut k = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        k.features.insert(Feature::Bind, true);
        k.named_graphs.insert("http://g1".into());
        k.statistics.triple_count = Some(42);
        k.metadata.timed_out_queries.push("statistics".into());

        let json = serde_json::to_string(&k).unwrap();
        let back: DiscoveryKnowledge = serde_json::from_str(&json).unwrap();
        assert_eq!(k, back);
    }

    #[test]
    fn pattern_lookup_is_case_insensitive() {
        let mut k = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        k.patterns.push(PatternHint {
            label: "human".into(),
            pattern: "?x wdt:P31 wd:Q5".into(),
        });
        assert_eq!(k.pattern_for("Human"), Some("?x wdt:P31 wd:Q5"));
        assert_eq!(k.pattern_for("nope"), None);
    }
}
