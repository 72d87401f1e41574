//! Query validator: checks a rendered SPARQL query against an endpoint's
//! [`DiscoveryKnowledge`] before it is ever sent over the wire. Collects
//! every error and warning in one pass rather than stopping at the first.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{DiscoveryKnowledge, Feature, QueryPlan};

/// Outcome of validating one rendered query. `valid` is `false` only when at
/// least one fatal check (undeclared prefix, unsupported feature) failed —
/// unknown namespaces and unsupported functions are downgraded to warnings
/// surface checks described below.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

static PREFIXED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Za-z][\w-]*):[A-Za-z][\w-]*\b").expect("invalid regex"));

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Z0-9_]{2,})\s*\(").expect("invalid regex"));

const FEATURE_MARKERS: &[(&str, Feature)] = &[
    ("SERVICE", Feature::Service),
    ("BIND(", Feature::Bind),
    ("MINUS", Feature::Minus),
    ("VALUES", Feature::Values),
    ("FILTER EXISTS", Feature::Exists),
    ("FILTER NOT EXISTS", Feature::Exists),
    ("GRAPH ?", Feature::NamedGraphs),
];

/// Validate `plan`'s rendered text against `knowledge`. Checks run in the
/// fixed order: declared prefixes, namespace coverage, feature
/// support, function support, then a handful of surface sanity checks.
pub fn validate(plan: &QueryPlan, rendered: &str, knowledge: &DiscoveryKnowledge) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_prefixes_declared(plan, rendered, &mut errors);
    check_namespaces_known(plan, knowledge, &mut warnings);
    check_features_supported(rendered, knowledge, &mut errors);
    check_functions_supported(rendered, knowledge, &mut warnings);
    check_surface_syntax(rendered, &mut errors);

    // Property paths are flagged separately since they aren't a fixed
    // keyword but a syntactic shape (`?p+`, `?p*`, `?p?`, `a/b`).
    if uses_property_path(rendered) && !knowledge.supports_feature(Feature::PropertyPaths) {
        errors.push("feature-not-supported: PROPERTY_PATHS".to_string());
    }
    if contains_subquery(rendered) && !knowledge.supports_feature(Feature::Subquery) {
        errors.push("feature-not-supported: SUBQUERY".to_string());
    }

    ValidationOutcome { valid: errors.is_empty(), errors, warnings }
}

fn check_prefixes_declared(plan: &QueryPlan, rendered: &str, errors: &mut Vec<String>) {
    let declared: Vec<&str> = plan.prefixes.iter().map(|(p, _)| p.as_str()).collect();
    for capture in PREFIXED_NAME.captures_iter(rendered) {
        let prefix = &capture[1];
        if prefix.eq_ignore_ascii_case("http") || prefix.eq_ignore_ascii_case("https") {
            continue;
        }
        if !declared.contains(&prefix) {
            errors.push(format!("undeclared-prefix: {prefix}"));
        }
    }
}

fn check_namespaces_known(plan: &QueryPlan, knowledge: &DiscoveryKnowledge, warnings: &mut Vec<String>) {
    for (_, namespace) in &plan.prefixes {
        if !knowledge.namespaces.iter().any(|n| n == namespace) {
            warnings.push(format!("unknown-namespace: {namespace}"));
        }
    }
}

fn check_features_supported(rendered: &str, knowledge: &DiscoveryKnowledge, errors: &mut Vec<String>) {
    let upper = rendered.to_ascii_uppercase();
    for (marker, feature) in FEATURE_MARKERS {
        if upper.contains(marker) && !knowledge.supports_feature(*feature) {
            errors.push(format!("feature-not-supported: {}", feature.as_str()));
        }
    }
}

fn check_functions_supported(rendered: &str, knowledge: &DiscoveryKnowledge, warnings: &mut Vec<String>) {
    for capture in FUNCTION_CALL.captures_iter(rendered) {
        let function = &capture[1];
        if !knowledge.functions.contains_key(function) {
            continue; // unprobed function, nothing to warn against
        }
        if !knowledge.supports_function(function) {
            warnings.push(format!("function-not-supported: {function}"));
        }
    }
}

fn check_surface_syntax(rendered: &str, errors: &mut Vec<String>) {
    let opens = rendered.matches('{').count();
    let closes = rendered.matches('}').count();
    if opens != closes {
        errors.push("unbalanced-braces".to_string());
    }
    if !rendered.to_ascii_uppercase().contains("WHERE") && !rendered.to_ascii_uppercase().contains("ASK") {
        errors.push("missing-where-clause".to_string());
    }
}

fn uses_property_path(rendered: &str) -> bool {
    static PATH: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\?\w+\s*[:\w]*[+*?]\s*\??\w*|[:\w]+/[:\w]+").expect("invalid regex")
    });
    PATH.is_match(rendered)
}

fn contains_subquery(rendered: &str) -> bool {
    static SUBQUERY: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\{\s*SELECT\b").expect("invalid regex")
    });
    SUBQUERY.is_match(&rendered.to_ascii_uppercase().replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiscoveryMode, QueryForm};

    fn knowledge_with(features: &[Feature]) -> DiscoveryKnowledge {
        let mut k = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        for f in features {
            k.features.insert(*f, true);
        }
        k
    }

    #[test]
    fn rejects_undeclared_prefix() {
        let plan = QueryPlan::new("https://e", QueryForm::Select);
        let rendered = "SELECT * WHERE { ?s wdt:P31 ?o }".to_string();
        let outcome = validate(&plan, &rendered, &knowledge_with(&[]));
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.contains("undeclared-prefix")));
    }

    #[test]
    fn unknown_namespace_is_a_warning_not_an_error() {
        let mut plan = QueryPlan::new("https://e", QueryForm::Select);
        plan.prefixes.push(("wdt".into(), "http://www.wikidata.org/prop/direct/".into()));
        let rendered = "PREFIX wdt: <http://www.wikidata.org/prop/direct/>\nSELECT * WHERE { ?s wdt:P31 ?o }".to_string();
        let outcome = validate(&plan, &rendered, &knowledge_with(&[]));
        assert!(outcome.valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("unknown-namespace")));
    }

    #[test]
    fn unsupported_feature_is_fatal() {
        let plan = QueryPlan::new("https://e", QueryForm::Select);
        let rendered = "SELECT * WHERE { SERVICE <http://x> { ?s ?p ?o } }".to_string();
        let outcome = validate(&plan, &rendered, &knowledge_with(&[]));
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.contains("SERVICE")));
    }

    #[test]
    fn supported_feature_passes() {
        let plan = QueryPlan::new("https://e", QueryForm::Select);
        let rendered = "SELECT * WHERE { SERVICE <http://x> { ?s ?p ?o } }".to_string();
        let outcome = validate(&plan, &rendered, &knowledge_with(&[Feature::Service]));
        assert!(outcome.valid);
    }

    #[test]
    fn unbalanced_braces_is_fatal() {
        let plan = QueryPlan::new("https://e", QueryForm::Select);
        let rendered = "SELECT * WHERE { ?s ?p ?o ".to_string();
        let outcome = validate(&plan, &rendered, &knowledge_with(&[]));
        assert!(!outcome.valid);
        assert!(outcome.errors.iter().any(|e| e.contains("unbalanced-braces")));
    }

    #[test]
    fn unsupported_function_is_a_warning() {
        let mut k = knowledge_with(&[]);
        k.functions.insert("REGEX".to_string(), false);
        let plan = QueryPlan::new("https://e", QueryForm::Select);
        let rendered = "SELECT * WHERE { ?s ?p ?o FILTER(REGEX(?o, \"x\")) }".to_string();
        let outcome = validate(&plan, &rendered, &k);
        assert!(outcome.valid);
        assert!(outcome.warnings.iter().any(|w| w.contains("REGEX")));
    }
}
