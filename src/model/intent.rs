//! The structured `Intent` the Intent Parser produces from natural-language
//! input, before the Query Builder turns it into a `QueryPlan`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The high-level SPARQL form an utterance is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Select,
    Ask,
    Describe,
    Count,
}

/// Comparison used by a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    Regex,
}

/// A single filter constraint extracted from the utterance, e.g.
/// `population > 1000000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub variable: String,
    pub comparator: Comparator,
    pub value: String,
}

/// Sort direction for a result ordering hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// An ordering hint, e.g. "largest first" -> `(population, Desc)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordering {
    pub variable: String,
    pub direction: SortDirection,
}

/// A mention of a known entity or class resolved (or left unresolved) against
/// the vocabulary index, e.g. "capital" -> `Some("http://.../capital")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHint {
    pub surface_form: String,
    pub resolved_iri: Option<String>,
}

/// Which component produced this intent — used to decide whether a
/// malformed LLM completion should fall back to the rule-based parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentSource {
    RuleBased,
    LlmAssisted,
}

/// Parsed structured intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub action: Action,
    pub keywords: Vec<String>,
    pub filters: Vec<Filter>,
    pub limit: Option<u64>,
    pub ordering: Option<Ordering>,
    pub entity_hints: Vec<EntityHint>,
    pub source: IntentSource,
    /// Raw key/value pairs the rule engine matched but didn't map into a
    /// typed field above; carried through so the builder can still use them.
    pub extra: BTreeMap<String, String>,
}

impl Intent {
    pub fn new(action: Action, source: IntentSource) -> Self {
        Self {
            action,
            keywords: Vec::new(),
            filters: Vec::new(),
            limit: None,
            ordering: None,
            entity_hints: Vec::new(),
            source,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = Some(ordering);
        self
    }

    pub fn with_entity_hint(mut self, hint: EntityHint) -> Self {
        self.entity_hints.push(hint);
        self
    }

    pub fn unresolved_entities(&self) -> impl Iterator<Item = &EntityHint> {
        self.entity_hints.iter().filter(|h| h.resolved_iri.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain_populates_fields() {
        let intent = Intent::new(Action::Select, IntentSource::RuleBased)
            .with_keywords(vec!["capital".into(), "country".into()])
            .with_limit(10)
            .with_filter(Filter {
                variable: "population".into(),
                comparator: Comparator::Gt,
                value: "1000000".into(),
            })
            .with_ordering(Ordering {
                variable: "population".into(),
                direction: SortDirection::Desc,
            })
            .with_entity_hint(EntityHint {
                surface_form: "France".into(),
                resolved_iri: Some("http://example.org/France".into()),
            });

        assert_eq!(intent.action, Action::Select);
        assert_eq!(intent.limit, Some(10));
        assert_eq!(intent.filters.len(), 1);
        assert!(intent.unresolved_entities().next().is_none());
    }

    #[test]
    fn unresolved_entities_filters_resolved_ones() {
        let intent = Intent::new(Action::Select, IntentSource::LlmAssisted)
            .with_entity_hint(EntityHint {
                surface_form: "Narnia".into(),
                resolved_iri: None,
            })
            .with_entity_hint(EntityHint {
                surface_form: "France".into(),
                resolved_iri: Some("http://example.org/France".into()),
            });
        let unresolved: Vec<_> = intent.unresolved_entities().collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].surface_form, "Narnia");
    }
}
