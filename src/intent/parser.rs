//! Intent parser: NL text + DiscoveryKnowledge -> Intent. Rule-based
//! by default; optionally LLM-assisted with fallback to the rule-based
//! path on a malformed completion.

use std::sync::Arc;

use serde::Deserialize;

use crate::collaborators::{LLMProvider, OntologyContext};
use crate::error::Error;
use crate::model::{DiscoveryKnowledge, EntityHint, Intent, IntentSource};

use super::rules;

/// The JSON shape an LLM completion must produce for
/// [`IntentParser::parse_with_llm`] to accept it.
#[derive(Debug, Deserialize)]
struct LlmIntentResponse {
    action: String,
    keywords: Vec<String>,
    #[serde(default)]
    limit: Option<u64>,
    #[serde(default)]
    entities: Vec<String>,
}

/// Parses natural-language queries into structured [`Intent`]s.
pub struct IntentParser {
    llm: Option<Arc<dyn LLMProvider>>,
}

impl IntentParser {
    pub fn new() -> Self {
        Self { llm: None }
    }

    pub fn with_llm(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm: Some(llm) }
    }

    /// Parse `text` into an [`Intent`], resolving entity hints against
    /// `knowledge`'s known classes/properties where possible. Tries the LLM
    /// path first if a collaborator is configured; falls back to the
    /// rule-based parser on any failure (network error, malformed JSON).
    pub async fn parse(&self, text: &str, knowledge: &DiscoveryKnowledge) -> Intent {
        if let Some(llm) = &self.llm {
            match self.parse_with_llm(llm.as_ref(), text, knowledge).await {
                Ok(intent) => return intent,
                Err(err) => {
                    tracing::warn!(error = %err, "LLM intent parse failed, falling back to rule-based parser");
                }
            }
        }
        self.parse_rule_based(text, knowledge)
    }

    fn parse_rule_based(&self, text: &str, knowledge: &DiscoveryKnowledge) -> Intent {
        let action = rules::classify_action(text);
        let keywords = rules::extract_keywords(text);
        let mut intent = Intent::new(action, IntentSource::RuleBased).with_keywords(keywords.clone());

        if let Some(limit) = rules::extract_limit(text) {
            intent = intent.with_limit(limit);
        }
        for filter in rules::extract_filters(text) {
            intent = intent.with_filter(filter);
        }
        if let Some(ordering) = rules::extract_ordering(text) {
            intent = intent.with_ordering(ordering);
        }
        for hint in resolve_entity_hints(&keywords, knowledge) {
            intent = intent.with_entity_hint(hint);
        }
        intent
    }

    async fn parse_with_llm(
        &self,
        llm: &dyn LLMProvider,
        text: &str,
        knowledge: &DiscoveryKnowledge,
    ) -> crate::error::Result<Intent> {
        let context = OntologyContext {
            known_prefixes: knowledge.prefixes.iter().map(|(p, ns)| (p.clone(), ns.clone())).collect(),
            known_classes: knowledge.known_classes.iter().cloned().collect(),
            known_properties: knowledge.known_properties.iter().cloned().collect(),
        };
        let prompt = format!(
            "Return a strict JSON object with fields action (select|ask|count), keywords (array of strings), limit (integer or null), entities (array of strings) for this request: {text}"
        );
        let raw = llm.complete(&prompt, &context).await?;
        let parsed: LlmIntentResponse = serde_json::from_str(raw.trim())
            .map_err(|e| Error::LlmMalformed { message: e.to_string() })?;

        let action = match parsed.action.to_ascii_lowercase().as_str() {
            "ask" => crate::model::Action::Ask,
            "count" => crate::model::Action::Count,
            "describe" => crate::model::Action::Describe,
            "select" => crate::model::Action::Select,
            other => return Err(Error::LlmMalformed { message: format!("unknown action {other:?}") }),
        };

        let mut intent = Intent::new(action, IntentSource::LlmAssisted).with_keywords(parsed.keywords.clone());
        if let Some(limit) = parsed.limit {
            intent = intent.with_limit(limit);
        }
        for hint in resolve_entity_hints(&parsed.entities, knowledge) {
            intent = intent.with_entity_hint(hint);
        }
        Ok(intent)
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_entity_hints(surface_forms: &[String], knowledge: &DiscoveryKnowledge) -> Vec<EntityHint> {
    surface_forms
        .iter()
        .map(|surface_form| {
            let resolved_iri = knowledge
                .known_classes
                .iter()
                .chain(knowledge.known_properties.iter())
                .find(|iri| iri.to_ascii_lowercase().contains(&surface_form.to_ascii_lowercase()))
                .cloned();
            EntityHint { surface_form: surface_form.clone(), resolved_iri }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, DiscoveryMode};

    fn empty_knowledge() -> DiscoveryKnowledge {
        DiscoveryKnowledge::empty("https://e", DiscoveryMode::Fast)
    }

    #[tokio::test]
    async fn rule_based_parses_count_query() {
        let parser = IntentParser::new();
        let intent = parser.parse("how many rivers are there", &empty_knowledge()).await;
        assert_eq!(intent.action, Action::Count);
        assert_eq!(intent.source, IntentSource::RuleBased);
    }

    #[tokio::test]
    async fn rule_based_parses_ask_query() {
        let parser = IntentParser::new();
        let intent = parser.parse("is there a capital of France", &empty_knowledge()).await;
        assert_eq!(intent.action, Action::Ask);
    }

    struct StubLlm(String);

    #[async_trait::async_trait]
    impl LLMProvider for StubLlm {
        async fn complete(&self, _prompt: &str, _context: &OntologyContext) -> crate::error::Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn llm_path_parses_valid_json() {
        let llm = Arc::new(StubLlm(r#"{"action": "select", "keywords": ["capital"], "limit": 5, "entities": []}"#.to_string()));
        let parser = IntentParser::with_llm(llm);
        let intent = parser.parse("capital of France", &empty_knowledge()).await;
        assert_eq!(intent.action, Action::Select);
        assert_eq!(intent.limit, Some(5));
        assert_eq!(intent.source, IntentSource::LlmAssisted);
    }

    #[tokio::test]
    async fn llm_path_falls_back_on_malformed_json() {
        let llm = Arc::new(StubLlm("not json at all".to_string()));
        let parser = IntentParser::with_llm(llm);
        let intent = parser.parse("how many rivers", &empty_knowledge()).await;
        assert_eq!(intent.source, IntentSource::RuleBased);
        assert_eq!(intent.action, Action::Count);
    }

    #[test]
    fn resolves_entity_hint_against_known_classes() {
        let mut knowledge = empty_knowledge();
        knowledge.known_classes.insert("http://dbpedia.org/ontology/River".to_string());
        let hints = resolve_entity_hints(&["river".to_string()], &knowledge);
        assert_eq!(hints[0].resolved_iri.as_deref(), Some("http://dbpedia.org/ontology/River"));
    }
}
