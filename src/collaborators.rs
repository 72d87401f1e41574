//! Thin adapter traits the gateway depends on but does not implement: an
//! LLM-assisted intent completion, the ontology context handed to it, and
//! an output formatter. Concrete providers (Anthropic, OpenAI, ...) live
//! outside this crate; only the seams are defined here, plus a
//! deterministic test double.

use async_trait::async_trait;

use crate::error::Result;

/// Context about the endpoint's vocabulary passed to an LLM completion so
/// it can ground its answer in real prefixes/classes instead of guessing.
#[derive(Debug, Clone, Default)]
pub struct OntologyContext {
    pub known_prefixes: Vec<(String, String)>,
    pub known_classes: Vec<String>,
    pub known_properties: Vec<String>,
}

/// An LLM collaborator used only to assist intent parsing. The
/// gateway never asks an LLM to emit SPARQL text directly.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Ask the model to complete `prompt`, given `context`, and return its
    /// raw text response. The caller is responsible for parsing/validating
    /// that response as the Intent JSON shape.
    async fn complete(&self, prompt: &str, context: &OntologyContext) -> Result<String>;
}

/// Where an [`crate::model::ExecutionResult`] is rendered to for display —
/// not part of the execution path itself.
pub trait Formatter: Send + Sync {
    fn emit(&self, result: &crate::model::ExecutionResult) -> String;
}

/// Renders an [`crate::model::ExecutionResult`] as a simple
/// whitespace-aligned table; the default formatter used by demos and
/// tests.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn emit(&self, result: &crate::model::ExecutionResult) -> String {
        if let Some(boolean) = result.boolean {
            return boolean.to_string();
        }
        let mut out = String::new();
        out.push_str(&result.columns.join("\t"));
        out.push('\n');
        for row in &result.rows {
            let cells: Vec<String> = result
                .columns
                .iter()
                .map(|c| row.get(c).map(|t| t.to_string()).unwrap_or_default())
                .collect();
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExecutionResult;

    #[test]
    fn table_formatter_renders_ask_as_boolean() {
        let formatter = TableFormatter;
        assert_eq!(formatter.emit(&ExecutionResult::ask(true)), "true");
    }

    #[test]
    fn table_formatter_renders_header_row() {
        let formatter = TableFormatter;
        let result = ExecutionResult::empty_select(vec!["x".into(), "y".into()]);
        assert_eq!(formatter.emit(&result), "x\ty\n");
    }
}
