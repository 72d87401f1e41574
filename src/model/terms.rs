//! RDF term representation shared by query plans, results, and the
//! vocabulary index.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single RDF term: an IRI, a literal (with optional datatype/language),
/// or a blank node. Equality is by `(kind, all fields)` per the data model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RdfTerm {
    Iri(String),
    Literal {
        lexical: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", rename = "lang")]
        language: Option<String>,
    },
    BlankNode(String),
}

impl RdfTerm {
    pub fn iri(value: impl Into<String>) -> Self {
        Self::Iri(value.into())
    }

    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Self::BlankNode(id.into())
    }

    /// Parse a binding produced by the SPARQL-results JSON wire format
    /// (`{"type": "uri"|"literal"|"bnode", "value": ..., "datatype"?, "xml:lang"?}`).
    pub fn from_binding(value: &serde_json::Value) -> Option<Self> {
        let ty = value.get("type")?.as_str()?;
        let text = value.get("value")?.as_str()?.to_string();
        match ty {
            "uri" | "iri" => Some(Self::Iri(text)),
            "bnode" => Some(Self::BlankNode(text)),
            "literal" | "typed-literal" => {
                let datatype = value
                    .get("datatype")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let language = value
                    .get("xml:lang")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                Some(Self::Literal {
                    lexical: text,
                    datatype,
                    language,
                })
            }
            _ => None,
        }
    }

    /// Serialize back to the SPARQL-results JSON binding shape.
    pub fn to_binding(&self) -> serde_json::Value {
        match self {
            Self::Iri(v) => serde_json::json!({"type": "uri", "value": v}),
            Self::BlankNode(v) => serde_json::json!({"type": "bnode", "value": v}),
            Self::Literal {
                lexical,
                datatype,
                language,
            } => {
                let mut obj = serde_json::json!({"type": "literal", "value": lexical});
                if let Some(dt) = datatype {
                    obj["datatype"] = serde_json::Value::String(dt.clone());
                }
                if let Some(lang) = language {
                    obj["xml:lang"] = serde_json::Value::String(lang.clone());
                }
                obj
            }
        }
    }
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(v) => write!(f, "<{v}>"),
            Self::BlankNode(v) => write!(f, "_:{v}"),
            Self::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{lexical}\"")?;
                if let Some(lang) = language {
                    write!(f, "@{lang}")?;
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{dt}>")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roundtrips_uri_binding() {
        let binding = json!({"type": "uri", "value": "http://example.org/x"});
        let term = RdfTerm::from_binding(&binding).unwrap();
        assert_eq!(term, RdfTerm::iri("http://example.org/x"));
        assert_eq!(term.to_binding(), binding);
    }

    #[test]
    fn roundtrips_typed_literal_binding() {
        let binding = json!({
            "type": "literal",
            "value": "42",
            "datatype": "http://www.w3.org/2001/XMLSchema#integer"
        });
        let term = RdfTerm::from_binding(&binding).unwrap();
        assert_eq!(
            term,
            RdfTerm::typed_literal("42", "http://www.w3.org/2001/XMLSchema#integer")
        );
        assert_eq!(term.to_binding(), binding);
    }

    #[test]
    fn roundtrips_lang_literal_binding() {
        let binding = json!({"type": "literal", "value": "chat", "xml:lang": "fr"});
        let term = RdfTerm::from_binding(&binding).unwrap();
        assert_eq!(term, RdfTerm::lang_literal("chat", "fr"));
        assert_eq!(term.to_binding(), binding);
    }

    #[test]
    fn display_formats_terms_as_sparql_syntax() {
        assert_eq!(RdfTerm::iri("http://e").to_string(), "<http://e>");
        assert_eq!(RdfTerm::blank("b0").to_string(), "_:b0");
        assert_eq!(
            RdfTerm::typed_literal("1", "http://e#int").to_string(),
            "\"1\"^^<http://e#int>"
        );
        assert_eq!(RdfTerm::lang_literal("hi", "en").to_string(), "\"hi\"@en");
    }

    #[test]
    fn equality_is_by_kind_and_fields() {
        assert_ne!(RdfTerm::literal("x"), RdfTerm::iri("x"));
        assert_ne!(
            RdfTerm::typed_literal("1", "http://a"),
            RdfTerm::typed_literal("1", "http://b")
        );
    }
}
