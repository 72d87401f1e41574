//! Error types for the SPARQL gateway.
//!
//! The taxonomy here is closed and maps one-to-one onto the failure kinds a
//! caller needs to branch on: network/transport failures, validation
//! rejections, and federation partial/fatal failures are distinct variants
//! rather than a single opaque "something went wrong".

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the gateway's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the gateway.
#[derive(Error, Debug)]
pub enum Error {
    /// DNS failure, connection refused, connection reset, or similar.
    #[error("network error contacting {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    /// A suspending call exceeded its deadline.
    #[error("operation against {endpoint} timed out after {elapsed_ms}ms")]
    Timeout { endpoint: String, elapsed_ms: u64 },

    /// TLS verification failed (bad or expired certificate).
    #[error("TLS error contacting {endpoint}: {message}")]
    Tls { endpoint: String, message: String },

    /// HTTP 401 — credentials are required but were not supplied.
    #[error("{endpoint} requires authentication")]
    AuthRequired { endpoint: String },

    /// HTTP 403 — credentials were supplied but rejected.
    #[error("{endpoint} rejected the supplied credentials")]
    AuthFailed { endpoint: String },

    /// Any other non-2xx HTTP response.
    #[error("{endpoint} returned HTTP {code}")]
    HttpError {
        endpoint: String,
        code: u16,
        /// First 256 bytes of the response body, for diagnosis.
        body_preview: String,
    },

    /// Malformed SPARQL-results JSON/XML.
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },

    /// A generated query failed validation against discovered capabilities.
    #[error("query rejected by validator: {}", .errors.join("; "))]
    Validation { errors: Vec<String> },

    /// The LLM's intent-parsing completion did not parse as the expected
    /// JSON shape. Callers fall back to the rule-based parser; this variant
    /// exists so that fallback is observable rather than silent-forever.
    #[error("LLM intent response was not valid JSON: {message}")]
    LlmMalformed { message: String },

    /// One `SERVICE SILENT` subservice in a federated plan failed; the rest
    /// of the plan still produced a (partial) result.
    #[error("federated subservice {endpoint} failed (non-fatal, SILENT): {message}")]
    FederationPartial { endpoint: String, message: String },

    /// A non-`SILENT` subservice in a federated plan failed; the whole plan
    /// is aborted.
    #[error("federated subservice {endpoint} failed: {message}")]
    FederationFatal { endpoint: String, message: String },

    /// Bad `EndpointDescriptor`/`ConnectionConfig`/`GatewayConfig` construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Errors bubbled up from `serde_json`.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything that does not fit the taxonomy above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn network(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn timeout(endpoint: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            endpoint: endpoint.into(),
            elapsed_ms,
        }
    }

    pub fn tls(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Tls {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn http_error(endpoint: impl Into<String>, code: u16, body: &str) -> Self {
        Self::HttpError {
            endpoint: endpoint.into(),
            code,
            body_preview: body.chars().take(256).collect(),
        }
    }

    pub fn parse(endpoint: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The endpoint this error is about, if it carries one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Network { endpoint, .. }
            | Self::Timeout { endpoint, .. }
            | Self::Tls { endpoint, .. }
            | Self::AuthRequired { endpoint }
            | Self::AuthFailed { endpoint }
            | Self::HttpError { endpoint, .. }
            | Self::Parse { endpoint, .. }
            | Self::FederationPartial { endpoint, .. }
            | Self::FederationFatal { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }

    /// Whether a retry of the same request could plausibly succeed.
    /// 4xx, TLS, and validation failures are never retried; network errors,
    /// timeouts, and 5xx responses are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpError { code, .. } => (500..600).contains(code),
            _ => false,
        }
    }

    /// The user-facing error kind name, stable across refactors (used both
    /// in [`UserFacingError`] and in log fields).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Network { .. } => "NETWORK",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Tls { .. } => "TLS",
            Self::AuthRequired { .. } => "AUTH_REQUIRED",
            Self::AuthFailed { .. } => "AUTH_FAILED",
            Self::HttpError { .. } => "HTTP_ERROR",
            Self::Parse { .. } => "PARSE",
            Self::Validation { .. } => "VALIDATION",
            Self::LlmMalformed { .. } => "LLM_MALFORMED",
            Self::FederationPartial { .. } => "FEDERATION_PARTIAL",
            Self::FederationFatal { .. } => "FEDERATION_FATAL",
            Self::Config(_) => "CONFIG",
            Self::Serialization(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Self::AuthRequired { .. } | Self::AuthFailed { .. } => {
                Some("set credentials on the endpoint descriptor".to_string())
            }
            Self::Timeout { .. } => {
                Some("retry discovery with fast_mode=true and a lower max_samples".to_string())
            }
            Self::Validation { errors } if errors.iter().any(|e| e.contains("feature-not-supported")) => {
                Some("the endpoint does not advertise that feature; rewrite the query without it".to_string())
            }
            Self::HttpError { code, .. } if (500..600).contains(code) => {
                Some("the endpoint is overloaded or erroring; retry with backoff".to_string())
            }
            _ => None,
        }
    }

    /// Strip this error down to the `{kind, endpoint, message, suggestion}`
    /// shape callers receive. Credentials and raw causes are only
    /// attached when `debug` is set.
    pub fn to_user_facing(&self, debug: bool) -> UserFacingError {
        UserFacingError {
            kind: self.kind_name().to_string(),
            endpoint: self.endpoint().map(str::to_string),
            message: self.to_string(),
            suggestion: self.suggestion(),
            debug_cause: debug.then(|| format!("{:?}", self)),
        }
    }
}

/// The structured, credential-free error every user-facing operation
/// returns on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFacingError {
    pub kind: String,
    pub endpoint: Option<String>,
    pub message: String,
    pub suggestion: Option<String>,
    /// Only populated when the caller opted into debug mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_cause: Option<String>,
}

impl fmt::Display for UserFacingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(Error::network("e", "connection reset").is_retryable());
        assert!(Error::timeout("e", 500).is_retryable());
        assert!(Error::http_error("e", 503, "").is_retryable());
        assert!(!Error::http_error("e", 404, "").is_retryable());
        assert!(!Error::AuthRequired { endpoint: "e".into() }.is_retryable());
        assert!(!Error::tls("e", "expired").is_retryable());
    }

    #[test]
    fn http_error_preview_truncates_body() {
        let long = "x".repeat(1000);
        let err = Error::http_error("e", 500, &long);
        match err {
            Error::HttpError { body_preview, .. } => assert_eq!(body_preview.len(), 256),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn user_facing_strips_debug_info_by_default() {
        let err = Error::AuthRequired { endpoint: "https://e".into() };
        let facing = err.to_user_facing(false);
        assert_eq!(facing.kind, "AUTH_REQUIRED");
        assert!(facing.debug_cause.is_none());
        assert!(facing.suggestion.unwrap().contains("credentials"));

        let facing_debug = err.to_user_facing(true);
        assert!(facing_debug.debug_cause.is_some());
    }

    #[test]
    fn validation_suggestion_mentions_feature() {
        let err = Error::validation(vec!["feature-not-supported: SERVICE".into()]);
        let facing = err.to_user_facing(false);
        assert!(facing.suggestion.unwrap().contains("rewrite"));
    }
}
