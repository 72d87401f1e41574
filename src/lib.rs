//! # sparql-gateway
//!
//! A natural-language-to-SPARQL gateway: discover an endpoint's actual
//! capabilities, parse a question into structured intent, build and
//! validate a query against what was discovered, then execute it — with
//! rate limiting, retry, and federation across multiple endpoints.
//!
//! ## Core components
//!
//! - **Discovery**: probes an endpoint for its SPARQL version, named
//!   graphs, namespaces, vocabulary, supported features/functions, and
//!   rough statistics.
//! - **Intent**: turns a natural-language question into a structured
//!   `Intent` (action, keywords, filters, ordering), rule-based by default
//!   with an optional LLM-assisted path.
//! - **Query**: builds, validates, and executes a `QueryPlan` against
//!   discovered capabilities.
//! - **Federation**: plans, executes, and merges queries spanning more
//!   than one endpoint.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sparql_gateway::{Gateway, GatewayConfig, EndpointDescriptor};
//!
//! # async fn run() -> sparql_gateway::Result<()> {
//! let gateway = Gateway::new(GatewayConfig::default());
//! let endpoint = EndpointDescriptor::new("https://query.wikidata.org/sparql");
//! let answer = gateway.ask("how many cats are there", &endpoint).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod collaborators;
pub mod config;
pub mod discovery;
pub mod error;
pub mod federation;
pub mod gateway;
pub mod health;
pub mod intent;
pub mod model;
pub mod query;
pub mod rate_limiter;
pub mod transport;
pub mod vocab;

pub use collaborators::{Formatter, LLMProvider, OntologyContext, TableFormatter};
pub use sparql_gateway_derive::EndpointProfile;
pub use config::{ConnectionConfig, Credentials, DiscoveryConfig, EndpointDescriptor, GatewayConfig};
pub use error::{Error, Result, UserFacingError};
pub use federation::{join, plan as plan_federated, union, CostEstimate, FederatedQuery, FederationHints, JoinKind, ResilientOrchestrator};
pub use gateway::{Gateway, GatewayAnswer, PreparedQuery};
pub use health::{HealthRegistry, Pinger};
pub use intent::IntentParser;
pub use model::{
    Action, Comparator, DiscoveryKnowledge, DiscoveryMetadata, DiscoveryMode, EntityHint,
    ExecutionResult, FederatedLeg, FederatedPlan, Feature, Filter, HealthSnapshot, HealthStatus,
    Intent, IntentSource, MergeStrategy, Ordering, PatternHint, QueryForm, QueryPlan, RdfTerm,
    Row, SortDirection, SourceTiming, SparqlVersion, Statistics, TriplePattern,
};
pub use query::{builder_from_intent, validate, QueryBuilder, QueryExecutor, ValidationOutcome};
pub use rate_limiter::{RateLimiter, RateLimiterRegistry};
pub use vocab::{CollisionStrategy, VocabularyIndex};
