//! The data model shared by discovery, intent parsing, query building, and
//! execution.

pub mod discovery;
pub mod execution;
pub mod health;
pub mod intent;
pub mod plan;
pub mod terms;

pub use discovery::{
    DiscoveryKnowledge, DiscoveryMetadata, DiscoveryMode, Feature, PatternHint, SparqlVersion,
    Statistics,
};
pub use execution::{ExecutionResult, Row, SourceTiming};
pub use health::{CapabilityHints, HealthHistory, HealthSnapshot, HealthStatus};
pub use intent::{Action, Comparator, EntityHint, Filter, Intent, IntentSource, Ordering, SortDirection};
pub use plan::{FederatedLeg, FederatedPlan, MergeStrategy, QueryForm, QueryPlan, TriplePattern};
pub use terms::RdfTerm;
