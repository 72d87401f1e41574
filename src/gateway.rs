//! Top-level orchestration: natural language + endpoint(s) in, bindings and
//! timings out. Wires discovery, intent parsing, query construction and
//! validation, and execution/federation together.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::cache::KnowledgeCache;
use crate::collaborators::LLMProvider;
use crate::config::{EndpointDescriptor, GatewayConfig};
use crate::discovery::CapabilityDetector;
use crate::error::{Error, Result};
use crate::federation::{self, ResilientOrchestrator};
use crate::intent::IntentParser;
use crate::model::{DiscoveryKnowledge, ExecutionResult, MergeStrategy, QueryPlan, TriplePattern};
use crate::query::{self, QueryExecutor, ValidationOutcome};
use crate::rate_limiter::RateLimiterRegistry;
use crate::transport::pool::HttpTransport;
use crate::transport::Transport;

/// A built, validated query plan paired with the knowledge it was built
/// against and the outcome of its validation pass.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub plan: QueryPlan,
    pub rendered: String,
    /// Hex-encoded SHA-256 of `rendered`, used as a stable cache/log key —
    /// two equivalent plans against the same endpoint collapse to the same
    /// fingerprint even if built from different natural-language questions.
    pub fingerprint: String,
    pub validation: ValidationOutcome,
}

fn fingerprint(rendered: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rendered.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// One endpoint's contribution to a gateway answer: the query that was run
/// against it and the result it returned.
#[derive(Debug, Clone)]
pub struct GatewayAnswer {
    pub queries: HashMap<String, PreparedQuery>,
    pub result: ExecutionResult,
}

/// Ties discovery, intent parsing, query construction, validation, and
/// execution/federation together behind a single `ask` entry point. Cheap to
/// clone: every field is an `Arc` or otherwise shared handle.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    detector: Arc<CapabilityDetector>,
    knowledge: KnowledgeCache,
    intent_parser: Arc<IntentParser>,
    executor: Arc<QueryExecutor>,
    orchestrator: Arc<ResilientOrchestrator>,
    config: GatewayConfig,
}

impl Gateway {
    /// Build a gateway around a real `reqwest`-backed transport.
    pub fn new(config: GatewayConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(config.connection.clone()));
        Self::with_transport(transport, config)
    }

    /// Build a gateway around a caller-supplied transport — the seam tests
    /// use to substitute `MockTransport`.
    pub fn with_transport(transport: Arc<dyn Transport>, config: GatewayConfig) -> Self {
        let rate_limiters = Arc::new(RateLimiterRegistry::new());
        let executor = Arc::new(QueryExecutor::new(transport.clone(), rate_limiters));
        Self {
            detector: Arc::new(CapabilityDetector::new(transport.clone())),
            orchestrator: Arc::new(ResilientOrchestrator::new(executor.clone(), config.connection.clone())),
            transport,
            knowledge: KnowledgeCache::new(),
            intent_parser: Arc::new(IntentParser::new()),
            executor,
            config,
        }
    }

    /// Attach an LLM-assisted intent parser in place of the rule-based
    /// default.
    pub fn with_llm(mut self, llm: Arc<dyn LLMProvider>) -> Self {
        self.intent_parser = Arc::new(IntentParser::new().with_llm(llm));
        self
    }

    /// Discover (or return cached) knowledge for `endpoint`, refreshing the
    /// cache on a fresh probe run.
    pub async fn discover(&self, endpoint: &EndpointDescriptor) -> DiscoveryKnowledge {
        if let Some(cached) = self.knowledge.get(endpoint.url()).await {
            return cached;
        }
        let knowledge = self.detector.detect(endpoint, &self.config.discovery, None).await;
        self.knowledge.put(knowledge.clone()).await;
        knowledge
    }

    /// Force a fresh probe run for `endpoint`, replacing any cached entry.
    pub async fn refresh(&self, endpoint: &EndpointDescriptor) -> DiscoveryKnowledge {
        let knowledge = self.detector.detect(endpoint, &self.config.discovery, None).await;
        self.knowledge.put(knowledge.clone()).await;
        knowledge
    }

    fn build_and_validate(&self, endpoint: &EndpointDescriptor, text: &str, knowledge: &DiscoveryKnowledge, intent: &crate::model::Intent) -> PreparedQuery {
        let plan = query::builder_from_intent(endpoint.url(), intent, knowledge).build();
        let rendered = plan.render();
        let validation = query::validate(&plan, &rendered, knowledge);
        if !validation.valid {
            tracing::warn!(endpoint = endpoint.url(), question = text, errors = ?validation.errors, "built query failed validation");
        }
        let plan_fingerprint = fingerprint(&rendered);
        PreparedQuery { plan, rendered, fingerprint: plan_fingerprint, validation }
    }

    /// Ask a question of a single endpoint: discover, parse intent, build
    /// and validate the query, then execute it with retry.
    pub async fn ask(&self, text: &str, endpoint: &EndpointDescriptor) -> Result<GatewayAnswer> {
        let knowledge = self.discover(endpoint).await;
        let intent = self.intent_parser.parse(text, &knowledge).await;
        let prepared = self.build_and_validate(endpoint, text, &knowledge, &intent);
        if !prepared.validation.valid {
            return Err(Error::validation(prepared.validation.errors.clone()));
        }

        let result = self.orchestrator.execute(endpoint, &prepared.plan, &[]).await?;
        let mut queries = HashMap::new();
        queries.insert(endpoint.url().to_string(), prepared);
        Ok(GatewayAnswer { queries, result })
    }

    /// Ask a question that spans multiple endpoints: discover each, parse
    /// one intent per endpoint (each grounded in that endpoint's own
    /// knowledge), compose a federated plan ordered by discovered rate
    /// limits as a selectivity proxy, and execute it leg by leg.
    pub async fn ask_federated(&self, text: &str, endpoints: &[EndpointDescriptor]) -> Result<GatewayAnswer> {
        if endpoints.is_empty() {
            return Err(Error::config("ask_federated requires at least one endpoint"));
        }
        if endpoints.len() == 1 {
            return self.ask(text, &endpoints[0]).await;
        }

        let mut queries = HashMap::new();
        let mut patterns_by_endpoint: BTreeMap<String, Vec<TriplePattern>> = BTreeMap::new();
        let mut select_vars: Vec<String> = Vec::new();
        let mut descriptors = HashMap::new();

        for endpoint in endpoints {
            let knowledge = self.discover(endpoint).await;
            let intent = self.intent_parser.parse(text, &knowledge).await;
            let prepared = self.build_and_validate(endpoint, text, &knowledge, &intent);

            for var in &prepared.plan.select_vars {
                if !select_vars.contains(var) {
                    select_vars.push(var.clone());
                }
            }
            patterns_by_endpoint.insert(endpoint.url().to_string(), prepared.plan.patterns.clone());
            descriptors.insert(endpoint.url().to_string(), endpoint.clone());
            queries.insert(endpoint.url().to_string(), prepared);
        }

        // Legs are executed independently against their own endpoints and merged
        // client-side (see `federation::union`) rather than composed into one
        // SERVICE-bearing query text and shipped to a single host endpoint — this
        // gateway has no designated host endpoint to run composed text against,
        // and per-endpoint rate limiting/retry already assumes one leg per
        // Transport call. `federation::plan`'s cost-estimating composer is kept
        // for callers that do want the single-query form; it is not used here.
        let plan = crate::model::FederatedPlan::new(MergeStrategy::Union);
        let plan = patterns_by_endpoint.iter().fold(plan, |plan, (endpoint_url, patterns)| {
            let leg_plan = QueryPlan {
                endpoint_url: endpoint_url.clone(),
                form: crate::model::QueryForm::Select,
                prefixes: Vec::new(),
                select_vars: select_vars.clone(),
                distinct: false,
                patterns: patterns.clone(),
                filters: Vec::new(),
                optional_blocks: Vec::new(),
                order_by: None,
                limit: None,
                graph: None,
            };
            plan.with_leg(crate::model::FederatedLeg { plan: leg_plan, silent: false, estimated_cost: patterns.len() as u64 })
        });

        let results = self.orchestrator.execute_federated(&descriptors, &plan).await?;
        let merged = federation::union(&results, true);
        Ok(GatewayAnswer { queries, result: merged })
    }

    pub fn executor(&self) -> &Arc<QueryExecutor> {
        &self.executor
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}
