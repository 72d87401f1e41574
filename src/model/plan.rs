//! Query plans produced by the Query Builder and the Federated
//! Planner.

use serde::{Deserialize, Serialize};

/// The SPARQL query form a plan will render to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryForm {
    Select,
    Ask,
    Describe,
    Construct,
}

/// A single triple pattern, stored pre-rendered (`?s wdt:P31 wd:Q5`) rather
/// than as a parsed AST — the builder assembles text incrementally and the
/// validator re-parses only what it needs to check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriplePattern {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// A single-endpoint query plan under construction/ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub endpoint_url: String,
    pub form: QueryForm,
    pub prefixes: Vec<(String, String)>,
    pub select_vars: Vec<String>,
    pub distinct: bool,
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<String>,
    pub optional_blocks: Vec<Vec<TriplePattern>>,
    pub order_by: Option<String>,
    pub limit: Option<u64>,
    pub graph: Option<String>,
}

impl QueryPlan {
    pub fn new(endpoint_url: impl Into<String>, form: QueryForm) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            form,
            prefixes: Vec::new(),
            select_vars: Vec::new(),
            distinct: false,
            patterns: Vec::new(),
            filters: Vec::new(),
            optional_blocks: Vec::new(),
            order_by: None,
            limit: None,
            graph: None,
        }
    }

    /// Render the plan to SPARQL text. This is intentionally simple text
    /// assembly, not a general-purpose SPARQL pretty-printer.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (prefix, iri) in &self.prefixes {
            out.push_str(&format!("PREFIX {prefix}: <{iri}>\n"));
        }
        match self.form {
            QueryForm::Select if self.select_vars.is_empty() => {
                out.push_str(if self.distinct { "SELECT DISTINCT *\n" } else { "SELECT *\n" });
            }
            QueryForm::Select => {
                out.push_str(if self.distinct { "SELECT DISTINCT " } else { "SELECT " });
                out.push_str(
                    &self
                        .select_vars
                        .iter()
                        .map(|v| format!("?{v}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                out.push('\n');
            }
            QueryForm::Ask => out.push_str("ASK\n"),
            QueryForm::Describe => {
                out.push_str("DESCRIBE ");
                out.push_str(
                    &self
                        .select_vars
                        .iter()
                        .map(|v| format!("?{v}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                );
                out.push('\n');
            }
            QueryForm::Construct => out.push_str("CONSTRUCT { }\n"),
        }
        out.push_str("WHERE {\n");
        if let Some(graph) = &self.graph {
            out.push_str(&format!("  GRAPH <{graph}> {{\n"));
        }
        for pattern in &self.patterns {
            out.push_str("  ");
            out.push_str(&pattern.render());
            out.push('\n');
        }
        for block in &self.optional_blocks {
            out.push_str("  OPTIONAL {\n");
            for pattern in block {
                out.push_str("    ");
                out.push_str(&pattern.render());
                out.push('\n');
            }
            out.push_str("  }\n");
        }
        for filter in &self.filters {
            out.push_str(&format!("  FILTER({filter})\n"));
        }
        if self.graph.is_some() {
            out.push_str("  }\n");
        }
        out.push_str("}\n");
        if let Some(order) = &self.order_by {
            out.push_str(&format!("ORDER BY {order}\n"));
        }
        if let Some(limit) = self.limit {
            out.push_str(&format!("LIMIT {limit}\n"));
        }
        out
    }
}

/// Join semantics between two legs of a federated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Union,
    Join,
}

/// One leg of a federated plan: a sub-plan targeting one endpoint, plus
/// whether its failure should be silent (degrade to partial result) or
/// fatal to the whole federation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedLeg {
    pub plan: QueryPlan,
    pub silent: bool,
    /// Estimated relative cost used by the planner to order legs
    /// (cheapest/most-selective first); see the planner's cost model.
    pub estimated_cost: u64,
}

/// A plan spanning more than one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedPlan {
    pub legs: Vec<FederatedLeg>,
    pub merge: MergeStrategy,
    pub join_variables: Vec<String>,
}

impl FederatedPlan {
    pub fn new(merge: MergeStrategy) -> Self {
        Self {
            legs: Vec::new(),
            merge,
            join_variables: Vec::new(),
        }
    }

    pub fn with_leg(mut self, leg: FederatedLeg) -> Self {
        self.legs.push(leg);
        self
    }

    /// Legs ordered cheapest-first, the order the orchestrator executes in.
    pub fn legs_by_cost(&self) -> Vec<&FederatedLeg> {
        let mut legs: Vec<&FederatedLeg> = self.legs.iter().collect();
        legs.sort_by_key(|leg| leg.estimated_cost);
        legs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_select() {
        let mut plan = QueryPlan::new("https://e", QueryForm::Select);
        plan.prefixes.push(("wdt".into(), "http://www.wikidata.org/prop/direct/".into()));
        plan.select_vars.push("x".into());
        plan.patterns.push(TriplePattern::new("?x", "wdt:P31", "wd:Q5"));
        plan.limit = Some(10);
        let rendered = plan.render();
        assert!(rendered.contains("PREFIX wdt:"));
        assert!(rendered.contains("SELECT ?x"));
        assert!(rendered.contains("?x wdt:P31 wd:Q5 ."));
        assert!(rendered.contains("LIMIT 10"));
    }

    #[test]
    fn renders_select_distinct() {
        let mut plan = QueryPlan::new("https://e", QueryForm::Select);
        plan.distinct = true;
        plan.select_vars.push("item".into());
        plan.select_vars.push("label".into());
        let rendered = plan.render();
        assert!(rendered.contains("SELECT DISTINCT ?item ?label"));
    }

    #[test]
    fn renders_graph_wrapped_pattern() {
        let mut plan = QueryPlan::new("https://e", QueryForm::Select);
        plan.graph = Some("http://g1".into());
        plan.patterns.push(TriplePattern::new("?s", "?p", "?o"));
        let rendered = plan.render();
        assert!(rendered.contains("GRAPH <http://g1>"));
    }

    #[test]
    fn federated_plan_orders_legs_by_cost() {
        let cheap = FederatedLeg {
            plan: QueryPlan::new("https://a", QueryForm::Select),
            silent: false,
            estimated_cost: 10,
        };
        let expensive = FederatedLeg {
            plan: QueryPlan::new("https://b", QueryForm::Select),
            silent: true,
            estimated_cost: 1000,
        };
        let fed = FederatedPlan::new(MergeStrategy::Union)
            .with_leg(expensive.clone())
            .with_leg(cheap.clone());
        let ordered = fed.legs_by_cost();
        assert_eq!(ordered[0].plan.endpoint_url, "https://a");
        assert_eq!(ordered[1].plan.endpoint_url, "https://b");
    }
}
