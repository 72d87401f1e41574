//! Query builder: turns an [`Intent`] plus [`DiscoveryKnowledge`]
//! into a [`QueryPlan`] incrementally — append-only fields with a final
//! `serialize`/`render` step.

use crate::model::{
    Action, Comparator, DiscoveryKnowledge, Filter, Intent, QueryForm, QueryPlan, TriplePattern,
};

/// Incremental builder for a single-endpoint [`QueryPlan`]. Mirrors the
/// its own incremental operations directly: `add_prefix`, `add_triple`,
/// `add_filter`, `add_optional`, `set_limit`, `set_order_by`, `set_group_by`.
pub struct QueryBuilder {
    plan: QueryPlan,
    group_by: Vec<String>,
}

impl QueryBuilder {
    pub fn new(endpoint_url: impl Into<String>, form: QueryForm) -> Self {
        Self {
            plan: QueryPlan::new(endpoint_url, form),
            group_by: Vec::new(),
        }
    }

    /// First declaration of a prefix wins; later calls with the same prefix
    /// name are ignored.
    pub fn add_prefix(mut self, prefix: impl Into<String>, namespace: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.plan.prefixes.iter().any(|(p, _)| p == &prefix) {
            self.plan.prefixes.push((prefix, namespace.into()));
        }
        self
    }

    pub fn set_select_vars(mut self, vars: Vec<String>) -> Self {
        self.plan.select_vars = vars;
        self
    }

    pub fn add_triple(
        mut self,
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        self.plan.patterns.push(TriplePattern::new(subject, predicate, object));
        self
    }

    pub fn add_filter(mut self, expr: impl Into<String>) -> Self {
        self.plan.filters.push(expr.into());
        self
    }

    pub fn add_optional(mut self, triples: Vec<TriplePattern>) -> Self {
        self.plan.optional_blocks.push(triples);
        self
    }

    pub fn set_distinct(mut self, distinct: bool) -> Self {
        self.plan.distinct = distinct;
        self
    }

    pub fn set_limit(mut self, limit: u64) -> Self {
        self.plan.limit = Some(limit);
        self
    }

    pub fn set_order_by(mut self, variable: impl Into<String>, ascending: bool) -> Self {
        let variable = variable.into();
        self.plan.order_by = Some(if ascending {
            format!("ASC(?{variable})")
        } else {
            format!("DESC(?{variable})")
        });
        self
    }

    pub fn set_group_by(mut self, vars: Vec<String>) -> Self {
        self.group_by = vars;
        self
    }

    pub fn set_graph(mut self, graph: impl Into<String>) -> Self {
        self.plan.graph = Some(graph.into());
        self
    }

    /// Render the accumulated plan to SPARQL text. `GROUP BY` is appended
    /// here rather than stored on [`QueryPlan`] since the plan's `render`
    /// has no slot for it and only the builder path produces grouped
    /// queries.
    pub fn serialize(&self) -> String {
        let mut out = self.plan.render();
        if !self.group_by.is_empty() {
            let vars = self.group_by.iter().map(|v| format!("?{v}")).collect::<Vec<_>>().join(" ");
            out.push_str(&format!("GROUP BY {vars}\n"));
        }
        out
    }

    pub fn build(self) -> QueryPlan {
        self.plan
    }
}

/// Build a starter plan from an [`Intent`], consulting `knowledge`'s pattern
/// hints so e.g. the keyword "human" resolves to `?x wdt:P31 wd:Q5` on an
/// endpoint that advertises that hint.
pub fn builder_from_intent(endpoint_url: &str, intent: &Intent, knowledge: &DiscoveryKnowledge) -> QueryBuilder {
    let form = match intent.action {
        Action::Select => QueryForm::Select,
        Action::Ask => QueryForm::Ask,
        Action::Describe => QueryForm::Describe,
        Action::Count => QueryForm::Select,
    };
    let mut builder = QueryBuilder::new(endpoint_url, form).set_select_vars(vec!["s".into(), "p".into(), "o".into()]);

    for (prefix, namespace) in &knowledge.prefixes {
        builder = builder.add_prefix(prefix.clone(), namespace.clone());
    }

    let mut matched_pattern = false;
    for keyword in &intent.keywords {
        if let Some(pattern) = knowledge.pattern_for(keyword) {
            let parts: Vec<&str> = pattern.splitn(3, ' ').collect();
            if let [s, p, o] = parts[..] {
                builder = builder.add_triple(s, p, o);
                matched_pattern = true;
                break;
            }
        }
    }
    if !matched_pattern {
        builder = builder.add_triple("?s", "?p", "?o");
    }

    for filter in &intent.filters {
        builder = builder.add_filter(render_filter(filter, "o"));
    }

    if let Some(limit) = intent.limit {
        builder = builder.set_limit(limit);
    }
    if let Some(ordering) = &intent.ordering {
        builder = builder.set_order_by(
            &ordering.variable,
            matches!(ordering.direction, crate::model::SortDirection::Asc),
        );
    }
    builder
}

/// Translate a [`Filter`] into a `FILTER(...)` expression body, binding its
/// placeholder comparison variable to `bound_var` (the object position of
/// the plan's primary triple pattern).
fn render_filter(filter: &Filter, bound_var: &str) -> String {
    match filter.comparator {
        Comparator::Eq => format!("?{bound_var} = {}", numeric_or_quoted(&filter.value)),
        Comparator::Ne => format!("?{bound_var} != {}", numeric_or_quoted(&filter.value)),
        Comparator::Lt => format!("?{bound_var} < {}", numeric_or_quoted(&filter.value)),
        Comparator::Lte => format!("?{bound_var} <= {}", numeric_or_quoted(&filter.value)),
        Comparator::Gt => format!("?{bound_var} > {}", numeric_or_quoted(&filter.value)),
        Comparator::Gte => format!("?{bound_var} >= {}", numeric_or_quoted(&filter.value)),
        Comparator::Contains => format!("CONTAINS(STR(?{bound_var}), \"{}\")", filter.value),
        Comparator::Regex => format!("REGEX(STR(?{bound_var}), \"{}\")", filter.value),
    }
}

fn numeric_or_quoted(value: &str) -> String {
    if value.parse::<f64>().is_ok() {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DiscoveryMode;

    #[test]
    fn first_prefix_declaration_wins() {
        let builder = QueryBuilder::new("https://e", QueryForm::Select)
            .add_prefix("wdt", "http://www.wikidata.org/prop/direct/")
            .add_prefix("wdt", "http://other/");
        assert_eq!(builder.plan.prefixes, vec![("wdt".to_string(), "http://www.wikidata.org/prop/direct/".to_string())]);
    }

    #[test]
    fn serialize_includes_group_by() {
        let builder = QueryBuilder::new("https://e", QueryForm::Select)
            .add_triple("?s", "?p", "?o")
            .set_group_by(vec!["s".into()]);
        assert!(builder.serialize().contains("GROUP BY ?s"));
    }

    #[test]
    fn builder_from_intent_uses_pattern_hint() {
        let mut knowledge = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        knowledge.patterns.push(crate::model::PatternHint {
            label: "human".into(),
            pattern: "?x wdt:P31 wd:Q5".into(),
        });
        let intent = Intent::new(Action::Select, crate::model::IntentSource::RuleBased)
            .with_keywords(vec!["human".into()]);
        let builder = builder_from_intent("https://e", &intent, &knowledge);
        let rendered = builder.serialize();
        assert!(rendered.contains("?x wdt:P31 wd:Q5"));
    }

    #[test]
    fn builder_from_intent_emits_filter_from_intent() {
        let knowledge = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        let intent = Intent::new(Action::Select, crate::model::IntentSource::RuleBased)
            .with_keywords(vec!["cities".into()])
            .with_filter(crate::model::Filter {
                variable: "value".into(),
                comparator: Comparator::Gte,
                value: "1000000".into(),
            });
        let builder = builder_from_intent("https://e", &intent, &knowledge);
        let rendered = builder.serialize();
        assert!(rendered.contains("FILTER(?o >= 1000000)"));
    }

    #[test]
    fn builder_from_intent_falls_back_to_wildcard_pattern() {
        let knowledge = DiscoveryKnowledge::empty("https://e", DiscoveryMode::Full);
        let intent = Intent::new(Action::Select, crate::model::IntentSource::RuleBased)
            .with_keywords(vec!["nonsense".into()]);
        let builder = builder_from_intent("https://e", &intent, &knowledge);
        assert!(builder.serialize().contains("?s ?p ?o ."));
    }
}
