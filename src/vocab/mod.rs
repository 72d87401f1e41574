//! Prefix/vocabulary index and the `owl:sameAs` closure helper
//! supplementing it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// How [`VocabularyIndex::generate_for_namespaces`] resolves a prefix
/// collision against an already-assigned key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionStrategy {
    KeepExisting,
    Overwrite,
    RenameSuffix,
}

static PREFIX_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)PREFIX\s+([A-Za-z_][\w.-]*)\s*:\s*<([^>]+)>").expect("invalid regex")
});

fn seed_prefixes() -> BTreeMap<String, String> {
    [
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
        ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
        ("owl", "http://www.w3.org/2002/07/owl#"),
        ("xsd", "http://www.w3.org/2001/XMLSchema#"),
        ("skos", "http://www.w3.org/2004/02/skos/core#"),
        ("dc", "http://purl.org/dc/elements/1.1/"),
        ("dcterms", "http://purl.org/dc/terms/"),
        ("foaf", "http://xmlns.com/foaf/0.1/"),
        ("schema", "http://schema.org/"),
        ("dbo", "http://dbpedia.org/ontology/"),
        ("dbr", "http://dbpedia.org/resource/"),
        ("geo", "http://www.w3.org/2003/01/geo/wgs84_pos#"),
        ("prov", "http://www.w3.org/ns/prov#"),
        ("void", "http://rdfs.org/ns/void#"),
        ("dcat", "http://www.w3.org/ns/dcat#"),
        ("vcard", "http://www.w3.org/2006/vcard/ns#"),
        ("time", "http://www.w3.org/2006/time#"),
        ("org", "http://www.w3.org/ns/org#"),
        ("qb", "http://purl.org/linked-data/cube#"),
        ("wdt", "http://www.wikidata.org/prop/direct/"),
    ]
    .into_iter()
    .map(|(p, ns)| (p.to_string(), ns.to_string()))
    .collect()
}

/// Derive a short candidate prefix from a namespace IRI, e.g.
/// `http://xmlns.com/foaf/0.1/` -> `foaf`.
fn candidate_prefix(namespace: &str) -> String {
    let trimmed = namespace.trim_end_matches(['/', '#']);
    let last_segment = trimmed.rsplit(['/', '#']).next().unwrap_or(trimmed);
    let alpha: String = last_segment.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if alpha.is_empty() {
        "ns".to_string()
    } else {
        alpha.to_ascii_lowercase()
    }
}

/// Maintains the seed prefix table plus endpoint-derived additions, and the
/// forward/reverse maps needed to shorten and expand IRIs.
#[derive(Debug, Clone)]
pub struct VocabularyIndex {
    prefix_to_ns: BTreeMap<String, String>,
    ns_to_prefix: HashMap<String, String>,
    same_as: HashMap<String, HashSet<String>>,
}

impl VocabularyIndex {
    pub fn new() -> Self {
        let prefix_to_ns = seed_prefixes();
        let ns_to_prefix = prefix_to_ns.iter().map(|(p, ns)| (ns.clone(), p.clone())).collect();
        Self { prefix_to_ns, ns_to_prefix, same_as: HashMap::new() }
    }

    /// Parse `PREFIX p: <ns>` declarations out of raw query text.
    pub fn extract_from_query(text: &str) -> BTreeMap<String, String> {
        PREFIX_DECL
            .captures_iter(text)
            .map(|c| (c[1].to_string(), c[2].to_string()))
            .collect()
    }

    /// Synthesize short prefixes for namespaces that don't have one yet,
    /// resolving collisions per `strategy`. `RENAME_SUFFIX` appends the
    /// lowest integer >= 2 that yields a fresh key.
    pub fn generate_for_namespaces(&mut self, namespaces: &[String], strategy: CollisionStrategy) {
        for namespace in namespaces {
            if self.ns_to_prefix.contains_key(namespace) {
                continue;
            }
            let base = candidate_prefix(namespace);
            let key = self.resolve_collision(&base, namespace, strategy);
            self.prefix_to_ns.insert(key.clone(), namespace.clone());
            self.ns_to_prefix.insert(namespace.clone(), key);
        }
    }

    fn resolve_collision(&mut self, base: &str, namespace: &str, strategy: CollisionStrategy) -> String {
        match self.prefix_to_ns.get(base) {
            None => base.to_string(),
            Some(existing_ns) if existing_ns == namespace => base.to_string(),
            Some(_) => match strategy {
                CollisionStrategy::KeepExisting => self.next_free_suffix(base),
                CollisionStrategy::Overwrite => {
                    self.prefix_to_ns.remove(base);
                    base.to_string()
                }
                CollisionStrategy::RenameSuffix => self.next_free_suffix(base),
            },
        }
    }

    fn next_free_suffix(&self, base: &str) -> String {
        let mut n = 2u32;
        loop {
            let candidate = format!("{base}{n}");
            if !self.prefix_to_ns.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Shorten a full IRI to `prefix:local` if its namespace is known;
    /// otherwise return the IRI unchanged (wrapped in angle brackets).
    pub fn shorten(&self, iri: &str) -> String {
        for (namespace, prefix) in &self.ns_to_prefix {
            if let Some(local) = iri.strip_prefix(namespace.as_str()) {
                if !local.is_empty() {
                    return format!("{prefix}:{local}");
                }
            }
        }
        format!("<{iri}>")
    }

    /// Expand a `prefix:local` form back to a full IRI, if the prefix is
    /// known.
    pub fn expand(&self, prefixed: &str) -> Option<String> {
        let (prefix, local) = prefixed.split_once(':')?;
        let namespace = self.prefix_to_ns.get(prefix)?;
        Some(format!("{namespace}{local}"))
    }

    /// Render `PREFIX p: <ns>` declarations for the given prefixes, in the
    /// order they're listed.
    pub fn emit_declarations(&self, prefixes: &[String]) -> String {
        prefixes
            .iter()
            .filter_map(|p| self.prefix_to_ns.get(p).map(|ns| format!("PREFIX {p}: <{ns}>")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefix_to_ns
    }

    /// Record a discovered `owl:sameAs` edge (undirected).
    pub fn add_same_as(&mut self, a: impl Into<String>, b: impl Into<String>) {
        let (a, b) = (a.into(), b.into());
        self.same_as.entry(a.clone()).or_default().insert(b.clone());
        self.same_as.entry(b).or_default().insert(a);
    }

    /// Transitive closure of `owl:sameAs` edges reachable from `iri`,
    /// excluding `iri` itself. Memoized per-index via a plain adjacency-list
    /// BFS — the graph is expected to be small (same-as clusters, not the
    /// whole dataset).
    pub fn same_as_closure(&self, iri: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut queue = vec![iri.to_string()];
        while let Some(current) = queue.pop() {
            if let Some(neighbors) = self.same_as.get(&current) {
                for neighbor in neighbors {
                    if visited.insert(neighbor.clone()) {
                        queue.push(neighbor.clone());
                    }
                }
            }
        }
        visited
    }
}

impl Default for VocabularyIndex {
    fn default() -> Self {
        Self::new()
    }
}
