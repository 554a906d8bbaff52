use std::collections::BTreeMap;

use dor_types::names::ns;

use crate::triple::Triple;

/// A relationship graph: an ordered, duplicate-free triple list plus the
/// prefix-to-namespace map of the document it came from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelsGraph {
    prefixes: BTreeMap<String, String>,
    triples: Vec<Triple>,
}

impl RelsGraph {
    /// An empty graph with the default `rdf` and `rel` prefixes bound.
    pub fn new() -> Self {
        let mut graph = Self::empty();
        graph.bind_defaults();
        graph
    }

    /// An empty graph with no prefixes at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind `rdf` and `rel` unless the prefix or its namespace is already bound.
    pub fn bind_defaults(&mut self) {
        for (prefix, uri) in [(ns::RDF_PREFIX, ns::RDF), (ns::RELS_EXT_PREFIX, ns::RELS_EXT)] {
            let uri_bound = self.prefixes.values().any(|u| u == uri);
            if !uri_bound && !self.prefixes.contains_key(prefix) {
                self.prefixes.insert(prefix.to_string(), uri.to_string());
            }
        }
    }

    /// Bind a prefix. An existing binding for the same prefix is kept.
    pub fn bind_prefix(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.prefixes.entry(prefix.into()).or_insert_with(|| uri.into());
    }

    /// Prefix to namespace URI.
    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// The prefix bound to `uri`, lowest prefix first when several are.
    pub fn prefix_for_namespace(&self, uri: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, u)| u.as_str() == uri)
            .map(|(p, _)| p.as_str())
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// Add a triple. Returns `false` if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.contains(&triple) {
            return false;
        }
        self.triples.push(triple);
        true
    }

    /// Remove a triple. Returns `false` if it was not present.
    pub fn remove(&mut self, triple: &Triple) -> bool {
        let before = self.triples.len();
        self.triples.retain(|t| t != triple);
        self.triples.len() != before
    }

    /// Triples matching an optional subject and an optional (expanded) predicate.
    pub fn matching<'a>(
        &'a self,
        subject: Option<&'a str>,
        predicate: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        self.triples.iter().filter(move |t| {
            subject.map_or(true, |s| t.subject == s) && predicate.map_or(true, |p| t.predicate == p)
        })
    }

    /// Expand a CURIE such as `rel:isMemberOf` using this graph's prefixes.
    /// Anything that does not start with a bound prefix is returned unchanged.
    pub fn expand_curie(&self, value: &str) -> String {
        if let Some((prefix, local)) = value.split_once(':') {
            if let Some(uri) = self.prefixes.get(prefix) {
                return format!("{uri}{local}");
            }
        }
        value.to_string()
    }

    /// Split into prefixes and triples.
    pub fn into_parts(self) -> (BTreeMap<String, String>, Vec<Triple>) {
        (self.prefixes, self.triples)
    }

    /// Rebuild from prefixes and triples, dropping duplicate triples.
    pub fn from_parts(prefixes: BTreeMap<String, String>, triples: impl IntoIterator<Item = Triple>) -> Self {
        let mut graph = Self {
            prefixes,
            triples: Vec::new(),
        };
        for t in triples {
            graph.insert(t);
        }
        graph
    }

    /// Same triples, ignoring order and prefixes.
    pub fn same_triples(&self, other: &Self) -> bool {
        self.len() == other.len() && self.triples.iter().all(|t| other.contains(t))
    }
}
