//! RDF/XML reading and writing for relationship documents.
//!
//! The reader handles the striped subset relationship documents use:
//! `rdf:Description` (or typed) node elements directly under `rdf:RDF`,
//! each holding property elements whose object is an `rdf:resource`, an
//! `rdf:nodeID`, or a (possibly typed) text literal. Property attributes
//! on node elements are read as plain literals. `xml:lang` is inherited by
//! nested elements and tags the plain literals in its scope.
//!
//! Two writers exist. [`write`] is strict: every predicate namespace must
//! be bound to a prefix in the graph. [`write_fallback`] declares unbound
//! namespaces on the property element itself. [`serialize`] tries the
//! strict writer first.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

use dor_types::names::ns;

use crate::error::{RelsError, RelsResult};
use crate::graph::RelsGraph;
use crate::triple::{RdfObject, Triple, BLANK_NODE_PREFIX};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
const INDENT: &str = "    ";
const FALLBACK_PREFIX: &str = "ns0";

/// Unqualified attribute names read as if they carried the `rdf:` prefix.
const BARE_RDF_ATTRIBUTES: &[&str] = &["about", "resource", "datatype", "nodeID", "ID", "parseType"];

fn parse_err(err: impl std::fmt::Display) -> RelsError {
    RelsError::Parse(err.to_string())
}

fn serialize_err(err: impl std::fmt::Display) -> RelsError {
    RelsError::Serialize(err.to_string())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Parse an RDF/XML document. The returned graph's prefix map holds every
/// `xmlns:` declaration in the document, first binding wins.
pub fn parse(bytes: &[u8]) -> RelsResult<RelsGraph> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| RelsError::Parse(format!("content is not UTF-8: {e}")))?;
    let mut reader = Reader::from_str(text);
    let mut parser = DocumentParser::default();

    loop {
        match reader.read_event().map_err(parse_err)? {
            Event::Start(e) => parser.open(&e, false)?,
            Event::Empty(e) => parser.open(&e, true)?,
            Event::End(_) => parser.close()?,
            Event::Text(t) => {
                let text = t.unescape().map_err(parse_err)?;
                parser.text(&text)?;
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(&c).map_err(parse_err)?;
                parser.text(text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    parser.finish()
}

#[derive(Debug)]
struct PendingProperty {
    predicate: String,
    resource: Option<String>,
    datatype: Option<String>,
    lang: Option<String>,
    text: String,
}

#[derive(Debug, Default)]
struct DocumentParser {
    /// Namespace declarations per open element, `""` for the default namespace.
    scopes: Vec<Vec<(String, String)>>,
    /// Effective `xml:lang` per open element.
    langs: Vec<Option<String>>,
    graph: RelsGraph,
    depth: usize,
    seen_root: bool,
    subject: Option<String>,
    pending: Option<PendingProperty>,
}

impl DocumentParser {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> RelsResult<()> {
        let raw = read_attributes(e)?;

        let mut scope = Vec::new();
        for (key, value) in &raw {
            if key == "xmlns" {
                scope.push((String::new(), value.clone()));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                scope.push((prefix.to_string(), value.clone()));
                self.graph.bind_prefix(prefix, value.clone());
            }
        }
        self.scopes.push(scope);
        let lang = match raw.iter().find(|(key, _)| key == "xml:lang") {
            Some((_, tag)) if tag.is_empty() => None,
            Some((_, tag)) => Some(tag.clone()),
            None => self.current_lang(),
        };
        self.langs.push(lang);

        let name = std::str::from_utf8(e.name().as_ref()).map_err(parse_err)?.to_string();
        let element = self.resolve_element(&name)?;
        let attrs = self.resolve_attributes(&raw)?;

        match self.depth {
            0 => self.open_root(&element)?,
            1 => self.open_node(&element, &attrs, empty)?,
            2 => self.open_property(element, &attrs, empty)?,
            _ => {
                return Err(RelsError::Parse(format!(
                    "nested element {name} inside a property is not supported"
                )))
            }
        }

        if empty {
            self.scopes.pop();
            self.langs.pop();
        } else {
            self.depth += 1;
        }
        Ok(())
    }

    fn open_root(&mut self, element: &str) -> RelsResult<()> {
        if element != format!("{}RDF", ns::RDF) {
            return Err(RelsError::Parse(format!("expected rdf:RDF root, found <{element}>")));
        }
        self.seen_root = true;
        Ok(())
    }

    fn open_node(&mut self, element: &str, attrs: &[(String, String)], empty: bool) -> RelsResult<()> {
        let mut subject = None;
        let mut types = Vec::new();
        let mut literals = Vec::new();
        for (uri, value) in attrs {
            match uri.strip_prefix(ns::RDF) {
                Some("about") => subject = Some(value.clone()),
                Some("nodeID") => subject = Some(format!("{BLANK_NODE_PREFIX}{value}")),
                Some("type") => types.push(value.clone()),
                Some(other) => {
                    return Err(RelsError::Parse(format!(
                        "unsupported rdf:{other} attribute on node element"
                    )))
                }
                None => literals.push((uri.clone(), value.clone())),
            }
        }
        let subject = subject.ok_or_else(|| {
            RelsError::Parse("node element has neither rdf:about nor rdf:nodeID".into())
        })?;

        let rdf_type = format!("{}type", ns::RDF);
        if element != format!("{}Description", ns::RDF) {
            types.insert(0, element.to_string());
        }
        for ty in types {
            self.graph
                .insert(Triple::new(subject.clone(), rdf_type.clone(), RdfObject::Resource(ty)));
        }
        let lang = self.current_lang();
        for (predicate, value) in literals {
            self.graph.insert(Triple::new(
                subject.clone(),
                predicate,
                RdfObject::Literal {
                    value,
                    datatype: None,
                    lang: lang.clone(),
                },
            ));
        }

        if !empty {
            self.subject = Some(subject);
        }
        Ok(())
    }

    fn open_property(&mut self, predicate: String, attrs: &[(String, String)], empty: bool) -> RelsResult<()> {
        let mut resource = None;
        let mut datatype = None;
        for (uri, value) in attrs {
            match uri.strip_prefix(ns::RDF) {
                Some("resource") => resource = Some(value.clone()),
                Some("nodeID") => resource = Some(format!("{BLANK_NODE_PREFIX}{value}")),
                Some("datatype") => datatype = Some(value.clone()),
                Some(other) => {
                    return Err(RelsError::Parse(format!(
                        "unsupported rdf:{other} attribute on property element"
                    )))
                }
                None => {
                    return Err(RelsError::Parse(format!(
                        "unsupported attribute <{uri}> on property element"
                    )))
                }
            }
        }

        let pending = PendingProperty {
            predicate,
            resource,
            lang: if datatype.is_none() { self.current_lang() } else { None },
            datatype,
            text: String::new(),
        };
        if empty {
            self.emit(pending)
        } else {
            self.pending = Some(pending);
            Ok(())
        }
    }

    fn close(&mut self) -> RelsResult<()> {
        self.depth = self
            .depth
            .checked_sub(1)
            .ok_or_else(|| RelsError::Parse("unbalanced end tag".into()))?;
        self.scopes.pop();
        self.langs.pop();
        match self.depth {
            2 => {
                let pending = self
                    .pending
                    .take()
                    .ok_or_else(|| RelsError::Parse("property end without start".into()))?;
                self.emit(pending)
            }
            1 => {
                self.subject = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn text(&mut self, text: &str) -> RelsResult<()> {
        match self.pending.as_mut() {
            Some(p) => p.text.push_str(text),
            None if text.trim().is_empty() => {}
            None => return Err(RelsError::Parse(format!("unexpected text {:?}", text.trim()))),
        }
        Ok(())
    }

    fn emit(&mut self, p: PendingProperty) -> RelsResult<()> {
        let subject = self
            .subject
            .clone()
            .ok_or_else(|| RelsError::Parse("property element outside a node element".into()))?;
        let object = match p.resource {
            Some(uri) if p.text.trim().is_empty() => RdfObject::Resource(uri),
            Some(_) => {
                return Err(RelsError::Parse(format!(
                    "property <{}> has both rdf:resource and text content",
                    p.predicate
                )))
            }
            None => RdfObject::Literal {
                value: p.text,
                datatype: p.datatype,
                lang: p.lang,
            },
        };
        self.graph.insert(Triple::new(subject, p.predicate, object));
        Ok(())
    }

    fn finish(self) -> RelsResult<RelsGraph> {
        if !self.seen_root {
            return Err(RelsError::Parse("document has no rdf:RDF root".into()));
        }
        Ok(self.graph)
    }

    fn current_lang(&self) -> Option<String> {
        self.langs.last().cloned().flatten()
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NS);
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn resolve_element(&self, name: &str) -> RelsResult<String> {
        let (prefix, local) = name.split_once(':').unwrap_or(("", name));
        self.lookup(prefix)
            .map(|uri| format!("{uri}{local}"))
            .ok_or_else(|| RelsError::Parse(format!("element <{name}> is not in a bound namespace")))
    }

    /// Expand attribute names, dropping namespace declarations, `xml:`
    /// attributes, and unqualified attributes with no RDF meaning.
    fn resolve_attributes(&self, raw: &[(String, String)]) -> RelsResult<Vec<(String, String)>> {
        let mut out = Vec::new();
        for (key, value) in raw {
            if key == "xmlns" || key.starts_with("xmlns:") || key.starts_with("xml:") {
                continue;
            }
            match key.split_once(':') {
                Some((prefix, local)) => {
                    let uri = self.lookup(prefix).ok_or_else(|| {
                        RelsError::Parse(format!("attribute {key} uses unbound prefix {prefix}"))
                    })?;
                    out.push((format!("{uri}{local}"), value.clone()));
                }
                None if BARE_RDF_ATTRIBUTES.contains(&key.as_str()) => {
                    out.push((format!("{}{key}", ns::RDF), value.clone()));
                }
                None => {}
            }
        }
        Ok(out)
    }
}

fn read_attributes(e: &BytesStart<'_>) -> RelsResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(parse_err)?;
        let key = std::str::from_utf8(attr.key.as_ref()).map_err(parse_err)?.to_string();
        let value = attr.unescape_value().map_err(parse_err)?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Split a predicate URI into namespace and local name at its last `#`,
/// `/`, or `:`. The local name must be a valid XML name.
pub fn split_predicate(uri: &str) -> Option<(&str, &str)> {
    let at = uri.rfind(['#', '/']).or_else(|| uri.rfind(':'))?;
    let (namespace, local) = uri.split_at(at + 1);
    is_ncname(local).then_some((namespace, local))
}

fn is_ncname(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Prefix declarations written on the root element, `rdf` first.
fn root_declarations(graph: &RelsGraph) -> Vec<(&str, &str)> {
    let mut decls = vec![(ns::RDF_PREFIX, ns::RDF)];
    decls.extend(
        graph
            .prefixes()
            .iter()
            .filter(|(prefix, _)| !prefix.is_empty() && prefix.as_str() != ns::RDF_PREFIX)
            .map(|(p, u)| (p.as_str(), u.as_str())),
    );
    decls
}

fn declared_prefix<'a>(decls: &[(&'a str, &str)], namespace: &str) -> Option<&'a str> {
    decls.iter().find(|(_, uri)| *uri == namespace).map(|(p, _)| *p)
}

/// Triples grouped by subject, in order of first appearance.
fn by_subject(triples: &[Triple]) -> Vec<(&str, Vec<&Triple>)> {
    let mut groups: Vec<(&str, Vec<&Triple>)> = Vec::new();
    for t in triples {
        match groups.iter_mut().find(|(s, _)| *s == t.subject) {
            Some((_, members)) => members.push(t),
            None => groups.push((t.subject.as_str(), vec![t])),
        }
    }
    groups
}

fn node_attribute(subject: &str) -> (&'static str, &str) {
    match subject.strip_prefix(BLANK_NODE_PREFIX) {
        Some(id) => ("rdf:nodeID", id),
        None => ("rdf:about", subject),
    }
}

/// Strict writer. Fails if a predicate's namespace has no declared prefix
/// or its local part is not an XML name.
pub fn write(graph: &RelsGraph) -> RelsResult<Vec<u8>> {
    let decls = root_declarations(graph);
    let mut names = Vec::with_capacity(graph.len());
    for t in graph.triples() {
        let (namespace, local) = split_predicate(&t.predicate).ok_or_else(|| {
            RelsError::Serialize(format!("predicate {} has no XML local name", t.predicate))
        })?;
        let prefix = declared_prefix(&decls, namespace)
            .ok_or_else(|| RelsError::Serialize(format!("no prefix bound for namespace {namespace}")))?;
        names.push(format!("{prefix}:{local}"));
    }

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT.len());
    let mut root = BytesStart::new("rdf:RDF");
    for (prefix, uri) in &decls {
        root.push_attribute((format!("xmlns:{prefix}").as_str(), *uri));
    }
    writer.write_event(Event::Start(root)).map_err(serialize_err)?;

    for (subject, members) in by_subject(graph.triples()) {
        let mut desc = BytesStart::new("rdf:Description");
        desc.push_attribute(node_attribute(subject));
        writer.write_event(Event::Start(desc)).map_err(serialize_err)?;

        for t in members {
            let index = graph
                .triples()
                .iter()
                .position(|x| x == t)
                .ok_or_else(|| RelsError::Serialize("triple vanished during write".into()))?;
            let qname = names[index].as_str();
            let mut el = BytesStart::new(qname);
            match &t.object {
                RdfObject::Resource(uri) => {
                    match uri.strip_prefix(BLANK_NODE_PREFIX) {
                        Some(id) => el.push_attribute(("rdf:nodeID", id)),
                        None => el.push_attribute(("rdf:resource", uri.as_str())),
                    }
                    writer.write_event(Event::Empty(el)).map_err(serialize_err)?;
                }
                RdfObject::Literal { value, datatype, lang } => {
                    match (datatype, lang) {
                        (Some(dt), _) => el.push_attribute(("rdf:datatype", dt.as_str())),
                        (None, Some(lang)) => el.push_attribute(("xml:lang", lang.as_str())),
                        (None, None) => {}
                    }
                    writer.write_event(Event::Start(el)).map_err(serialize_err)?;
                    writer
                        .write_event(Event::Text(BytesText::new(value)))
                        .map_err(serialize_err)?;
                    writer
                        .write_event(Event::End(BytesEnd::new(qname)))
                        .map_err(serialize_err)?;
                }
            }
        }
        writer
            .write_event(Event::End(BytesEnd::new("rdf:Description")))
            .map_err(serialize_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("rdf:RDF")))
        .map_err(serialize_err)?;

    let mut out = writer.into_inner();
    out.push(b'\n');
    Ok(out)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Lenient writer. Predicates whose namespace is not declared on the root
/// get an `xmlns:ns0` declaration on their own element.
pub fn write_fallback(graph: &RelsGraph) -> RelsResult<Vec<u8>> {
    let decls = root_declarations(graph);
    let mut out = String::from("<rdf:RDF");
    for (prefix, uri) in &decls {
        out.push_str(&format!(" xmlns:{prefix}=\"{}\"", escape(uri)));
    }
    out.push_str(">\n");

    for (subject, members) in by_subject(graph.triples()) {
        let (attr, value) = node_attribute(subject);
        out.push_str(&format!("{INDENT}<rdf:Description {attr}=\"{}\">\n", escape(value)));
        for t in members {
            let (namespace, local) = split_predicate(&t.predicate).ok_or_else(|| {
                RelsError::Serialize(format!("predicate {} has no XML local name", t.predicate))
            })?;
            let (qname, inline_decl) = match declared_prefix(&decls, namespace) {
                Some(prefix) => (format!("{prefix}:{local}"), String::new()),
                None => (
                    format!("{FALLBACK_PREFIX}:{local}"),
                    format!(" xmlns:{FALLBACK_PREFIX}=\"{}\"", escape(namespace)),
                ),
            };
            out.push_str(&format!("{INDENT}{INDENT}<{qname}{inline_decl}"));
            match &t.object {
                RdfObject::Resource(uri) => match uri.strip_prefix(BLANK_NODE_PREFIX) {
                    Some(id) => out.push_str(&format!(" rdf:nodeID=\"{}\"/>\n", escape(id))),
                    None => out.push_str(&format!(" rdf:resource=\"{}\"/>\n", escape(uri))),
                },
                RdfObject::Literal { value, datatype, lang } => {
                    match (datatype, lang) {
                        (Some(dt), _) => out.push_str(&format!(" rdf:datatype=\"{}\"", escape(dt))),
                        (None, Some(lang)) => out.push_str(&format!(" xml:lang=\"{}\"", escape(lang))),
                        (None, None) => {}
                    }
                    out.push_str(&format!(">{}</{qname}>\n", escape(value)));
                }
            }
        }
        out.push_str(&format!("{INDENT}</rdf:Description>\n"));
    }
    out.push_str("</rdf:RDF>\n");
    Ok(out.into_bytes())
}

/// Write with the strict writer, falling back to [`write_fallback`] when
/// it fails.
pub fn serialize(graph: &RelsGraph) -> RelsResult<Vec<u8>> {
    match write(graph) {
        Ok(bytes) => Ok(bytes),
        Err(primary) => {
            warn!(error = %primary, "strict rdf/xml writer failed, using fallback writer");
            write_fallback(graph)
        }
    }
}
