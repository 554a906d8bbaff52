use tracing::{debug, info};

use dor_model::{Datastream, DatastreamContent, DigitalObject};
use dor_rels::{rdfxml, FilterMode, FilteredTriples, RdfObject, RelationshipTuple, RelsGraph, Triple};
use dor_types::names::RELS_EXT_DATASTREAM_ID;
use dor_types::{validate_uri, ChecksumType, ControlGroup, State, Timestamp};

use crate::error::{AccessError, AccessResult};

const RELS_EXT_LABEL: &str = "Relationships";
const RELS_EXT_MIME_TYPE: &str = "text/xml";

/// Arguments of one relationship add or purge.
///
/// `subject` defaults to the object's own URI. `predicate` may be a CURIE
/// such as `rel:isMemberOf`. Exactly one of `object_uri` and
/// `object_literal` must be set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Relationship<'a> {
    pub subject: Option<&'a str>,
    pub predicate: &'a str,
    pub object_uri: Option<&'a str>,
    pub object_literal: Option<&'a str>,
    pub literal_type: Option<&'a str>,
}

impl<'a> Relationship<'a> {
    /// A relationship to another resource, about this object.
    pub fn resource(predicate: &'a str, object_uri: &'a str) -> Self {
        Self {
            predicate,
            object_uri: Some(object_uri),
            ..Self::default()
        }
    }

    /// A relationship to a plain literal, about this object.
    pub fn literal(predicate: &'a str, value: &'a str) -> Self {
        Self {
            predicate,
            object_literal: Some(value),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: &'a str) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_literal_type(mut self, literal_type: &'a str) -> Self {
        self.literal_type = Some(literal_type);
        self
    }
}

/// Outcome of an add or purge that did not fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelationshipChange {
    /// A new `RELS-EXT` version was written.
    Changed(RelationshipTuple),
    /// The triple set was already in the requested shape.
    Unchanged,
}

impl RelationshipChange {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed(_))
    }
}

/// Reads and rewrites the `RELS-EXT` datastream of an object.
pub struct RelationshipEngine;

impl RelationshipEngine {
    /// Add a triple, creating `RELS-EXT` if the object has none.
    pub fn add(
        obj: &mut DigitalObject,
        now: Timestamp,
        rel: &Relationship<'_>,
    ) -> AccessResult<RelationshipChange> {
        Self::apply(obj, now, rel, FilterMode::Add)
    }

    /// Remove a triple. Purging from an object without `RELS-EXT` is a no-op.
    pub fn purge(
        obj: &mut DigitalObject,
        now: Timestamp,
        rel: &Relationship<'_>,
    ) -> AccessResult<RelationshipChange> {
        Self::apply(obj, now, rel, FilterMode::Purge)
    }

    /// Triples of the current `RELS-EXT` version matching the filters.
    pub fn list(
        obj: &DigitalObject,
        subject: Option<&str>,
        predicate: Option<&str>,
    ) -> AccessResult<Vec<RelationshipTuple>> {
        let Some(graph) = current_graph(obj)? else {
            return Ok(Vec::new());
        };
        let predicate = predicate.map(|p| graph.expand_curie(p));
        Ok(graph
            .matching(subject, predicate.as_deref())
            .cloned()
            .map(RelationshipTuple::from)
            .collect())
    }

    fn apply(
        obj: &mut DigitalObject,
        now: Timestamp,
        rel: &Relationship<'_>,
        mode: FilterMode,
    ) -> AccessResult<RelationshipChange> {
        let pid = obj
            .pid()
            .ok_or_else(|| AccessError::StructuralIntegrity("object has no pid".into()))?;
        let subject = rel.subject.map_or_else(|| pid.to_uri(), str::to_string);
        validate_uri(&subject)?;
        let object = RdfObject::from_parts(rel.object_uri, rel.object_literal, rel.literal_type)?;

        let previous = obj.latest_datastream(RELS_EXT_DATASTREAM_ID).cloned();
        let graph = match current_graph(obj)? {
            Some(graph) => graph,
            None if mode == FilterMode::Purge => {
                debug!(pid = %pid, "no relationships to purge from");
                return Ok(RelationshipChange::Unchanged);
            }
            None => RelsGraph::new(),
        };

        let predicate = graph.expand_curie(rel.predicate);
        validate_uri(&predicate)?;
        let target = Triple::new(subject.clone(), predicate, object.clone());

        let (prefixes, triples) = graph.into_parts();
        let mut filtered = FilteredTriples::new(triples.into_iter(), target, mode);
        let updated: Vec<Triple> = filtered.by_ref().collect();
        if !filtered.was_change_made() {
            debug!(pid = %pid, ?mode, predicate = rel.predicate, "relationships unchanged");
            return Ok(RelationshipChange::Unchanged);
        }
        let updated = RelsGraph::from_parts(prefixes, updated);

        let content = rdfxml::serialize(&updated)?;
        let reparsed = rdfxml::parse(&content)?;
        if !reparsed.same_triples(&updated) {
            return Err(AccessError::Format(
                "serialized relationships do not read back as written".into(),
            ));
        }

        let pid = pid.clone();
        let version_id = obj.new_datastream_version_id(RELS_EXT_DATASTREAM_ID);
        let ds = match previous {
            // The rewrite must sort last even when the clock is behind the
            // newest version, or readers would keep seeing the old graph.
            Some(prev) => Datastream {
                version_id,
                control_group: ControlGroup::X,
                mime_type: RELS_EXT_MIME_TYPE.to_string(),
                created: now.max(prev.created),
                size: content.len() as u64,
                content: DatastreamContent::Inline(content),
                ..prev
            },
            None => Datastream {
                datastream_id: RELS_EXT_DATASTREAM_ID.to_string(),
                version_id,
                control_group: ControlGroup::X,
                label: RELS_EXT_LABEL.to_string(),
                mime_type: RELS_EXT_MIME_TYPE.to_string(),
                format_uri: None,
                state: State::Active,
                versionable: false,
                created: now,
                size: content.len() as u64,
                checksum_type: ChecksumType::default(),
                content: DatastreamContent::Inline(content),
            },
        };
        let versionable = ds.versionable;
        info!(pid = %pid, version = %ds.version_id, ?mode, triples = updated.len(), "relationships rewritten");
        obj.add_datastream_version(ds, versionable);

        Ok(RelationshipChange::Changed(RelationshipTuple {
            subject,
            predicate: rel.predicate.to_string(),
            object,
        }))
    }
}

/// The parsed newest `RELS-EXT` version, with the default prefixes bound
/// where the document leaves them free.
fn current_graph(obj: &DigitalObject) -> AccessResult<Option<RelsGraph>> {
    let Some(ds) = obj.latest_datastream(RELS_EXT_DATASTREAM_ID) else {
        return Ok(None);
    };
    let bytes = ds.xml_content().ok_or_else(|| {
        AccessError::Format(format!("{} is not inline xml", ds.version_id))
    })?;
    let mut graph = rdfxml::parse(bytes)?;
    graph.bind_defaults();
    Ok(Some(graph))
}
