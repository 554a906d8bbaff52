use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use dor_model::{AuditRecord, Datastream, DatastreamContent, DigitalObject};
use dor_types::names::{is_audit_datastream, RELS_EXT_DATASTREAM_ID};
use dor_types::{State, Timestamp};

use crate::clock::Clock;
use crate::commit::{CommitRequest, CommitSink};
use crate::error::{AccessError, AccessResult};
use crate::reader::ObjectReader;
use crate::relationships::{Relationship, RelationshipChange, RelationshipEngine};

/// Process type recorded on audit records the writer creates itself.
const WRITER_PROCESS_TYPE: &str = "Fedora API-M";

/// Lifecycle of a writer handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WriterState {
    Active,
    /// [`ObjectWriter::remove`] was called; commit will delete the object.
    PendingRemoval,
    Committed,
    Invalidated,
}

impl WriterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Invalidated)
    }
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::PendingRemoval => "pending removal",
            Self::Committed => "committed",
            Self::Invalidated => "invalidated",
        })
    }
}

/// Guarded mutation of one digital object.
///
/// Mutations require [`WriterState::Active`]. `commit` and `rollback` are
/// also allowed while pending removal. Reads stay available in every state.
pub trait ObjectWriter: ObjectReader {
    fn writer_state(&self) -> WriterState;

    fn is_committed(&self) -> bool {
        self.writer_state() == WriterState::Committed
    }

    /// Whether the object has never been persisted.
    fn is_new(&self) -> bool {
        self.object().is_new()
    }

    fn set_state(&mut self, state: State) -> AccessResult<()>;

    fn set_label(&mut self, label: &str) -> AccessResult<()>;

    fn set_owner_id(&mut self, owner_id: &str) -> AccessResult<()>;

    /// Set the state of every version of a datastream.
    fn set_datastream_state(&mut self, id: &str, state: State) -> AccessResult<()>;

    /// Set the versionable flag of every version of a datastream.
    fn set_datastream_versionable(&mut self, id: &str, versionable: bool) -> AccessResult<()>;

    /// Add a datastream version, or replace all versions when
    /// `as_new_version` is false.
    fn add_datastream(&mut self, ds: Datastream, as_new_version: bool) -> AccessResult<()>;

    /// Remove the versions of `id` created within `[start, end]`, where a
    /// missing bound is unbounded. Returns the creation dates of the removed
    /// versions in list order. Audit records are never touched.
    fn remove_datastream(
        &mut self,
        id: &str,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> AccessResult<Vec<Timestamp>>;

    fn add_relationship(&mut self, rel: &Relationship<'_>) -> AccessResult<RelationshipChange>;

    fn purge_relationship(&mut self, rel: &Relationship<'_>) -> AccessResult<RelationshipChange>;

    /// Append an audit record with a fresh ID and the current date.
    /// Returns the record ID.
    fn add_audit_record(
        &mut self,
        action: &str,
        component_id: Option<&str>,
        responsibility: &str,
        justification: &str,
    ) -> AccessResult<String>;

    fn new_datastream_id(&mut self) -> AccessResult<String>;

    fn new_datastream_version_id(&mut self, base: &str) -> AccessResult<String>;

    /// Mark the object for deletion on commit.
    fn remove(&mut self) -> AccessResult<()>;

    /// Hand the object to the commit sink. The handle is finished afterwards.
    fn commit(&mut self, log_message: &str) -> AccessResult<()>;

    /// Restore the object as it was when the writer was opened.
    fn rollback(&mut self) -> AccessResult<()>;

    /// Finish the handle without committing.
    fn invalidate(&mut self);
}

/// Writer behaviour that is configuration rather than object state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriterOptions {
    /// When set, every non-removal commit appends an audit record with this
    /// responsibility and the log message as justification.
    pub audit_commits_as: Option<String>,
}

/// The writer over an exclusively owned object.
pub struct SimpleWriter<S> {
    object: DigitalObject,
    snapshot: DigitalObject,
    state: WriterState,
    sink: S,
    clock: Arc<dyn Clock>,
    options: WriterOptions,
}

impl<S: CommitSink> SimpleWriter<S> {
    pub fn new(object: DigitalObject, sink: S, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(object, sink, clock, WriterOptions::default())
    }

    pub fn with_options(
        object: DigitalObject,
        sink: S,
        clock: Arc<dyn Clock>,
        options: WriterOptions,
    ) -> Self {
        Self {
            snapshot: object.clone(),
            object,
            state: WriterState::Active,
            sink,
            clock,
            options,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    fn require_active(&self, operation: &'static str) -> AccessResult<()> {
        match self.state {
            WriterState::Active => Ok(()),
            state => Err(AccessError::InvalidState { state, operation }),
        }
    }

    fn require_live(&self, operation: &'static str) -> AccessResult<()> {
        if self.state.is_terminal() {
            return Err(AccessError::InvalidState {
                state: self.state,
                operation,
            });
        }
        Ok(())
    }

    fn pid_field(&self) -> String {
        self.object.pid().map(|p| p.to_string()).unwrap_or_default()
    }

    fn audit_record(
        object: &mut DigitalObject,
        now: Timestamp,
        action: &str,
        component_id: Option<&str>,
        responsibility: &str,
        justification: &str,
    ) -> String {
        let id = object.new_audit_record_id();
        object.append_audit_record(AuditRecord {
            id: id.clone(),
            process_type: WRITER_PROCESS_TYPE.to_string(),
            action: action.to_string(),
            component_id: component_id.map(str::to_string),
            responsibility: responsibility.to_string(),
            date: now,
            justification: justification.to_string(),
        });
        id
    }
}

impl<S: CommitSink> ObjectReader for SimpleWriter<S> {
    fn object(&self) -> &DigitalObject {
        &self.object
    }
}

impl<S: CommitSink> ObjectWriter for SimpleWriter<S> {
    fn writer_state(&self) -> WriterState {
        self.state
    }

    fn set_state(&mut self, state: State) -> AccessResult<()> {
        self.require_active("set state")?;
        self.object.set_state(state);
        Ok(())
    }

    fn set_label(&mut self, label: &str) -> AccessResult<()> {
        self.require_active("set label")?;
        self.object.set_label(label);
        Ok(())
    }

    fn set_owner_id(&mut self, owner_id: &str) -> AccessResult<()> {
        self.require_active("set owner")?;
        self.object.set_owner_id(owner_id);
        Ok(())
    }

    fn set_datastream_state(&mut self, id: &str, state: State) -> AccessResult<()> {
        self.require_active("set datastream state")?;
        let versions = self
            .object
            .datastream_versions_mut(id)
            .ok_or_else(|| AccessError::datastream_not_found(id))?;
        for ds in versions {
            ds.state = state;
        }
        Ok(())
    }

    fn set_datastream_versionable(&mut self, id: &str, versionable: bool) -> AccessResult<()> {
        self.require_active("set datastream versionable")?;
        let versions = self
            .object
            .datastream_versions_mut(id)
            .ok_or_else(|| AccessError::datastream_not_found(id))?;
        for ds in versions {
            ds.versionable = versionable;
        }
        Ok(())
    }

    fn add_datastream(&mut self, ds: Datastream, as_new_version: bool) -> AccessResult<()> {
        self.require_active("add datastream")?;
        if is_audit_datastream(&ds.datastream_id) {
            return Err(AccessError::StructuralIntegrity(format!(
                "{} is reserved for the audit trail",
                ds.datastream_id
            )));
        }
        if ds.datastream_id == RELS_EXT_DATASTREAM_ID {
            return Err(AccessError::StructuralIntegrity(format!(
                "{RELS_EXT_DATASTREAM_ID} is changed only through relationship operations"
            )));
        }
        let inline = matches!(ds.content, DatastreamContent::Inline(_));
        if inline != ds.control_group.is_inline() {
            return Err(AccessError::StructuralIntegrity(format!(
                "content of {} does not match control group {}",
                ds.version_id, ds.control_group
            )));
        }
        if as_new_version
            && self
                .object
                .datastream_versions(&ds.datastream_id)
                .iter()
                .any(|v| v.version_id == ds.version_id)
        {
            return Err(AccessError::StructuralIntegrity(format!(
                "version {} already exists",
                ds.version_id
            )));
        }
        debug!(pid = %self.pid_field(), dsid = %ds.datastream_id, version = %ds.version_id, "adding datastream");
        self.object.add_datastream_version(ds, as_new_version);
        Ok(())
    }

    fn remove_datastream(
        &mut self,
        id: &str,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> AccessResult<Vec<Timestamp>> {
        self.require_active("remove datastream")?;
        let removed = self.object.remove_datastream_versions(id, |ds| {
            start.map_or(true, |s| ds.created >= s) && end.map_or(true, |e| ds.created <= e)
        });
        let dates: Vec<Timestamp> = removed.iter().map(|ds| ds.created).collect();
        debug!(pid = %self.pid_field(), dsid = id, removed = dates.len(), "removed datastream versions");
        Ok(dates)
    }

    fn add_relationship(&mut self, rel: &Relationship<'_>) -> AccessResult<RelationshipChange> {
        self.require_active("add relationship")?;
        RelationshipEngine::add(&mut self.object, self.clock.now(), rel)
    }

    fn purge_relationship(&mut self, rel: &Relationship<'_>) -> AccessResult<RelationshipChange> {
        self.require_active("purge relationship")?;
        RelationshipEngine::purge(&mut self.object, self.clock.now(), rel)
    }

    fn add_audit_record(
        &mut self,
        action: &str,
        component_id: Option<&str>,
        responsibility: &str,
        justification: &str,
    ) -> AccessResult<String> {
        self.require_active("add audit record")?;
        if action.is_empty() || responsibility.is_empty() {
            return Err(AccessError::StructuralIntegrity(
                "audit records need an action and a responsibility".into(),
            ));
        }
        let now = self.clock.now();
        Ok(Self::audit_record(
            &mut self.object,
            now,
            action,
            component_id,
            responsibility,
            justification,
        ))
    }

    fn new_datastream_id(&mut self) -> AccessResult<String> {
        self.require_active("allocate datastream id")?;
        Ok(self.object.new_datastream_id())
    }

    fn new_datastream_version_id(&mut self, base: &str) -> AccessResult<String> {
        self.require_active("allocate version id")?;
        Ok(self.object.new_datastream_version_id(base))
    }

    fn remove(&mut self) -> AccessResult<()> {
        self.require_active("remove object")?;
        self.state = WriterState::PendingRemoval;
        debug!(pid = %self.pid_field(), "object marked for removal");
        Ok(())
    }

    fn commit(&mut self, log_message: &str) -> AccessResult<()> {
        self.require_live("commit")?;
        let pending_removal = self.state == WriterState::PendingRemoval;

        let mut staged = self.object.clone();
        if let (false, Some(responsibility)) = (pending_removal, &self.options.audit_commits_as) {
            Self::audit_record(
                &mut staged,
                self.clock.now(),
                "commit",
                None,
                responsibility,
                log_message,
            );
        }
        self.sink.do_commit(CommitRequest {
            object: &mut staged,
            log_message,
            pending_removal,
        })?;

        info!(pid = %self.pid_field(), pending_removal, "committed");
        self.object = staged;
        self.state = WriterState::Committed;
        Ok(())
    }

    fn rollback(&mut self) -> AccessResult<()> {
        self.require_live("roll back")?;
        self.object = self.snapshot.clone();
        self.state = WriterState::Active;
        debug!(pid = %self.pid_field(), "rolled back");
        Ok(())
    }

    fn invalidate(&mut self) {
        if !self.state.is_terminal() {
            self.state = WriterState::Invalidated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use dor_types::{ControlGroup, Pid};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Committed {
        object: DigitalObject,
        log_message: String,
        pending_removal: bool,
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        commits: Rc<RefCell<Vec<Committed>>>,
        fail: bool,
    }

    impl CommitSink for RecordingSink {
        fn do_commit(&mut self, request: CommitRequest<'_>) -> AccessResult<()> {
            if self.fail {
                return Err(AccessError::Commit("sink offline".into()));
            }
            self.commits.borrow_mut().push(Committed {
                object: request.object.clone(),
                log_message: request.log_message.to_string(),
                pending_removal: request.pending_removal,
            });
            Ok(())
        }
    }

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn object() -> DigitalObject {
        let mut obj = DigitalObject::with_pid(Pid::new("demo:11").unwrap());
        obj.set_label("original");
        for (vid, day) in [("DS1.0", 1), ("DS1.1", 5), ("DS1.2", 10), ("DS1.3", 15)] {
            obj.add_datastream_version(
                Datastream::referenced("DS1", vid, ControlGroup::M, at(day), format!("demo:11+DS1+{vid}")),
                true,
            );
        }
        obj.append_audit_record(AuditRecord {
            id: "AUDREC1".into(),
            process_type: WRITER_PROCESS_TYPE.into(),
            action: "addDatastream".into(),
            component_id: Some("DS1".into()),
            responsibility: "fedoraAdmin".into(),
            date: at(1),
            justification: String::new(),
        });
        obj
    }

    fn writer() -> (SimpleWriter<RecordingSink>, Rc<RefCell<Vec<Committed>>>) {
        let sink = RecordingSink::default();
        let commits = Rc::clone(&sink.commits);
        let clock = Arc::new(FixedClock::new(at(20)));
        (SimpleWriter::new(object(), sink, clock), commits)
    }

    #[test]
    fn mutations_apply_while_active() {
        let (mut w, _) = writer();
        w.set_label("changed").unwrap();
        w.set_state(State::Inactive).unwrap();
        w.set_owner_id("alice").unwrap();
        w.set_datastream_state("DS1", State::Deleted).unwrap();
        w.set_datastream_versionable("DS1", false).unwrap();
        assert_eq!(w.label(), Some("changed"));
        assert_eq!(w.state(), Some(State::Inactive));
        assert_eq!(w.owner_id(), Some("alice"));
        assert!(w
            .datastream_versions("DS1")
            .unwrap()
            .iter()
            .all(|ds| ds.state == State::Deleted && !ds.versionable));
    }

    #[test]
    fn datastream_setters_need_an_existing_datastream() {
        let (mut w, _) = writer();
        assert!(matches!(w.set_datastream_state("NOPE", State::Active), Err(AccessError::NotFound { .. })));
        assert!(matches!(w.set_datastream_versionable("NOPE", true), Err(AccessError::NotFound { .. })));
    }

    #[test]
    fn remove_datastream_honours_inclusive_range() {
        let (mut w, _) = writer();
        let removed = w.remove_datastream("DS1", Some(at(5)), Some(at(10))).unwrap();
        assert_eq!(removed, vec![at(5), at(10)]);
        let left: Vec<_> = w.datastream_versions("DS1").unwrap().iter().map(|d| d.version_id.clone()).collect();
        assert_eq!(left, vec!["DS1.0", "DS1.3"]);
        assert_eq!(w.object().audit_records().len(), 1);
    }

    #[test]
    fn remove_datastream_open_bounds() {
        let (mut w, _) = writer();
        assert_eq!(w.remove_datastream("DS1", None, Some(at(1))).unwrap(), vec![at(1)]);
        assert_eq!(w.remove_datastream("DS1", Some(at(15)), None).unwrap(), vec![at(15)]);
        assert_eq!(w.remove_datastream("DS1", None, None).unwrap(), vec![at(5), at(10)]);
        assert!(!w.object().has_datastream("DS1"));
        assert!(w.remove_datastream("DS1", None, None).unwrap().is_empty());
    }

    #[test]
    fn removed_version_ids_are_not_reissued() {
        let (mut w, _) = writer();
        w.remove_datastream("DS1", Some(at(15)), None).unwrap();
        assert_eq!(w.new_datastream_version_id("DS1").unwrap(), "DS1.4");
    }

    #[test]
    fn add_datastream_validates_before_placing() {
        let (mut w, _) = writer();
        let audit = Datastream::inline_xml("AUDIT", "AUDIT.0", at(2), b"<x/>".to_vec());
        assert!(matches!(w.add_datastream(audit, true), Err(AccessError::StructuralIntegrity(_))));

        let rels = Datastream::inline_xml(RELS_EXT_DATASTREAM_ID, "RELS-EXT.0", at(2), b"<junk/>".to_vec());
        assert!(matches!(w.add_datastream(rels, true), Err(AccessError::StructuralIntegrity(_))));
        assert!(!w.object().has_datastream(RELS_EXT_DATASTREAM_ID));
        assert!(w.add_relationship(&Relationship::resource("rel:isMemberOf", "info:fedora/demo:10")).unwrap().is_changed());

        let mismatched = Datastream::referenced("DS2", "DS2.0", ControlGroup::X, at(2), "x");
        assert!(matches!(w.add_datastream(mismatched, true), Err(AccessError::StructuralIntegrity(_))));

        let duplicate = Datastream::referenced("DS1", "DS1.1", ControlGroup::M, at(2), "x");
        assert!(matches!(w.add_datastream(duplicate, true), Err(AccessError::StructuralIntegrity(_))));
        assert_eq!(w.object(), &object());

        let id = w.new_datastream_id().unwrap();
        assert_eq!(id, "DS2");
        let vid = w.new_datastream_version_id(&id).unwrap();
        w.add_datastream(Datastream::inline_xml(&id, vid, at(2), b"<x/>".to_vec()), true).unwrap();
        assert_eq!(w.datastream(&id, None).unwrap().version_id, "DS2.0");
    }

    #[test]
    fn pending_removal_blocks_mutation_but_commits_as_deletion() {
        let (mut w, commits) = writer();
        w.remove().unwrap();
        assert_eq!(w.writer_state(), WriterState::PendingRemoval);
        assert!(matches!(
            w.set_state(State::Active),
            Err(AccessError::InvalidState { state: WriterState::PendingRemoval, .. })
        ));
        assert!(w
            .add_datastream(Datastream::inline_xml("DS9", "DS9.0", at(2), b"<x/>".to_vec()), true)
            .is_err());
        assert!(w.remove_datastream("DS1", None, None).is_err());
        assert!(w.remove().is_err());

        w.commit("purge object").unwrap();
        let commits = commits.borrow();
        assert_eq!(commits.len(), 1);
        assert!(commits[0].pending_removal);
        assert_eq!(commits[0].log_message, "purge object");
        assert!(w.is_committed());
    }

    #[test]
    fn terminal_states_reject_everything_but_reads() {
        let (mut committed, _) = writer();
        committed.commit("done").unwrap();
        let (mut invalidated, _) = writer();
        invalidated.invalidate();

        for w in [&mut committed, &mut invalidated] {
            assert!(w.writer_state().is_terminal());
            assert!(matches!(w.set_label("x"), Err(AccessError::InvalidState { .. })));
            assert!(matches!(w.set_state(State::Deleted), Err(AccessError::InvalidState { .. })));
            let ds = Datastream::inline_xml("DS2", "DS2.0", at(30), b"<x/>".to_vec());
            assert!(matches!(w.add_datastream(ds, true), Err(AccessError::InvalidState { .. })));
            assert!(matches!(w.remove_datastream("DS1", None, None), Err(AccessError::InvalidState { .. })));
            assert!(w.remove().is_err());
            assert!(w.commit("again").is_err());
            assert!(w.rollback().is_err());
            assert!(w.add_relationship(&Relationship::resource("rel:isMemberOf", "info:fedora/demo:10")).is_err());
            assert!(w.add_audit_record("x", None, "y", "z").is_err());
            assert_eq!(w.label(), Some("original"));
            assert_eq!(w.datastream_ids(), vec!["DS1".to_string()]);
        }
        invalidated.invalidate();
        assert_eq!(invalidated.writer_state(), WriterState::Invalidated);
    }

    #[test]
    fn commit_hands_over_the_object() {
        let (mut w, commits) = writer();
        w.set_label("committed label").unwrap();
        w.commit("edit label").unwrap();
        let commits = commits.borrow();
        assert_eq!(commits[0].object.label(), Some("committed label"));
        assert!(!commits[0].pending_removal);
        assert_eq!(commits[0].object.audit_records().len(), 1);
    }

    #[test]
    fn failed_commit_leaves_writer_usable() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut w = SimpleWriter::new(object(), sink, Arc::new(FixedClock::new(at(20))));
        w.set_label("pending").unwrap();
        assert!(matches!(w.commit("try"), Err(AccessError::Commit(_))));
        assert_eq!(w.writer_state(), WriterState::Active);
        assert_eq!(w.label(), Some("pending"));
    }

    #[test]
    fn audited_commits_append_a_record_with_the_log_message() {
        let sink = RecordingSink::default();
        let commits = Rc::clone(&sink.commits);
        let options = WriterOptions {
            audit_commits_as: Some("fedoraAdmin".into()),
        };
        let mut w = SimpleWriter::with_options(object(), sink, Arc::new(FixedClock::new(at(20))), options);
        w.commit("nightly").unwrap();
        let commits = commits.borrow();
        let record = commits[0].object.audit_records().last().unwrap();
        assert_eq!(record.id, "AUDREC2");
        assert_eq!(record.action, "commit");
        assert_eq!(record.justification, "nightly");
        assert_eq!(record.date, at(20));
    }

    #[test]
    fn rollback_restores_snapshot_and_clears_removal() {
        let (mut w, _) = writer();
        w.set_label("scratch").unwrap();
        w.remove_datastream("DS1", None, None).unwrap();
        w.remove().unwrap();
        w.rollback().unwrap();
        assert_eq!(w.writer_state(), WriterState::Active);
        assert_eq!(w.object(), &object());
        w.set_label("after rollback").unwrap();
    }

    #[test]
    fn audit_records_use_clock_and_fresh_ids() {
        let (mut w, _) = writer();
        let id = w.add_audit_record("modifyObject", None, "fedoraAdmin", "why").unwrap();
        assert_eq!(id, "AUDREC2");
        let record = w.object().audit_records().last().unwrap();
        assert_eq!(record.date, at(20));
        assert_eq!(record.process_type, WRITER_PROCESS_TYPE);
        assert!(matches!(
            w.add_audit_record("", None, "fedoraAdmin", ""),
            Err(AccessError::StructuralIntegrity(_))
        ));
    }

    #[test]
    fn relationship_add_is_idempotent_through_writer() {
        let (mut w, _) = writer();
        let rel = Relationship::resource("rel:isMemberOf", "info:fedora/demo:10");
        assert!(w.add_relationship(&rel).unwrap().is_changed());
        assert!(!w.add_relationship(&rel).unwrap().is_changed());
        assert_eq!(w.datastream_versions(RELS_EXT_DATASTREAM_ID).unwrap().len(), 1);
        assert_eq!(w.relationships(None, Some("rel:isMemberOf")).unwrap().len(), 1);
        assert!(w.purge_relationship(&rel).unwrap().is_changed());
        assert!(w.relationships(None, None).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn range_removal_selects_exactly_the_window(
            days in proptest::collection::vec(1u32..29, 1..12),
            start in proptest::option::of(1u32..29),
            end in proptest::option::of(1u32..29),
        ) {
            let mut obj = DigitalObject::with_pid(Pid::new("demo:p").unwrap());
            for (i, day) in days.iter().enumerate() {
                obj.add_datastream_version(
                    Datastream::referenced("DS1", format!("DS1.{i}"), ControlGroup::E, at(*day), "http://example.org/"),
                    true,
                );
            }
            obj.append_audit_record(AuditRecord {
                id: "AUDREC1".into(),
                process_type: "p".into(),
                action: "a".into(),
                component_id: None,
                responsibility: "r".into(),
                date: at(1),
                justification: String::new(),
            });
            let in_window = |d: Timestamp| start.map_or(true, |s| d >= at(s)) && end.map_or(true, |e| d <= at(e));
            let sorted: Vec<Timestamp> = obj.datastream_versions("DS1").iter().map(|d| d.created).collect();
            let expected_removed: Vec<Timestamp> = sorted.iter().copied().filter(|d| in_window(*d)).collect();
            let expected_kept: Vec<Timestamp> = sorted.iter().copied().filter(|d| !in_window(*d)).collect();

            let mut w = SimpleWriter::new(obj, RecordingSink::default(), Arc::new(FixedClock::new(at(28))));
            let removed = w.remove_datastream("DS1", start.map(at), end.map(at)).unwrap();
            prop_assert_eq!(removed, expected_removed);
            let kept: Vec<Timestamp> = w.object().datastream_versions("DS1").iter().map(|d| d.created).collect();
            prop_assert_eq!(kept, expected_kept);
            prop_assert_eq!(w.object().audit_records().len(), 1);
        }
    }
}
