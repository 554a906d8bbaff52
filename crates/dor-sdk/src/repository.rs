use std::sync::Arc;

use tracing::{debug, info};

use dor_access::{Clock, ObjectWriter, SimpleReader, SimpleWriter, SystemClock, WriterOptions};
use dor_foxml::{FoxmlParser, FoxmlSerializer, TranslationContext};
use dor_model::DigitalObject;
use dor_store::{InMemoryObjectStore, ObjectStore};
use dor_types::{Pid, State};

use crate::commit::{Checkout, CheckoutSet, FoxmlCommitSink};
use crate::config::RepositoryConfig;
use crate::error::{SdkError, SdkResult};

/// A writer checked out from a [`Repository`].
pub type RepoWriter = SimpleWriter<FoxmlCommitSink>;

/// High-level repository API.
///
/// At most one writer per PID is live at a time; opening a second one
/// fails with [`SdkError::WriterCheckedOut`] until the first is committed
/// or dropped. Readers are unrestricted and see committed state only.
pub struct Repository {
    config: RepositoryConfig,
    store: Arc<dyn ObjectStore>,
    clock: Arc<dyn Clock>,
    checkouts: CheckoutSet,
}

impl Repository {
    /// A repository over a fresh in-memory store and the system clock.
    pub fn new(config: RepositoryConfig) -> Self {
        Self::with_parts(config, Arc::new(InMemoryObjectStore::new()), Arc::new(SystemClock))
    }

    pub fn with_parts(config: RepositoryConfig, store: Arc<dyn ObjectStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
            checkouts: CheckoutSet::default(),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    // ---- Object lifecycle ----

    /// Open a writer on a new, empty, active object. Nothing is stored
    /// until the writer commits.
    pub fn create_object(&self, pid: Pid) -> SdkResult<RepoWriter> {
        let checkout = Checkout::acquire(&self.checkouts, &pid)?;
        if self.store.exists(&pid)? {
            return Err(SdkError::ObjectExists(pid));
        }
        let mut object = DigitalObject::with_pid(pid.clone());
        object.set_state(State::Active);
        object.set_create_date(self.clock.now());
        debug!(pid = %pid, "creating object");
        Ok(self.open_writer(object, checkout))
    }

    /// Open the single writer on a stored object.
    pub fn writer(&self, pid: &Pid) -> SdkResult<RepoWriter> {
        let checkout = Checkout::acquire(&self.checkouts, pid)?;
        let object = self.load(pid)?;
        Ok(self.open_writer(object, checkout))
    }

    /// A read-only view of the committed state of an object.
    pub fn reader(&self, pid: &Pid) -> SdkResult<SimpleReader> {
        Ok(SimpleReader::new(self.load(pid)?))
    }

    pub fn exists(&self, pid: &Pid) -> SdkResult<bool> {
        Ok(self.store.exists(pid)?)
    }

    pub fn list_objects(&self) -> SdkResult<Vec<Pid>> {
        Ok(self.store.pids()?)
    }

    // ---- Import and export ----

    /// Store a canonical document as a new object. `context` is the
    /// translation the document was exported with.
    pub fn ingest(&self, bytes: &[u8], context: TranslationContext, log_message: &str) -> SdkResult<Pid> {
        let object = FoxmlParser::parse(bytes, &self.config.parse_options(context))?;
        let pid = object.pid().cloned().ok_or(SdkError::MissingPid)?;
        let checkout = Checkout::acquire(&self.checkouts, &pid)?;
        if self.store.exists(&pid)? {
            return Err(SdkError::ObjectExists(pid));
        }
        let mut writer = self.open_writer(object, checkout);
        writer.commit(log_message)?;
        info!(pid = %pid, "ingested");
        Ok(pid)
    }

    /// Serialize the committed state of an object with `context`, or the
    /// configured export context.
    pub fn export(&self, pid: &Pid, context: Option<TranslationContext>) -> SdkResult<Vec<u8>> {
        let object = self.load(pid)?;
        let context = context.unwrap_or(self.config.export_context);
        Ok(FoxmlSerializer::serialize(&object, &self.config.serialize_options(context))?)
    }

    fn load(&self, pid: &Pid) -> SdkResult<DigitalObject> {
        let bytes = self
            .store
            .read(pid)?
            .ok_or_else(|| SdkError::ObjectNotFound(pid.clone()))?;
        let options = self.config.parse_options(self.config.storage_context);
        Ok(FoxmlParser::parse(&bytes, &options)?)
    }

    fn open_writer(&self, object: DigitalObject, checkout: Checkout) -> RepoWriter {
        let sink = FoxmlCommitSink::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.config.serialize_options(self.config.storage_context),
            checkout,
        );
        let options = WriterOptions {
            audit_commits_as: self.config.audit_commits_as.clone(),
        };
        SimpleWriter::with_options(object, sink, Arc::clone(&self.clock), options)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository").field("config", &self.config).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dor_access::{FixedClock, ObjectReader, Relationship, WriterState};
    use dor_model::Datastream;
    use dor_types::{ControlGroup, Timestamp};

    fn at(sec: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap()
    }

    fn repo() -> Repository {
        repo_with(RepositoryConfig::default())
    }

    fn repo_with(config: RepositoryConfig) -> Repository {
        Repository::with_parts(config, Arc::new(InMemoryObjectStore::new()), Arc::new(FixedClock::new(at(0))))
    }

    fn pid(s: &str) -> Pid {
        Pid::new(s).unwrap()
    }

    fn create(repo: &Repository, p: &str) {
        let mut w = repo.create_object(pid(p)).unwrap();
        w.set_label("created").unwrap();
        w.commit("create").unwrap();
    }

    #[test]
    fn create_commit_and_read_back() {
        let repo = repo();
        let mut w = repo.create_object(pid("demo:1")).unwrap();
        assert!(w.is_new());
        w.set_label("first object").unwrap();
        assert!(!repo.exists(&pid("demo:1")).unwrap());
        w.commit("create").unwrap();
        assert!(w.is_committed());

        let r = repo.reader(&pid("demo:1")).unwrap();
        assert_eq!(r.label(), Some("first object"));
        assert_eq!(r.state(), Some(State::Active));
        assert_eq!(r.create_date(), Some(at(0)));
        assert_eq!(r.last_mod_date(), Some(at(0)));
        assert!(!r.object().is_new());
        assert_eq!(repo.list_objects().unwrap(), vec![pid("demo:1")]);
    }

    #[test]
    fn one_writer_per_pid() {
        let repo = repo();
        create(&repo, "demo:1");
        let w = repo.writer(&pid("demo:1")).unwrap();
        assert!(matches!(repo.writer(&pid("demo:1")), Err(SdkError::WriterCheckedOut(_))));
        assert!(repo.reader(&pid("demo:1")).is_ok());
        drop(w);
        assert!(repo.writer(&pid("demo:1")).is_ok());
    }

    #[test]
    fn commit_releases_checkout() {
        let repo = repo();
        let mut w = repo.create_object(pid("demo:1")).unwrap();
        w.commit("create").unwrap();
        let mut second = repo.writer(&pid("demo:1")).unwrap();
        second.set_label("second").unwrap();
        second.commit("edit").unwrap();
        drop(w);
        assert_eq!(repo.reader(&pid("demo:1")).unwrap().label(), Some("second"));
    }

    #[test]
    fn failed_open_does_not_leak_checkout() {
        let repo = repo();
        assert!(matches!(repo.writer(&pid("demo:404")), Err(SdkError::ObjectNotFound(_))));
        create(&repo, "demo:1");
        assert!(matches!(repo.create_object(pid("demo:1")), Err(SdkError::ObjectExists(_))));
        assert!(repo.writer(&pid("demo:1")).is_ok());
    }

    #[test]
    fn uncommitted_changes_are_invisible() {
        let repo = repo();
        create(&repo, "demo:1");
        let mut w = repo.writer(&pid("demo:1")).unwrap();
        w.set_label("draft").unwrap();
        assert_eq!(repo.reader(&pid("demo:1")).unwrap().label(), Some("created"));
        w.invalidate();
        assert_eq!(w.writer_state(), WriterState::Invalidated);
        assert!(w.commit("too late").is_err());
        assert_eq!(repo.reader(&pid("demo:1")).unwrap().label(), Some("created"));
    }

    #[test]
    fn removal_commit_deletes_object() {
        let repo = repo();
        create(&repo, "demo:1");
        let mut w = repo.writer(&pid("demo:1")).unwrap();
        w.remove().unwrap();
        w.commit("purge").unwrap();
        assert!(!repo.exists(&pid("demo:1")).unwrap());
        assert!(matches!(repo.reader(&pid("demo:1")), Err(SdkError::ObjectNotFound(_))));
    }

    #[test]
    fn storage_uses_placeholder_and_export_expands_it() {
        let repo = repo();
        let mut w = repo.create_object(pid("demo:1")).unwrap();
        w.add_datastream(
            Datastream::referenced("LINK", "LINK.0", ControlGroup::E, at(1), "http://localhost:8080/fedora/get/demo:2"),
            true,
        )
        .unwrap();
        w.commit("add link").unwrap();

        let stored = repo.store().read_existing(&pid("demo:1")).unwrap();
        let stored = String::from_utf8(stored).unwrap();
        assert!(stored.contains("REF=\"http://local.fedora.server/fedora/get/demo:2\""));

        let exported = String::from_utf8(repo.export(&pid("demo:1"), None).unwrap()).unwrap();
        assert!(exported.contains("REF=\"http://localhost:8080/fedora/get/demo:2\""));

        let migrated = repo.export(&pid("demo:1"), Some(TranslationContext::ExportMigrate)).unwrap();
        assert!(String::from_utf8(migrated).unwrap().contains("http://local.fedora.server/"));

        let r = repo.reader(&pid("demo:1")).unwrap();
        assert_eq!(
            r.datastream("LINK", None).unwrap().location(),
            Some("http://localhost:8080/fedora/get/demo:2")
        );
    }

    #[test]
    fn ingest_export_round_trip() {
        let source = repo();
        create(&source, "demo:7");
        let exported = source.export(&pid("demo:7"), Some(TranslationContext::ExportMigrate)).unwrap();

        let target = repo();
        let p = target.ingest(&exported, TranslationContext::ExportMigrate, "ingest").unwrap();
        assert_eq!(p, pid("demo:7"));
        assert_eq!(target.reader(&p).unwrap().label(), Some("created"));
        assert!(matches!(
            target.ingest(&exported, TranslationContext::ExportMigrate, "again"),
            Err(SdkError::ObjectExists(_))
        ));
    }

    #[test]
    fn ingest_rejects_garbage() {
        assert!(matches!(
            repo().ingest(b"not xml at all", TranslationContext::AsIs, "x"),
            Err(SdkError::Foxml(_))
        ));
    }

    #[test]
    fn relationships_survive_commit() {
        let repo = repo();
        create(&repo, "demo:11");
        let mut w = repo.writer(&pid("demo:11")).unwrap();
        let rel = Relationship::resource("rel:isMemberOf", "info:fedora/demo:10");
        assert!(w.add_relationship(&rel).unwrap().is_changed());
        w.commit("relate").unwrap();

        let r = repo.reader(&pid("demo:11")).unwrap();
        let rels = r.relationships(None, Some("rel:isMemberOf")).unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].subject, "info:fedora/demo:11");
        assert_eq!(rels[0].object_uri(), Some("info:fedora/demo:10"));
        assert_eq!(r.datastream("RELS-EXT", None).unwrap().version_id, "RELS-EXT.0");
    }

    #[test]
    fn audited_commits_append_records_that_persist() {
        let repo = repo_with(RepositoryConfig {
            audit_commits_as: Some("fedoraAdmin".into()),
            ..RepositoryConfig::default()
        });
        create(&repo, "demo:1");
        let mut w = repo.writer(&pid("demo:1")).unwrap();
        w.set_label("again").unwrap();
        w.commit("second").unwrap();
        let r = repo.reader(&pid("demo:1")).unwrap();
        let records = r.object().audit_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].justification, "second");
        assert_eq!(records[1].responsibility, "fedoraAdmin");
    }
}
