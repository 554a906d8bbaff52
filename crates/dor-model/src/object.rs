use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use dor_types::{ObjectType, Pid, State, Timestamp};

use crate::audit::AuditRecord;
use crate::datastream::{version_suffix, Datastream};
use crate::disseminator::Disseminator;
use crate::error::{ModelError, ModelResult};

const DATASTREAM_ID_PREFIX: &str = "DS";
const DISSEMINATOR_ID_PREFIX: &str = "DISS";
const AUDIT_RECORD_ID_PREFIX: &str = "AUDREC";

/// A digital object: the aggregate root of the model.
///
/// Datastream and disseminator versions are kept per ID, ordered by
/// creation date ascending. IDs iterate in lexical order, which is also
/// the order the canonical serializer emits them in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalObject {
    pid: Option<Pid>,
    object_type: ObjectType,
    state: Option<State>,
    label: Option<String>,
    owner_id: Option<String>,
    create_date: Option<Timestamp>,
    last_mod_date: Option<Timestamp>,
    content_model_id: Option<String>,
    /// Namespace URI to prefix.
    namespace_mapping: BTreeMap<String, String>,
    ext_properties: BTreeMap<String, String>,
    datastreams: BTreeMap<String, Vec<Datastream>>,
    disseminators: BTreeMap<String, Vec<Disseminator>>,
    audit_records: Vec<AuditRecord>,
    is_new: bool,
    ids: IdAllocator,
}

impl DigitalObject {
    /// An empty, new object with no PID yet.
    pub fn new() -> Self {
        Self {
            pid: None,
            object_type: ObjectType::default(),
            state: None,
            label: None,
            owner_id: None,
            create_date: None,
            last_mod_date: None,
            content_model_id: None,
            namespace_mapping: BTreeMap::new(),
            ext_properties: BTreeMap::new(),
            datastreams: BTreeMap::new(),
            disseminators: BTreeMap::new(),
            audit_records: Vec::new(),
            is_new: true,
            ids: IdAllocator::default(),
        }
    }

    /// An empty, new object with the given PID.
    pub fn with_pid(pid: Pid) -> Self {
        Self {
            pid: Some(pid),
            ..Self::new()
        }
    }

    // ---- Identity and properties ----

    pub fn pid(&self) -> Option<&Pid> {
        self.pid.as_ref()
    }

    /// Assign the PID. Fails if one is already assigned.
    pub fn assign_pid(&mut self, pid: Pid) -> ModelResult<()> {
        if let Some(existing) = &self.pid {
            return Err(ModelError::PidAlreadyAssigned(existing.clone()));
        }
        self.pid = Some(pid);
        Ok(())
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn set_object_type(&mut self, object_type: ObjectType) {
        self.object_type = object_type;
    }

    pub fn state(&self) -> Option<State> {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = Some(state);
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = Some(label.into());
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    pub fn set_owner_id(&mut self, owner_id: impl Into<String>) {
        self.owner_id = Some(owner_id.into());
    }

    pub fn create_date(&self) -> Option<Timestamp> {
        self.create_date
    }

    pub fn set_create_date(&mut self, date: Timestamp) {
        self.create_date = Some(date);
    }

    pub fn last_mod_date(&self) -> Option<Timestamp> {
        self.last_mod_date
    }

    pub fn set_last_mod_date(&mut self, date: Timestamp) {
        self.last_mod_date = Some(date);
    }

    pub fn content_model_id(&self) -> Option<&str> {
        self.content_model_id.as_deref()
    }

    pub fn set_content_model_id(&mut self, content_model_id: impl Into<String>) {
        self.content_model_id = Some(content_model_id.into());
    }

    /// `true` until the object has been loaded from, or committed to, storage.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub fn set_new(&mut self, is_new: bool) {
        self.is_new = is_new;
    }

    /// Namespace URI to prefix mappings declared on the object.
    pub fn namespace_mapping(&self) -> &BTreeMap<String, String> {
        &self.namespace_mapping
    }

    pub fn set_namespace_prefix(&mut self, uri: impl Into<String>, prefix: impl Into<String>) {
        self.namespace_mapping.insert(uri.into(), prefix.into());
    }

    pub fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.namespace_mapping.get(uri).map(String::as_str)
    }

    pub fn ext_properties(&self) -> &BTreeMap<String, String> {
        &self.ext_properties
    }

    pub fn ext_property(&self, name: &str) -> Option<&str> {
        self.ext_properties.get(name).map(String::as_str)
    }

    pub fn set_ext_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.ext_properties.insert(name.into(), value.into());
    }

    pub fn remove_ext_property(&mut self, name: &str) -> Option<String> {
        self.ext_properties.remove(name)
    }

    // ---- Datastreams ----

    /// IDs of datastreams with at least one version, in lexical order.
    pub fn datastream_ids(&self) -> impl Iterator<Item = &str> {
        self.datastreams.keys().map(String::as_str)
    }

    pub fn has_datastream(&self, id: &str) -> bool {
        self.datastreams.contains_key(id)
    }

    /// All versions of a datastream, oldest first. Empty if unknown.
    pub fn datastream_versions(&self, id: &str) -> &[Datastream] {
        self.datastreams.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// The newest version of a datastream.
    pub fn latest_datastream(&self, id: &str) -> Option<&Datastream> {
        self.datastream_versions(id).last()
    }

    /// The version active at `at`: the newest one created at or before it.
    pub fn datastream_as_of(&self, id: &str, at: Timestamp) -> Option<&Datastream> {
        self.datastream_versions(id).iter().rev().find(|ds| ds.created <= at)
    }

    /// Mutable access to every version of a datastream.
    pub fn datastream_versions_mut(
        &mut self,
        id: &str,
    ) -> Option<impl Iterator<Item = &mut Datastream>> {
        self.datastreams.get_mut(id).map(|versions| versions.iter_mut())
    }

    /// Place a datastream version.
    ///
    /// With `as_new_version` the version joins the existing list at its
    /// creation-date position; otherwise it replaces every existing version.
    pub fn add_datastream_version(&mut self, ds: Datastream, as_new_version: bool) {
        self.ids.observe_datastream_version(&ds.datastream_id, &ds.version_id);
        self.ids.observe_datastream(&ds.datastream_id);
        let versions = self.datastreams.entry(ds.datastream_id.clone()).or_default();
        if as_new_version {
            let pos = versions.partition_point(|v| v.created <= ds.created);
            versions.insert(pos, ds);
        } else {
            versions.clear();
            versions.push(ds);
        }
    }

    /// Remove the versions of `id` selected by `select`, returning them in
    /// list order. A datastream left with no versions is dropped entirely;
    /// its version counter is kept so suffixes are not reissued.
    pub fn remove_datastream_versions<F>(&mut self, id: &str, mut select: F) -> Vec<Datastream>
    where
        F: FnMut(&Datastream) -> bool,
    {
        let Some(versions) = self.datastreams.get_mut(id) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(versions).into_iter().partition(|ds| select(ds));
        if kept.is_empty() {
            self.datastreams.remove(id);
        } else {
            *versions = kept;
        }
        removed
    }

    // ---- Disseminators ----

    pub fn disseminator_ids(&self) -> impl Iterator<Item = &str> {
        self.disseminators.keys().map(String::as_str)
    }

    pub fn has_disseminator(&self, id: &str) -> bool {
        self.disseminators.contains_key(id)
    }

    pub fn disseminator_versions(&self, id: &str) -> &[Disseminator] {
        self.disseminators.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn latest_disseminator(&self, id: &str) -> Option<&Disseminator> {
        self.disseminator_versions(id).last()
    }

    /// The newest version created at or before `at`. Versions without a
    /// creation date sort first and count as created before any instant.
    pub fn disseminator_as_of(&self, id: &str, at: Timestamp) -> Option<&Disseminator> {
        self.disseminator_versions(id)
            .iter()
            .rev()
            .find(|d| d.created.map_or(true, |c| c <= at))
    }

    pub fn add_disseminator_version(&mut self, diss: Disseminator, as_new_version: bool) {
        self.ids.observe_disseminator_version(&diss.disseminator_id, &diss.version_id);
        self.ids.observe_disseminator(&diss.disseminator_id);
        let versions = self.disseminators.entry(diss.disseminator_id.clone()).or_default();
        if as_new_version {
            let pos = versions.partition_point(|v| v.created <= diss.created);
            versions.insert(pos, diss);
        } else {
            versions.clear();
            versions.push(diss);
        }
    }

    pub fn remove_disseminator_versions<F>(&mut self, id: &str, mut select: F) -> Vec<Disseminator>
    where
        F: FnMut(&Disseminator) -> bool,
    {
        let Some(versions) = self.disseminators.get_mut(id) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) =
            std::mem::take(versions).into_iter().partition(|d| select(d));
        if kept.is_empty() {
            self.disseminators.remove(id);
        } else {
            *versions = kept;
        }
        removed
    }

    // ---- Audit trail ----

    pub fn audit_records(&self) -> &[AuditRecord] {
        &self.audit_records
    }

    /// Append a record. There is deliberately no removal counterpart.
    pub fn append_audit_record(&mut self, record: AuditRecord) {
        self.ids.observe_audit_record(&record.id);
        self.audit_records.push(record);
    }

    // ---- ID generation ----

    /// A datastream ID (`DS<n>`) not used by any datastream of this object.
    pub fn new_datastream_id(&mut self) -> String {
        IdAllocator::next_prefixed(&mut self.ids.next_datastream, DATASTREAM_ID_PREFIX)
    }

    /// A version ID for `base` whose suffix exceeds every suffix seen or
    /// issued for it, including suffixes of removed versions.
    pub fn new_datastream_version_id(&mut self, base: &str) -> String {
        IdAllocator::next_version(&mut self.ids.datastream_versions, base)
    }

    pub fn new_disseminator_id(&mut self) -> String {
        IdAllocator::next_prefixed(&mut self.ids.next_disseminator, DISSEMINATOR_ID_PREFIX)
    }

    pub fn new_disseminator_version_id(&mut self, base: &str) -> String {
        IdAllocator::next_version(&mut self.ids.disseminator_versions, base)
    }

    pub fn new_audit_record_id(&mut self) -> String {
        IdAllocator::next_prefixed(&mut self.ids.next_audit_record, AUDIT_RECORD_ID_PREFIX)
    }
}

impl Default for DigitalObject {
    fn default() -> Self {
        Self::new()
    }
}

/// High-water marks for generated IDs. Only ever increases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct IdAllocator {
    /// Next version suffix per datastream ID.
    datastream_versions: BTreeMap<String, u64>,
    /// Next version suffix per disseminator ID.
    disseminator_versions: BTreeMap<String, u64>,
    next_datastream: u64,
    next_disseminator: u64,
    next_audit_record: u64,
}

impl IdAllocator {
    fn observe_datastream_version(&mut self, base: &str, version_id: &str) {
        Self::observe_version(&mut self.datastream_versions, base, version_id);
    }

    fn observe_disseminator_version(&mut self, base: &str, version_id: &str) {
        Self::observe_version(&mut self.disseminator_versions, base, version_id);
    }

    fn observe_datastream(&mut self, id: &str) {
        Self::observe_prefixed(&mut self.next_datastream, DATASTREAM_ID_PREFIX, id);
    }

    fn observe_disseminator(&mut self, id: &str) {
        Self::observe_prefixed(&mut self.next_disseminator, DISSEMINATOR_ID_PREFIX, id);
    }

    fn observe_audit_record(&mut self, id: &str) {
        Self::observe_prefixed(&mut self.next_audit_record, AUDIT_RECORD_ID_PREFIX, id);
    }

    fn observe_version(counters: &mut BTreeMap<String, u64>, base: &str, version_id: &str) {
        if let Some(n) = version_suffix(base, version_id) {
            let next = counters.entry(base.to_string()).or_default();
            *next = (*next).max(n.saturating_add(1));
        }
    }

    fn next_version(counters: &mut BTreeMap<String, u64>, base: &str) -> String {
        let next = counters.entry(base.to_string()).or_default();
        let n = *next;
        *next = n + 1;
        format!("{base}.{n}")
    }

    fn observe_prefixed(next: &mut u64, prefix: &str, id: &str) {
        if let Some(n) = id.strip_prefix(prefix).and_then(|rest| rest.parse::<u64>().ok()) {
            *next = (*next).max(n.saturating_add(1));
        }
    }

    fn next_prefixed(next: &mut u64, prefix: &str) -> String {
        let n = (*next).max(1);
        *next = n + 1;
        format!("{prefix}{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dor_types::ControlGroup;
    use proptest::prelude::*;

    fn at(sec: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap()
    }

    fn managed(id: &str, version: &str, created: Timestamp) -> Datastream {
        Datastream::referenced(id, version, ControlGroup::M, created, format!("{version}-loc"))
    }

    fn pid() -> Pid {
        Pid::new("demo:1").unwrap()
    }

    #[test]
    fn new_object_is_empty_and_new() {
        let obj = DigitalObject::new();
        assert!(obj.pid().is_none());
        assert!(obj.is_new());
        assert_eq!(obj.datastream_ids().count(), 0);
        assert!(obj.audit_records().is_empty());
    }

    #[test]
    fn pid_assigned_once() {
        let mut obj = DigitalObject::new();
        obj.assign_pid(pid()).unwrap();
        let err = obj.assign_pid(Pid::new("demo:2").unwrap()).unwrap_err();
        assert_eq!(err, ModelError::PidAlreadyAssigned(pid()));
        assert_eq!(obj.pid(), Some(&pid()));
    }

    #[test]
    fn add_as_new_version_appends_in_date_order() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS1", "DS1.0", at(10)), true);
        obj.add_datastream_version(managed("DS1", "DS1.1", at(30)), true);
        obj.add_datastream_version(managed("DS1", "DS1.2", at(20)), true);
        let ids: Vec<_> = obj.datastream_versions("DS1").iter().map(|d| d.version_id.as_str()).collect();
        assert_eq!(ids, vec!["DS1.0", "DS1.2", "DS1.1"]);
        assert_eq!(obj.latest_datastream("DS1").unwrap().version_id, "DS1.1");
    }

    #[test]
    fn add_without_new_version_replaces() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS1", "DS1.0", at(10)), true);
        obj.add_datastream_version(managed("DS1", "DS1.1", at(20)), true);
        obj.add_datastream_version(managed("DS1", "DS1.2", at(30)), false);
        assert_eq!(obj.datastream_versions("DS1").len(), 1);
        assert_eq!(obj.datastream_versions("DS1")[0].version_id, "DS1.2");
    }

    #[test]
    fn as_of_picks_latest_not_after() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS1", "DS1.0", at(10)), true);
        obj.add_datastream_version(managed("DS1", "DS1.1", at(20)), true);
        assert_eq!(obj.datastream_as_of("DS1", at(15)).unwrap().version_id, "DS1.0");
        assert_eq!(obj.datastream_as_of("DS1", at(20)).unwrap().version_id, "DS1.1");
        assert!(obj.datastream_as_of("DS1", at(5)).is_none());
        assert!(obj.datastream_as_of("NOPE", at(50)).is_none());
    }

    #[test]
    fn removing_every_version_drops_the_id() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS1", "DS1.0", at(10)), true);
        let removed = obj.remove_datastream_versions("DS1", |_| true);
        assert_eq!(removed.len(), 1);
        assert!(!obj.has_datastream("DS1"));
        assert!(obj.remove_datastream_versions("DS1", |_| true).is_empty());
    }

    #[test]
    fn version_ids_not_reused_after_removal() {
        let mut obj = DigitalObject::with_pid(pid());
        let v0 = obj.new_datastream_version_id("DS1");
        obj.add_datastream_version(managed("DS1", &v0, at(1)), true);
        let v1 = obj.new_datastream_version_id("DS1");
        obj.add_datastream_version(managed("DS1", &v1, at(2)), true);
        obj.remove_datastream_versions("DS1", |_| true);
        assert_eq!(v0, "DS1.0");
        assert_eq!(v1, "DS1.1");
        assert_eq!(obj.new_datastream_version_id("DS1"), "DS1.2");
    }

    #[test]
    fn observed_versions_raise_counter() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DC", "DC.7", at(1)), true);
        assert_eq!(obj.new_datastream_version_id("DC"), "DC.8");
        assert_eq!(obj.new_datastream_version_id("OTHER"), "OTHER.0");
    }

    #[test]
    fn datastream_ids_skip_existing() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS3", "DS3.0", at(1)), true);
        assert_eq!(obj.new_datastream_id(), "DS4");
        assert_eq!(obj.new_datastream_id(), "DS5");
    }

    #[test]
    fn audit_ids_follow_appended_records() {
        let mut obj = DigitalObject::with_pid(pid());
        assert_eq!(obj.new_audit_record_id(), "AUDREC1");
        obj.append_audit_record(AuditRecord {
            id: "AUDREC9".into(),
            process_type: "p".into(),
            action: "a".into(),
            component_id: None,
            responsibility: "r".into(),
            date: at(0),
            justification: String::new(),
        });
        assert_eq!(obj.new_audit_record_id(), "AUDREC10");
    }

    #[test]
    fn disseminator_versions_and_ids() {
        let mut obj = DigitalObject::with_pid(pid());
        let id = obj.new_disseminator_id();
        let v = obj.new_disseminator_version_id(&id);
        obj.add_disseminator_version(
            Disseminator::new(&id, &v, "demo:bdef", "demo:bmech").with_created(at(5)),
            true,
        );
        assert_eq!(id, "DISS1");
        assert_eq!(v, "DISS1.0");
        assert!(obj.disseminator_as_of("DISS1", at(4)).is_none());
        assert_eq!(obj.disseminator_as_of("DISS1", at(5)).unwrap().version_id, "DISS1.0");
        assert_eq!(obj.remove_disseminator_versions("DISS1", |_| true).len(), 1);
        assert_eq!(obj.new_disseminator_version_id("DISS1"), "DISS1.1");
    }

    #[test]
    fn set_versions_state_through_iterator() {
        let mut obj = DigitalObject::with_pid(pid());
        obj.add_datastream_version(managed("DS1", "DS1.0", at(1)), true);
        obj.add_datastream_version(managed("DS1", "DS1.1", at(2)), true);
        for ds in obj.datastream_versions_mut("DS1").unwrap() {
            ds.state = State::Inactive;
        }
        assert!(obj.datastream_versions("DS1").iter().all(|d| d.state == State::Inactive));
        assert!(obj.datastream_versions_mut("NOPE").is_none());
    }

    proptest! {
        #[test]
        fn generated_version_ids_strictly_increase(ops in proptest::collection::vec(0u8..3, 1..40)) {
            let mut obj = DigitalObject::with_pid(pid());
            let mut issued: Vec<u64> = Vec::new();
            for (i, op) in ops.iter().enumerate() {
                match op {
                    0 | 1 => {
                        let vid = obj.new_datastream_version_id("DS1");
                        let n: u64 = vid.strip_prefix("DS1.").unwrap().parse().unwrap();
                        if let Some(last) = issued.last() {
                            prop_assert!(n > *last);
                        }
                        prop_assert!(!issued.contains(&n));
                        issued.push(n);
                        obj.add_datastream_version(managed("DS1", &vid, at(i as u32 % 60)), *op == 0);
                    }
                    _ => {
                        obj.remove_datastream_versions("DS1", |_| true);
                    }
                }
            }
        }
    }
}
