use dor_model::{Datastream, DigitalObject, Disseminator};
use dor_rels::RelationshipTuple;
use dor_types::{ObjectType, Pid, State, Timestamp};

use crate::error::{AccessError, AccessResult};
use crate::relationships::RelationshipEngine;

/// Read boundary over one digital object.
///
/// Everything is derived from [`object`](Self::object); implementors only
/// provide that.
pub trait ObjectReader {
    fn object(&self) -> &DigitalObject;

    fn pid(&self) -> Option<&Pid> {
        self.object().pid()
    }

    fn object_type(&self) -> ObjectType {
        self.object().object_type()
    }

    fn state(&self) -> Option<State> {
        self.object().state()
    }

    fn label(&self) -> Option<&str> {
        self.object().label()
    }

    fn owner_id(&self) -> Option<&str> {
        self.object().owner_id()
    }

    fn create_date(&self) -> Option<Timestamp> {
        self.object().create_date()
    }

    fn last_mod_date(&self) -> Option<Timestamp> {
        self.object().last_mod_date()
    }

    fn content_model_id(&self) -> Option<&str> {
        self.object().content_model_id()
    }

    fn datastream_ids(&self) -> Vec<String> {
        self.object().datastream_ids().map(str::to_string).collect()
    }

    fn disseminator_ids(&self) -> Vec<String> {
        self.object().disseminator_ids().map(str::to_string).collect()
    }

    /// The version of `id` active at `as_of`, or the newest one.
    ///
    /// Fails with `NotFound` if the datastream does not exist or has no
    /// version created at or before `as_of`.
    fn datastream(&self, id: &str, as_of: Option<Timestamp>) -> AccessResult<&Datastream> {
        let obj = self.object();
        let found = match as_of {
            Some(at) => obj.datastream_as_of(id, at),
            None => obj.latest_datastream(id),
        };
        found.ok_or_else(|| AccessError::datastream_not_found(id))
    }

    /// Every version of `id`, oldest first.
    fn datastream_versions(&self, id: &str) -> AccessResult<&[Datastream]> {
        let versions = self.object().datastream_versions(id);
        if versions.is_empty() {
            return Err(AccessError::datastream_not_found(id));
        }
        Ok(versions)
    }

    fn disseminator(&self, id: &str, as_of: Option<Timestamp>) -> AccessResult<&Disseminator> {
        let obj = self.object();
        let found = match as_of {
            Some(at) => obj.disseminator_as_of(id, at),
            None => obj.latest_disseminator(id),
        };
        found.ok_or_else(|| AccessError::NotFound {
            kind: "disseminator",
            id: id.to_string(),
        })
    }

    /// Relationships in `RELS-EXT`, optionally narrowed to one subject and
    /// one predicate. The predicate may be given as a CURIE.
    fn relationships(
        &self,
        subject: Option<&str>,
        predicate: Option<&str>,
    ) -> AccessResult<Vec<RelationshipTuple>> {
        RelationshipEngine::list(self.object(), subject, predicate)
    }
}

/// A reader that owns its object.
#[derive(Clone, Debug)]
pub struct SimpleReader {
    object: DigitalObject,
}

impl SimpleReader {
    pub fn new(object: DigitalObject) -> Self {
        Self { object }
    }

    pub fn into_object(self) -> DigitalObject {
        self.object
    }
}

impl ObjectReader for SimpleReader {
    fn object(&self) -> &DigitalObject {
        &self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dor_model::Disseminator;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn reader() -> SimpleReader {
        let mut obj = DigitalObject::with_pid(Pid::new("demo:1").unwrap());
        obj.set_label("reader test");
        for (vid, day) in [("DC.0", 1), ("DC.1", 10), ("DC.2", 20)] {
            obj.add_datastream_version(
                Datastream::inline_xml("DC", vid, at(day), format!("<{}/>", vid.replace('.', "")).into_bytes()),
                true,
            );
        }
        obj.add_disseminator_version(
            Disseminator::new("DISS1", "DISS1.0", "demo:8", "demo:9").with_created(at(5)),
            true,
        );
        SimpleReader::new(obj)
    }

    #[test]
    fn latest_version_without_date() {
        assert_eq!(reader().datastream("DC", None).unwrap().version_id, "DC.2");
    }

    #[test]
    fn as_of_picks_version_active_at_instant() {
        let r = reader();
        assert_eq!(r.datastream("DC", Some(at(10))).unwrap().version_id, "DC.1");
        assert_eq!(r.datastream("DC", Some(at(15))).unwrap().version_id, "DC.1");
        assert_eq!(r.datastream("DC", Some(at(25))).unwrap().version_id, "DC.2");
    }

    #[test]
    fn lookups_before_first_version_or_of_unknown_ids_fail() {
        let r = reader();
        let before = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        assert!(matches!(r.datastream("DC", Some(before)), Err(AccessError::NotFound { .. })));
        assert!(matches!(r.datastream("NOPE", None), Err(AccessError::NotFound { .. })));
        assert!(matches!(r.datastream_versions("NOPE"), Err(AccessError::NotFound { .. })));
        assert!(matches!(
            r.disseminator("NOPE", None),
            Err(AccessError::NotFound { kind: "disseminator", .. })
        ));
    }

    #[test]
    fn metadata_and_listings() {
        let r = reader();
        assert_eq!(r.pid().map(Pid::as_str), Some("demo:1"));
        assert_eq!(r.label(), Some("reader test"));
        assert_eq!(r.datastream_ids(), vec!["DC".to_string()]);
        assert_eq!(r.disseminator_ids(), vec!["DISS1".to_string()]);
        assert_eq!(r.datastream_versions("DC").unwrap().len(), 3);
        assert_eq!(r.disseminator("DISS1", Some(at(6))).unwrap().version_id, "DISS1.0");
    }

    #[test]
    fn no_relationships_without_rels_ext() {
        assert!(reader().relationships(None, None).unwrap().is_empty());
    }
}
