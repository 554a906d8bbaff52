use serde::{Deserialize, Serialize};

use dor_types::{ChecksumType, ControlGroup, State, Timestamp};

/// Where a datastream version's bytes live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatastreamContent {
    /// Inline XML owned by the object (control group `X`).
    Inline(Vec<u8>),
    /// A location string: internal identifier for `M`, URL for `E`/`R`.
    Location(String),
}

/// One version of a datastream.
///
/// Versions of the same datastream share `datastream_id`; `version_id` is
/// the datastream ID plus a numeric suffix (`DS1.0`, `DS1.1`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastream {
    pub datastream_id: String,
    pub version_id: String,
    pub control_group: ControlGroup,
    pub label: String,
    pub mime_type: String,
    pub format_uri: Option<String>,
    pub state: State,
    pub versionable: bool,
    pub created: Timestamp,
    pub size: u64,
    pub checksum_type: ChecksumType,
    pub content: DatastreamContent,
}

impl Datastream {
    /// A new inline XML (`X`) version. Size is taken from the content.
    pub fn inline_xml(
        datastream_id: impl Into<String>,
        version_id: impl Into<String>,
        created: Timestamp,
        xml: Vec<u8>,
    ) -> Self {
        Self {
            datastream_id: datastream_id.into(),
            version_id: version_id.into(),
            control_group: ControlGroup::X,
            label: String::new(),
            mime_type: "text/xml".into(),
            format_uri: None,
            state: State::Active,
            versionable: true,
            created,
            size: xml.len() as u64,
            checksum_type: ChecksumType::default(),
            content: DatastreamContent::Inline(xml),
        }
    }

    /// A new referenced (`M`, `E` or `R`) version pointing at `location`.
    ///
    /// Passing [`ControlGroup::X`] is allowed here but produces a version
    /// the serializer rejects; use [`Datastream::inline_xml`] instead.
    pub fn referenced(
        datastream_id: impl Into<String>,
        version_id: impl Into<String>,
        control_group: ControlGroup,
        created: Timestamp,
        location: impl Into<String>,
    ) -> Self {
        Self {
            datastream_id: datastream_id.into(),
            version_id: version_id.into(),
            control_group,
            label: String::new(),
            mime_type: String::new(),
            format_uri: None,
            state: State::Active,
            versionable: true,
            created,
            size: 0,
            checksum_type: ChecksumType::default(),
            content: DatastreamContent::Location(location.into()),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_format_uri(mut self, format_uri: impl Into<String>) -> Self {
        self.format_uri = Some(format_uri.into());
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn with_versionable(mut self, versionable: bool) -> Self {
        self.versionable = versionable;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_checksum_type(mut self, checksum_type: ChecksumType) -> Self {
        self.checksum_type = checksum_type;
        self
    }

    /// Inline bytes, for `X` versions.
    pub fn xml_content(&self) -> Option<&[u8]> {
        match &self.content {
            DatastreamContent::Inline(bytes) => Some(bytes),
            DatastreamContent::Location(_) => None,
        }
    }

    /// Location string, for `M`, `E` and `R` versions.
    pub fn location(&self) -> Option<&str> {
        match &self.content {
            DatastreamContent::Location(loc) => Some(loc),
            DatastreamContent::Inline(_) => None,
        }
    }

    /// Numeric suffix of `version_id` when it has the form `<datastream_id>.<n>`.
    pub fn version_suffix(&self) -> Option<u64> {
        version_suffix(&self.datastream_id, &self.version_id)
    }
}

/// Parse the numeric suffix of `version_id` relative to `base`.
pub(crate) fn version_suffix(base: &str, version_id: &str) -> Option<u64> {
    version_id
        .strip_prefix(base)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(sec: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, sec).unwrap()
    }

    #[test]
    fn inline_xml_defaults() {
        let ds = Datastream::inline_xml("DC", "DC.0", at(0), b"<dc/>".to_vec());
        assert_eq!(ds.control_group, ControlGroup::X);
        assert_eq!(ds.mime_type, "text/xml");
        assert_eq!(ds.size, 5);
        assert_eq!(ds.xml_content(), Some(&b"<dc/>"[..]));
        assert_eq!(ds.location(), None);
    }

    #[test]
    fn referenced_carries_location() {
        let ds = Datastream::referenced("IMG", "IMG.3", ControlGroup::E, at(1), "http://x/y.png")
            .with_mime_type("image/png")
            .with_label("Picture");
        assert_eq!(ds.location(), Some("http://x/y.png"));
        assert_eq!(ds.label, "Picture");
        assert_eq!(ds.version_suffix(), Some(3));
    }

    #[test]
    fn version_suffix_requires_matching_base() {
        assert_eq!(version_suffix("DS1", "DS1.12"), Some(12));
        assert_eq!(version_suffix("DS1", "DS10.1"), None);
        assert_eq!(version_suffix("DS1", "DS1"), None);
        assert_eq!(version_suffix("DS1", "DS1.x"), None);
    }
}
