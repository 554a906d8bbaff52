use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::names::OBJECT_URI_PREFIX;

/// Maximum length of a PID, namespace and separator included.
pub const MAX_PID_LENGTH: usize = 64;

/// Persistent identifier of a digital object.
///
/// A PID has the form `namespace:id`. The namespace may contain ASCII
/// letters, digits, `-` and `.`; the id may additionally contain `~`, `_`
/// and `%XX` escapes. A PID is assigned once and never changes.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pid(String);

impl Pid {
    /// Validate and wrap a PID string.
    pub fn new(value: impl Into<String>) -> Result<Self, TypeError> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    /// Parse the PID out of an `info:fedora/<pid>` URI.
    pub fn from_uri(uri: &str) -> Result<Self, TypeError> {
        match uri.strip_prefix(OBJECT_URI_PREFIX) {
            Some(rest) => Self::new(rest),
            None => Err(TypeError::InvalidPid {
                value: uri.to_string(),
                reason: format!("uri must start with {OBJECT_URI_PREFIX}"),
            }),
        }
    }

    /// The full PID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `:`.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or_default()
    }

    /// The part after the first `:`.
    pub fn object_id(&self) -> &str {
        self.0.split_once(':').map(|(_, id)| id).unwrap_or_default()
    }

    /// Canonical object URI, `info:fedora/<pid>`.
    pub fn to_uri(&self) -> String {
        format!("{OBJECT_URI_PREFIX}{}", self.0)
    }

    /// URI of one of this object's datastreams, `info:fedora/<pid>/<dsid>`.
    pub fn datastream_uri(&self, datastream_id: &str) -> String {
        format!("{OBJECT_URI_PREFIX}{}/{datastream_id}", self.0)
    }
}

fn validate(value: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| TypeError::InvalidPid {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    if value.len() > MAX_PID_LENGTH {
        return Err(fail("longer than 64 characters"));
    }
    let (namespace, id) = value.split_once(':').ok_or_else(|| fail("missing ':'"))?;
    if namespace.is_empty() {
        return Err(fail("empty namespace"));
    }
    if !namespace
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(fail("namespace contains an illegal character"));
    }
    if id.is_empty() {
        return Err(fail("empty object id"));
    }

    let bytes = id.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let escape = bytes.get(i + 1..i + 3).ok_or_else(|| fail("truncated % escape"))?;
            if !escape.iter().all(|h| h.is_ascii_hexdigit()) {
                return Err(fail("malformed % escape"));
            }
            i += 3;
            continue;
        }
        if !(b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'~' | b'_')) {
            return Err(fail("object id contains an illegal character"));
        }
        i += 1;
    }
    Ok(())
}

impl fmt::Debug for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pid({})", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Pid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Pid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pid> for String {
    fn from(pid: Pid) -> Self {
        pid.0
    }
}
