use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state shared by objects, datastreams, and disseminators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    /// Visible and usable (`A`).
    #[default]
    #[serde(rename = "A")]
    Active,
    /// Hidden from ordinary access (`I`).
    #[serde(rename = "I")]
    Inactive,
    /// Marked for deletion (`D`).
    #[serde(rename = "D")]
    Deleted,
}

impl State {
    /// Single-letter wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Active => "A",
            Self::Inactive => "I",
            Self::Deleted => "D",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for State {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::Active),
            "I" => Ok(Self::Inactive),
            "D" => Ok(Self::Deleted),
            other => Err(TypeError::InvalidState(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ControlGroup
// ---------------------------------------------------------------------------

/// How a datastream's content is held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlGroup {
    /// Inline XML owned by the object.
    X,
    /// Managed content referenced by an internal identifier.
    M,
    /// External content referenced by URL.
    E,
    /// Redirect to a URL.
    R,
}

impl ControlGroup {
    /// Wire code (`X`, `M`, `E`, `R`).
    pub fn code(&self) -> &'static str {
        match self {
            Self::X => "X",
            Self::M => "M",
            Self::E => "E",
            Self::R => "R",
        }
    }

    /// Returns `true` for inline XML content.
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::X)
    }

    /// The `contentLocation TYPE` used for referenced content, if any.
    pub fn location_type(&self) -> Option<&'static str> {
        match self {
            Self::X => None,
            Self::M => Some("INTERNAL_ID"),
            Self::E | Self::R => Some("URL"),
        }
    }
}

impl fmt::Display for ControlGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ControlGroup {
    type Err = TypeError;

    /// Case-insensitive, matching how stored objects have been written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" | "x" => Ok(Self::X),
            "M" | "m" => Ok(Self::M),
            "E" | "e" => Ok(Self::E),
            "R" | "r" => Ok(Self::R),
            other => Err(TypeError::InvalidControlGroup(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ObjectType
// ---------------------------------------------------------------------------

/// Kind of digital object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Ordinary data object.
    #[default]
    DataObject,
    /// Behavior definition (abstract service contract).
    BehaviorDefinition,
    /// Behavior mechanism (concrete service binding).
    BehaviorMechanism,
}

impl ObjectType {
    /// Value of the `fType` object property.
    pub fn ftype_value(&self) -> &'static str {
        match self {
            Self::DataObject => "FedoraObject",
            Self::BehaviorDefinition => "FedoraBDefObject",
            Self::BehaviorMechanism => "FedoraBMechObject",
        }
    }

    /// Parse the value of the `fType` object property.
    pub fn from_ftype_value(value: &str) -> Result<Self, TypeError> {
        match value {
            "FedoraObject" => Ok(Self::DataObject),
            "FedoraBDefObject" => Ok(Self::BehaviorDefinition),
            "FedoraBMechObject" => Ok(Self::BehaviorMechanism),
            other => Err(TypeError::InvalidObjectType(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ftype_value())
    }
}

// ---------------------------------------------------------------------------
// ChecksumType
// ---------------------------------------------------------------------------

/// Digest algorithm recorded on a datastream version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    #[default]
    Md5,
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Disabled,
}

impl ChecksumType {
    /// Name used in the `contentDigest TYPE` attribute.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChecksumType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MD5" => Ok(Self::Md5),
            "SHA-1" => Ok(Self::Sha1),
            "SHA-256" => Ok(Self::Sha256),
            "SHA-384" => Ok(Self::Sha384),
            "SHA-512" => Ok(Self::Sha512),
            "DISABLED" => Ok(Self::Disabled),
            other => Err(TypeError::InvalidChecksumType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_roundtrip() {
        for state in [State::Active, State::Inactive, State::Deleted] {
            assert_eq!(state.code().parse::<State>().unwrap(), state);
        }
        assert!("Z".parse::<State>().is_err());
    }

    #[test]
    fn state_default_is_active() {
        assert_eq!(State::default(), State::Active);
    }

    #[test]
    fn control_group_parse_is_case_insensitive() {
        assert_eq!("m".parse::<ControlGroup>().unwrap(), ControlGroup::M);
        assert_eq!("X".parse::<ControlGroup>().unwrap(), ControlGroup::X);
        assert!("Q".parse::<ControlGroup>().is_err());
    }

    #[test]
    fn control_group_location_types() {
        assert_eq!(ControlGroup::X.location_type(), None);
        assert_eq!(ControlGroup::M.location_type(), Some("INTERNAL_ID"));
        assert_eq!(ControlGroup::E.location_type(), Some("URL"));
        assert_eq!(ControlGroup::R.location_type(), Some("URL"));
        assert!(ControlGroup::X.is_inline());
    }

    #[test]
    fn object_type_ftype_values() {
        for t in [
            ObjectType::DataObject,
            ObjectType::BehaviorDefinition,
            ObjectType::BehaviorMechanism,
        ] {
            assert_eq!(ObjectType::from_ftype_value(t.ftype_value()).unwrap(), t);
        }
        assert!(ObjectType::from_ftype_value("Folder").is_err());
    }

    #[test]
    fn checksum_names() {
        assert_eq!(ChecksumType::default().name(), "MD5");
        assert_eq!("SHA-256".parse::<ChecksumType>().unwrap(), ChecksumType::Sha256);
        assert!("CRC32".parse::<ChecksumType>().is_err());
    }

    #[test]
    fn state_serde_uses_codes() {
        let json = serde_json::to_string(&State::Inactive).unwrap();
        assert_eq!(json, "\"I\"");
    }
}
