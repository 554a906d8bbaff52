use serde::{Deserialize, Serialize};

use dor_types::{State, Timestamp};

/// One entry of a disseminator's datastream binding map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsBinding {
    /// Binding key declared by the behavior mechanism.
    pub binding_key: String,
    /// Datastream of this object bound to the key.
    pub datastream_id: String,
    /// Optional human-readable label; empty when absent.
    pub label: String,
    /// Position among bindings sharing a key.
    pub order: Option<u32>,
}

impl DsBinding {
    pub fn new(binding_key: impl Into<String>, datastream_id: impl Into<String>) -> Self {
        Self {
            binding_key: binding_key.into(),
            datastream_id: datastream_id.into(),
            label: String::new(),
            order: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// One version of a disseminator: a binding of this object's datastreams
/// to a behavior mechanism implementing a behavior definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disseminator {
    pub disseminator_id: String,
    pub version_id: String,
    /// PID of the behavior definition (the contract).
    pub bdef_pid: String,
    /// PID of the behavior mechanism (the service).
    pub bmech_pid: String,
    pub label: String,
    pub created: Option<Timestamp>,
    pub state: State,
    pub versionable: bool,
    /// Bindings in declaration order.
    pub bindings: Vec<DsBinding>,
}

impl Disseminator {
    pub fn new(
        disseminator_id: impl Into<String>,
        version_id: impl Into<String>,
        bdef_pid: impl Into<String>,
        bmech_pid: impl Into<String>,
    ) -> Self {
        Self {
            disseminator_id: disseminator_id.into(),
            version_id: version_id.into(),
            bdef_pid: bdef_pid.into(),
            bmech_pid: bmech_pid.into(),
            label: String::new(),
            created: None,
            state: State::Active,
            versionable: true,
            bindings: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_created(mut self, created: Timestamp) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_binding(mut self, binding: DsBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Bindings for one key, in declaration order.
    pub fn bindings_for<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a DsBinding> + 'a {
        self.bindings.iter().filter(move |b| b.binding_key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_bindings_in_order() {
        let diss = Disseminator::new("DISS1", "DISS1.0", "demo:1", "demo:2")
            .with_label("Image viewer")
            .with_binding(DsBinding::new("THUMB", "TN").with_order(0))
            .with_binding(DsBinding::new("FULL", "IMG"))
            .with_binding(DsBinding::new("THUMB", "TN2").with_order(1));
        assert_eq!(diss.bindings.len(), 3);
        let thumbs: Vec<_> = diss.bindings_for("THUMB").map(|b| b.datastream_id.as_str()).collect();
        assert_eq!(thumbs, vec!["TN", "TN2"]);
        assert!(diss.created.is_none());
    }
}
