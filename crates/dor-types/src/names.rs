//! Reserved datastream IDs and well-known namespace URIs.

/// Datastream ID of the audit trail. Regenerated on every serialization.
pub const AUDIT_DATASTREAM_ID: &str = "AUDIT";

/// Older audit trail ID, skipped the same way as [`AUDIT_DATASTREAM_ID`].
pub const LEGACY_AUDIT_DATASTREAM_ID: &str = "FEDORA-AUDITTRAIL";

/// Datastream ID holding the object's RDF relationship graph.
pub const RELS_EXT_DATASTREAM_ID: &str = "RELS-EXT";

/// Scheme prefix of object URIs (`info:fedora/<pid>`).
pub const OBJECT_URI_PREFIX: &str = "info:fedora/";

/// Namespace URIs used by the canonical format and relationship graphs.
pub mod ns {
    pub const FOXML: &str = "info:fedora/def:foxml/";
    pub const FOXML_PREFIX: &str = "foxml";
    pub const FOXML_XSD_LOCATION: &str = "http://www.fedora.info/definitions/1/0/foxml1-0.xsd";

    pub const AUDIT: &str = "info:fedora/def:audit/";
    pub const AUDIT_PREFIX: &str = "audit";

    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const XSI_FALLBACK_PREFIX: &str = "fedoraxsi";

    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const RDF_PREFIX: &str = "rdf";

    pub const RELS_EXT: &str = "info:fedora/fedora-system:def/relations-external#";
    pub const RELS_EXT_PREFIX: &str = "rel";
}

/// Returns `true` for either audit trail datastream ID.
pub fn is_audit_datastream(id: &str) -> bool {
    id == AUDIT_DATASTREAM_ID || id == LEGACY_AUDIT_DATASTREAM_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_ids_recognized() {
        assert!(is_audit_datastream("AUDIT"));
        assert!(is_audit_datastream("FEDORA-AUDITTRAIL"));
        assert!(!is_audit_datastream("RELS-EXT"));
    }
}
