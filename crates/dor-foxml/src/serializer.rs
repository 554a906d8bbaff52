use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use quick_xml::escape::escape;
use tracing::debug;

use dor_model::{AuditRecord, Datastream, DatastreamContent, DigitalObject, Disseminator};
use dor_types::names::{is_audit_datastream, ns, AUDIT_DATASTREAM_ID};
use dor_types::{format_timestamp, ControlGroup, ObjectType, Pid};

use crate::error::{FoxmlError, FoxmlResult};
use crate::options::SerializeOptions;

/// Indent of namespace declarations and attributes on the root element.
const ROOT_ATTR_INDENT: &str = "           ";
const L1: &str = "    ";
const L2: &str = "        ";
const L3: &str = "            ";
const L4: &str = "                ";
const L5: &str = "                    ";

pub(crate) const PROPERTY_FTYPE: &str = "info:fedora/def:dobj:fType";
pub(crate) const PROPERTY_STATE: &str = "info:fedora/def:dobj:state";
pub(crate) const PROPERTY_LABEL: &str = "info:fedora/def:dobj:label";
pub(crate) const PROPERTY_CREATED: &str = "info:fedora/def:dobj:cDate";
pub(crate) const PROPERTY_MODIFIED: &str = "info:fedora/def:dobj:mDate";
pub(crate) const PROPERTY_CONTENT_MODEL: &str = "info:fedora/def:dobj:cModel";

pub(crate) const AUDIT_FORMAT_URI: &str = "info:fedora/format:xml:audit";
pub(crate) const AUDIT_VERSION_LABEL: &str = "Fedora Object Audit Trail";
pub(crate) const DIGEST_PLACEHOLDER: &str = "future: hash of content goes here";

/// Inline datastreams of behavior mechanisms whose embedded URLs are
/// rewritten for the translation context.
pub(crate) const SERVICE_DATASTREAM_IDS: &[&str] = &["WSDL", "SERVICE-PROFILE"];

/// Writes digital objects in the canonical FOXML layout.
pub struct FoxmlSerializer;

impl FoxmlSerializer {
    /// Serialize to bytes in `options.encoding`.
    ///
    /// Nothing is produced on error: the document is validated, rendered
    /// as text, and transcoded as a whole.
    pub fn serialize(obj: &DigitalObject, options: &SerializeOptions) -> FoxmlResult<Vec<u8>> {
        let text = Self::render(obj, options)?;
        options.encoding.encode(&text)
    }

    /// Serialize and write to `out` in one flush.
    pub fn serialize_to<W: Write>(
        obj: &DigitalObject,
        options: &SerializeOptions,
        out: &mut W,
    ) -> FoxmlResult<()> {
        let bytes = Self::serialize(obj, options)?;
        out.write_all(&bytes)?;
        out.flush()?;
        Ok(())
    }

    /// Render the document as text, before transcoding.
    pub fn render(obj: &DigitalObject, options: &SerializeOptions) -> FoxmlResult<String> {
        let pid = obj
            .pid()
            .ok_or_else(|| FoxmlError::StructuralIntegrity("object must have a pid".into()))?;
        for record in obj.audit_records() {
            validate_audit(record)?;
        }

        let namespaces = effective_namespaces(obj);
        let mut doc = Document {
            obj,
            pid,
            options,
            audit_prefix: namespaces.get(ns::AUDIT).map_or(ns::AUDIT_PREFIX, String::as_str),
            buf: String::with_capacity(4096),
        };

        doc.declaration();
        doc.root_start(&namespaces);
        doc.properties();
        doc.audit();
        doc.datastreams()?;
        doc.disseminators();
        doc.buf.push_str(&format!("</{}:digitalObject>", ns::FOXML_PREFIX));

        debug!(
            pid = %pid,
            encoding = %options.encoding,
            context = ?options.context,
            chars = doc.buf.len(),
            "rendered canonical xml"
        );
        Ok(doc.buf)
    }
}

fn validate_audit(record: &AuditRecord) -> FoxmlResult<()> {
    let missing = record.missing_fields();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(FoxmlError::StructuralIntegrity(format!(
            "audit record {:?} must have {}",
            record.id,
            missing.join(", ")
        )))
    }
}

/// Root namespace declarations, URI to prefix.
///
/// Starts from the object's map without empty prefixes or the FOXML
/// namespace, then binds the schema-instance, relationship and audit
/// namespaces if missing. A prefix already in use, `foxml` included, is
/// replaced by the first free `<prefix>N`. The object is not modified.
fn effective_namespaces(obj: &DigitalObject) -> BTreeMap<String, String> {
    let mut used = BTreeSet::from([ns::FOXML_PREFIX.to_string()]);
    let mut map = BTreeMap::new();
    let declared = obj
        .namespace_mapping()
        .iter()
        .filter(|(uri, prefix)| !prefix.is_empty() && uri.as_str() != ns::FOXML)
        .map(|(uri, prefix)| (uri.as_str(), prefix.as_str()));
    let required = [
        (ns::XSI, ns::XSI_FALLBACK_PREFIX),
        (ns::RELS_EXT, ns::RELS_EXT_PREFIX),
        (ns::AUDIT, ns::AUDIT_PREFIX),
    ];
    for (uri, prefix) in declared.chain(required) {
        if map.contains_key(uri) {
            continue;
        }
        let prefix = free_prefix(prefix, &used);
        used.insert(prefix.clone());
        map.insert(uri.to_string(), prefix);
    }
    map
}

fn free_prefix(wanted: &str, used: &BTreeSet<String>) -> String {
    if !used.contains(wanted) {
        return wanted.to_string();
    }
    let mut n = 1u32;
    loop {
        let candidate = format!("{wanted}{n}");
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

struct Document<'a> {
    obj: &'a DigitalObject,
    pid: &'a Pid,
    options: &'a SerializeOptions,
    audit_prefix: &'a str,
    buf: String,
}

impl Document<'_> {
    fn push(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    /// ` NAME="value"` with the value escaped.
    fn attr(&mut self, name: &str, value: &str) {
        self.buf.push(' ');
        self.buf.push_str(name);
        self.buf.push_str("=\"");
        self.buf.push_str(&escape(value));
        self.buf.push('"');
    }

    fn declaration(&mut self) {
        let line = format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>\n",
            self.options.encoding.name()
        );
        self.push(&line);
    }

    fn root_start(&mut self, namespaces: &BTreeMap<String, String>) {
        let foxml = ns::FOXML_PREFIX;
        self.push(&format!(
            "<{foxml}:digitalObject xmlns:{foxml}=\"{}\"\n",
            escape(ns::FOXML)
        ));

        for (uri, prefix) in namespaces {
            if uri == ns::AUDIT {
                continue;
            }
            self.push(&format!("{ROOT_ATTR_INDENT}xmlns:{prefix}=\"{}\"\n", escape(uri)));
        }
        self.push(&format!(
            "{ROOT_ATTR_INDENT}xmlns:{}=\"{}\"\n",
            self.audit_prefix,
            ns::AUDIT
        ));

        let xsi = namespaces.get(ns::XSI).map_or(ns::XSI_FALLBACK_PREFIX, String::as_str);
        self.push(&format!(
            "{ROOT_ATTR_INDENT}{xsi}:schemaLocation=\"{} {}\"\n",
            escape(ns::FOXML),
            escape(ns::FOXML_XSD_LOCATION)
        ));

        self.push(ROOT_ATTR_INDENT);
        self.push(&format!(
            "PID=\"{}\" URI=\"{}\">\n",
            escape(self.pid.as_str()),
            escape(&self.pid.to_uri())
        ));
    }

    fn property(&mut self, element: &str, name: &str, value: &str) {
        self.push(&format!("{L2}<{}:{element}", ns::FOXML_PREFIX));
        self.attr("NAME", name);
        self.attr("VALUE", value);
        self.push("/>\n");
    }

    fn properties(&mut self) {
        let obj = self.obj;
        let foxml = ns::FOXML_PREFIX;
        self.push(&format!("{L1}<{foxml}:objectProperties>\n"));

        self.property("property", PROPERTY_FTYPE, obj.object_type().ftype_value());
        if let Some(state) = obj.state() {
            self.property("property", PROPERTY_STATE, state.code());
        }
        if let Some(label) = obj.label() {
            self.property("property", PROPERTY_LABEL, label);
        }
        if let Some(date) = obj.create_date() {
            self.property("property", PROPERTY_CREATED, &format_timestamp(&date));
        }
        if let Some(date) = obj.last_mod_date() {
            self.property("property", PROPERTY_MODIFIED, &format_timestamp(&date));
        }
        if let Some(cmodel) = obj.content_model_id() {
            self.property("property", PROPERTY_CONTENT_MODEL, cmodel);
        }
        for (name, value) in obj.ext_properties() {
            self.property("extproperty", name, value);
        }

        self.push(&format!("{L1}</{foxml}:objectProperties>\n"));
    }

    /// The audit datastream, rebuilt from the record list.
    fn audit(&mut self) {
        let obj = self.obj;
        if obj.audit_records().is_empty() {
            return;
        }
        let foxml = ns::FOXML_PREFIX;
        let a = self.audit_prefix;

        self.push(&format!("{L1}<{foxml}:datastream"));
        self.attr("ID", AUDIT_DATASTREAM_ID);
        self.attr("URI", &self.pid.datastream_uri(AUDIT_DATASTREAM_ID));
        self.attr("STATE", "A");
        self.attr("MIMETYPE", "text/xml");
        self.attr("FORMAT_URI", AUDIT_FORMAT_URI);
        self.attr("CONTROL_GROUP", "X");
        self.attr("VERSIONABLE", "NO");
        self.push(">\n");

        self.push(&format!("{L2}<{foxml}:datastreamVersion"));
        self.attr("ID", &format!("{AUDIT_DATASTREAM_ID}.0"));
        self.attr("LABEL", AUDIT_VERSION_LABEL);
        if let Some(created) = obj.create_date() {
            self.attr("CREATED", &format_timestamp(&created));
        }
        self.push(">\n");

        self.push(&format!("{L3}<{foxml}:xmlContent>\n"));
        self.push(&format!("{L3}<{a}:auditTrail xmlns:{a}=\"{}\">\n", ns::AUDIT));
        for rec in obj.audit_records() {
            self.push(&format!("{L4}<{a}:record ID=\"{}\">\n", escape(&rec.id)));
            self.push(&format!("{L5}<{a}:process type=\"{}\"/>\n", escape(&rec.process_type)));
            for (element, value) in [
                ("action", rec.action.as_str()),
                ("componentID", rec.component_id_or_empty()),
                ("responsibility", rec.responsibility.as_str()),
                ("date", format_timestamp(&rec.date).as_str()),
                ("justification", rec.justification.as_str()),
            ] {
                self.push(&format!("{L5}<{a}:{element}>{}</{a}:{element}>\n", escape(value)));
            }
            self.push(&format!("{L4}</{a}:record>\n"));
        }
        self.push(&format!("{L3}</{a}:auditTrail>\n"));
        self.push(&format!("{L3}</{foxml}:xmlContent>\n"));
        self.push(&format!(
            "{L3}<{foxml}:contentDigest TYPE=\"MD5\" DIGEST=\"{DIGEST_PLACEHOLDER}\"/>\n"
        ));
        self.push(&format!("{L2}</{foxml}:datastreamVersion>\n"));
        self.push(&format!("{L1}</{foxml}:datastream>\n"));
    }

    fn datastreams(&mut self) -> FoxmlResult<()> {
        let obj = self.obj;
        let foxml = ns::FOXML_PREFIX;
        for dsid in obj.datastream_ids() {
            if is_audit_datastream(dsid) {
                continue;
            }
            let versions = obj.datastream_versions(dsid);
            let Some(first) = versions.first() else {
                continue;
            };

            self.push(&format!("{L1}<{foxml}:datastream"));
            self.attr("ID", dsid);
            self.attr("URI", &self.pid.datastream_uri(dsid));
            self.attr("STATE", first.state.code());
            self.attr("MIMETYPE", &first.mime_type);
            if let Some(format_uri) = &first.format_uri {
                self.attr("FORMAT_URI", format_uri);
            }
            self.attr("CONTROL_GROUP", first.control_group.code());
            self.attr("VERSIONABLE", if first.versionable { "true" } else { "false" });
            self.push(">\n");

            for ds in versions {
                self.datastream_version(ds)?;
            }
            self.push(&format!("{L1}</{foxml}:datastream>\n"));
        }
        Ok(())
    }

    fn datastream_version(&mut self, ds: &Datastream) -> FoxmlResult<()> {
        let foxml = ns::FOXML_PREFIX;
        self.push(&format!("{L2}<{foxml}:datastreamVersion"));
        self.attr("ID", &ds.version_id);
        self.attr("LABEL", &ds.label);
        self.attr("CREATED", &format_timestamp(&ds.created));
        self.attr("SIZE", &ds.size.to_string());
        self.push(">\n");

        match (&ds.content, ds.control_group.location_type()) {
            (DatastreamContent::Location(location), Some(location_type)) => {
                let location = match ds.control_group {
                    ControlGroup::E | ControlGroup::R => self
                        .options
                        .context
                        .outbound(location, &self.options.local_server_url),
                    _ => location.as_str().into(),
                };
                self.push(&format!("{L3}<{foxml}:contentLocation"));
                self.attr("TYPE", location_type);
                self.attr("REF", &location);
                self.push("/>\n");
            }
            (DatastreamContent::Inline(bytes), None) => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    FoxmlError::StructuralIntegrity(format!(
                        "inline content of {} is not UTF-8: {e}",
                        ds.version_id
                    ))
                })?;
                let text = if self.rewrites_inline(ds) {
                    self.options.context.outbound(text, &self.options.local_server_url)
                } else {
                    text.into()
                };
                self.push(&format!("{L3}<{foxml}:xmlContent>\n"));
                self.push(&text);
                self.push(&format!("{L3}</{foxml}:xmlContent>\n"));
            }
            _ => {
                return Err(FoxmlError::StructuralIntegrity(format!(
                    "content of {} does not match control group {}",
                    ds.version_id, ds.control_group
                )))
            }
        }

        self.push(&format!("{L3}<{foxml}:contentDigest"));
        self.attr("TYPE", ds.checksum_type.name());
        self.attr("DIGEST", DIGEST_PLACEHOLDER);
        self.push("/>\n");
        self.push(&format!("{L2}</{foxml}:datastreamVersion>\n"));
        Ok(())
    }

    fn rewrites_inline(&self, ds: &Datastream) -> bool {
        self.obj.object_type() == ObjectType::BehaviorMechanism
            && SERVICE_DATASTREAM_IDS.contains(&ds.datastream_id.as_str())
    }

    fn disseminators(&mut self) {
        let obj = self.obj;
        let foxml = ns::FOXML_PREFIX;
        for did in obj.disseminator_ids() {
            let versions = obj.disseminator_versions(did);
            let Some(first) = versions.first() else {
                continue;
            };
            self.push(&format!("{L1}<{foxml}:disseminator"));
            self.attr("ID", did);
            self.attr("BDEF_CONTRACT_PID", &first.bdef_pid);
            self.attr("STATE", first.state.code());
            self.attr("VERSIONABLE", if first.versionable { "true" } else { "false" });
            self.push(">\n");
            for diss in versions {
                self.disseminator_version(diss);
            }
            self.push(&format!("{L1}</{foxml}:disseminator>\n"));
        }
    }

    fn disseminator_version(&mut self, diss: &Disseminator) {
        let foxml = ns::FOXML_PREFIX;
        self.push(&format!("{L2}<{foxml}:disseminatorVersion"));
        self.attr("ID", &diss.version_id);
        if !diss.label.is_empty() {
            self.attr("LABEL", &diss.label);
        }
        self.attr("BMECH_SERVICE_PID", &diss.bmech_pid);
        if let Some(created) = diss.created {
            self.attr("CREATED", &format_timestamp(&created));
        }
        self.push(">\n");

        self.push(&format!("{L3}<{foxml}:serviceInputMap>\n"));
        for binding in &diss.bindings {
            self.push(&format!("{L4}<{foxml}:datastreamBinding"));
            self.attr("KEY", &binding.binding_key);
            self.attr("DATASTREAM_ID", &binding.datastream_id);
            if !binding.label.is_empty() {
                self.attr("LABEL", &binding.label);
            }
            if let Some(order) = binding.order {
                self.attr("ORDER", &order.to_string());
            }
            self.push("/>\n");
        }
        self.push(&format!("{L3}</{foxml}:serviceInputMap>\n"));
        self.push(&format!("{L2}</{foxml}:disseminatorVersion>\n"));
    }
}
