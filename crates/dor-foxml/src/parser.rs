use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use dor_model::{AuditRecord, Datastream, DatastreamContent, DigitalObject, Disseminator, DsBinding};
use dor_types::names::{is_audit_datastream, ns};
use dor_types::{
    parse_timestamp, ChecksumType, ControlGroup, ObjectType, Pid, State, Timestamp,
};

use crate::charset::Encoding;
use crate::error::{FoxmlError, FoxmlResult};
use crate::options::ParseOptions;
use crate::serializer::{
    PROPERTY_CONTENT_MODEL, PROPERTY_CREATED, PROPERTY_FTYPE, PROPERTY_LABEL, PROPERTY_MODIFIED,
    PROPERTY_STATE, SERVICE_DATASTREAM_IDS,
};

/// Indentation the serializer writes before the closing `xmlContent` tag.
const INLINE_CLOSE_INDENT: &str = "            ";

/// Reads canonical FOXML back into a [`DigitalObject`].
///
/// The audit datastream becomes the object's audit record list, and the
/// root element's namespace declarations become its namespace map, so a
/// parsed object serializes to the bytes it was read from.
pub struct FoxmlParser;

impl FoxmlParser {
    /// Parse a document in any supported encoding.
    pub fn parse(bytes: &[u8], options: &ParseOptions) -> FoxmlResult<DigitalObject> {
        let (encoding, text) = Encoding::decode_document(bytes)?;
        let obj = Self::parse_str(&text, options)?;
        debug!(
            pid = ?obj.pid().map(Pid::as_str),
            encoding = %encoding,
            datastreams = obj.datastream_ids().count(),
            audit_records = obj.audit_records().len(),
            "parsed canonical xml"
        );
        Ok(obj)
    }

    /// Parse an already decoded document.
    pub fn parse_str(text: &str, options: &ParseOptions) -> FoxmlResult<DigitalObject> {
        let mut reader = Reader::from_str(text);
        let mut builder = ObjectBuilder::new(options);

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let local = local_name(&e)?;
                    if local == "xmlContent" {
                        let span = reader.read_to_end(e.name())?;
                        let raw = text
                            .get(span.start as usize..span.end as usize)
                            .ok_or_else(|| FoxmlError::Format("xmlContent span out of range".into()))?;
                        builder.xml_content(strip_inline_framing(raw))?;
                    } else {
                        builder.open(&local, &e)?;
                    }
                }
                Event::Empty(e) => {
                    let local = local_name(&e)?;
                    if local == "xmlContent" {
                        builder.xml_content("")?;
                    } else {
                        builder.open(&local, &e)?;
                        builder.close(&local)?;
                    }
                }
                Event::End(e) => {
                    let local = std::str::from_utf8(e.local_name().as_ref())
                        .map_err(|err| FoxmlError::Format(err.to_string()))?
                        .to_string();
                    builder.close(&local)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        builder.finish()
    }
}

fn local_name(e: &BytesStart<'_>) -> FoxmlResult<String> {
    std::str::from_utf8(e.local_name().as_ref())
        .map(str::to_string)
        .map_err(|err| FoxmlError::Format(err.to_string()))
}

/// Undo the framing the serializer puts around inline content: one newline
/// after the opening tag and the indentation before the closing tag.
fn strip_inline_framing(raw: &str) -> &str {
    let raw = raw.strip_prefix('\n').unwrap_or(raw);
    raw.strip_suffix(INLINE_CLOSE_INDENT).unwrap_or(raw)
}

/// Attributes of one element, keyed by qualified name.
struct Attrs {
    element: String,
    pairs: Vec<(String, String)>,
}

impl Attrs {
    fn read(element: &str, e: &BytesStart<'_>) -> FoxmlResult<Self> {
        let mut pairs = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|err| FoxmlError::Format(err.to_string()))?
                .to_string();
            pairs.push((key, attr.unescape_value()?.into_owned()));
        }
        Ok(Self {
            element: element.to_string(),
            pairs,
        })
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    fn require(&self, key: &str) -> FoxmlResult<&str> {
        self.get(key).ok_or_else(|| {
            FoxmlError::StructuralIntegrity(format!("<{}> is missing {key}", self.element))
        })
    }

    fn timestamp(&self, key: &str) -> FoxmlResult<Option<Timestamp>> {
        self.get(key).map(parse_timestamp).transpose().map_err(Into::into)
    }

    fn state(&self) -> FoxmlResult<State> {
        Ok(self.get("STATE").map(str::parse::<State>).transpose()?.unwrap_or_default())
    }

    fn versionable(&self) -> FoxmlResult<bool> {
        match self.get("VERSIONABLE") {
            None => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("no") => Ok(false),
            Some(v) => Err(FoxmlError::Format(format!(
                "<{}> has invalid VERSIONABLE {v:?}",
                self.element
            ))),
        }
    }

    fn number<T: std::str::FromStr>(&self, key: &str) -> FoxmlResult<Option<T>> {
        self.get(key)
            .map(|v| {
                v.parse().map_err(|_| {
                    FoxmlError::Format(format!("<{}> has non-numeric {key} {v:?}", self.element))
                })
            })
            .transpose()
    }
}

struct DatastreamHeader {
    id: String,
    state: State,
    mime_type: String,
    format_uri: Option<String>,
    control_group: ControlGroup,
    versionable: bool,
}

struct PendingVersion {
    version_id: String,
    label: String,
    created: Option<Timestamp>,
    size: u64,
    content: Option<DatastreamContent>,
    checksum_type: ChecksumType,
}

struct DisseminatorHeader {
    id: String,
    bdef_pid: String,
    state: State,
    versionable: bool,
}

struct ObjectBuilder<'o> {
    options: &'o ParseOptions,
    obj: DigitalObject,
    seen_root: bool,
    datastream: Option<DatastreamHeader>,
    version: Option<PendingVersion>,
    disseminator: Option<DisseminatorHeader>,
    diss_version: Option<Disseminator>,
}

impl<'o> ObjectBuilder<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        let mut obj = DigitalObject::new();
        obj.set_new(false);
        Self {
            options,
            obj,
            seen_root: false,
            datastream: None,
            version: None,
            disseminator: None,
            diss_version: None,
        }
    }

    fn open(&mut self, local: &str, e: &BytesStart<'_>) -> FoxmlResult<()> {
        let attrs = Attrs::read(local, e)?;
        match local {
            "digitalObject" => self.root(&attrs),
            "property" => self.property(&attrs),
            "extproperty" => {
                let name = attrs.require("NAME")?;
                let value = attrs.get("VALUE").unwrap_or_default();
                self.obj.set_ext_property(name, value);
                Ok(())
            }
            "datastream" => {
                self.datastream = Some(DatastreamHeader {
                    id: attrs.require("ID")?.to_string(),
                    state: attrs.state()?,
                    mime_type: attrs.get("MIMETYPE").unwrap_or_default().to_string(),
                    format_uri: attrs.get("FORMAT_URI").map(str::to_string),
                    control_group: attrs.require("CONTROL_GROUP")?.parse()?,
                    versionable: attrs.versionable()?,
                });
                Ok(())
            }
            "datastreamVersion" => {
                if self.datastream.is_none() {
                    return Err(FoxmlError::Format("datastreamVersion outside datastream".into()));
                }
                self.version = Some(PendingVersion {
                    version_id: attrs.require("ID")?.to_string(),
                    label: attrs.get("LABEL").unwrap_or_default().to_string(),
                    created: attrs.timestamp("CREATED")?,
                    size: attrs.number("SIZE")?.unwrap_or(0),
                    content: None,
                    checksum_type: ChecksumType::default(),
                });
                Ok(())
            }
            "contentLocation" => self.content_location(&attrs),
            "contentDigest" => {
                let audit = is_audit_datastream(&self.header()?.id);
                let version = self.version_mut()?;
                if let (false, Some(ty)) = (audit, attrs.get("TYPE")) {
                    version.checksum_type = ty.parse()?;
                }
                Ok(())
            }
            "disseminator" => {
                self.disseminator = Some(DisseminatorHeader {
                    id: attrs.require("ID")?.to_string(),
                    bdef_pid: attrs.require("BDEF_CONTRACT_PID")?.to_string(),
                    state: attrs.state()?,
                    versionable: attrs.versionable()?,
                });
                Ok(())
            }
            "disseminatorVersion" => {
                let header = self.disseminator.as_ref().ok_or_else(|| {
                    FoxmlError::Format("disseminatorVersion outside disseminator".into())
                })?;
                let mut diss = Disseminator::new(
                    header.id.clone(),
                    attrs.require("ID")?,
                    header.bdef_pid.clone(),
                    attrs.require("BMECH_SERVICE_PID")?,
                )
                .with_label(attrs.get("LABEL").unwrap_or_default());
                diss.state = header.state;
                diss.versionable = header.versionable;
                diss.created = attrs.timestamp("CREATED")?;
                self.diss_version = Some(diss);
                Ok(())
            }
            "datastreamBinding" => {
                let diss = self.diss_version.as_mut().ok_or_else(|| {
                    FoxmlError::Format("datastreamBinding outside disseminatorVersion".into())
                })?;
                let mut binding = DsBinding::new(attrs.require("KEY")?, attrs.require("DATASTREAM_ID")?)
                    .with_label(attrs.get("LABEL").unwrap_or_default());
                binding.order = attrs.number("ORDER")?;
                diss.bindings.push(binding);
                Ok(())
            }
            "objectProperties" | "serviceInputMap" => Ok(()),
            other => {
                debug!(element = other, "ignoring unknown element");
                Ok(())
            }
        }
    }

    fn root(&mut self, attrs: &Attrs) -> FoxmlResult<()> {
        for (key, value) in &attrs.pairs {
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                if value != ns::FOXML {
                    self.obj.set_namespace_prefix(value.clone(), prefix);
                }
            }
        }
        let pid = attrs
            .get("PID")
            .ok_or_else(|| FoxmlError::StructuralIntegrity("object must have a pid".into()))?;
        let pid = Pid::new(pid)?;
        self.obj.assign_pid(pid).map_err(|e| FoxmlError::Format(e.to_string()))?;
        self.seen_root = true;
        Ok(())
    }

    fn property(&mut self, attrs: &Attrs) -> FoxmlResult<()> {
        let name = attrs.require("NAME")?;
        let value = attrs.get("VALUE").unwrap_or_default();
        match name {
            PROPERTY_FTYPE => self.obj.set_object_type(ObjectType::from_ftype_value(value)?),
            PROPERTY_STATE => self.obj.set_state(value.parse()?),
            PROPERTY_LABEL => self.obj.set_label(value),
            PROPERTY_CREATED => self.obj.set_create_date(parse_timestamp(value)?),
            PROPERTY_MODIFIED => self.obj.set_last_mod_date(parse_timestamp(value)?),
            PROPERTY_CONTENT_MODEL => self.obj.set_content_model_id(value),
            other => warn!(property = other, "ignoring unknown object property"),
        }
        Ok(())
    }

    fn content_location(&mut self, attrs: &Attrs) -> FoxmlResult<()> {
        let group = self.header()?.control_group;
        let reference = attrs.require("REF")?;
        let location = match group {
            ControlGroup::E | ControlGroup::R => self
                .options
                .context
                .inbound(reference, &self.options.local_server_url)
                .into_owned(),
            _ => reference.to_string(),
        };
        self.version_mut()?.content = Some(DatastreamContent::Location(location));
        Ok(())
    }

    fn xml_content(&mut self, raw: &str) -> FoxmlResult<()> {
        let header = self
            .datastream
            .as_ref()
            .ok_or_else(|| FoxmlError::Format("xmlContent outside datastream".into()))?;
        if is_audit_datastream(&header.id) {
            for record in parse_audit_trail(raw)? {
                self.obj.append_audit_record(record);
            }
            return Ok(());
        }
        let rewrite = self.obj.object_type() == ObjectType::BehaviorMechanism
            && SERVICE_DATASTREAM_IDS.contains(&header.id.as_str());
        let content = if rewrite {
            self.options.context.inbound(raw, &self.options.local_server_url)
        } else {
            raw.into()
        };
        self.version_mut()?.content = Some(DatastreamContent::Inline(content.into_owned().into_bytes()));
        Ok(())
    }

    fn close(&mut self, local: &str) -> FoxmlResult<()> {
        match local {
            "datastreamVersion" => self.finish_version(),
            "datastream" => {
                self.datastream = None;
                Ok(())
            }
            "disseminatorVersion" => {
                if let Some(diss) = self.diss_version.take() {
                    self.obj.add_disseminator_version(diss, true);
                }
                Ok(())
            }
            "disseminator" => {
                self.disseminator = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn finish_version(&mut self) -> FoxmlResult<()> {
        let version = self
            .version
            .take()
            .ok_or_else(|| FoxmlError::Format("datastreamVersion end without start".into()))?;
        let header = self
            .datastream
            .as_ref()
            .ok_or_else(|| FoxmlError::Format("datastreamVersion outside datastream".into()))?;
        if is_audit_datastream(&header.id) {
            return Ok(());
        }
        let created = version.created.ok_or_else(|| {
            FoxmlError::StructuralIntegrity(format!("{} is missing CREATED", version.version_id))
        })?;
        let content = version.content.ok_or_else(|| {
            FoxmlError::StructuralIntegrity(format!("{} has no content", version.version_id))
        })?;
        let ds = Datastream {
            datastream_id: header.id.clone(),
            version_id: version.version_id,
            control_group: header.control_group,
            label: version.label,
            mime_type: header.mime_type.clone(),
            format_uri: header.format_uri.clone(),
            state: header.state,
            versionable: header.versionable,
            created,
            size: version.size,
            checksum_type: version.checksum_type,
            content,
        };
        self.obj.add_datastream_version(ds, true);
        Ok(())
    }

    fn header(&self) -> FoxmlResult<&DatastreamHeader> {
        self.datastream
            .as_ref()
            .ok_or_else(|| FoxmlError::Format("element outside datastream".into()))
    }

    fn version_mut(&mut self) -> FoxmlResult<&mut PendingVersion> {
        self.version
            .as_mut()
            .ok_or_else(|| FoxmlError::Format("element outside datastreamVersion".into()))
    }

    fn finish(self) -> FoxmlResult<DigitalObject> {
        if !self.seen_root {
            return Err(FoxmlError::Format("document has no digitalObject root".into()));
        }
        Ok(self.obj)
    }
}

#[derive(Default)]
struct PartialRecord {
    id: String,
    process_type: String,
    action: String,
    component_id: String,
    responsibility: String,
    date: Option<Timestamp>,
    justification: String,
}

impl PartialRecord {
    fn build(self) -> FoxmlResult<AuditRecord> {
        let date = self.date.ok_or_else(|| {
            FoxmlError::StructuralIntegrity(format!("audit record {:?} must have date", self.id))
        })?;
        Ok(AuditRecord {
            id: self.id,
            process_type: self.process_type,
            action: self.action,
            component_id: (!self.component_id.is_empty()).then_some(self.component_id),
            responsibility: self.responsibility,
            date,
            justification: self.justification,
        })
    }

    fn set(&mut self, field: &str, value: String) -> FoxmlResult<()> {
        match field {
            "action" => self.action = value,
            "componentID" => self.component_id = value,
            "responsibility" => self.responsibility = value,
            "date" => self.date = Some(parse_timestamp(&value)?),
            "justification" => self.justification = value,
            _ => {}
        }
        Ok(())
    }
}

/// Records of an `auditTrail` document, in order.
fn parse_audit_trail(raw: &str) -> FoxmlResult<Vec<AuditRecord>> {
    let mut reader = Reader::from_str(raw);
    let mut records = Vec::new();
    let mut current: Option<PartialRecord> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let local = local_name(&e)?;
                match local.as_str() {
                    "record" => {
                        let attrs = Attrs::read("record", &e)?;
                        current = Some(PartialRecord {
                            id: attrs.require("ID")?.to_string(),
                            ..PartialRecord::default()
                        });
                    }
                    "auditTrail" => {}
                    field => {
                        let text = reader.read_text(e.name())?;
                        let value = unescape(&text)
                            .map_err(|err| FoxmlError::Format(err.to_string()))?
                            .into_owned();
                        record_mut(&mut current)?.set(field, value)?;
                    }
                }
            }
            Event::Empty(e) => {
                let local = local_name(&e)?;
                if local == "process" {
                    let attrs = Attrs::read("process", &e)?;
                    record_mut(&mut current)?.process_type = attrs.require("type")?.to_string();
                } else {
                    record_mut(&mut current)?.set(&local, String::new())?;
                }
            }
            Event::End(e) if e.local_name().as_ref() == b"record" => {
                let record = current
                    .take()
                    .ok_or_else(|| FoxmlError::Format("audit record end without start".into()))?;
                records.push(record.build()?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(records)
}

fn record_mut(current: &mut Option<PartialRecord>) -> FoxmlResult<&mut PartialRecord> {
    current
        .as_mut()
        .ok_or_else(|| FoxmlError::Format("audit field outside a record".into()))
}
