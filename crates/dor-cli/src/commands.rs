use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use serde_json::json;
use tracing::debug;

use dor_access::{
    Clock, ObjectWriter, Relationship, RelationshipChange, RelationshipEngine, SimpleWriter,
    SystemClock, WriterOptions,
};
use dor_foxml::{Encoding, FoxmlParser, FoxmlSerializer, TranslationContext};
use dor_model::DigitalObject;
use dor_rels::RelationshipTuple;
use dor_sdk::RepositoryConfig;
use dor_types::{format_timestamp, Timestamp};

use crate::cli::*;
use crate::sink::FileCommitSink;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RepositoryConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RepositoryConfig::default(),
    };
    debug!(?config, "configuration");

    match cli.command {
        Command::Inspect(args) => cmd_inspect(args, &config, cli.format),
        Command::Validate(args) => cmd_validate(args, &config),
        Command::Export(args) => cmd_export(args, &config),
        Command::Rels(args) => match args.action {
            RelsAction::List(args) => cmd_rels_list(args, &config, cli.format),
            RelsAction::Add(args) => cmd_rels_change(args, &config, RelsMode::Add),
            RelsAction::Purge(args) => cmd_rels_change(args, &config, RelsMode::Purge),
        },
    }
}

// ---- Document loading ----

/// Read and parse a document, keeping the encoding it was written in.
fn load_document(
    path: &Path,
    context: TranslationContext,
    config: &RepositoryConfig,
) -> anyhow::Result<(Encoding, DigitalObject)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    parse_document(&bytes, context, config).with_context(|| format!("parsing {}", path.display()))
}

fn parse_document(
    bytes: &[u8],
    context: TranslationContext,
    config: &RepositoryConfig,
) -> anyhow::Result<(Encoding, DigitalObject)> {
    let (encoding, _) = Encoding::decode_document(bytes)?;
    let object = FoxmlParser::parse(bytes, &config.parse_options(context))?;
    Ok((encoding, object))
}

fn fmt_date(date: Option<Timestamp>) -> String {
    date.as_ref().map(format_timestamp).unwrap_or_else(|| "-".into())
}

fn describe_object(tuple: &RelationshipTuple) -> String {
    if let Some(uri) = tuple.object_uri() {
        return format!("<{uri}>");
    }
    let value = tuple.object_literal().unwrap_or_default();
    match (tuple.literal_type(), tuple.literal_lang()) {
        (Some(datatype), _) => format!("\"{value}\"^^<{datatype}>"),
        (None, Some(lang)) => format!("\"{value}\"@{lang}"),
        (None, None) => format!("\"{value}\""),
    }
}

// ---- inspect ----

fn cmd_inspect(args: InspectArgs, config: &RepositoryConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (encoding, obj) = load_document(&args.file, args.context.into(), config)?;
    let relationships = RelationshipEngine::list(&obj, None, None)?;
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&inspect_json(&obj, encoding, &relationships))?);
        }
        OutputFormat::Text => print_inspect(&obj, encoding, &relationships),
    }
    Ok(())
}

fn inspect_json(obj: &DigitalObject, encoding: Encoding, relationships: &[RelationshipTuple]) -> serde_json::Value {
    let datastreams: Vec<_> = obj
        .datastream_ids()
        .map(|id| {
            let versions = obj.datastream_versions(id);
            let latest = versions.last();
            json!({
                "id": id,
                "control_group": latest.map(|ds| ds.control_group.to_string()),
                "state": latest.map(|ds| ds.state.to_string()),
                "mime_type": latest.map(|ds| ds.mime_type.clone()),
                "versionable": latest.map(|ds| ds.versionable),
                "versions": versions.iter().map(|ds| json!({
                    "id": ds.version_id,
                    "created": format_timestamp(&ds.created),
                    "size": ds.size,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();
    let disseminators: Vec<_> = obj
        .disseminator_ids()
        .map(|id| {
            let versions = obj.disseminator_versions(id);
            json!({
                "id": id,
                "bdef": versions.last().map(|d| d.bdef_pid.clone()),
                "bmech": versions.last().map(|d| d.bmech_pid.clone()),
                "versions": versions.iter().map(|d| d.version_id.clone()).collect::<Vec<_>>(),
            })
        })
        .collect();
    let audit: Vec<_> = obj
        .audit_records()
        .iter()
        .map(|r| json!({
            "id": r.id,
            "action": r.action,
            "component_id": r.component_id,
            "responsibility": r.responsibility,
            "date": format_timestamp(&r.date),
            "justification": r.justification,
        }))
        .collect();
    let rels: Vec<_> = relationships
        .iter()
        .map(|t| json!({
            "subject": t.subject,
            "predicate": t.predicate,
            "object": describe_object(t),
        }))
        .collect();

    json!({
        "pid": obj.pid().map(|p| p.as_str()),
        "type": obj.object_type().to_string(),
        "encoding": encoding.name(),
        "state": obj.state().map(|s| s.to_string()),
        "label": obj.label(),
        "content_model": obj.content_model_id(),
        "created": obj.create_date().as_ref().map(format_timestamp),
        "modified": obj.last_mod_date().as_ref().map(format_timestamp),
        "ext_properties": obj.ext_properties(),
        "datastreams": datastreams,
        "disseminators": disseminators,
        "audit": audit,
        "relationships": rels,
    })
}

fn print_inspect(obj: &DigitalObject, encoding: Encoding, relationships: &[RelationshipTuple]) {
    let pid = obj.pid().map(|p| p.as_str()).unwrap_or("-");
    println!("Object {} [{}] ({})", pid.yellow().bold(), obj.object_type(), encoding.name().dimmed());
    println!("  State:    {}", obj.state().map(|s| s.to_string()).unwrap_or_else(|| "-".into()));
    println!("  Label:    {}", obj.label().unwrap_or("-"));
    if let Some(cmodel) = obj.content_model_id() {
        println!("  Model:    {}", cmodel.cyan());
    }
    println!("  Created:  {}", fmt_date(obj.create_date()));
    println!("  Modified: {}", fmt_date(obj.last_mod_date()));
    for (name, value) in obj.ext_properties() {
        println!("  {} = {}", name.dimmed(), value);
    }

    println!("\nDatastreams ({})", obj.datastream_ids().count());
    for id in obj.datastream_ids() {
        let versions = obj.datastream_versions(id);
        let Some(latest) = versions.last() else { continue };
        let ids: Vec<&str> = versions.iter().map(|ds| ds.version_id.as_str()).collect();
        println!(
            "  {:<14} {} {} {:<20} {}",
            id.bold(),
            latest.control_group,
            latest.state,
            latest.mime_type,
            ids.join(", ").dimmed()
        );
    }

    let dissems: Vec<&str> = obj.disseminator_ids().collect();
    if !dissems.is_empty() {
        println!("\nDisseminators ({})", dissems.len());
        for id in dissems {
            if let Some(d) = obj.latest_disseminator(id) {
                println!("  {:<14} bdef {} bmech {} ({} bindings)", id.bold(), d.bdef_pid, d.bmech_pid, d.bindings.len());
            }
        }
    }

    let audit = obj.audit_records();
    if !audit.is_empty() {
        println!("\nAudit trail ({} records)", audit.len());
        for r in audit {
            println!(
                "  {} {} {} by {}",
                r.id.yellow(),
                format_timestamp(&r.date).dimmed(),
                r.action,
                r.responsibility
            );
        }
    }

    if !relationships.is_empty() {
        println!("\nRelationships ({})", relationships.len());
        print_relationships(relationships);
    }
}

fn print_relationships(relationships: &[RelationshipTuple]) {
    for t in relationships {
        println!("  <{}> <{}> {}", t.subject, t.predicate.cyan(), describe_object(t));
    }
}

// ---- validate ----

/// Result of re-serializing a parsed document in its own encoding.
#[derive(Debug)]
struct CanonicalCheck {
    encoding: Encoding,
    /// Byte offset of the first mismatch, if the output differs.
    first_difference: Option<usize>,
}

fn check_canonical(bytes: &[u8], config: &RepositoryConfig) -> anyhow::Result<CanonicalCheck> {
    let (encoding, object) = parse_document(bytes, TranslationContext::AsIs, config)?;
    let mut options = config.serialize_options(TranslationContext::AsIs);
    options.encoding = encoding;
    let again = FoxmlSerializer::serialize(&object, &options)?;
    Ok(CanonicalCheck {
        encoding,
        first_difference: first_difference(bytes, &again),
    })
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    a.iter()
        .zip(b)
        .position(|(x, y)| x != y)
        .or_else(|| (a.len() != b.len()).then(|| a.len().min(b.len())))
}

fn cmd_validate(args: ValidateArgs, config: &RepositoryConfig) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let check = check_canonical(&bytes, config).with_context(|| format!("parsing {}", args.file.display()))?;
    match check.first_difference {
        None => println!(
            "{} {} is valid and canonical ({})",
            "✓".green().bold(),
            args.file.display(),
            check.encoding.name()
        ),
        Some(offset) => {
            println!(
                "{} {} is valid but not canonical (first difference at byte {})",
                "!".yellow().bold(),
                args.file.display(),
                offset
            );
            if args.strict {
                anyhow::bail!("{} is not in canonical form", args.file.display());
            }
        }
    }
    Ok(())
}

// ---- export ----

fn export_document(
    bytes: &[u8],
    from: TranslationContext,
    to: TranslationContext,
    encoding: Option<Encoding>,
    config: &RepositoryConfig,
) -> anyhow::Result<Vec<u8>> {
    let object = FoxmlParser::parse(bytes, &config.parse_options(from))?;
    let mut options = config.serialize_options(to);
    if let Some(encoding) = encoding {
        options.encoding = encoding;
    }
    Ok(FoxmlSerializer::serialize(&object, &options)?)
}

fn cmd_export(args: ExportArgs, config: &RepositoryConfig) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.file).with_context(|| format!("reading {}", args.file.display()))?;
    let out = export_document(&bytes, args.from.into(), args.to.into(), args.encoding, config)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &out).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} Exported {} bytes to {}", "✓".green().bold(), out.len(), path.display());
        }
        None => {
            use std::io::Write;
            std::io::stdout().write_all(&out)?;
        }
    }
    Ok(())
}

// ---- rels ----

fn cmd_rels_list(args: RelsListArgs, config: &RepositoryConfig, format: OutputFormat) -> anyhow::Result<()> {
    let (_, obj) = load_document(&args.file, TranslationContext::AsIs, config)?;
    let found = RelationshipEngine::list(&obj, args.subject.as_deref(), args.predicate.as_deref())?;
    match format {
        OutputFormat::Json => {
            let rows: Vec<_> = found
                .iter()
                .map(|t| json!({
                    "subject": t.subject,
                    "predicate": t.predicate,
                    "object_uri": t.object_uri(),
                    "object_literal": t.object_literal(),
                    "literal_type": t.literal_type(),
                    "literal_lang": t.literal_lang(),
                }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text if found.is_empty() => println!("No relationships."),
        OutputFormat::Text => print_relationships(&found),
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RelsMode {
    Add,
    Purge,
}

/// Apply one relationship change and, if it changed anything, commit the
/// object back to disk through a writer.
fn change_relationship(
    args: &RelsChangeArgs,
    config: &RepositoryConfig,
    mode: RelsMode,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<RelationshipChange> {
    let context: TranslationContext = args.context.into();
    let (encoding, object) = load_document(&args.file, context, config)?;

    let mut options = config.serialize_options(context);
    options.encoding = encoding;
    let target = args.output.clone().unwrap_or_else(|| args.file.clone());
    let sink = FileCommitSink::new(target, Arc::clone(&clock), options);
    let writer_options = WriterOptions {
        audit_commits_as: config.audit_commits_as.clone(),
    };
    let mut writer = SimpleWriter::with_options(object, sink, clock, writer_options);

    let rel = Relationship {
        subject: args.subject.as_deref(),
        predicate: &args.predicate,
        object_uri: args.object_uri.as_deref(),
        object_literal: args.literal.as_deref(),
        literal_type: args.literal_type.as_deref(),
    };
    let change = match mode {
        RelsMode::Add => writer.add_relationship(&rel)?,
        RelsMode::Purge => writer.purge_relationship(&rel)?,
    };
    if change.is_changed() {
        writer.commit(&args.message)?;
    }
    Ok(change)
}

fn cmd_rels_change(args: RelsChangeArgs, config: &RepositoryConfig, mode: RelsMode) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    match change_relationship(&args, config, mode, clock)? {
        RelationshipChange::Changed(t) => {
            let verb = match mode {
                RelsMode::Add => "Added",
                RelsMode::Purge => "Purged",
            };
            println!("{} {} <{}> <{}> {}", "✓".green().bold(), verb, t.subject, t.predicate.cyan(), describe_object(&t));
        }
        RelationshipChange::Unchanged => println!("No change; {} left as is.", args.file.display()),
    }
    Ok(())
}
