use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dor_foxml::{Encoding, TranslationContext};

#[derive(Parser)]
#[command(
    name = "dor",
    about = "DOR: inspect, validate and rewrite canonical digital-object documents",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Repository settings (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// URL rewriting applied while reading or writing a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ContextArg {
    AsIs,
    Storage,
    Public,
    Migrate,
}

impl From<ContextArg> for TranslationContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::AsIs => TranslationContext::AsIs,
            ContextArg::Storage => TranslationContext::StorageInternal,
            ContextArg::Public => TranslationContext::ExportAbsolute,
            ContextArg::Migrate => TranslationContext::ExportMigrate,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize an object document
    Inspect(InspectArgs),
    /// Parse a document and check that it is in canonical form
    Validate(ValidateArgs),
    /// Re-serialize a document with another context or encoding
    Export(ExportArgs),
    /// List, add or purge RELS-EXT relationships
    Rels(RelsArgs),
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
    /// Context the document was written with
    #[arg(long, value_enum, default_value = "as-is")]
    pub context: ContextArg,
}

#[derive(Args)]
pub struct ValidateArgs {
    pub file: PathBuf,
    /// Fail when re-serializing does not reproduce the input bytes
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args)]
pub struct ExportArgs {
    pub file: PathBuf,
    /// Context the input was written with
    #[arg(long, value_enum, default_value = "as-is")]
    pub from: ContextArg,
    /// Context to write with
    #[arg(long, value_enum, default_value = "public")]
    pub to: ContextArg,
    /// Output encoding; defaults to the configured one
    #[arg(long)]
    pub encoding: Option<Encoding>,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct RelsArgs {
    #[command(subcommand)]
    pub action: RelsAction,
}

#[derive(Subcommand)]
pub enum RelsAction {
    /// Print the relationships of an object
    List(RelsListArgs),
    /// Add a relationship and commit a new RELS-EXT version
    Add(RelsChangeArgs),
    /// Remove a relationship and commit a new RELS-EXT version
    Purge(RelsChangeArgs),
}

#[derive(Args)]
pub struct RelsListArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub subject: Option<String>,
    /// Full URI or CURIE such as rel:isMemberOf
    #[arg(long)]
    pub predicate: Option<String>,
}

#[derive(Args)]
pub struct RelsChangeArgs {
    pub file: PathBuf,
    /// Full URI or CURIE such as rel:isMemberOf
    pub predicate: String,
    #[arg(long, conflicts_with = "literal", required_unless_present = "literal")]
    pub object_uri: Option<String>,
    #[arg(long)]
    pub literal: Option<String>,
    /// Datatype URI of the literal
    #[arg(long, requires = "literal")]
    pub literal_type: Option<String>,
    /// Defaults to the object's own URI
    #[arg(long)]
    pub subject: Option<String>,
    /// Log message of the commit
    #[arg(short, long, default_value = "Modified by dor rels")]
    pub message: String,
    /// Context the document was written with; also used to write it back
    #[arg(long, value_enum, default_value = "as-is")]
    pub context: ContextArg,
    /// Write here instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
