use std::path::Path;

use serde::{Deserialize, Serialize};

use dor_foxml::{Encoding, ParseOptions, SerializeOptions, TranslationContext, DEFAULT_LOCAL_SERVER_URL};

use crate::error::{SdkError, SdkResult};

/// Repository settings, loadable from TOML. Missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Encoding of stored and exported documents.
    pub encoding: Encoding,
    pub storage_context: TranslationContext,
    /// Context used by `export` when the caller gives none.
    pub export_context: TranslationContext,
    /// Base URL of this server, swapped with the placeholder host.
    pub local_server_url: String,
    /// Responsibility recorded on the audit record appended to every
    /// commit. No record is appended when unset.
    pub audit_commits_as: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            storage_context: TranslationContext::StorageInternal,
            export_context: TranslationContext::ExportAbsolute,
            local_server_url: DEFAULT_LOCAL_SERVER_URL.to_string(),
            audit_commits_as: None,
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn serialize_options(&self, context: TranslationContext) -> SerializeOptions {
        SerializeOptions::new(self.encoding, context).with_local_server_url(&self.local_server_url)
    }

    pub fn parse_options(&self, context: TranslationContext) -> ParseOptions {
        ParseOptions::new(context).with_local_server_url(&self.local_server_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = RepositoryConfig::default();
        assert_eq!(c.encoding, Encoding::Utf8);
        assert_eq!(c.storage_context, TranslationContext::StorageInternal);
        assert_eq!(c.export_context, TranslationContext::ExportAbsolute);
        assert_eq!(c.local_server_url, "http://localhost:8080/");
        assert!(c.audit_commits_as.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = RepositoryConfig::from_toml_str(
            "encoding = \"ISO-8859-1\"\nexport_context = \"export-migrate\"\naudit_commits_as = \"fedoraAdmin\"\n",
        )
        .unwrap();
        assert_eq!(c.encoding, Encoding::Latin1);
        assert_eq!(c.export_context, TranslationContext::ExportMigrate);
        assert_eq!(c.storage_context, TranslationContext::StorageInternal);
        assert_eq!(c.audit_commits_as.as_deref(), Some("fedoraAdmin"));
    }

    #[test]
    fn bad_values_are_config_errors() {
        assert!(matches!(
            RepositoryConfig::from_toml_str("encoding = \"EBCDIC\""),
            Err(SdkError::Config(_))
        ));
        assert!(matches!(
            RepositoryConfig::from_toml_str("storage_context = \"sideways\""),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn toml_round_trip() {
        let c = RepositoryConfig {
            local_server_url: "https://repo.example.org/".into(),
            ..RepositoryConfig::default()
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(RepositoryConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "local_server_url = \"http://repo.test:9090/\"").unwrap();
        let c = RepositoryConfig::load(file.path()).unwrap();
        assert_eq!(c.local_server_url, "http://repo.test:9090/");
        let opts = c.serialize_options(TranslationContext::StorageInternal);
        assert_eq!(opts.local_server_url, "http://repo.test:9090/");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            RepositoryConfig::load(dir.path().join("absent.toml")),
            Err(SdkError::Io(_))
        ));
    }
}
