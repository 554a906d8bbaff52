//! Translation contexts: how repository-relative URLs are rewritten when
//! an object leaves or enters the repository.
//!
//! Stored objects refer to the local server through a placeholder host so
//! they survive a change of host name. Exports either expand the
//! placeholder to the real base URL or keep it for migration.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Host standing in for the local server in stored and migrated objects.
pub const LOCAL_SERVER_PLACEHOLDER: &str = "http://local.fedora.server/";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranslationContext {
    /// No rewriting.
    #[default]
    AsIs,
    /// Internal storage: local URLs become the placeholder.
    StorageInternal,
    /// Export for use elsewhere: the placeholder becomes the local URL.
    ExportAbsolute,
    /// Export for ingest into another repository: local URLs become the
    /// placeholder.
    ExportMigrate,
}

impl TranslationContext {
    /// Rewrite for serialization.
    pub fn outbound<'a>(&self, text: &'a str, local_server_url: &str) -> Cow<'a, str> {
        match self {
            Self::AsIs => Cow::Borrowed(text),
            Self::StorageInternal | Self::ExportMigrate => {
                replace(text, &with_slash(local_server_url), LOCAL_SERVER_PLACEHOLDER)
            }
            Self::ExportAbsolute => {
                replace(text, LOCAL_SERVER_PLACEHOLDER, &with_slash(local_server_url))
            }
        }
    }

    /// Rewrite for parsing. The inverse of [`outbound`](Self::outbound)
    /// for the contexts that store the placeholder.
    pub fn inbound<'a>(&self, text: &'a str, local_server_url: &str) -> Cow<'a, str> {
        match self {
            Self::StorageInternal | Self::ExportMigrate => {
                replace(text, LOCAL_SERVER_PLACEHOLDER, &with_slash(local_server_url))
            }
            Self::AsIs | Self::ExportAbsolute => Cow::Borrowed(text),
        }
    }
}

fn with_slash(url: &str) -> Cow<'_, str> {
    if url.is_empty() || url.ends_with('/') {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("{url}/"))
    }
}

fn replace<'a>(text: &'a str, from: &str, to: &str) -> Cow<'a, str> {
    if from.is_empty() || !text.contains(from) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.replace(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: &str = "http://repo.example.org:8080";

    #[test]
    fn storage_uses_placeholder_and_restores() {
        let url = "http://repo.example.org:8080/fedora/get/demo:1/DS1";
        let stored = TranslationContext::StorageInternal.outbound(url, LOCAL);
        assert_eq!(stored, "http://local.fedora.server/fedora/get/demo:1/DS1");
        let loaded = TranslationContext::StorageInternal.inbound(&stored, LOCAL);
        assert_eq!(loaded, url);
    }

    #[test]
    fn absolute_export_expands_placeholder() {
        let out = TranslationContext::ExportAbsolute
            .outbound("http://local.fedora.server/fedora/search", LOCAL);
        assert_eq!(out, "http://repo.example.org:8080/fedora/search");
    }

    #[test]
    fn as_is_and_unrelated_urls_untouched() {
        let url = "http://elsewhere.org/x";
        assert!(matches!(TranslationContext::AsIs.outbound(url, LOCAL), Cow::Borrowed(_)));
        assert!(matches!(
            TranslationContext::ExportMigrate.outbound(url, LOCAL),
            Cow::Borrowed(_)
        ));
        assert_eq!(TranslationContext::StorageInternal.outbound(url, ""), url);
    }
}
