use crate::charset::Encoding;
use crate::translate::TranslationContext;

/// Base URL of the local server used when none is configured.
pub const DEFAULT_LOCAL_SERVER_URL: &str = "http://localhost:8080/";

/// Per-call serializer settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SerializeOptions {
    pub encoding: Encoding,
    pub context: TranslationContext,
    pub local_server_url: String,
}

impl SerializeOptions {
    pub fn new(encoding: Encoding, context: TranslationContext) -> Self {
        Self {
            encoding,
            context,
            local_server_url: DEFAULT_LOCAL_SERVER_URL.to_string(),
        }
    }

    pub fn with_local_server_url(mut self, url: impl Into<String>) -> Self {
        self.local_server_url = url.into();
        self
    }
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::new(Encoding::default(), TranslationContext::default())
    }
}

/// Per-call parser settings. The encoding is detected from the input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseOptions {
    pub context: TranslationContext,
    pub local_server_url: String,
}

impl ParseOptions {
    pub fn new(context: TranslationContext) -> Self {
        Self {
            context,
            local_server_url: DEFAULT_LOCAL_SERVER_URL.to_string(),
        }
    }

    pub fn with_local_server_url(mut self, url: impl Into<String>) -> Self {
        self.local_server_url = url.into();
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new(TranslationContext::default())
    }
}

impl From<&SerializeOptions> for ParseOptions {
    /// Parse options that undo the given serialization's translation.
    fn from(options: &SerializeOptions) -> Self {
        Self {
            context: options.context,
            local_server_url: options.local_server_url.clone(),
        }
    }
}
