//! Byte encodings for serialized objects.
//!
//! Serialization builds the document as text and transcodes it in one step.
//! Parsing detects the encoding from a byte-order mark or the XML
//! declaration, defaulting to UTF-8.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FoxmlError, FoxmlResult};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];

/// How far into a document to look for the XML declaration.
const DECLARATION_SCAN_LIMIT: usize = 256;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    #[default]
    Utf8,
    /// Big endian with a byte-order mark.
    Utf16,
    Latin1,
    Ascii,
}

impl Encoding {
    /// Name written in the XML declaration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::Utf16 => "UTF-16",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "US-ASCII",
        }
    }

    pub fn encode(&self, text: &str) -> FoxmlResult<Vec<u8>> {
        match self {
            Self::Utf8 => Ok(text.as_bytes().to_vec()),
            Self::Utf16 => {
                let mut out = Vec::with_capacity(2 + text.len() * 2);
                out.extend_from_slice(UTF16_BE_BOM);
                for unit in text.encode_utf16() {
                    out.extend_from_slice(&unit.to_be_bytes());
                }
                Ok(out)
            }
            Self::Latin1 => self.encode_single_byte(text, 0xFF),
            Self::Ascii => self.encode_single_byte(text, 0x7F),
        }
    }

    fn encode_single_byte(&self, text: &str, max: u32) -> FoxmlResult<Vec<u8>> {
        text.chars()
            .enumerate()
            .map(|(i, c)| {
                u8::try_from(c as u32)
                    .ok()
                    .filter(|b| u32::from(*b) <= max)
                    .ok_or_else(|| FoxmlError::Transcode {
                        encoding: self.name().to_string(),
                        reason: format!("character {c:?} at position {i} is unmappable"),
                    })
            })
            .collect()
    }

    pub fn decode(&self, bytes: &[u8]) -> FoxmlResult<String> {
        match self {
            Self::Utf8 => {
                let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                String::from_utf8(bytes.to_vec()).map_err(|e| self.decode_error(e))
            }
            Self::Utf16 => {
                let (body, little_endian) = if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
                    (rest, false)
                } else if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
                    (rest, true)
                } else {
                    (bytes, false)
                };
                if body.len() % 2 != 0 {
                    return Err(self.decode_error("odd number of bytes"));
                }
                let units: Vec<u16> = body
                    .chunks_exact(2)
                    .map(|pair| {
                        let pair = [pair[0], pair[1]];
                        if little_endian {
                            u16::from_le_bytes(pair)
                        } else {
                            u16::from_be_bytes(pair)
                        }
                    })
                    .collect();
                String::from_utf16(&units).map_err(|e| self.decode_error(e))
            }
            Self::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Self::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(at) => Err(self.decode_error(format!("non-ASCII byte at offset {at}"))),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    fn decode_error(&self, reason: impl fmt::Display) -> FoxmlError {
        FoxmlError::Transcode {
            encoding: self.name().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Detect a document's encoding and decode it.
    ///
    /// A UTF-16 byte-order mark wins; otherwise the `encoding` pseudo
    /// attribute of the XML declaration is used, then UTF-8.
    pub fn decode_document(bytes: &[u8]) -> FoxmlResult<(Self, String)> {
        if bytes.starts_with(UTF16_BE_BOM) || bytes.starts_with(UTF16_LE_BOM) {
            return Ok((Self::Utf16, Self::Utf16.decode(bytes)?));
        }
        let encoding = match declared_encoding(bytes) {
            Some(name) => name.parse()?,
            None => Self::Utf8,
        };
        Ok((encoding, encoding.decode(bytes)?))
    }
}

/// The `encoding="..."` value of a leading XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN_LIMIT)];
    let head = String::from_utf8_lossy(head);
    let decl = head.strip_prefix("<?xml")?;
    let decl = &decl[..decl.find("?>")?];
    let after = &decl[decl.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    Some(value[..value.find(quote)?].to_string())
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = FoxmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "UTF-16" | "UTF16" => Ok(Self::Utf16),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Self::Latin1),
            "US-ASCII" | "ASCII" => Ok(Self::Ascii),
            _ => Err(FoxmlError::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = FoxmlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(e: Encoding) -> Self {
        e.name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for enc in [Encoding::Utf8, Encoding::Utf16, Encoding::Latin1, Encoding::Ascii] {
            assert_eq!(enc.name().parse::<Encoding>().unwrap(), enc);
        }
        assert_eq!("utf8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("ISO8859_1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!(matches!(
            "EBCDIC".parse::<Encoding>(),
            Err(FoxmlError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn utf16_has_bom_and_decodes() {
        let bytes = Encoding::Utf16.encode("<a>é</a>").unwrap();
        assert_eq!(&bytes[..2], UTF16_BE_BOM);
        let (enc, text) = Encoding::decode_document(&bytes).unwrap();
        assert_eq!(enc, Encoding::Utf16);
        assert_eq!(text, "<a>é</a>");
    }

    #[test]
    fn unmappable_characters_fail() {
        assert!(matches!(
            Encoding::Ascii.encode("caf\u{e9}"),
            Err(FoxmlError::Transcode { .. })
        ));
        assert!(matches!(
            Encoding::Latin1.encode("check \u{2713}"),
            Err(FoxmlError::Transcode { .. })
        ));
        assert_eq!(Encoding::Latin1.encode("caf\u{e9}").unwrap(), b"caf\xe9".to_vec());
    }

    #[test]
    fn declaration_drives_detection() {
        let doc = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<a>caf\xe9</a>";
        let (enc, text) = Encoding::decode_document(doc).unwrap();
        assert_eq!(enc, Encoding::Latin1);
        assert!(text.ends_with("<a>caf\u{e9}</a>"));

        let (enc, _) = Encoding::decode_document(b"<a/>").unwrap();
        assert_eq!(enc, Encoding::Utf8);

        assert!(Encoding::decode_document(b"<?xml version='1.0' encoding='KOI8-R'?><a/>").is_err());
    }

    #[test]
    fn invalid_utf8_is_a_transcode_error() {
        assert!(matches!(
            Encoding::Utf8.decode(&[0x3C, 0xFF, 0x3E]),
            Err(FoxmlError::Transcode { .. })
        ));
    }
}
