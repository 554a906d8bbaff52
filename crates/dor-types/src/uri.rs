//! Absolute URI checks for relationship subjects, predicates, and objects.

use crate::error::TypeError;

/// Characters never allowed unescaped in a URI reference.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '<', '>', '"', '{', '}', '|', '\\', '^', '`'];

/// Validate that `value` is an absolute URI (`scheme:rest`).
///
/// The scheme must start with an ASCII letter followed by letters, digits,
/// `+`, `-` or `.`; the remainder must be non-empty and free of whitespace
/// and the characters in RFC 3986's excluded set.
pub fn validate_uri(value: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| TypeError::InvalidUri {
        value: value.to_string(),
        reason: reason.to_string(),
    };

    let (scheme, rest) = value.split_once(':').ok_or_else(|| fail("missing scheme"))?;
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return Err(fail("scheme must start with a letter")),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err(fail("scheme contains an illegal character"));
    }
    if rest.is_empty() {
        return Err(fail("empty scheme-specific part"));
    }
    if let Some(c) = value.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(fail(&format!("contains forbidden character {c:?}")));
    }
    Ok(())
}
