use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::TypeError;

/// A UTC instant. Creation and modification dates throughout the model.
pub type Timestamp = DateTime<Utc>;

/// Wire format of every date in the canonical serialization.
pub const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a timestamp at second precision, without zone designator.
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Parse a wire timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS` with optional fractional seconds and an
/// optional trailing `Z`. Values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, TypeError> {
    let trimmed = s.trim();
    let body = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| TypeError::InvalidTimestamp(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_without_fraction_or_zone() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-01T00:00:00");
    }

    #[test]
    fn parses_plain_fractional_and_zulu() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 12, 30, 15).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T12:30:15").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-03-05T12:30:15Z").unwrap(), expected);
        let frac = parse_timestamp("2024-03-05T12:30:15.250Z").unwrap();
        assert_eq!(format_timestamp(&frac), "2024-03-05T12:30:15");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-13-01T00:00:00").is_err());
    }

    #[test]
    fn format_parse_roundtrip() {
        let ts = Utc.with_ymd_and_hms(1999, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
    }
}
