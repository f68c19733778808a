use chrono::{DateTime, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer};

// Seconds are optional in ISO-8601, so minute precision is accepted too.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Parses an ISO-8601 date-time and drops its offset, keeping the wall-clock
/// fields. Values without an offset are taken as-is.
pub fn parse_naive(input: &str) -> Result<NaiveDateTime, String> {
    let value = input.trim();
    if value.is_empty() {
        return Err("timestamp is empty".to_string());
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.naive_local());
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Ok(parsed.naive_local());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }

    Err(format!("invalid date-time: {value}"))
}

/// ISO-8601 without offset; microseconds only when non-zero.
pub fn format_iso(value: &NaiveDateTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_naive(&raw).map_err(serde::de::Error::custom)
}

pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_iso(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn strips_offsets_without_shifting() {
        assert_eq!(parse_naive("2024-01-01T00:00:00Z").unwrap(), at(0, 0, 0));
        assert_eq!(parse_naive("2024-01-01T05:30:00+05:00").unwrap(), at(5, 30, 0));
        assert_eq!(parse_naive("2024-01-01 05:30:00-0300").unwrap(), at(5, 30, 0));
        assert_eq!(parse_naive("2024-01-01T00:00Z").unwrap(), at(0, 0, 0));
        assert_eq!(parse_naive("2024-01-01T07:45+02:00").unwrap(), at(7, 45, 0));
        assert_eq!(parse_naive("2024-01-01 07:45-05:00").unwrap(), at(7, 45, 0));
    }

    #[test]
    fn accepts_naive_input() {
        assert_eq!(parse_naive("2024-01-01T12:00:00").unwrap(), at(12, 0, 0));
        assert_eq!(parse_naive("2024-01-01 12:00:00").unwrap(), at(12, 0, 0));
        assert_eq!(parse_naive("2024-01-01T12:30").unwrap(), at(12, 30, 0));
        assert_eq!(parse_naive("2024-01-01 12:30").unwrap(), at(12, 30, 0));
        let fractional = parse_naive("2024-01-01T12:00:00.250").unwrap();
        assert_eq!(fractional.nanosecond(), 250_000_000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_naive("").is_err());
        assert!(parse_naive("yesterday").is_err());
        assert!(parse_naive("2024-13-01T00:00:00Z").is_err());
        assert!(parse_naive("2024-01-01T12").is_err());
    }

    #[test]
    fn formats_like_isoformat() {
        assert_eq!(format_iso(&at(8, 15, 0)), "2024-01-01T08:15:00");
        let with_micros = at(8, 15, 0) + chrono::Duration::microseconds(120);
        assert_eq!(format_iso(&with_micros), "2024-01-01T08:15:00.000120");
    }
}
