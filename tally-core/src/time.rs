//! Timestamp parsing and export formatting.

use chrono::NaiveDateTime;

/// Format used when writing canonical files. Second resolution.
pub const EXPORT_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

const ACCEPTED_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Parse a provider timestamp such as "2024-03-01 12:30:05" or "2024/3/1 12:30".
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(EXPORT_FORMAT).to_string()
}

/// Serde adapter for canonical CSV timestamp columns.
pub mod export_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_timestamp(&s).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_formats() {
        let a = parse_timestamp("2024-03-01 08:05:09").unwrap();
        let b = parse_timestamp("2024/3/1 8:05:09").unwrap();
        assert_eq!(a, b);
        assert!(parse_timestamp("2024/3/1 08:05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_export_format_round_trip() {
        let ts = parse_timestamp("2023-12-31 23:59:58").unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2023/12/31 23:59:58");
        assert_eq!(parse_timestamp(&text), Some(ts));
    }
}
