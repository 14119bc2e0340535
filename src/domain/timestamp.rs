use chrono::{DateTime, SecondsFormat, Utc};

/// Storage form of an instant: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_instant_is_utc_millis() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(format_instant(&instant), "2024-01-15T12:00:00.000Z");
    }

    #[test]
    fn test_parse_instant_round_trip() {
        let instant = Utc.with_ymd_and_hms(2023, 12, 28, 8, 30, 5).unwrap();
        assert_eq!(parse_instant(&format_instant(&instant)), Some(instant));
        assert!(parse_instant("yesterday").is_none());
    }
}
