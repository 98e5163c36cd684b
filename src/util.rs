use serde::{Deserialize, Deserializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

/// Parse a client-supplied timestamp. Accepts RFC 3339 (a trailing `Z`
/// means UTC), a naive `YYYY-MM-DDTHH:MM:SS[.f]` datetime (assumed UTC),
/// or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(t) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(t);
    }
    let naive = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(t) = PrimitiveDateTime::parse(raw, naive) {
        return Some(t.assume_utc());
    }
    let naive_frac =
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");
    if let Ok(t) = PrimitiveDateTime::parse(raw, naive_frac) {
        return Some(t.assume_utc());
    }
    let date_only = format_description!("[year]-[month]-[day]");
    if let Ok(d) = Date::parse(raw, date_only) {
        return Some(d.midnight().assume_utc());
    }
    None
}

/// Whole seconds between two instants.
pub fn duration_seconds(start: OffsetDateTime, end: OffsetDateTime) -> i64 {
    (end - start).whole_seconds()
}

/// Seconds to hours, rounded to two decimals.
pub fn seconds_to_hours(seconds: i64) -> f64 {
    (seconds as f64 / 3600.0 * 100.0).round() / 100.0
}

/// Deserializer for patch fields that must distinguish "absent" from
/// "explicitly null": absent stays `None`, `null` becomes `Some(None)`.
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_rfc3339_with_zulu() {
        let t = parse_timestamp("2024-01-01T09:00:00Z").unwrap();
        assert_eq!(t, datetime!(2024-01-01 09:00:00 UTC));
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let t = parse_timestamp("2024-01-01T09:00:00+02:00").unwrap();
        assert_eq!(t, datetime!(2024-01-01 07:00:00 UTC));
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let t = parse_timestamp("2024-01-01T09:30:15").unwrap();
        assert_eq!(t, datetime!(2024-01-01 09:30:15 UTC));
    }

    #[test]
    fn parses_naive_datetime_with_fraction() {
        let t = parse_timestamp("2024-01-01T09:30:15.5").unwrap();
        assert_eq!(t.unix_timestamp(), datetime!(2024-01-01 09:30:15 UTC).unix_timestamp());
    }

    #[test]
    fn parses_date_only_as_midnight_utc() {
        let t = parse_timestamp("2024-01-01").unwrap();
        assert_eq!(t, datetime!(2024-01-01 00:00:00 UTC));
    }

    #[test]
    fn rejects_junk() {
        assert!(parse_timestamp("not-a-date").is_none());
        assert!(parse_timestamp("2024-13-01").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn duration_is_whole_seconds() {
        let start = datetime!(2024-01-01 09:00:00 UTC);
        let end = datetime!(2024-01-01 11:30:00 UTC);
        assert_eq!(duration_seconds(start, end), 9000);
    }

    #[test]
    fn hours_round_to_two_decimals() {
        assert_eq!(seconds_to_hours(9000), 2.5);
        assert_eq!(seconds_to_hours(0), 0.0);
        assert_eq!(seconds_to_hours(3601), 1.0);
        assert_eq!(seconds_to_hours(5400), 1.5);
        // 1 hour 20 seconds -> 1.01
        assert_eq!(seconds_to_hours(3620), 1.01);
    }
}
