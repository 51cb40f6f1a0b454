// Vendor timestamp conventions.
//
// Each source names a format tag; the tag picks one of the conventions below.
// A value that does not parse is "no timestamp", never an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Date pattern for split date/time exports.
const SPLIT_DATE_FORMAT: &str = "%m/%d/%Y";
/// Combined pattern when a time-of-day field is present.
const SPLIT_DATE_TIME_FORMAT: &str = "%m/%d/%Y %H:%M:%S";

/// Naive layouts tried, in order, for self-describing timestamps.
const ISO_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp convention of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// One field holding an ISO-8601 style date-time.
    SelfDescribing,
    /// Separate `MM/DD/YYYY` date and optional `HH:MM:SS` time fields.
    SplitDateTime,
    /// Source carries no usable timestamps.
    Untimed,
}

/// Format tags understood in source definitions.
const REGISTRY: &[(&str, TimestampFormat)] = &[
    ("photon", TimestampFormat::SelfDescribing),
    ("iso", TimestampFormat::SelfDescribing),
    ("hawkin", TimestampFormat::SplitDateTime),
    ("mdy", TimestampFormat::SplitDateTime),
];

impl TimestampFormat {
    /// Look up a format tag. Unknown or empty tags mean `Untimed`.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();
        REGISTRY
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, format)| *format)
            .unwrap_or(TimestampFormat::Untimed)
    }

    /// Parse a row's date (and optional time) field values.
    pub fn parse(self, date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
        match self {
            TimestampFormat::SelfDescribing => parse_self_describing(date?),
            TimestampFormat::SplitDateTime => parse_split(date?, time),
            TimestampFormat::Untimed => None,
        }
    }
}

/// Parse an ISO-8601 style string. Values with an offset are converted to
/// UTC; naive values are taken as-is.
pub fn parse_self_describing(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ISO_DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, ISO_DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a `MM/DD/YYYY` date, combined with an `HH:MM:SS` time when one is
/// present and non-blank.
pub fn parse_split(date: &str, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    match time.map(str::trim).filter(|t| !t.is_empty()) {
        Some(time) => {
            NaiveDateTime::parse_from_str(&format!("{date} {time}"), SPLIT_DATE_TIME_FORMAT).ok()
        }
        None => NaiveDate::parse_from_str(date, SPLIT_DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
    }
}

/// Render an instant the way the report carries it: `YYYY-MM-DDTHH:MM:SS`
/// with fractional seconds only when present.
pub fn format_instant(instant: &NaiveDateTime) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn registry_lookup() {
        assert_eq!(TimestampFormat::from_tag("photon"), TimestampFormat::SelfDescribing);
        assert_eq!(TimestampFormat::from_tag("Hawkin"), TimestampFormat::SplitDateTime);
        assert_eq!(TimestampFormat::from_tag(""), TimestampFormat::Untimed);
        assert_eq!(TimestampFormat::from_tag("catapult"), TimestampFormat::Untimed);
    }

    // -- Self-describing --

    #[test]
    fn self_describing_variants() {
        let expected = ymd_hms(2026, 1, 18, 9, 30, 0);
        assert_eq!(parse_self_describing("2026-01-18T09:30:00"), Some(expected));
        assert_eq!(parse_self_describing("2026-01-18 09:30:00"), Some(expected));
        assert_eq!(parse_self_describing("2026-01-18T09:30"), Some(expected));
        assert_eq!(
            parse_self_describing("2026-01-18"),
            Some(ymd_hms(2026, 1, 18, 0, 0, 0))
        );
    }

    #[test]
    fn self_describing_offset_converted_to_utc() {
        assert_eq!(
            parse_self_describing("2026-01-18T09:30:00+02:00"),
            Some(ymd_hms(2026, 1, 18, 7, 30, 0))
        );
        assert_eq!(
            parse_self_describing("2026-01-18T09:30:00Z"),
            Some(ymd_hms(2026, 1, 18, 9, 30, 0))
        );
    }

    #[test]
    fn self_describing_garbage_is_none() {
        assert_eq!(parse_self_describing(""), None);
        assert_eq!(parse_self_describing("yesterday"), None);
        assert_eq!(parse_self_describing("01/18/2026"), None);
    }

    // -- Split date/time --

    #[test]
    fn split_with_time() {
        assert_eq!(
            parse_split("01/18/2026", Some("14:05:09")),
            Some(ymd_hms(2026, 1, 18, 14, 5, 9))
        );
    }

    #[test]
    fn split_without_time_or_blank_time() {
        let midnight = ymd_hms(2026, 1, 18, 0, 0, 0);
        assert_eq!(parse_split("01/18/2026", None), Some(midnight));
        assert_eq!(parse_split("01/18/2026", Some("   ")), Some(midnight));
    }

    #[test]
    fn split_bad_values_are_none() {
        assert_eq!(parse_split("2026-01-18", None), None);
        assert_eq!(parse_split("01/18/2026", Some("2pm")), None);
        assert_eq!(parse_split("", Some("10:00:00")), None);
    }

    #[test]
    fn untimed_never_parses() {
        assert_eq!(
            TimestampFormat::Untimed.parse(Some("2026-01-18"), None),
            None
        );
    }

    #[test]
    fn instant_formatting() {
        assert_eq!(
            format_instant(&ymd_hms(2026, 1, 18, 9, 30, 0)),
            "2026-01-18T09:30:00"
        );
        let with_millis = ymd_hms(2026, 1, 18, 9, 30, 0) + chrono::Duration::milliseconds(250);
        assert_eq!(format_instant(&with_millis), "2026-01-18T09:30:00.250");
    }
}
