//! Timestamp parsing for export records
//!
//! Legacy exports wrote end times in several textual shapes, so they go
//! through [`parse_permissive`]. Extended exports use ISO-8601 and go through
//! [`parse_iso8601`], which refuses anything else.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone};

/// A parsed timestamp, with or without an explicit offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTimestamp {
    /// Wall-clock value with no offset information
    Naive(NaiveDateTime),
    /// Value carrying its own UTC offset
    Zoned(DateTime<FixedOffset>),
}

const ISO_OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
    "%Y%m%dT%H%M%S%.f%z",
    "%Y%m%dT%H%M%z",
];

const ISO_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d"];

/// Hour-only shapes, parsed by padding the missing minutes
const ISO_HOUR_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%dT%H:%M", ":00"),
    ("%Y-%m-%d %H:%M", ":00"),
    ("%Y%m%dT%H%M", "00"),
];

const LOOSE_OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S %z", "%Y/%m/%d %H:%M:%S%z"];

const LOOSE_NAIVE_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
];

const LOOSE_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%d %b %Y"];

/// Parse an ISO-8601 timestamp (`T` or space separator, optional offset)
///
/// Both the extended (`2023-05-01T08:00:00`) and basic (`20230501T080000`)
/// forms are accepted, down to hour precision.
pub fn parse_iso8601(raw: &str) -> Option<ParsedTimestamp> {
    let raw = raw.trim();

    if let Some(body) = raw.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return parse_iso_naive(body).map(as_utc);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(ParsedTimestamp::Zoned(dt));
    }

    parse_offset(raw, ISO_OFFSET_FORMATS)
        .map(ParsedTimestamp::Zoned)
        .or_else(|| parse_iso_naive(raw).map(ParsedTimestamp::Naive))
}

/// Parse a timestamp in any of the textual shapes seen in legacy exports
pub fn parse_permissive(raw: &str) -> Option<ParsedTimestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(parsed) = parse_iso8601(raw) {
        return Some(parsed);
    }

    for suffix in [" UTC", " GMT", "UTC", "GMT"] {
        if let Some(body) = raw.strip_suffix(suffix) {
            return parse_any_naive(body.trim_end()).map(as_utc);
        }
    }

    parse_offset(raw, LOOSE_OFFSET_FORMATS)
        .map(ParsedTimestamp::Zoned)
        .or_else(|| parse_any_naive(raw).map(ParsedTimestamp::Naive))
}

/// Attach a civil zone to a wall-clock value
///
/// Ambiguous wall times (clocks going back) take the earlier instant. Wall
/// times skipped by a forward transition keep their wall-clock reading and
/// take the offset in force after it, so `02:30` in a one-hour gap becomes
/// `02:30+02:00` rather than being moved.
pub fn localize<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> DateTime<FixedOffset> {
    if let Some(dt) = zone.from_local_datetime(&naive).earliest() {
        return dt.fixed_offset();
    }

    let after = zone.offset_from_utc_datetime(&(naive + Duration::hours(24))).fix();
    let utc = naive - Duration::seconds(i64::from(after.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, after)
}

fn as_utc(naive: NaiveDateTime) -> ParsedTimestamp {
    ParsedTimestamp::Zoned(naive.and_utc().fixed_offset())
}

fn parse_offset(raw: &str, formats: &[&str]) -> Option<DateTime<FixedOffset>> {
    formats
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
}

fn parse_naive(raw: &str, formats: &[&str], date_formats: &[&str]) -> Option<NaiveDateTime> {
    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parse_iso_naive(raw: &str) -> Option<NaiveDateTime> {
    parse_naive(raw, ISO_NAIVE_FORMATS, ISO_DATE_FORMATS).or_else(|| {
        ISO_HOUR_FORMATS.iter().find_map(|(fmt, pad)| {
            NaiveDateTime::parse_from_str(&format!("{raw}{pad}"), fmt).ok()
        })
    })
}

fn parse_any_naive(raw: &str) -> Option<NaiveDateTime> {
    parse_iso_naive(raw)
        .or_else(|| parse_naive(raw, LOOSE_NAIVE_FORMATS, LOOSE_DATE_FORMATS))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};
    use chrono_tz::Europe::Paris;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_iso_with_z_suffix_is_utc() {
        let parsed = parse_iso8601("2023-05-01T08:00:00Z").unwrap();
        let ParsedTimestamp::Zoned(dt) = parsed else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn test_iso_with_offset() {
        let parsed = parse_iso8601("2023-05-01T10:00:00+02:00").unwrap();
        let ParsedTimestamp::Zoned(dt) = parsed else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn test_iso_without_offset_is_naive() {
        assert_eq!(
            parse_iso8601("2023-05-01T08:00:00").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 08:00:00"))
        );
        assert_eq!(
            parse_iso8601("2023-05-01T08:00:00.250").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 08:00:00") + Duration::milliseconds(250))
        );
    }

    #[test]
    fn test_iso_basic_format() {
        let expected = ParsedTimestamp::Naive(naive("2023-05-01 08:00:00"));
        assert_eq!(parse_iso8601("20230501T080000").unwrap(), expected);
        assert_eq!(parse_iso8601("20230501T0800").unwrap(), expected);
        assert_eq!(parse_iso8601("20230501T08").unwrap(), expected);
        assert_eq!(
            parse_iso8601("20230501").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 00:00:00"))
        );

        let ParsedTimestamp::Zoned(dt) = parse_iso8601("20230501T080000Z").unwrap() else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);

        let ParsedTimestamp::Zoned(dt) = parse_iso8601("20230501T100000+0200").unwrap() else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn test_iso_hour_precision() {
        let expected = ParsedTimestamp::Naive(naive("2023-05-01 08:00:00"));
        assert_eq!(parse_iso8601("2023-05-01T08").unwrap(), expected);
        assert_eq!(parse_iso8601("2023-05-01 08").unwrap(), expected);

        let ParsedTimestamp::Zoned(dt) = parse_iso8601("2023-05-01T08Z").unwrap() else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);

        assert!(parse_iso8601("2023-05-01T25").is_none());
    }

    #[test]
    fn test_iso_rejects_loose_shapes() {
        assert!(parse_iso8601("05/01/2023 10:00").is_none());
        assert!(parse_iso8601("1 May 2023 10:00").is_none());
        assert!(parse_iso8601("yesterday").is_none());
        assert!(parse_iso8601("").is_none());
    }

    #[test]
    fn test_permissive_accepts_legacy_export_shape() {
        assert_eq!(
            parse_permissive("2023-05-01 10:00").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 10:00:00"))
        );
        assert_eq!(
            parse_permissive("2023-05-01 10:00:00").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 10:00:00"))
        );
    }

    #[test]
    fn test_permissive_accepts_loose_shapes() {
        let expected = ParsedTimestamp::Naive(naive("2023-05-01 10:00:00"));
        assert_eq!(parse_permissive("2023/05/01 10:00").unwrap(), expected);
        assert_eq!(parse_permissive("05/01/2023 10:00").unwrap(), expected);
        assert_eq!(parse_permissive("1 May 2023 10:00").unwrap(), expected);
        assert_eq!(
            parse_permissive("2023-05-01").unwrap(),
            ParsedTimestamp::Naive(naive("2023-05-01 00:00:00"))
        );
    }

    #[test]
    fn test_permissive_utc_suffix() {
        let ParsedTimestamp::Zoned(dt) = parse_permissive("2023-05-01 10:00 UTC").unwrap() else {
            panic!("expected zoned timestamp");
        };
        assert_eq!(dt.offset().local_minus_utc(), 0);
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_permissive_rejects_garbage() {
        assert!(parse_permissive("not a date").is_none());
        assert!(parse_permissive("   ").is_none());
    }

    #[test]
    fn test_localize_regular_time() {
        let dt = localize(&Paris, naive("2023-05-01 10:00:00"));
        assert_eq!(dt.with_timezone(&Utc).hour(), 8);
    }

    #[test]
    fn test_localize_ambiguous_takes_earlier_instant() {
        // 2023-10-29 02:30 happens twice in Paris; the first is still CEST (+02:00)
        let dt = localize(&Paris, naive("2023-10-29 02:30:00"));
        assert_eq!(dt.offset().fix().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.with_timezone(&Utc).hour(), 0);
    }

    #[test]
    fn test_localize_gap_uses_offset_after_transition() {
        // 2023-03-26 02:30 does not exist in Paris; CEST (+02:00) applies
        let dt = localize(&Paris, naive("2023-03-26 02:30:00"));
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!((dt.hour(), dt.minute()), (2, 30));

        let utc = dt.with_timezone(&Utc);
        assert_eq!((utc.hour(), utc.minute()), (0, 30));
    }
}
