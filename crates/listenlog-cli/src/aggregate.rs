//! Aggregation over stored listening events
//!
//! Stored local timestamps carry whatever offset was written at import time.
//! They are re-read as absolute instants and converted through the zone
//! database again, so a change of civil zone or DST rules is reflected here
//! without re-importing.
//!
//! Minute totals are summed from integer milliseconds and converted at the
//! end, which keeps equal totals exactly equal for tie-breaking. Sums
//! saturate at `i64::MAX` instead of overflowing.

use crate::error::Result;
use crate::models::EventProjection;
use crate::store::SqliteStore;
use crate::timestamp::{parse_iso8601, ParsedTimestamp};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

const MS_PER_MINUTE: f64 = 60_000.0;

/// One event with its derived calendar fields
#[derive(Debug, Clone, PartialEq)]
pub struct ListenRow {
    pub local: DateTime<Tz>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub ms_played: i64,
    pub minutes: f64,
    pub hour: u32,
    pub weekday: Weekday,
    /// `YYYY-MM`
    pub month: String,
    pub date: NaiveDate,
    pub platform: Option<String>,
    pub content_type: Option<String>,
}

/// Derives [`ListenRow`]s in a civil zone
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    zone: Tz,
}

impl Aggregator {
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Load every stored event and derive its fields
    pub fn load(&self, store: &SqliteStore) -> Result<Vec<ListenRow>> {
        let events = store.events_for_aggregation()?;
        let rows = self.derive(&events);
        debug!(events = events.len(), rows = rows.len(), zone = %self.zone, "Loaded events for aggregation");
        Ok(rows)
    }

    /// Derive rows from projections, dropping unparseable timestamps
    pub fn derive(&self, events: &[EventProjection]) -> Vec<ListenRow> {
        events.iter().filter_map(|event| self.derive_one(event)).collect()
    }

    fn derive_one(&self, event: &EventProjection) -> Option<ListenRow> {
        let instant = match parse_iso8601(&event.played_at_local) {
            Some(ParsedTimestamp::Zoned(dt)) => dt.with_timezone(&Utc),
            Some(ParsedTimestamp::Naive(naive)) => naive.and_utc(),
            None => {
                warn!(played_at_local = %event.played_at_local, "Dropping event with unparseable timestamp");
                return None;
            },
        };
        let local = instant.with_timezone(&self.zone);

        Some(ListenRow {
            track_name: event.track_name.clone(),
            artist_name: event.artist_name.clone(),
            album_name: event.album_name.clone(),
            ms_played: event.ms_played,
            minutes: event.ms_played as f64 / MS_PER_MINUTE,
            hour: local.hour(),
            weekday: local.weekday(),
            month: local.format("%Y-%m").to_string(),
            date: local.date_naive(),
            platform: event.platform.clone(),
            content_type: event.content_type.clone(),
            local,
        })
    }
}

/// English day name, as used in report labels
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn to_minutes(ms: i64) -> f64 {
    ms as f64 / MS_PER_MINUTE
}

/// Minutes per hour of day, ascending; hours with no events are omitted
pub fn minutes_by_hour(rows: &[ListenRow]) -> Vec<(u32, f64)> {
    let mut totals: BTreeMap<u32, i64> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(row.hour).or_default();
        *total = total.saturating_add(row.ms_played);
    }
    totals.into_iter().map(|(hour, ms)| (hour, to_minutes(ms))).collect()
}

/// Minutes per weekday, Monday first; days with no events are omitted
///
/// Days follow calendar order (Monday to Sunday), not alphabetical order of
/// their names as a plain group-by on the day label would give.
pub fn minutes_by_weekday(rows: &[ListenRow]) -> Vec<(Weekday, f64)> {
    let mut totals: BTreeMap<u32, (Weekday, i64)> = BTreeMap::new();
    for row in rows {
        let (_, total) = totals
            .entry(row.weekday.num_days_from_monday())
            .or_insert((row.weekday, 0));
        *total = total.saturating_add(row.ms_played);
    }
    totals.into_values().map(|(day, ms)| (day, to_minutes(ms))).collect()
}

/// Minutes per calendar month, ascending
pub fn minutes_by_month(rows: &[ListenRow]) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, i64> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(row.month.as_str()).or_default();
        *total = total.saturating_add(row.ms_played);
    }
    totals
        .into_iter()
        .map(|(month, ms)| (month.to_string(), to_minutes(ms)))
        .collect()
}

/// The `n` artists with the most minutes
///
/// Rows without an artist are ignored. Artists with equal totals keep the
/// order in which they first appear in `rows`.
pub fn top_artists(rows: &[ListenRow], n: usize) -> Vec<(String, f64)> {
    let mut order: Vec<(&str, i64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for row in rows {
        let Some(artist) = row.artist_name.as_deref() else {
            continue;
        };
        match index.get(artist) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(row.ms_played),
            None => {
                index.insert(artist, order.len());
                order.push((artist, row.ms_played));
            },
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
        .into_iter()
        .take(n)
        .map(|(artist, ms)| (artist.to_string(), to_minutes(ms)))
        .collect()
}

/// Sum of all minutes played
pub fn total_minutes(rows: &[ListenRow]) -> f64 {
    to_minutes(rows.iter().fold(0i64, |acc, r| acc.saturating_add(r.ms_played)))
}

/// Number of distinct local calendar dates with at least one event
pub fn distinct_days(rows: &[ListenRow]) -> usize {
    rows.iter().map(|r| r.date).collect::<HashSet<_>>().len()
}

/// Everything the report renders
#[derive(Debug, Clone, PartialEq)]
pub struct ListeningReport {
    pub total_minutes: f64,
    pub distinct_days: usize,
    pub average_minutes_per_day: f64,
    pub by_hour: Vec<(u32, f64)>,
    pub by_weekday: Vec<(Weekday, f64)>,
    pub by_month: Vec<(String, f64)>,
    pub top_artists: Vec<(String, f64)>,
}

impl ListeningReport {
    pub fn from_rows(rows: &[ListenRow], top_n: usize) -> Self {
        let total = total_minutes(rows);
        let days = distinct_days(rows);
        let average = if days == 0 { 0.0 } else { total / days as f64 };

        Self {
            total_minutes: total,
            distinct_days: days,
            average_minutes_per_day: average,
            by_hour: minutes_by_hour(rows),
            by_weekday: minutes_by_weekday(rows),
            by_month: minutes_by_month(rows),
            top_artists: top_artists(rows, top_n),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.distinct_days == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Paris;

    fn projection(local: &str, artist: Option<&str>, ms: i64) -> EventProjection {
        EventProjection {
            played_at_local: local.to_string(),
            track_name: Some("Track".to_string()),
            artist_name: artist.map(str::to_string),
            album_name: None,
            ms_played: ms,
            platform: None,
            content_type: Some("music".to_string()),
        }
    }

    fn rows(events: &[EventProjection]) -> Vec<ListenRow> {
        Aggregator::new(Paris).derive(events)
    }

    #[test]
    fn test_derived_fields() {
        let derived = rows(&[projection("2023-05-01T10:00:00+02:00", Some("B"), 120_000)]);
        let row = &derived[0];
        assert_eq!(row.minutes, 2.0);
        assert_eq!(row.hour, 10);
        assert_eq!(row.weekday, Weekday::Mon);
        assert_eq!(row.month, "2023-05");
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2023, 5, 1).unwrap());
    }

    #[test]
    fn test_offset_is_reinterpreted_through_zone() {
        // Written with a stale winter offset; the instant is 09:00 UTC, which is 11:00 in Paris summer time
        let derived = rows(&[projection("2023-05-01T10:00:00+01:00", Some("B"), 60_000)]);
        assert_eq!(derived[0].hour, 11);

        // No offset at all means UTC
        let derived = rows(&[projection("2023-05-01T10:00:00", Some("B"), 60_000)]);
        assert_eq!(derived[0].hour, 12);
    }

    #[test]
    fn test_unparseable_timestamps_are_dropped() {
        let derived = rows(&[
            projection("garbage", Some("A"), 60_000),
            projection("2023-05-01T10:00:00+02:00", Some("B"), 60_000),
        ]);
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].artist_name.as_deref(), Some("B"));
    }

    #[test]
    fn test_minutes_by_hour_sorted_and_sparse() {
        let derived = rows(&[
            projection("2023-05-01T22:00:00+02:00", Some("A"), 60_000),
            projection("2023-05-01T08:00:00+02:00", Some("A"), 30_000),
            projection("2023-05-02T08:30:00+02:00", Some("A"), 90_000),
        ]);
        assert_eq!(minutes_by_hour(&derived), vec![(8, 2.0), (22, 1.0)]);
    }

    #[test]
    fn test_minutes_by_weekday_monday_first() {
        let derived = rows(&[
            projection("2023-05-07T10:00:00+02:00", Some("A"), 60_000), // Sunday
            projection("2023-05-03T10:00:00+02:00", Some("A"), 60_000), // Wednesday
            projection("2023-05-01T10:00:00+02:00", Some("A"), 60_000), // Monday
        ]);
        let days: Vec<_> = minutes_by_weekday(&derived).into_iter().map(|(d, _)| d).collect();
        assert_eq!(days, vec![Weekday::Mon, Weekday::Wed, Weekday::Sun]);
    }

    #[test]
    fn test_minutes_by_month() {
        let derived = rows(&[
            projection("2023-06-01T10:00:00+02:00", Some("A"), 60_000),
            projection("2023-05-31T23:30:00+02:00", Some("A"), 120_000),
        ]);
        assert_eq!(
            minutes_by_month(&derived),
            vec![("2023-05".to_string(), 2.0), ("2023-06".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_top_artists_ties_keep_first_seen_order() {
        let derived = rows(&[
            projection("2023-05-01T10:00:00+02:00", Some("Zed"), 60_000),
            projection("2023-05-01T11:00:00+02:00", Some("Alpha"), 60_000),
            projection("2023-05-01T12:00:00+02:00", None, 600_000),
            projection("2023-05-01T13:00:00+02:00", Some("Mid"), 120_000),
        ]);
        let top = top_artists(&derived, 10);
        let names: Vec<_> = top.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Zed", "Alpha"]);

        assert_eq!(top_artists(&derived, 2).len(), 2);
    }

    #[test]
    fn test_huge_durations_saturate_instead_of_overflowing() {
        let big = i64::MAX / 2 + 1;
        let derived = rows(&[
            projection("2023-05-01T10:00:00+02:00", Some("Huge"), big),
            projection("2023-05-01T10:30:00+02:00", Some("Huge"), big),
            projection("2023-05-01T11:00:00+02:00", Some("Small"), 60_000),
        ]);
        let max_minutes = to_minutes(i64::MAX);

        assert_eq!(total_minutes(&derived), max_minutes);
        assert_eq!(minutes_by_hour(&derived), vec![(10, max_minutes), (11, 1.0)]);
        assert_eq!(minutes_by_weekday(&derived), vec![(Weekday::Mon, max_minutes)]);
        assert_eq!(minutes_by_month(&derived), vec![("2023-05".to_string(), max_minutes)]);

        let top = top_artists(&derived, 10);
        assert_eq!(top, vec![("Huge".to_string(), max_minutes), ("Small".to_string(), 1.0)]);
        assert!(top.iter().all(|(_, minutes)| *minutes > 0.0));

        let report = ListeningReport::from_rows(&derived, 15);
        assert_eq!(report.total_minutes, max_minutes);
    }

    #[test]
    fn test_report_scalars() {
        let derived = rows(&[
            projection("2023-05-01T10:00:00+02:00", Some("A"), 120_000),
            projection("2023-05-01T23:59:00+02:00", Some("A"), 60_000),
            projection("2023-05-02T00:01:00+02:00", Some("B"), 60_000),
        ]);
        let report = ListeningReport::from_rows(&derived, 15);
        assert_eq!(report.total_minutes, 4.0);
        assert_eq!(report.distinct_days, 2);
        assert_eq!(report.average_minutes_per_day, 2.0);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_empty_report() {
        let report = ListeningReport::from_rows(&[], 15);
        assert!(report.is_empty());
        assert_eq!(report.average_minutes_per_day, 0.0);
        assert!(report.top_artists.is_empty());
    }
}
