//! Schema detection and normalization of export records
//!
//! Two export generations exist:
//!
//! - **Legacy** (`StreamingHistory*.json`): `endTime`, `msPlayed`,
//!   `trackName`, `artistName`. End times carry no zone and are civil time.
//! - **Extended** (`endsong*.json`): `ts`, `ms_played`, `master_metadata_*`,
//!   podcast `episode_*` fields. Timestamps are ISO-8601 and UTC when no
//!   offset is written.
//!
//! The two formats disagree on what an offset-less timestamp means. Both
//! conventions are kept as observed in real exports.
//!
//! [`classify`] picks the variant from the object's keys; [`Normalizer`]
//! applies that variant's rules. Records that fit neither shape, or that fail
//! a rule, are skipped without error.

use crate::models::{CanonicalEvent, ContentType, RawSource};
use crate::timestamp::{localize, parse_iso8601, parse_permissive, ParsedTimestamp};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};

/// Shape of a raw export object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    /// `endTime` + `msPlayed`
    Legacy,
    /// `ts` + `ms_played` (or the alternate spellings)
    Extended,
    /// Anything else
    Unrecognized,
}

const EXTENDED_TIMESTAMP_KEYS: &[&str] = &["ts", "timestamp"];
const EXTENDED_MS_KEYS: &[&str] = &["ms_played", "msPlayed"];

const TRACK_KEYS: &[&str] = &["master_metadata_track_name", "trackName", "episode_name", "episode_title"];
const ARTIST_KEYS: &[&str] = &[
    "master_metadata_album_artist_name",
    "artistName",
    "episode_show_name",
    "show_name",
];
const ALBUM_KEYS: &[&str] = &["master_metadata_album_album_name", "albumName"];
const PODCAST_MARKER_KEYS: &[&str] = &["spotify_episode_uri", "episode_name", "episode_show_name"];

/// Decide which export variant an object belongs to
///
/// Legacy takes priority when an object somehow carries both key sets.
pub fn classify(obj: &Map<String, Value>) -> RecordShape {
    if obj.contains_key("endTime") && obj.contains_key("msPlayed") {
        return RecordShape::Legacy;
    }

    let has_ts = EXTENDED_TIMESTAMP_KEYS.iter().any(|k| obj.contains_key(*k));
    let has_ms = EXTENDED_MS_KEYS.iter().any(|k| obj.contains_key(*k));
    if has_ts && has_ms {
        RecordShape::Extended
    } else {
        RecordShape::Unrecognized
    }
}

/// Converts raw export objects into canonical events
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    zone: Tz,
}

impl Normalizer {
    /// Create a normalizer producing local times in `zone`
    pub fn new(zone: Tz) -> Self {
        Self { zone }
    }

    /// Civil zone used for local timestamps
    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// Normalize one decoded JSON value
    ///
    /// Returns `None` for anything that is not a playable event.
    pub fn normalize_value(&self, value: &Value) -> Option<CanonicalEvent> {
        value.as_object().and_then(|obj| self.normalize(obj))
    }

    /// Normalize one decoded JSON object
    pub fn normalize(&self, obj: &Map<String, Value>) -> Option<CanonicalEvent> {
        match classify(obj) {
            RecordShape::Legacy => self.normalize_legacy(obj),
            RecordShape::Extended => self.normalize_extended(obj),
            RecordShape::Unrecognized => None,
        }
    }

    fn normalize_legacy(&self, obj: &Map<String, Value>) -> Option<CanonicalEvent> {
        let local = match parse_permissive(obj.get("endTime")?.as_str()?)? {
            ParsedTimestamp::Naive(naive) => localize(&self.zone, naive),
            ParsedTimestamp::Zoned(dt) => dt.with_timezone(&self.zone).fixed_offset(),
        };

        let ms_played = coerce_ms(obj.get("msPlayed"));
        if ms_played <= 0 {
            return None;
        }

        Some(CanonicalEvent {
            played_at_utc: local.with_timezone(&Utc),
            played_at_local: local,
            track_name: string_field(obj, "trackName"),
            artist_name: string_field(obj, "artistName"),
            album_name: None,
            ms_played,
            platform: None,
            content_type: ContentType::Music,
            raw_source: RawSource::StreamingHistoryOld,
        })
    }

    fn normalize_extended(&self, obj: &Map<String, Value>) -> Option<CanonicalEvent> {
        let raw_ts = EXTENDED_TIMESTAMP_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_str))?;

        let utc: DateTime<Utc> = match parse_iso8601(raw_ts)? {
            ParsedTimestamp::Naive(naive) => naive.and_utc(),
            ParsedTimestamp::Zoned(dt) => dt.with_timezone(&Utc),
        };

        let ms_played = EXTENDED_MS_KEYS
            .iter()
            .map(|k| coerce_ms(obj.get(*k)))
            .find(|ms| *ms != 0)
            .unwrap_or(0);
        if ms_played <= 0 {
            return None;
        }

        let content_type = if PODCAST_MARKER_KEYS.iter().any(|k| obj.get(*k).is_some_and(is_truthy)) {
            ContentType::Podcast
        } else {
            ContentType::Music
        };

        let local: DateTime<FixedOffset> = utc.with_timezone(&self.zone).fixed_offset();

        Some(CanonicalEvent {
            played_at_utc: utc,
            played_at_local: local,
            track_name: first_text(obj, TRACK_KEYS),
            artist_name: first_text(obj, ARTIST_KEYS),
            album_name: first_text(obj, ALBUM_KEYS),
            ms_played,
            platform: string_field(obj, "platform"),
            content_type,
            raw_source: RawSource::StreamingHistoryNew,
        })
    }
}

/// Coerce a play duration to whole milliseconds
///
/// Integers pass through, floats truncate, numeric strings are parsed.
/// Anything else, including floats outside the `i64` range, counts as zero.
fn coerce_ms(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_ms))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(float_ms))
                .unwrap_or(0)
        },
        _ => 0,
    }
}

/// Truncate a float to whole milliseconds, if it fits in an `i64`
fn float_ms(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then(|| f as i64)
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// First non-empty string among `keys`
fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
