//! Canonical listening-history records
//!
//! These are the shapes persisted by the store, independent of which export
//! schema produced them.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content that was played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Music,
    Podcast,
}

impl ContentType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Music => "music",
            ContentType::Podcast => "podcast",
        }
    }

    /// Parse the stored representation
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "music" => Some(ContentType::Music),
            "podcast" => Some(ContentType::Podcast),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export schema variant a row was normalized from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawSource {
    /// `endTime`/`msPlayed` records from `StreamingHistory*.json`
    #[serde(rename = "streaming_history_old")]
    StreamingHistoryOld,
    /// `ts`/`ms_played` records from extended (`endsong*.json`) exports
    #[serde(rename = "streaming_history_new")]
    StreamingHistoryNew,
}

impl RawSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RawSource::StreamingHistoryOld => "streaming_history_old",
            RawSource::StreamingHistoryNew => "streaming_history_new",
        }
    }
}

impl std::fmt::Display for RawSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One playback occurrence
///
/// `ms_played` is always positive; the normalizer never builds an event
/// otherwise and the store's CHECK constraint rejects it as well.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    pub played_at_utc: DateTime<Utc>,
    /// Civil time in the configured zone, offset preserved
    pub played_at_local: DateTime<FixedOffset>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub ms_played: i64,
    pub platform: Option<String>,
    pub content_type: ContentType,
    pub raw_source: RawSource,
}

/// Provenance of one ingested file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportRecord {
    pub imported_at: DateTime<Utc>,
    pub export_root: String,
    pub file_path: String,
    /// Content fingerprint; the dedup key
    pub file_hash: String,
    pub rows_inserted: i64,
}

/// Columns the aggregator reads back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct EventProjection {
    pub played_at_local: String,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
    pub ms_played: i64,
    pub platform: Option<String>,
    pub content_type: Option<String>,
}

/// Render a timestamp as ISO-8601 text with second precision and explicit offset
pub fn to_iso_seconds<Tz: chrono::TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
}
