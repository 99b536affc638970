//! Timestamp catalog for the available wind rasters.

use chrono::{Duration, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{WindError, WindResult};

/// Label format used by the raster listing: "YYYY-MM-DD HH:MM".
pub const LABEL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Entries older than this (relative to the newest one) drop out of the display window.
pub const DEFAULT_DISPLAY_WINDOW_DAYS: i64 = 5;

/// Where the u/v components of a timestamp live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterSource {
    /// One file with band 0 = u and band 1 = v.
    Combined(String),
    /// Separate u and v files.
    Split { u: String, v: String },
}

impl RasterSource {
    /// Build from a u/v locator pair; identical locators mean a combined file.
    pub fn from_pair(u: impl Into<String>, v: impl Into<String>) -> Self {
        let u = u.into();
        let v = v.into();
        if u == v {
            RasterSource::Combined(u)
        } else {
            RasterSource::Split { u, v }
        }
    }

    /// Every locator that must be fetched, u first.
    pub fn locators(&self) -> Vec<&str> {
        match self {
            RasterSource::Combined(path) => vec![path.as_str()],
            RasterSource::Split { u, v } => vec![u.as_str(), v.as_str()],
        }
    }
}

/// One timestamp and the rasters holding its wind field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampEntry {
    label: String,
    time: NaiveDateTime,
    source: RasterSource,
}

impl TimestampEntry {
    /// Parse a "YYYY-MM-DD HH:MM" label (an ISO "T" separator is accepted too).
    pub fn parse(label: &str, source: RasterSource) -> WindResult<Self> {
        let normalized = label.trim().replacen('T', " ", 1);
        let time = NaiveDateTime::parse_from_str(&normalized, LABEL_FORMAT).map_err(|e| {
            WindError::Catalog(format!("invalid timestamp label '{}': {}", label, e))
        })?;
        Ok(Self {
            label: label.trim().to_string(),
            time,
            source,
        })
    }

    pub fn new(time: NaiveDateTime, source: RasterSource) -> Self {
        Self {
            label: time.format(LABEL_FORMAT).to_string(),
            time,
            source,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time(&self) -> NaiveDateTime {
        self.time
    }

    pub fn source(&self) -> &RasterSource {
        &self.source
    }
}

/// Raster listing returned by the scan endpoint.
#[derive(Debug, Deserialize)]
struct ScanResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    timestamps: Vec<ScanEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanEntry {
    timestamp: String,
    u_file: String,
    v_file: String,
}

/// Ascending sequence of timestamp entries.
///
/// Labels are wall-clock times in the catalog's UTC offset, which is what
/// `current()` compares against.
#[derive(Debug, Clone)]
pub struct TimeSeriesCatalog {
    entries: Vec<TimestampEntry>,
    offset: FixedOffset,
}

impl TimeSeriesCatalog {
    /// Build a catalog; entries are sorted and duplicate labels keep the first.
    pub fn new(mut entries: Vec<TimestampEntry>) -> Self {
        entries.sort_by_key(|e| e.time);
        entries.dedup_by(|b, a| a.label == b.label);
        Self {
            entries,
            offset: Utc.fix(),
        }
    }

    /// Set the UTC offset that labels are expressed in.
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Parse the scan listing: `{"success": true, "timestamps": [{"timestamp", "uFile", "vFile"}]}`.
    pub fn from_scan_json(json: &str) -> WindResult<Self> {
        let response: ScanResponse = serde_json::from_str(json)?;
        if !response.success {
            return Err(WindError::Catalog(
                response
                    .message
                    .unwrap_or_else(|| "raster scan failed".to_string()),
            ));
        }

        let entries = response
            .timestamps
            .into_iter()
            .map(|e| TimestampEntry::parse(&e.timestamp, RasterSource::from_pair(e.u_file, e.v_file)))
            .collect::<WindResult<Vec<_>>>()?;

        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[TimestampEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Time between the first and last entries.
    pub fn span(&self) -> Option<Duration> {
        let first = self.entries.first()?;
        let last = self.entries.last()?;
        Some(last.time - first.time)
    }

    /// Entries to show on the time bar, using the default five-day window.
    pub fn compute_display_window(&self) -> &[TimestampEntry] {
        self.display_window(Duration::days(DEFAULT_DISPLAY_WINDOW_DAYS))
    }

    /// The full catalog when it spans less than `threshold`, otherwise the
    /// suffix within `threshold` of the newest entry.
    pub fn display_window(&self, threshold: Duration) -> &[TimestampEntry] {
        let (Some(span), Some(last)) = (self.span(), self.entries.last()) else {
            return &self.entries;
        };
        if span < threshold {
            return &self.entries;
        }

        let cutoff = last.time - threshold;
        let start = self.entries.partition_point(|e| e.time < cutoff);
        &self.entries[start..]
    }

    /// Entry with the smallest absolute distance to `t`; ties go to the earlier entry.
    pub fn nearest_to(&self, t: NaiveDateTime) -> Option<&TimestampEntry> {
        nearest_in(&self.entries, t)
    }

    /// Display-window entry nearest to the current wall clock in the catalog's offset.
    pub fn current(&self) -> Option<&TimestampEntry> {
        let now = Utc::now().with_timezone(&self.offset).naive_local();
        self.current_at(now)
    }

    /// Display-window entry nearest to `now`.
    pub fn current_at(&self, now: NaiveDateTime) -> Option<&TimestampEntry> {
        nearest_in(self.compute_display_window(), now)
    }

    pub fn find(&self, label: &str) -> Option<&TimestampEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// The entry following `label`, used to preload the next frame of an animation.
    pub fn next_after(&self, label: &str) -> Option<&TimestampEntry> {
        let idx = self.entries.iter().position(|e| e.label == label)?;
        self.entries.get(idx + 1)
    }

    /// Entries between `start` and `end` inclusive, e.g. the lifetime of a storm.
    ///
    /// An open-ended period (`end = None`) runs to the current wall clock.
    pub fn within(&self, start: NaiveDateTime, end: Option<NaiveDateTime>) -> Vec<&TimestampEntry> {
        let end = end.unwrap_or_else(|| Utc::now().with_timezone(&self.offset).naive_local());
        self.entries
            .iter()
            .filter(|e| e.time >= start && e.time <= end)
            .collect()
    }
}

fn nearest_in(entries: &[TimestampEntry], t: NaiveDateTime) -> Option<&TimestampEntry> {
    let mut best: Option<(&TimestampEntry, Duration)> = None;
    for entry in entries {
        let diff = (entry.time - t).abs();
        match best {
            Some((_, best_diff)) if diff >= best_diff => {}
            _ => best = Some((entry, diff)),
        }
    }
    best.map(|(entry, _)| entry)
}
