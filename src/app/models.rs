//! Core data structures for field visit processing.
//!
//! Defines the visit and activity model produced by parser plugins,
//! the time interval arithmetic the merge engine relies on, and the
//! lifecycle states tracked for every hot-folder file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Half-open time interval [start, end) in UTC.
///
/// A zero-width interval (start == end) represents a single-instant
/// observation; merges may widen it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, normalizing reversed endpoints
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self {
                start: end,
                end: start,
            }
        } else {
            Self { start, end }
        }
    }

    /// Zero-width interval at a single instant
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self { start: at, end: at }
    }

    /// Widen the interval so it contains the given timestamp
    pub fn widen(&mut self, timestamp: DateTime<Utc>) {
        if timestamp < self.start {
            self.start = timestamp;
        }
        if timestamp > self.end {
            self.end = timestamp;
        }
    }

    /// True when the interval is a single instant
    pub fn is_instant(&self) -> bool {
        self.start == self.end
    }

    /// Strict half-open overlap test. Touching intervals (one's end
    /// equals the other's start) do not overlap. A zero-width interval
    /// overlaps any interval that contains its instant.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        match (self.is_instant(), other.is_instant()) {
            (false, false) => self.start < other.end && other.start < self.end,
            (true, false) => other.start <= self.start && self.start < other.end,
            (false, true) => self.start <= other.start && other.start < self.end,
            (true, true) => self.start == other.start,
        }
    }

    /// Day-rounded overlap test: intervals are disjoint only when one's
    /// calendar end date is strictly before the other's calendar start
    /// date. Absorbs time-of-day jitter between records on the same day.
    pub fn overlaps_whole_day(&self, other: &TimeInterval) -> bool {
        let disjoint = self.end.date_naive() < other.start.date_naive()
            || other.end.date_naive() < self.start.date_naive();
        !disjoint
    }

    /// Closed day range covering the interval, used for conflict
    /// queries against the remote store
    pub fn day_span(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let day_start = self
            .start
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let day_end = self
            .end
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .expect("end of day is always valid")
            .and_utc();
        (day_start, day_end)
    }
}

/// Resolved metadata for a monitoring location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    /// Human-assigned location identifier, e.g. "01234567"
    pub identifier: String,
    /// Server-assigned opaque unique id
    pub unique_id: String,
    /// Display name
    pub name: String,
    /// UTC offset of the location in hours
    pub utc_offset_hours: f64,
}

/// A typed child record owned by exactly one visit.
///
/// Timestamps of `None` are the "unknown" sentinel and never
/// participate in interval widening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Activity {
    DischargeMeasurement {
        period: TimeInterval,
        /// Measured discharge in the given unit
        discharge: f64,
        unit: String,
    },
    Reading {
        parameter_id: String,
        unit: String,
        value: Option<f64>,
        time: Option<DateTime<Utc>>,
    },
    Calibration {
        parameter_id: String,
        time: Option<DateTime<Utc>>,
        value: f64,
    },
    Inspection {
        time: Option<DateTime<Utc>>,
        notes: Option<String>,
    },
    CrossSectionSurvey {
        period: TimeInterval,
        channel: String,
    },
    LevelSurvey {
        time: Option<DateTime<Utc>>,
        party: Option<String>,
    },
    ControlCondition {
        time: Option<DateTime<Utc>>,
        condition: String,
    },
    GageZeroFlow {
        time: Option<DateTime<Utc>>,
        certainty: Option<f64>,
    },
}

impl Activity {
    /// Every concrete timestamp this activity contributes to its
    /// owning visit's interval
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        match self {
            Activity::DischargeMeasurement { period, .. }
            | Activity::CrossSectionSurvey { period, .. } => {
                vec![period.start, period.end]
            }
            Activity::Reading { time, .. }
            | Activity::Calibration { time, .. }
            | Activity::Inspection { time, .. }
            | Activity::LevelSurvey { time, .. }
            | Activity::ControlCondition { time, .. }
            | Activity::GageZeroFlow { time, .. } => time.iter().copied().collect(),
        }
    }

    /// Short kind label used in logs and summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Activity::DischargeMeasurement { .. } => "discharge",
            Activity::Reading { .. } => "reading",
            Activity::Calibration { .. } => "calibration",
            Activity::Inspection { .. } => "inspection",
            Activity::CrossSectionSurvey { .. } => "cross-section",
            Activity::LevelSurvey { .. } => "level-survey",
            Activity::ControlCondition { .. } => "control-condition",
            Activity::GageZeroFlow { .. } => "gage-zero-flow",
        }
    }
}

/// One field trip's consolidated observation record for a location
/// and time window. Identity for merge purposes is (location
/// identifier, window overlap); ids are assigned by the remote store
/// only after upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub location: LocationInfo,
    pub interval: TimeInterval,
    pub activities: Vec<Activity>,
    pub party: Option<String>,
}

impl Visit {
    /// Number of activities of each kind, for summary reporting
    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }
}

/// Tri-state result of offering one payload to one plugin
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Payload not recognized; the chain tries the next plugin
    CannotParse,
    /// Payload recognized and fragments were produced
    ParsedValid,
    /// Payload recognized but structurally wrong; terminal for the
    /// payload, the chain does not continue
    ParsedInvalid(String),
}

/// Metadata for a named byte blob inside a primary+attachments archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Path of the entry inside the archive
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
}

/// Lifecycle state of a tracked hot-folder file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileState {
    Discovered,
    Processing,
    Uploaded,
    PartialUpload,
    Failed,
}

/// A filesystem object tracked through the lifecycle state machine.
/// The physical path changes on every state transition.
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    pub state: FileState,
}

/// How the merge engine decides two visit windows overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapMode {
    /// Exact half-open interval comparison; touching intervals are
    /// distinct visits
    Strict,
    /// Day-rounded comparison; activity on the same calendar day
    /// joins the same visit
    WholeDay,
}

/// Aggregated counters for one processing run
#[derive(Debug, Clone, Default)]
pub struct ProcessingStats {
    /// Files whose visits all uploaded cleanly
    pub files_uploaded: usize,
    /// Files with at least one visit withheld due to conflict
    pub files_partial: usize,
    /// Files that failed parsing or uploading
    pub files_failed: usize,
    /// Files that vanished before they could be claimed
    pub files_vanished: usize,
    /// Individual visits uploaded
    pub visits_uploaded: usize,
    /// Individual visits withheld because of remote conflicts
    pub visits_skipped: usize,
    /// Total processing time in milliseconds
    pub processing_time_ms: u128,
}

impl ProcessingStats {
    /// Total files that reached a terminal state
    pub fn files_completed(&self) -> usize {
        self.files_uploaded + self.files_partial + self.files_failed
    }
}
