//! Shared types and constants for the event feed.
//!
//! This crate provides the data model that every other crate speaks:
//! the immutable [`EventRecord`], the pagination [`Cursor`], and the page
//! and count shapes returned to clients. Wire encodings live here so they
//! stay stable no matter which crate produces them.
//!
//! Timestamps travel as Unix milliseconds. Records truncate their
//! timestamp to millisecond precision at construction so that a cursor
//! echoed back by a client compares equal to the record it came from.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Default page size for the latest-events view.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Upper bound for a caller-supplied `limit`.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Fixed page size for cursor-driven (refresh / backward) pages.
pub const CURSOR_PAGE_SIZE: usize = 20;

/// Severity label that counts towards the critical badge.
pub const SEVERITY_CRITICAL: &str = "critical";

/// Truncates an instant to whole milliseconds.
pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant.trunc_subsecs(3)
}

/// Event severity levels produced by the generators.
///
/// Records store severity as an opaque string; this enum only names the
/// values the feed itself knows how to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Returns the wire label for this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => SEVERITY_CRITICAL,
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ParseSeverityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseSeverityError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown severity label.
#[derive(Debug, Clone)]
pub struct ParseSeverityError(pub String);

impl std::fmt::Display for ParseSeverityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown severity: {}", self.0)
    }
}

impl std::error::Error for ParseSeverityError {}

/// The descriptive part of an event, before an ID and timestamp are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub device_id: String,
    pub device_name: String,
    pub event_type: String,
    pub severity: String,
    pub message: String,
    pub location: String,
    pub download_url: Option<String>,
}

/// A single device-generated event.
///
/// Records are immutable once created and never removed from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique identifier (UUID string).
    pub id: String,
    /// Identifier of the emitting device.
    pub device_id: String,
    /// Human-readable device name.
    pub device_name: String,
    /// Event type, e.g. `facial_authentication`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Severity label, e.g. `critical`.
    pub severity: String,
    /// Free-form message.
    pub message: String,
    /// When the event happened, millisecond precision.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Physical location of the device.
    pub location: String,
    /// Optional link to an attached log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl EventRecord {
    /// Builds a record from a draft, truncating `timestamp` to milliseconds.
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, draft: EventDraft) -> Self {
        Self {
            id: id.into(),
            device_id: draft.device_id,
            device_name: draft.device_name,
            event_type: draft.event_type,
            severity: draft.severity,
            message: draft.message,
            timestamp: truncate_to_millis(timestamp),
            location: draft.location,
            download_url: draft.download_url,
        }
    }

    /// Timestamp as Unix milliseconds.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }

    /// Returns the cursor identifying this record's position.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            timestamp: self.timestamp_millis(),
            event_id: self.id.clone(),
        }
    }

    /// Whether this record carries the critical severity label.
    pub fn is_critical(&self) -> bool {
        self.severity == SEVERITY_CRITICAL
    }
}

/// A resume position in canonical order: `(timestamp, event_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    /// Unix milliseconds.
    pub timestamp: i64,
    /// ID of the record at this position.
    pub event_id: String,
}

/// One page of the feed in canonical order (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventPage {
    pub events: Vec<EventRecord>,
    /// Whether more records exist beyond this page.
    #[serde(rename = "has_next")]
    pub has_more: bool,
    /// Boundary for the next backward request; present only when `has_more`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// Unread badge counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewEventsCount {
    pub total_count: usize,
    pub critical_count: usize,
}
