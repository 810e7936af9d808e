//! Cursor-based pagination over a ledger snapshot.
//!
//! Every page is computed in canonical order: timestamp descending, then
//! ID descending. IDs are unique, so the order is total and two requests
//! against the same snapshot always slice the same sequence.
//!
//! # Boundary convention
//!
//! A boundary is `(timestamp, optional id)`. With a timestamp alone the
//! comparison is strict: refresh keeps records with `ts > boundary`,
//! backward keeps records with `ts < boundary`. When an ID is supplied the
//! candidate set also admits records at exactly the boundary timestamp,
//! and the boundary record's position in canonical order decides which of
//! them belong to the page. If that record is not among the candidates
//! the request decays to the strict timestamp filter.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use feed_types::{EventPage, EventRecord, CURSOR_PAGE_SIZE, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

use crate::error::ValidationError;
use crate::ledger::Snapshot;

/// Canonical feed order: newest first, ties broken by ID descending.
pub fn canonical_cmp(a: &EventRecord, b: &EventRecord) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.as_bytes().cmp(a.id.as_bytes()))
}

/// Page size for the latest-events view, always within `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit(usize);

impl PageLimit {
    /// Validates a caller-supplied limit, clamping values above the maximum.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidLimit`] for zero or negative values.
    pub fn new(limit: i64) -> Result<Self, ValidationError> {
        if limit <= 0 {
            return Err(ValidationError::InvalidLimit(limit.to_string()));
        }
        // Bounded by MAX_PAGE_LIMIT, so the cast cannot truncate.
        Ok(Self(limit.min(MAX_PAGE_LIMIT) as usize))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for PageLimit {
    fn default() -> Self {
        Self(DEFAULT_PAGE_LIMIT as usize)
    }
}

/// A position in canonical order used to resume paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    pub timestamp: DateTime<Utc>,
    pub event_id: Option<String>,
}

impl Boundary {
    pub fn new(timestamp: DateTime<Utc>, event_id: Option<String>) -> Self {
        Self {
            timestamp,
            event_id,
        }
    }
}

/// Which side of a boundary a cursor request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Strictly newer than the boundary (refresh).
    Newer,
    /// Strictly older than the boundary (load more history).
    Older,
}

impl Direction {
    fn admits(self, ts: DateTime<Utc>, boundary: DateTime<Utc>, inclusive: bool) -> bool {
        match (self, inclusive) {
            (Self::Newer, false) => ts > boundary,
            (Self::Newer, true) => ts >= boundary,
            (Self::Older, false) => ts < boundary,
            (Self::Older, true) => ts <= boundary,
        }
    }
}

/// One of the three mutually exclusive pagination modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// The newest `limit` records.
    Latest { limit: PageLimit },
    /// Records newer than the boundary.
    NewerThan(Boundary),
    /// Records older than the boundary.
    OlderThan(Boundary),
}

impl PageRequest {
    /// Number of records a single page may hold.
    pub fn page_size(&self) -> usize {
        match self {
            Self::Latest { limit } => limit.get(),
            Self::NewerThan(_) | Self::OlderThan(_) => CURSOR_PAGE_SIZE,
        }
    }
}

/// Filters, orders, and refines `records` for `request`, without
/// applying the page size.
pub fn window<'a>(records: &'a Snapshot, request: &PageRequest) -> Vec<&'a EventRecord> {
    match request {
        PageRequest::Latest { .. } => {
            let mut all: Vec<&EventRecord> = records.iter().collect();
            all.sort_by(|a, b| canonical_cmp(a, b));
            all
        }
        PageRequest::NewerThan(boundary) => bounded(records, Direction::Newer, boundary),
        PageRequest::OlderThan(boundary) => bounded(records, Direction::Older, boundary),
    }
}

fn bounded<'a>(records: &'a Snapshot, direction: Direction, boundary: &Boundary) -> Vec<&'a EventRecord> {
    let inclusive = boundary.event_id.is_some();
    let mut candidates: Vec<&EventRecord> = records
        .iter()
        .filter(|r| direction.admits(r.timestamp, boundary.timestamp, inclusive))
        .collect();
    candidates.sort_by(|a, b| canonical_cmp(a, b));

    let Some(anchor_id) = boundary.event_id.as_deref() else {
        return candidates;
    };

    match candidates.iter().position(|r| r.id == anchor_id) {
        Some(pos) => match direction {
            Direction::Older => candidates.split_off(pos + 1),
            Direction::Newer => {
                candidates.truncate(pos);
                candidates
            }
        },
        None => {
            tracing::warn!(
                event_id = anchor_id,
                boundary_ms = boundary.timestamp.timestamp_millis(),
                ?direction,
                "cursor record not found, falling back to timestamp-only boundary"
            );
            candidates.retain(|r| direction.admits(r.timestamp, boundary.timestamp, false));
            candidates
        }
    }
}

/// Computes one page of `snapshot` for `request`.
///
/// `has_more` is set when the refined window holds more records than the
/// page; the continuation cursor then points at the last (oldest) record
/// returned.
pub fn paginate(snapshot: &Snapshot, request: &PageRequest) -> EventPage {
    let window = window(snapshot, request);
    let page_size = request.page_size();
    let available = window.len();
    let has_more = available > page_size;

    let events: Vec<EventRecord> = window.into_iter().take(page_size).cloned().collect();
    let next_cursor = if has_more {
        events.last().map(EventRecord::cursor)
    } else {
        None
    };

    tracing::debug!(
        available,
        returned = events.len(),
        has_more,
        "computed feed page"
    );

    EventPage {
        events,
        has_more,
        next_cursor,
    }
}
