//! The feed service: the ledger and pagination engine behind the
//! operations the HTTP layer calls.
//!
//! External callers speak in millisecond integers and optional ID strings.
//! This module turns those into typed [`PageRequest`]s, runs them against
//! one snapshot, and hands back wire-ready pages.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use feed_types::{truncate_to_millis, EventPage, EventRecord, NewEventsCount};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{FeedError, ValidationError};
use crate::generator::EventGenerator;
use crate::ledger::Ledger;
use crate::pagination::{paginate, Boundary, PageLimit, PageRequest};

/// Largest batch a single `append_synthetic` call accepts.
pub const MAX_SYNTHETIC_BATCH: usize = 100;

/// Raw pagination parameters as they arrive on the query string.
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<String>,
    pub before_ts: Option<String>,
    pub before_id: Option<String>,
    pub after_ts: Option<String>,
    pub after_id: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn millis_to_instant(param: &'static str, millis: i64) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| ValidationError::InvalidTimestamp {
        param,
        value: millis.to_string(),
    })
}

fn parse_millis(param: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    let millis = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidTimestamp {
            param,
            value: raw.to_string(),
        })?;
    millis_to_instant(param, millis)
}

fn parse_boundary(
    ts_param: &'static str,
    id_param: &'static str,
    ts: Option<&str>,
    id: Option<&str>,
) -> Result<Option<Boundary>, ValidationError> {
    match (ts, id) {
        (Some(ts), id) => Ok(Some(Boundary::new(
            parse_millis(ts_param, ts)?,
            id.map(str::to_string),
        ))),
        (None, Some(_)) => Err(ValidationError::MissingTimestamp { id_param, ts_param }),
        (None, None) => Ok(None),
    }
}

impl FeedQuery {
    /// Validates the raw parameters into exactly one pagination mode.
    ///
    /// Checks run in order: `limit`, the refresh pair, the backward pair,
    /// then the mutual exclusion of the two pairs. A `limit` given next to
    /// a cursor is validated but has no effect, since cursor pages have a
    /// fixed size.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn parse(&self) -> Result<PageRequest, ValidationError> {
        let limit = present(&self.limit)
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| ValidationError::InvalidLimit(raw.to_string()))
                    .and_then(PageLimit::new)
            })
            .transpose()?;

        let newer = parse_boundary(
            "before_ts",
            "before_id",
            present(&self.before_ts),
            present(&self.before_id),
        )?;
        let older = parse_boundary(
            "after_ts",
            "after_id",
            present(&self.after_ts),
            present(&self.after_id),
        )?;

        match (newer, older) {
            (Some(_), Some(_)) => Err(ValidationError::ConflictingBoundaries),
            (Some(boundary), None) => Ok(PageRequest::NewerThan(boundary)),
            (None, Some(boundary)) => Ok(PageRequest::OlderThan(boundary)),
            (None, None) => Ok(PageRequest::Latest {
                limit: limit.unwrap_or_default(),
            }),
        }
    }
}

/// Reads and extends the event feed.
pub struct FeedService {
    ledger: Ledger,
    generator: Box<dyn EventGenerator>,
    clock: fn() -> DateTime<Utc>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for FeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedService")
            .field("ledger", &self.ledger)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl FeedService {
    pub fn new(ledger: Ledger, generator: impl EventGenerator + 'static) -> Self {
        Self {
            ledger,
            generator: Box::new(generator),
            clock: Utc::now,
            sequence: AtomicU64::new(0),
        }
    }

    /// Replaces the wall clock used to stamp synthetic events.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs one pagination request against a fresh snapshot.
    pub fn page(&self, request: &PageRequest) -> Result<EventPage, FeedError> {
        let snapshot = self.ledger.snapshot()?;
        Ok(paginate(&snapshot, request))
    }

    /// Validates raw query parameters and returns the requested page.
    pub fn query(&self, query: &FeedQuery) -> Result<EventPage, FeedError> {
        let request = query.parse()?;
        self.page(&request)
    }

    /// The newest `limit` events (default 20, clamped to 100).
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero or negative `limit`.
    pub fn get_latest(&self, limit: Option<i64>) -> Result<EventPage, FeedError> {
        let limit = limit.map(PageLimit::new).transpose()?.unwrap_or_default();
        self.page(&PageRequest::Latest { limit })
    }

    /// Up to 20 events strictly older than `(ts_ms, id)`.
    pub fn get_older_than(&self, ts_ms: i64, id: Option<String>) -> Result<EventPage, FeedError> {
        let boundary = Boundary::new(millis_to_instant("after_ts", ts_ms)?, id);
        self.page(&PageRequest::OlderThan(boundary))
    }

    /// Up to 20 events strictly newer than `(ts_ms, id)`.
    pub fn get_newer_than(&self, ts_ms: i64, id: Option<String>) -> Result<EventPage, FeedError> {
        let boundary = Boundary::new(millis_to_instant("before_ts", ts_ms)?, id);
        self.page(&PageRequest::NewerThan(boundary))
    }

    /// Looks up one event.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::NotFound`] for an unknown ID.
    pub fn get_by_id(&self, id: &str) -> Result<EventRecord, FeedError> {
        self.ledger.find_by_id(id)
    }

    /// Counts events strictly newer than `ts_ms`, and the critical ones
    /// among them.
    pub fn count_newer_than(&self, ts_ms: i64) -> Result<NewEventsCount, FeedError> {
        let since = millis_to_instant("since_ts", ts_ms)?;
        let snapshot = self.ledger.snapshot()?;
        let counts = snapshot
            .iter()
            .filter(|r| r.timestamp > since)
            .fold(NewEventsCount::default(), |mut acc, r| {
                acc.total_count += 1;
                if r.is_critical() {
                    acc.critical_count += 1;
                }
                acc
            });
        Ok(counts)
    }

    /// Generates `count` events and appends them as one atomic batch.
    ///
    /// Timestamps increase by one millisecond per event, starting at the
    /// later of "now" and one millisecond past the newest event already in
    /// the ledger.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `count` is outside
    /// `1..=MAX_SYNTHETIC_BATCH`, or [`FeedError::DuplicateId`] if a
    /// generated ID collides.
    pub fn append_synthetic(&self, count: usize) -> Result<Vec<EventRecord>, FeedError> {
        if count == 0 || count > MAX_SYNTHETIC_BATCH {
            return Err(ValidationError::InvalidCount {
                count,
                max: MAX_SYNTHETIC_BATCH,
            }
            .into());
        }

        let first_seq = self.sequence.fetch_add(count as u64, Ordering::Relaxed);
        let drafts: Vec<_> = (0..count as u64)
            .map(|i| (Uuid::new_v4().to_string(), self.generator.draft(first_seq + i)))
            .collect();
        let now = truncate_to_millis((self.clock)());

        let batch = self.ledger.append_with(|newest| {
            let start = match newest {
                Some(newest) if newest >= now => newest + Duration::milliseconds(1),
                _ => now,
            };
            drafts
                .into_iter()
                .enumerate()
                .map(|(i, (id, draft))| {
                    EventRecord::new(id, start + Duration::milliseconds(i as i64), draft)
                })
                .collect()
        })?;

        tracing::info!(count = batch.len(), "appended synthetic events");
        Ok(batch)
    }
}
