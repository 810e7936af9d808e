//! Unit tests for the ledger, pagination engine, and feed service.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use feed_types::{EventDraft, EventPage, EventRecord};
use proptest::prelude::*;

use crate::error::{FeedError, ValidationError};
use crate::generator::{EmptySeed, EventGenerator};
use crate::ledger::Ledger;
use crate::pagination::{canonical_cmp, window, Boundary, PageLimit, PageRequest};
use crate::service::{FeedQuery, FeedService};

const BASE_MS: i64 = 1_705_312_200_000;

fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).expect("valid millis")
}

fn draft(severity: &str) -> EventDraft {
    EventDraft {
        device_id: "DEVICE-001".to_string(),
        device_name: "Device - Main Entrance".to_string(),
        event_type: "facial_authentication".to_string(),
        severity: severity.to_string(),
        message: "test event".to_string(),
        location: "Main Entrance, Building A".to_string(),
        download_url: None,
    }
}

fn record(ms: i64, id: &str) -> EventRecord {
    EventRecord::new(id, at(ms), draft("info"))
}

fn ledger_of(records: Vec<EventRecord>) -> Ledger {
    Ledger::with_seed(&records, Utc::now()).expect("seed should load")
}

fn service_of(records: Vec<EventRecord>) -> FeedService {
    FeedService::new(ledger_of(records), TestGenerator)
}

/// `n` records one millisecond apart, newest at `BASE_MS + n - 1`.
fn spaced(n: usize) -> Vec<EventRecord> {
    (0..n)
        .map(|i| record(BASE_MS + i as i64, &format!("evt-{i:04}")))
        .collect()
}

fn ids(page: &EventPage) -> Vec<&str> {
    page.events.iter().map(|r| r.id.as_str()).collect()
}

/// Deterministic generator: every third event is critical.
struct TestGenerator;

impl EventGenerator for TestGenerator {
    fn draft(&self, sequence: u64) -> EventDraft {
        let severity = if sequence % 3 == 0 { "critical" } else { "info" };
        draft(severity)
    }
}

/// The three-record ledger used throughout the boundary tests.
fn scenario() -> FeedService {
    service_of(vec![record(90, "C"), record(100, "A"), record(100, "B")])
}

// ── canonical order ──────────────────────────────────────────────────

#[test]
fn canonical_order_breaks_timestamp_ties_by_id() {
    let page = scenario().get_latest(None).unwrap();
    assert_eq!(ids(&page), vec!["B", "A", "C"]);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

// ── boundary semantics ───────────────────────────────────────────────

#[test]
fn backward_from_first_record_keeps_same_timestamp_tail() {
    let page = scenario()
        .get_older_than(100, Some("B".to_string()))
        .unwrap();
    assert_eq!(ids(&page), vec!["A", "C"]);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[test]
fn refresh_from_last_record_returns_everything_newer() {
    let page = scenario().get_newer_than(90, Some("C".to_string())).unwrap();
    assert_eq!(ids(&page), vec!["B", "A"]);
}

#[test]
fn refresh_from_middle_record_excludes_it() {
    let page = scenario().get_newer_than(100, Some("A".to_string())).unwrap();
    assert_eq!(ids(&page), vec!["B"]);
}

#[test]
fn timestamp_only_boundaries_are_strict() {
    let feed = scenario();
    assert_eq!(ids(&feed.get_older_than(100, None).unwrap()), vec!["C"]);
    assert_eq!(ids(&feed.get_newer_than(90, None).unwrap()), vec!["B", "A"]);
    assert!(feed.get_newer_than(100, None).unwrap().events.is_empty());
}

#[test]
fn unknown_boundary_id_decays_to_timestamp_filter() {
    let feed = scenario();

    let newer = feed.get_newer_than(90, Some("missing".to_string())).unwrap();
    assert_eq!(ids(&newer), vec!["B", "A"]);

    let older = feed.get_older_than(100, Some("missing".to_string())).unwrap();
    assert_eq!(ids(&older), vec!["C"]);
}

#[test]
fn boundary_id_at_other_timestamp_decays() {
    // C sits at t=90, so it is not among the candidates for t>=100.
    let page = scenario().get_newer_than(100, Some("C".to_string())).unwrap();
    assert!(page.events.is_empty());
}

// ── page sizing ──────────────────────────────────────────────────────

#[test]
fn latest_defaults_to_twenty_with_cursor() {
    let feed = service_of(spaced(25));
    let page = feed.get_latest(None).unwrap();

    assert_eq!(page.events.len(), 20);
    assert!(page.has_more);
    let last = page.events.last().unwrap();
    assert_eq!(page.next_cursor, Some(last.cursor()));
    assert_eq!(last.id, "evt-0005");
}

#[test]
fn latest_limit_is_clamped_to_one_hundred() {
    let feed = service_of(spaced(150));
    let page = feed.get_latest(Some(500)).unwrap();
    assert_eq!(page.events.len(), 100);
    assert!(page.has_more);
}

#[test]
fn latest_rejects_non_positive_limits() {
    let feed = service_of(spaced(3));
    for limit in [0, -1] {
        let err = feed.get_latest(Some(limit)).unwrap_err();
        assert!(matches!(
            err,
            FeedError::Validation(ValidationError::InvalidLimit(_))
        ));
    }
}

#[test]
fn page_larger_than_remaining_returns_everything() {
    let feed = service_of(spaced(7));
    let page = feed.get_latest(Some(50)).unwrap();
    assert_eq!(page.events.len(), 7);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());
}

#[test]
fn cursor_pages_are_fixed_at_twenty() {
    let feed = service_of(spaced(60));
    let page = feed.get_older_than(BASE_MS + 60, None).unwrap();
    assert_eq!(page.events.len(), 20);
    assert!(page.has_more);

    let newer = feed.get_newer_than(BASE_MS - 1, None).unwrap();
    assert_eq!(newer.events.len(), 20);
    assert_eq!(newer.events[0].id, "evt-0059");
    assert!(newer.has_more);
    let cursor = newer.next_cursor.expect("full refresh page carries a cursor");
    assert_eq!(cursor.event_id, "evt-0040");
    assert_eq!(cursor.event_id, newer.events[19].id);
    assert_eq!(cursor.timestamp, BASE_MS + 40);
}

#[test]
fn exactly_one_full_page_has_no_cursor() {
    let feed = service_of(spaced(21));
    let first = feed.get_latest(Some(1)).unwrap();
    let cursor = first.next_cursor.unwrap();

    let rest = feed
        .get_older_than(cursor.timestamp, Some(cursor.event_id))
        .unwrap();
    assert_eq!(rest.events.len(), 20);
    assert!(!rest.has_more);
    assert!(rest.next_cursor.is_none());
}

#[test]
fn empty_ledger_yields_empty_pages() {
    let feed = FeedService::new(Ledger::new(), TestGenerator);
    for page in [
        feed.get_latest(None).unwrap(),
        feed.get_older_than(BASE_MS, None).unwrap(),
        feed.get_newer_than(BASE_MS, Some("x".to_string())).unwrap(),
    ] {
        assert!(page.events.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}

// ── query validation ─────────────────────────────────────────────────

fn query(pairs: &[(&str, &str)]) -> FeedQuery {
    let mut q = FeedQuery::default();
    for (key, value) in pairs {
        let value = Some(value.to_string());
        match *key {
            "limit" => q.limit = value,
            "before_ts" => q.before_ts = value,
            "before_id" => q.before_id = value,
            "after_ts" => q.after_ts = value,
            "after_id" => q.after_id = value,
            other => panic!("unknown key {other}"),
        }
    }
    q
}

#[test]
fn query_without_parameters_is_latest_twenty() {
    let request = query(&[]).parse().unwrap();
    assert_eq!(
        request,
        PageRequest::Latest {
            limit: PageLimit::default()
        }
    );
    assert_eq!(request.page_size(), 20);
}

#[test]
fn query_treats_empty_strings_as_absent() {
    let request = query(&[("limit", ""), ("before_ts", ""), ("after_id", "")])
        .parse()
        .unwrap();
    assert_eq!(request.page_size(), 20);
}

#[test]
fn query_rejects_malformed_input() {
    let cases: Vec<(Vec<(&str, &str)>, ValidationError)> = vec![
        (
            vec![("limit", "abc")],
            ValidationError::InvalidLimit("abc".to_string()),
        ),
        (
            vec![("limit", "0")],
            ValidationError::InvalidLimit("0".to_string()),
        ),
        (
            vec![("before_ts", "yesterday")],
            ValidationError::InvalidTimestamp {
                param: "before_ts",
                value: "yesterday".to_string(),
            },
        ),
        (
            vec![("before_id", "abc")],
            ValidationError::MissingTimestamp {
                id_param: "before_id",
                ts_param: "before_ts",
            },
        ),
        (
            vec![("after_id", "abc")],
            ValidationError::MissingTimestamp {
                id_param: "after_id",
                ts_param: "after_ts",
            },
        ),
        (
            vec![("before_ts", "1"), ("after_ts", "2")],
            ValidationError::ConflictingBoundaries,
        ),
    ];

    for (pairs, expected) in cases {
        assert_eq!(query(&pairs).parse().unwrap_err(), expected, "{pairs:?}");
    }
}

#[test]
fn query_ignores_limit_for_cursor_pages() {
    let request = query(&[("limit", "5"), ("after_ts", "100"), ("after_id", "B")])
        .parse()
        .unwrap();
    assert_eq!(
        request,
        PageRequest::OlderThan(Boundary::new(at(100), Some("B".to_string())))
    );
    assert_eq!(request.page_size(), 20);
}

#[test]
fn query_runs_against_the_ledger() {
    let page = scenario()
        .query(&query(&[("after_ts", "100"), ("after_id", "B")]))
        .unwrap();
    assert_eq!(ids(&page), vec!["A", "C"]);
}

// ── ledger ───────────────────────────────────────────────────────────

#[test]
fn duplicate_append_is_an_internal_error() {
    let ledger = ledger_of(vec![record(1, "dup")]);
    let err = ledger.append(record(2, "dup")).unwrap_err();
    assert!(matches!(err, FeedError::DuplicateId(ref id) if id == "dup"));
    assert!(err.is_internal());
    assert_eq!(ledger.len().unwrap(), 1);
}

#[test]
fn failed_batch_leaves_ledger_untouched() {
    let ledger = ledger_of(vec![record(1, "a")]);
    let err = ledger
        .append_batch(vec![record(2, "b"), record(3, "c"), record(4, "b")])
        .unwrap_err();
    assert!(matches!(err, FeedError::DuplicateId(_)));
    assert_eq!(ledger.len().unwrap(), 1);
    assert_eq!(ledger.newest_timestamp().unwrap(), Some(at(1)));
}

#[test]
fn seed_with_duplicates_is_rejected() {
    let err = Ledger::with_seed(&vec![record(1, "x"), record(2, "x")], Utc::now()).unwrap_err();
    assert!(matches!(err, FeedError::DuplicateId(_)));
}

#[test]
fn find_by_id_distinguishes_missing() {
    let ledger = ledger_of(vec![record(5, "known")]);
    assert_eq!(ledger.find_by_id("known").unwrap().timestamp_millis(), 5);
    assert!(matches!(
        ledger.find_by_id("nope"),
        Err(FeedError::NotFound(ref id)) if id == "nope"
    ));
    assert!(!FeedError::NotFound(String::new()).is_internal());
}

#[test]
fn newest_timestamp_tracks_maximum() {
    let ledger = Ledger::with_seed(&EmptySeed, Utc::now()).unwrap();
    assert!(ledger.is_empty().unwrap());
    assert_eq!(ledger.newest_timestamp().unwrap(), None);

    ledger.append(record(50, "a")).unwrap();
    ledger.append(record(10, "b")).unwrap();
    assert_eq!(ledger.newest_timestamp().unwrap(), Some(at(50)));
}

#[test]
fn snapshot_is_isolated_from_later_appends() {
    let ledger = ledger_of(spaced(3));
    let before = ledger.snapshot().unwrap();
    ledger.append(record(BASE_MS + 100, "late")).unwrap();

    assert_eq!(before.len(), 3);
    assert!(before.iter().all(|r| r.id != "late"));
    assert_eq!(ledger.snapshot().unwrap().len(), 4);
}

// ── feed service ─────────────────────────────────────────────────────

#[test]
fn get_by_id_reports_not_found() {
    let feed = scenario();
    assert_eq!(feed.get_by_id("A").unwrap().id, "A");
    assert!(matches!(feed.get_by_id("Z"), Err(FeedError::NotFound(_))));
}

#[test]
fn count_newer_than_is_strict_and_counts_critical() {
    let mut records = spaced(4);
    records.push(EventRecord::new("crit-1", at(BASE_MS + 10), draft("critical")));
    records.push(EventRecord::new("crit-2", at(BASE_MS + 1), draft("critical")));
    let feed = service_of(records);

    let counts = feed.count_newer_than(BASE_MS + 1).unwrap();
    assert_eq!(counts.total_count, 3);
    assert_eq!(counts.critical_count, 1);

    let none = feed.count_newer_than(BASE_MS + 10).unwrap();
    assert_eq!(none.total_count, 0);
    assert_eq!(none.critical_count, 0);
}

fn frozen_clock() -> DateTime<Utc> {
    at(BASE_MS)
}

#[test]
fn synthetic_batch_is_strictly_increasing_from_now() {
    let feed = service_of(vec![record(BASE_MS - 5_000, "old")]).with_clock(frozen_clock);
    let batch = feed.append_synthetic(5).unwrap();

    assert_eq!(batch.len(), 5);
    assert_eq!(batch[0].timestamp_millis(), BASE_MS);
    for pair in batch.windows(2) {
        assert!(pair[1].timestamp > pair[0].timestamp);
    }
    assert_eq!(feed.ledger().len().unwrap(), 6);
    assert_eq!(feed.get_latest(Some(1)).unwrap().events[0], batch[4]);
}

#[test]
fn synthetic_batch_starts_after_future_newest() {
    let feed = service_of(vec![record(BASE_MS + 60_000, "future")]).with_clock(frozen_clock);
    let batch = feed.append_synthetic(2).unwrap();
    assert_eq!(batch[0].timestamp_millis(), BASE_MS + 60_001);
    assert_eq!(batch[1].timestamp_millis(), BASE_MS + 60_002);
}

#[test]
fn consecutive_synthetic_batches_never_overlap() {
    let feed = FeedService::new(Ledger::new(), TestGenerator).with_clock(frozen_clock);
    let first = feed.append_synthetic(3).unwrap();
    let second = feed.append_synthetic(3).unwrap();
    assert!(second[0].timestamp > first[2].timestamp);
}

#[test]
fn synthetic_batch_size_is_validated() {
    let feed = FeedService::new(Ledger::new(), TestGenerator);
    for count in [0, 101] {
        assert!(matches!(
            feed.append_synthetic(count),
            Err(FeedError::Validation(ValidationError::InvalidCount { .. }))
        ));
    }
    assert!(feed.ledger().is_empty().unwrap());
}

#[test]
fn synthetic_records_use_generator_drafts() {
    let feed = FeedService::new(Ledger::new(), TestGenerator);
    let batch = feed.append_synthetic(6).unwrap();
    let critical = batch.iter().filter(|r| r.is_critical()).count();
    assert_eq!(critical, 2);
}

// ── concurrency ──────────────────────────────────────────────────────

#[test]
fn concurrent_single_appends_are_all_kept() {
    let pre_existing = spaced(10);
    let feed = Arc::new(service_of(pre_existing));

    std::thread::scope(|scope| {
        for _ in 0..50 {
            let feed = Arc::clone(&feed);
            scope.spawn(move || {
                feed.append_synthetic(1).expect("append should succeed");
            });
        }
    });

    let page = feed.get_latest(Some(100)).unwrap();
    assert_eq!(page.events.len(), 60);
    assert!(!page.has_more);

    let unique: HashSet<_> = page.events.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(unique.len(), 60);
    for pair in page.events.windows(2) {
        assert_eq!(canonical_cmp(&pair[0], &pair[1]), std::cmp::Ordering::Less);
    }
    // Synthetic events are newer than every seeded one.
    assert!(page.events[..50].iter().all(|r| !r.id.starts_with("evt-")));
}

#[test]
fn readers_never_observe_partial_batches() {
    let feed = Arc::new(FeedService::new(Ledger::new(), TestGenerator));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let feed = Arc::clone(&feed);
            scope.spawn(move || {
                for _ in 0..20 {
                    feed.append_synthetic(5).unwrap();
                }
            });
        }
        for _ in 0..4 {
            let feed = Arc::clone(&feed);
            scope.spawn(move || {
                for _ in 0..200 {
                    let snapshot = feed.ledger().snapshot().unwrap();
                    assert_eq!(snapshot.len() % 5, 0);
                }
            });
        }
    });

    assert_eq!(feed.ledger().len().unwrap(), 400);
}

// ── properties ───────────────────────────────────────────────────────

prop_compose! {
    /// Up to `max` records with unique IDs and many timestamp ties.
    fn arb_records(max: usize)(
        raw in prop::collection::vec((0i64..40, any::<u16>()), 0..max),
    ) -> Vec<EventRecord> {
        raw.into_iter()
            .enumerate()
            .map(|(i, (ts, tag))| record(BASE_MS + ts, &format!("{tag:04x}-{i}")))
            .collect()
    }
}

fn sorted(records: &[EventRecord]) -> Vec<EventRecord> {
    let mut all = records.to_vec();
    all.sort_by(canonical_cmp);
    all
}

proptest! {
    #[test]
    fn canonical_order_is_strict_and_total(records in arb_records(40)) {
        for a in &records {
            for b in &records {
                let ab = canonical_cmp(a, b);
                prop_assert_eq!(ab, canonical_cmp(b, a).reverse());
                if a.id != b.id {
                    prop_assert_ne!(ab, std::cmp::Ordering::Equal);
                }
            }
        }
        let all = sorted(&records);
        for pair in all.windows(2) {
            prop_assert_eq!(canonical_cmp(&pair[0], &pair[1]), std::cmp::Ordering::Less);
        }
    }

    #[test]
    fn boundaries_partition_the_feed(
        records in arb_records(60).prop_filter("non-empty", |r| !r.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let pivot = pick.get(&records).clone();
        let ledger = ledger_of(records.clone());
        let snapshot = ledger.snapshot().unwrap();
        let boundary = Boundary::new(pivot.timestamp, Some(pivot.id.clone()));

        let newer = window(&snapshot, &PageRequest::NewerThan(boundary.clone()));
        let older = window(&snapshot, &PageRequest::OlderThan(boundary));

        let mut rebuilt: Vec<EventRecord> = newer.into_iter().cloned().collect();
        rebuilt.push(pivot);
        rebuilt.extend(older.into_iter().cloned());

        prop_assert_eq!(rebuilt, sorted(&records));
    }

    #[test]
    fn following_cursors_replays_the_sorted_feed(records in arb_records(150)) {
        let expected = sorted(&records);
        let feed = service_of(records);

        let mut page = feed.get_latest(Some(20)).unwrap();
        let mut collected = Vec::new();
        loop {
            let has_more = page.has_more;
            prop_assert!(page.events.len() <= 20);
            if has_more {
                prop_assert_eq!(page.events.len(), 20);
            }
            collected.extend(page.events);
            let Some(cursor) = page.next_cursor else {
                prop_assert!(!has_more);
                break;
            };
            page = feed
                .get_older_than(cursor.timestamp, Some(cursor.event_id))
                .unwrap();
        }

        prop_assert_eq!(collected, expected);
    }
}
