//! The event feed core: ledger, pagination engine, and feed service.
//!
//! Events live in an append-only, in-memory [`Ledger`] guarded by a
//! reader/writer lock. Every read works on a [`Snapshot`], so a page is
//! internally consistent even when appends land mid-request.
//!
//! Pages are computed in canonical order (timestamp descending, then ID
//! descending) in one of three modes:
//!
//! | Mode | Boundary | Page size |
//! |------|----------|-----------|
//! | latest | none | `limit`, default 20, max 100 |
//! | refresh | strictly newer than `(before_ts, before_id?)` | 20 |
//! | backward | strictly older than `(after_ts, after_id?)` | 20 |
//!
//! # Usage
//!
//! ```rust,ignore
//! use feed_ledger::{CatalogGenerator, DemoSeed, FeedService, Ledger};
//!
//! let ledger = Ledger::with_seed(&DemoSeed::default(), chrono::Utc::now())?;
//! let feed = FeedService::new(ledger, CatalogGenerator);
//!
//! let first = feed.get_latest(Some(20))?;
//! if let Some(cursor) = first.next_cursor {
//!     let older = feed.get_older_than(cursor.timestamp, Some(cursor.event_id))?;
//! }
//! ```

mod error;
mod generator;
mod ledger;
mod pagination;
mod service;

pub use error::{FeedError, ValidationError};
pub use generator::{
    discover_log_files, CatalogGenerator, DemoSeed, EmptySeed, EventGenerator, SeedSource,
};
pub use ledger::{Ledger, Snapshot};
pub use pagination::{
    canonical_cmp, paginate, window, Boundary, Direction, PageLimit, PageRequest,
};
pub use service::{FeedQuery, FeedService, MAX_SYNTHETIC_BATCH};

#[cfg(test)]
mod tests;
