//! Error types for the feed core.

/// Malformed or contradictory pagination input.
///
/// Reported to the caller before any work is attempted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// `limit` was not a positive integer.
    #[error("the 'limit' parameter must be a positive integer (max: 100), got {0:?}")]
    InvalidLimit(String),

    /// A timestamp parameter was not Unix milliseconds.
    #[error("the '{param}' parameter must be Unix milliseconds (e.g., 1705312200000), got {value:?}")]
    InvalidTimestamp {
        param: &'static str,
        value: String,
    },

    /// A boundary ID was supplied without its paired timestamp.
    #[error("the '{id_param}' parameter requires the '{ts_param}' parameter to be provided")]
    MissingTimestamp {
        id_param: &'static str,
        ts_param: &'static str,
    },

    /// Both refresh and backward boundaries were supplied.
    #[error("cannot use both 'before_ts' and 'after_ts' parameters together")]
    ConflictingBoundaries,

    /// A synthetic batch size outside the accepted range.
    #[error("synthetic batch size must be between 1 and {max}, got {count}")]
    InvalidCount { count: usize, max: usize },
}

/// Errors produced by ledger and feed operations.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The request was rejected before touching the ledger.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// No event with the given ID exists.
    #[error("event not found: {0}")]
    NotFound(String),

    /// An append collided with an existing ID. Indicates a generation bug.
    #[error("duplicate event id: {0}")]
    DuplicateId(String),

    /// A thread panicked while holding the ledger lock.
    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl FeedError {
    /// Whether this error signals a broken internal invariant rather than
    /// bad caller input.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::DuplicateId(_) | Self::LockPoisoned)
    }
}
