use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Operation, Visibility};

/// Filter for [`OperationSource::select_operations`].
///
/// `is_completed = false` is implied — the bot never notifies about finished
/// operations. Start bounds are inclusive and compared against the
/// minute-truncated `date_start` (see [`crate::types::truncate_to_minute`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationFilter {
    pub game_id: Option<i64>,
    pub visibility: Option<Visibility>,
    /// Inclusive lower bound on the minute-truncated start time (epoch secs).
    pub starts_at_or_after: Option<i64>,
    /// Inclusive upper bound on the minute-truncated start time (epoch secs).
    pub starts_at_or_before: Option<i64>,
}

impl OperationFilter {
    /// All not-yet-completed operations for one (game, audience) pair
    /// starting at or after `from` — the per-schedule notifier query.
    pub fn upcoming(game_id: i64, visibility: Visibility, from: i64) -> Self {
        Self {
            game_id: Some(game_id),
            visibility: Some(visibility),
            starts_at_or_after: Some(from),
            starts_at_or_before: None,
        }
    }

    /// Operations starting inside `[from, until]` — the sweep window query.
    pub fn window(game_id: i64, visibility: Visibility, from: i64, until: i64) -> Self {
        Self {
            game_id: Some(game_id),
            visibility: Some(visibility),
            starts_at_or_after: Some(from),
            starts_at_or_before: Some(until),
        }
    }
}

/// Read-only query surface over the external operations store.
///
/// Implemented by `opswatch-opserv` against MySQL; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait OperationSource: Send + Sync {
    /// Return matching operations ordered by `date_start` ascending.
    async fn select_operations(&self, filter: OperationFilter) -> Result<Vec<Operation>>;
}
