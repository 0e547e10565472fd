use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tracing::debug;

use crate::db::init_db;
use crate::error::Result;

/// Durable record of which `(operation, start time)` pairs have already
/// received a "starting soon" alert.
///
/// Clones share one connection behind a mutex; the only writer is the sweep
/// task, so contention is nil. Batch writes run inside a single transaction
/// — a crash mid-record leaves no partial batch to cause half-duplicated
/// notifications on retry.
#[derive(Clone)]
pub struct NotificationLedger {
    conn: Arc<Mutex<Connection>>,
}

impl NotificationLedger {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// True iff this exact `(operation_id, date_start)` pair was recorded.
    pub fn has_notified(&self, operation_id: i64, date_start: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let exists = conn.query_row(
            "SELECT EXISTS(
                 SELECT 1 FROM notified_operations
                 WHERE operation_id = ?1 AND date_start = ?2
             )",
            [operation_id, date_start],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    /// Record a batch of notified pairs, all-or-nothing.
    pub fn record(&self, entries: &[(i64, i64)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO notified_operations
                 (operation_id, date_start, notified_at)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (operation_id, date_start) in entries {
                stmt.execute(rusqlite::params![operation_id, date_start, now])?;
            }
        }
        tx.commit()?;

        debug!(count = entries.len(), "ledger: recorded notified operations");
        Ok(())
    }

    /// Operation ids whose recorded start time is still at or after `as_of`
    /// (epoch seconds). Past rows are stale and never re-matched.
    pub fn future_entries(&self, as_of: i64) -> Result<HashSet<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT operation_id FROM notified_operations WHERE date_start >= ?1",
        )?;
        let ids = stmt
            .query_map([as_of], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<HashSet<i64>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> NotificationLedger {
        NotificationLedger::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn record_then_has_notified() {
        let ledger = ledger();
        assert!(!ledger.has_notified(42, 1000).unwrap());

        ledger.record(&[(42, 1000), (43, 1000)]).unwrap();
        assert!(ledger.has_notified(42, 1000).unwrap());
        assert!(ledger.has_notified(43, 1000).unwrap());
    }

    #[test]
    fn rescheduled_start_counts_as_new_occurrence() {
        let ledger = ledger();
        ledger.record(&[(42, 1000)]).unwrap();

        assert!(ledger.has_notified(42, 1000).unwrap());
        assert!(!ledger.has_notified(42, 2000).unwrap());
    }

    #[test]
    fn re_recording_a_pair_is_idempotent() {
        let ledger = ledger();
        ledger.record(&[(42, 1000)]).unwrap();
        ledger.record(&[(42, 1000)]).unwrap();
        assert_eq!(ledger.future_entries(0).unwrap().len(), 1);
    }

    #[test]
    fn future_entries_excludes_past_rows() {
        let ledger = ledger();
        ledger.record(&[(1, 100), (2, 200), (3, 300)]).unwrap();

        let future = ledger.future_entries(200).unwrap();
        assert_eq!(future, HashSet::from([2, 3]));
    }

    #[test]
    fn empty_batch_is_a_noop() {
        let ledger = ledger();
        ledger.record(&[]).unwrap();
        assert!(ledger.future_entries(0).unwrap().is_empty());
    }
}
