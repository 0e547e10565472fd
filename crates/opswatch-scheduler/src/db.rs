use rusqlite::Connection;

use crate::error::Result;

/// Initialise the ledger schema in `conn`.
///
/// The composite primary key is deliberate: a rescheduled operation gets a
/// new `date_start` and therefore counts as a fresh, not-yet-notified
/// occurrence.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notified_operations (
            operation_id INTEGER NOT NULL,
            date_start   INTEGER NOT NULL,   -- epoch seconds
            notified_at  TEXT    NOT NULL,   -- ISO-8601
            PRIMARY KEY (operation_id, date_start)
        ) STRICT;

        -- future_entries filters on date_start every sweep tick
        CREATE INDEX IF NOT EXISTS idx_notified_date_start
            ON notified_operations (date_start);
        ",
    )?;
    Ok(())
}
