use thiserror::Error;

/// Errors that can occur within the notification engine.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The cron expression failed 5-field validation or parsing.
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },

    /// Underlying SQLite / rusqlite error from the ledger.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failure reported by the external operations source.
    #[error("Event source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
