//! `opswatch-scheduler` — the notification engine.
//!
//! # Overview
//!
//! Three cooperating pieces, all running on one tokio runtime:
//!
//! | Piece              | Drive                  | Behaviour                                  |
//! |--------------------|------------------------|--------------------------------------------|
//! | [`TaskSupervisor`] | one cron per entry     | posts upcoming operations on each fire     |
//! | [`SweepNotifier`]  | fixed 3-minute ticks   | reminds about operations starting ≤ 30 min |
//! | [`NotificationLedger`] | —                  | dedupes the sweep across ticks/restarts    |
//!
//! The supervisor owns one long-running task per schedule-registry entry,
//! keyed by `(game, visibility, channel)`. Tasks sleep until their cron's
//! next firing and are cancelled by aborting at that sleep point, so a
//! replace never leaves two live tasks for a key. The sweep is a single
//! interval loop, independent of any cron, that uses the SQLite-backed
//! ledger to avoid notifying the same `(operation, start time)` twice.

pub mod db;
pub mod error;
pub mod ledger;
pub mod schedule;
pub mod supervisor;
pub mod sweep;

pub use error::{Result, SchedulerError};
pub use ledger::NotificationLedger;
pub use schedule::{next_fire_delay, next_fire_in_seconds, parse, CronSchedule};
pub use supervisor::TaskSupervisor;
pub use sweep::SweepNotifier;
