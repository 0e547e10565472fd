//! `opswatch-registry` — durable mapping from (game, visibility, channel)
//! to a cron expression.
//!
//! The registry is the source of truth for which recurring notification
//! tasks should exist. It persists as a JSON file with the nested shape
//! `game_id → visibility("0"|"1") → channel_id → cron`, string keys at
//! every level, and is rewritten wholesale (temp file + rename) after every
//! mutation.

pub mod error;
pub mod registry;

pub use error::{RegistryError, Result};
pub use registry::ScheduleRegistry;
