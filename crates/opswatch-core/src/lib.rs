//! `opswatch-core` — shared types, config and contracts for the Opswatch bot.
//!
//! Everything here is channel- and storage-agnostic: the domain model
//! ([`types::Operation`], [`types::Visibility`], [`types::NotificationKey`]),
//! the read-only event source contract ([`source::OperationSource`]) and the
//! dispatch payload handed to the Discord delivery task
//! ([`notify::NotificationDelivery`]).

pub mod config;
pub mod error;
pub mod notify;
pub mod source;
pub mod types;

pub use error::{OpswatchError, Result};
pub use types::{NotificationKey, Operation, ScheduleEntry, Visibility};
