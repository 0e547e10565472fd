//! `opswatch-opserv` — read-only Event Source over the Opserv MySQL schema.
//!
//! The bot never writes here: operations, games and users live in the
//! XenForo database and are mutated exclusively by the forum software.

pub mod db;

pub use db::OpservDb;
