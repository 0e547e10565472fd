//! `opswatch-discord` — serenity adapter: gateway client, slash commands,
//! embed rendering and the proactive notification delivery task.

pub mod adapter;
pub mod commands;
pub mod context;
pub mod delivery;
pub mod embed;
pub mod handler;

pub use adapter::DiscordAdapter;
pub use context::NotifierContext;
