//! Slash commands — `/notifications`, `/notify-add`, `/notify-remove`.
//!
//! Registration happens in `ready()`; interactions are dispatched from
//! `interaction_create` in the event handler. All validation lives here:
//! the registry and supervisor only ever see cron strings that parse.

use std::sync::Arc;

use serenity::builder::{
    CreateCommand, CreateCommandOption, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use serenity::model::application::{CommandInteraction, CommandOptionType};
use serenity::model::id::GuildId;
use serenity::prelude::Context;
use tracing::{info, warn};

use opswatch_core::types::{NotificationKey, Visibility};

use crate::context::NotifierContext;

/// Register the bot's slash commands. Call from `ready()`.
pub async fn register_commands(ctx: &Context, guild_id: Option<GuildId>) {
    let commands = vec![
        CreateCommand::new("notifications")
            .description("List operation notifications configured for this channel"),
        CreateCommand::new("notify-add")
            .description("Add or update an operation notification schedule for this channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "game_id",
                    "Opserv game id",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "opsec",
                    "Notify about OPSEC operations instead of public ones",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::String,
                    "cron",
                    "5-field cron schedule, e.g. \"0 19 * * *\"",
                )
                .required(true),
            ),
        CreateCommand::new("notify-remove")
            .description("Remove an operation notification schedule from this channel")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Integer,
                    "game_id",
                    "Opserv game id",
                )
                .required(true),
            )
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::Boolean,
                    "opsec",
                    "Whether the schedule to remove is the OPSEC one",
                )
                .required(true),
            ),
    ];

    match guild_id {
        Some(gid) => match gid.set_commands(&ctx.http, commands).await {
            Ok(cmds) => info!(guild = %gid, count = cmds.len(), "registered guild slash commands"),
            Err(e) => warn!(guild = %gid, error = %e, "failed to register guild commands"),
        },
        None => {
            match serenity::model::application::Command::set_global_commands(&ctx.http, commands)
                .await
            {
                Ok(cmds) => info!(count = cmds.len(), "registered global slash commands"),
                Err(e) => warn!(error = %e, "failed to register global slash commands"),
            }
        }
    }
}

/// Dispatch a slash command interaction to the appropriate handler.
pub async fn handle_interaction(
    app: &Arc<NotifierContext>,
    ctx: &Context,
    command: &CommandInteraction,
) {
    match command.data.name.as_str() {
        "notifications" => handle_list(app, ctx, command).await,
        "notify-add" => handle_add(app, ctx, command).await,
        "notify-remove" => handle_remove(app, ctx, command).await,
        other => {
            warn!(command = %other, "unknown slash command");
            respond_ephemeral(ctx, command, "Unknown command.").await;
        }
    }
}

fn option_i64(command: &CommandInteraction, name: &str) -> Option<i64> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_i64())
}

fn option_bool(command: &CommandInteraction, name: &str) -> Option<bool> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_bool())
}

fn option_str<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| o.value.as_str())
}

/// `/notifications` — list this channel's configured schedules.
async fn handle_list(app: &Arc<NotifierContext>, ctx: &Context, command: &CommandInteraction) {
    let channel_id = command.channel_id.get();
    let notifications = app
        .registry
        .read()
        .await
        .get_channel_notifications(channel_id);

    let response = if notifications.is_empty() {
        "No operation notifications are configured for this channel.".to_string()
    } else {
        let mut text = format!(
            "**Notifications for this channel** ({}):\n",
            notifications.len()
        );
        for (game_id, visibility, cron) in notifications {
            text.push_str(&format!(
                "- game {} — {} — `{}`\n",
                game_id,
                visibility.label(),
                cron
            ));
        }
        text
    };

    respond_ephemeral(ctx, command, &response).await;
}

/// `/notify-add game_id opsec cron` — upsert a schedule and (re)start its task.
async fn handle_add(app: &Arc<NotifierContext>, ctx: &Context, command: &CommandInteraction) {
    let (Some(game_id), Some(opsec), Some(cron)) = (
        option_i64(command, "game_id"),
        option_bool(command, "opsec"),
        option_str(command, "cron"),
    ) else {
        respond_ephemeral(ctx, command, "Missing required options.").await;
        return;
    };

    if game_id <= 0 {
        respond_ephemeral(ctx, command, "`game_id` must be a positive Opserv game id.").await;
        return;
    }

    // Validate before any state changes — a bad cron must leave both the
    // registry and the task map untouched.
    if let Err(e) = opswatch_scheduler::schedule::parse(cron) {
        respond_ephemeral(ctx, command, &format!("\u{26a0}\u{fe0f} {e}")).await;
        return;
    }

    let key = NotificationKey::new(game_id, Visibility::from_opsec(opsec), command.channel_id.get());

    let is_new = match app
        .registry
        .write()
        .await
        .upsert(key.game_id, key.visibility, key.channel_id, cron)
    {
        Ok(is_new) => is_new,
        Err(e) => {
            warn!(key = %key, error = %e, "registry save failed");
            respond_ephemeral(ctx, command, "\u{26a0}\u{fe0f} Failed to save the schedule. Nothing was changed.")
                .await;
            return;
        }
    };

    if let Err(e) = app.supervisor.lock().await.create_or_replace(key, cron) {
        // Unreachable in practice: the expression was validated above.
        warn!(key = %key, error = %e, "task creation failed after registry update");
        respond_ephemeral(ctx, command, &format!("\u{26a0}\u{fe0f} {e}")).await;
        return;
    }

    let verb = if is_new { "added" } else { "updated" };
    respond_ephemeral(
        ctx,
        command,
        &format!(
            "Notification {} for game {} ({}) on schedule `{}`.",
            verb,
            key.game_id,
            key.visibility.label(),
            cron
        ),
    )
    .await;
}

/// `/notify-remove game_id opsec` — drop a schedule and cancel its task.
async fn handle_remove(app: &Arc<NotifierContext>, ctx: &Context, command: &CommandInteraction) {
    let (Some(game_id), Some(opsec)) = (
        option_i64(command, "game_id"),
        option_bool(command, "opsec"),
    ) else {
        respond_ephemeral(ctx, command, "Missing required options.").await;
        return;
    };

    if game_id <= 0 {
        respond_ephemeral(ctx, command, "`game_id` must be a positive Opserv game id.").await;
        return;
    }

    let key = NotificationKey::new(game_id, Visibility::from_opsec(opsec), command.channel_id.get());

    let removed = match app
        .registry
        .write()
        .await
        .remove(key.game_id, key.visibility, key.channel_id)
    {
        Ok(removed) => removed,
        Err(e) => {
            warn!(key = %key, error = %e, "registry save failed");
            respond_ephemeral(ctx, command, "\u{26a0}\u{fe0f} Failed to save the registry. Nothing was changed.")
                .await;
            return;
        }
    };

    if !removed {
        respond_ephemeral(
            ctx,
            command,
            &format!(
                "No {} notification for game {} is configured in this channel.",
                key.visibility.label(),
                key.game_id
            ),
        )
        .await;
        return;
    }

    app.supervisor.lock().await.cancel(key);
    respond_ephemeral(
        ctx,
        command,
        &format!(
            "Notification removed for game {} ({}).",
            key.game_id,
            key.visibility.label()
        ),
    )
    .await;
}

/// Send an ephemeral response to a slash command (only visible to the invoker).
async fn respond_ephemeral(ctx: &Context, command: &CommandInteraction, content: &str) {
    let _ = command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await;
}
