use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serenity::all::ActivityData;
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::model::user::OnlineStatus;
use serenity::prelude::{Context, EventHandler};
use tokio::sync::watch;
use tracing::info;

use opswatch_core::config::DiscordConfig;

use crate::context::NotifierContext;

/// Serenity event handler: command dispatch plus publishing the gateway
/// context for the presence rotation.
pub struct DiscordHandler {
    pub ctx: Arc<NotifierContext>,
    pub config: DiscordConfig,
    pub gateway_ctx: Arc<watch::Sender<Option<Context>>>,
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(name = %ready.user.name, "Discord bot connected");

        crate::commands::register_commands(&ctx, self.config.guild_id.map(GuildId::new)).await;

        // The client is rebuilt after every gateway drop, which invalidates
        // earlier contexts. Publishing the fresh one here keeps the
        // long-lived presence rotation working across rebuilds.
        let _ = self.gateway_ctx.send(Some(ctx));
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            crate::commands::handle_interaction(&self.ctx, &ctx, &command).await;
        }
    }
}

/// Rotate a random "Watching …" status every minute.
///
/// Spawned once per process by the adapter. Reads the latest gateway
/// context each tick rather than capturing one, so client rebuilds never
/// strand it talking to a dead shard.
pub(crate) async fn run_presence_rotation(
    gateway_ctx: watch::Receiver<Option<Context>>,
    statuses: Vec<String>,
) {
    if statuses.is_empty() {
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(60));

    loop {
        interval.tick().await;
        let ctx = gateway_ctx.borrow().clone();
        let Some(ctx) = ctx else {
            // Not connected yet.
            continue;
        };
        if let Some(activity) = next_activity(&statuses) {
            ctx.set_presence(Some(activity), OnlineStatus::Online);
        }
    }
}

fn next_activity(statuses: &[String]) -> Option<ActivityData> {
    let mut rng = rand::thread_rng();
    statuses
        .choose(&mut rng)
        .map(|status| ActivityData::watching(status.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_picks_from_the_configured_statuses() {
        let statuses = vec!["the operations".to_string()];
        let activity = next_activity(&statuses).unwrap();
        assert_eq!(activity.name, "the operations");

        assert!(next_activity(&[]).is_none());
    }
}
