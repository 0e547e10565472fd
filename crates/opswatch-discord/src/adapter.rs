use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::prelude::Context;
use serenity::Client;
use tokio::sync::watch;
use tracing::{error, info, warn};

use opswatch_core::config::DiscordConfig;
use opswatch_core::notify::NotificationDelivery;

use crate::context::NotifierContext;
use crate::handler::DiscordHandler;

/// Discord adapter.
///
/// Wraps a serenity `Client` and drives the gateway loop until the process
/// exits, reconnecting whenever the gateway drops.
pub struct DiscordAdapter {
    ctx: Arc<NotifierContext>,
    config: DiscordConfig,
    // Latest gateway context, refreshed by the handler on every `ready`.
    gateway_ctx: Arc<watch::Sender<Option<Context>>>,
}

impl DiscordAdapter {
    pub fn new(config: &DiscordConfig, ctx: Arc<NotifierContext>) -> Self {
        let (gateway_ctx, _) = watch::channel(None);
        Self {
            ctx,
            config: config.clone(),
            gateway_ctx: Arc::new(gateway_ctx),
        }
    }

    /// Connect to Discord and keep reconnecting whenever the gateway drops.
    ///
    /// Never returns — runs for the lifetime of the process.
    ///
    /// The delivery task is spawned once over `Arc<Http>` (Discord REST, not
    /// the gateway WebSocket), so notifications keep flowing across
    /// reconnects without the task being restarted. The presence rotation is
    /// likewise spawned once, but needs a gateway context — it follows the
    /// watch slot instead of holding one.
    pub async fn run(self, delivery_rx: tokio::sync::mpsc::Receiver<NotificationDelivery>) {
        // Slash commands and proactive sends only need guild metadata.
        let intents = GatewayIntents::GUILDS;

        tokio::spawn(crate::handler::run_presence_rotation(
            self.gateway_ctx.subscribe(),
            self.config.statuses.clone(),
        ));

        // Build first client — retry indefinitely until initial connection succeeds.
        let first_client = loop {
            match self.build_client(intents).await {
                Ok(c) => break c,
                Err(e) => {
                    error!("Discord: initial connect failed ({e}), retrying in 30s");
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
            }
        };

        let http = Arc::clone(&first_client.http);
        tokio::spawn(crate::delivery::run_notification_delivery(
            http,
            delivery_rx,
        ));

        let mut client = first_client;

        loop {
            info!("Discord: gateway connecting");

            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;

            // Rebuild the client for the next attempt.
            client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: reconnect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };
        }
    }

    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = DiscordHandler {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
            gateway_ctx: Arc::clone(&self.gateway_ctx),
        };

        Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
