//! Proactive delivery — sends scheduler-produced notifications to Discord.

use std::sync::Arc;

use chrono::Utc;
use serenity::builder::CreateMessage;
use serenity::model::id::ChannelId;
use tracing::{debug, info, warn};

use opswatch_core::notify::NotificationDelivery;

/// Background task that receives notifications from the supervisor and the
/// sweep and posts them as embeds.
///
/// Spawned once in `adapter.rs` after the serenity client is built. It uses
/// `Arc<Http>` (Discord REST, not the gateway WebSocket), so it keeps
/// working across gateway reconnects. A failed send — unknown channel,
/// missing permission — is logged and skipped; later deliveries proceed.
pub async fn run_notification_delivery(
    http: Arc<serenity::http::Http>,
    mut rx: tokio::sync::mpsc::Receiver<NotificationDelivery>,
) {
    while let Some(delivery) = rx.recv().await {
        let channel = ChannelId::new(delivery.channel_id);
        let embed = crate::embed::operations_embed(
            &delivery.title,
            &delivery.operations,
            &delivery.options,
            Utc::now(),
        );

        debug!(
            channel_id = delivery.channel_id,
            operations = delivery.operations.len(),
            "discord: delivering notification"
        );

        match channel
            .send_message(&http, CreateMessage::new().embed(embed))
            .await
        {
            Ok(_) => info!(
                channel_id = delivery.channel_id,
                title = %delivery.title,
                "discord: notification delivered"
            ),
            Err(e) => warn!(
                channel_id = delivery.channel_id,
                error = %e,
                "discord: notification delivery failed; skipping channel"
            ),
        }
    }

    info!("discord delivery task exiting (channel closed)");
}
