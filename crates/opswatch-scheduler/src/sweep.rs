use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};

use opswatch_core::notify::{MessageOptions, NotificationDelivery};
use opswatch_core::source::{OperationFilter, OperationSource};
use opswatch_core::types::{truncate_to_minute, Visibility};
use opswatch_registry::ScheduleRegistry;

use crate::ledger::NotificationLedger;

/// Cadence of the reminder scan.
const SWEEP_INTERVAL: Duration = Duration::from_secs(180);
/// How far ahead a start time may be to qualify for the reminder.
const LOOKAHEAD_SECS: i64 = 30 * 60;
/// Title used for every sweep notification.
const SWEEP_TITLE: &str = "Operations starting in 30 minutes!";

/// Fixed-interval reminder: every 3 minutes, scan all registered
/// (game, visibility) pairs for operations starting within the next 30
/// minutes and notify their channels, deduplicating via the ledger.
///
/// Start times are compared minute-truncated on both sides — cron and this
/// sweep both work at minute granularity, so an operation starting at
/// HH:MM:45 is neither missed nor matched twice by adjacent ticks.
pub struct SweepNotifier {
    registry: Arc<RwLock<ScheduleRegistry>>,
    ledger: NotificationLedger,
    source: Arc<dyn OperationSource>,
    delivery_tx: mpsc::Sender<NotificationDelivery>,
}

impl SweepNotifier {
    pub fn new(
        registry: Arc<RwLock<ScheduleRegistry>>,
        ledger: NotificationLedger,
        source: Arc<dyn OperationSource>,
        delivery_tx: mpsc::Sender<NotificationDelivery>,
    ) -> Self {
        Self {
            registry,
            ledger,
            source,
            delivery_tx,
        }
    }

    /// Main loop. Ticks every [`SWEEP_INTERVAL`] until `shutdown` turns true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("sweep notifier started");
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("sweep notifier shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One scan. Public so tests can drive it with a fixed `now`.
    pub async fn tick(&self, now: DateTime<Utc>) {
        let now_epoch = now.timestamp();

        // Already-handled occurrences; excluding them makes a retried tick
        // idempotent even when the previous record call failed after some
        // dispatches.
        let exclude = match self.ledger.future_entries(now_epoch) {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "sweep: ledger read failed; skipping tick");
                return;
            }
        };

        let window_start = truncate_to_minute(now_epoch);
        let window_end = window_start + LOOKAHEAD_SECS;

        // Snapshot the registry grouped by (game, visibility); channels with
        // the same pair share one query.
        let mut groups: HashMap<(i64, Visibility), Vec<u64>> = HashMap::new();
        for entry in self.registry.read().await.entries() {
            groups
                .entry((entry.key.game_id, entry.key.visibility))
                .or_default()
                .push(entry.key.channel_id);
        }

        let mut notified: Vec<(i64, i64)> = Vec::new();

        for ((game_id, visibility), channels) in groups {
            let filter = OperationFilter::window(game_id, visibility, window_start, window_end);
            let operations = match self.source.select_operations(filter).await {
                Ok(ops) => ops,
                Err(e) => {
                    // One game's failure must not abort the whole sweep.
                    warn!(game_id, error = %e, "sweep: operation query failed");
                    continue;
                }
            };

            let operations: Vec<_> = operations
                .into_iter()
                .filter(|op| !exclude.contains(&op.operation_id))
                .collect();
            if operations.is_empty() {
                continue;
            }

            for channel_id in channels {
                let delivery = NotificationDelivery {
                    channel_id,
                    title: SWEEP_TITLE.to_string(),
                    operations: operations.clone(),
                    options: MessageOptions::starting_soon(),
                };
                if self.delivery_tx.send(delivery).await.is_err() {
                    warn!(channel_id, "sweep: delivery channel closed");
                    return;
                }
            }

            notified.extend(operations.iter().map(|op| (op.operation_id, op.date_start)));
        }

        if notified.is_empty() {
            debug!("sweep: nothing to notify this tick");
            return;
        }

        // Atomic batch. On failure nothing is marked notified, so the next
        // tick retries — worst case one duplicate reminder, never a lost one.
        //
        // Pairs are recorded once queued on the delivery channel, not once
        // Discord confirms the send: a send that fails downstream (gone
        // channel, missing permission) drops that reminder for good, and
        // retrying it next tick would hit the same failure.
        if let Err(e) = self.ledger.record(&notified) {
            error!(error = %e, count = notified.len(), "sweep: ledger record failed; next tick will retry");
        }
    }
}
