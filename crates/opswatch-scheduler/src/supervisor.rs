use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use opswatch_core::notify::{MessageOptions, NotificationDelivery};
use opswatch_core::source::{OperationFilter, OperationSource};
use opswatch_core::types::{truncate_to_minute, NotificationKey, ScheduleEntry};

use crate::error::Result;
use crate::schedule::{self, CronSchedule};

/// One live recurring notification bound to a registry entry.
struct NotificationTask {
    cron: String,
    handle: JoinHandle<()>,
}

/// Owns one long-running tokio task per schedule-registry entry.
///
/// Invariant: at most one live task per [`NotificationKey`]. Replacing a
/// schedule aborts the old handle before the new task is spawned, so two
/// tasks for the same key never run concurrently. Tasks are infinite loops
/// — there is no completed state, only cancellation.
pub struct TaskSupervisor {
    tasks: HashMap<NotificationKey, NotificationTask>,
    source: Arc<dyn OperationSource>,
    delivery_tx: mpsc::Sender<NotificationDelivery>,
}

impl TaskSupervisor {
    pub fn new(
        source: Arc<dyn OperationSource>,
        delivery_tx: mpsc::Sender<NotificationDelivery>,
    ) -> Self {
        Self {
            tasks: HashMap::new(),
            source,
            delivery_tx,
        }
    }

    /// Start one task per registry entry. Entries with a cron expression
    /// that no longer parses are logged and skipped — one bad row must not
    /// keep the rest of the registry from starting.
    pub fn initialize(&mut self, entries: &[ScheduleEntry]) {
        for entry in entries {
            if let Err(e) = self.create_or_replace(entry.key, &entry.cron) {
                warn!(key = %entry.key, error = %e, "skipping schedule with invalid cron");
            }
        }
        info!(count = self.tasks.len(), "task supervisor initialized");
    }

    /// Create the task for `key`, cancelling any existing one first.
    ///
    /// The cron expression is parsed before anything is cancelled, so an
    /// invalid expression leaves the current task untouched.
    pub fn create_or_replace(&mut self, key: NotificationKey, cron: &str) -> Result<()> {
        let parsed = schedule::parse(cron)?;

        if let Some(old) = self.tasks.remove(&key) {
            old.handle.abort();
            debug!(key = %key, "replaced existing notification task");
        }

        let handle = spawn_notification_task(
            key,
            parsed,
            Arc::clone(&self.source),
            self.delivery_tx.clone(),
        );
        self.tasks.insert(
            key,
            NotificationTask {
                cron: cron.to_string(),
                handle,
            },
        );
        info!(key = %key, %cron, "notification task started");
        Ok(())
    }

    /// Cancel and forget the task for `key`. Returns `false` if none exists.
    pub fn cancel(&mut self, key: NotificationKey) -> bool {
        match self.tasks.remove(&key) {
            Some(task) => {
                task.handle.abort();
                info!(key = %key, "notification task cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every live task. Used on process teardown.
    pub fn shutdown(&mut self) {
        for (key, task) in self.tasks.drain() {
            task.handle.abort();
            debug!(key = %key, "notification task stopped");
        }
        info!("task supervisor shut down");
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn contains(&self, key: NotificationKey) -> bool {
        self.tasks.contains_key(&key)
    }

    /// The cron expression the live task for `key` was created with.
    pub fn cron_for(&self, key: NotificationKey) -> Option<&str> {
        self.tasks.get(&key).map(|t| t.cron.as_str())
    }
}

impl Drop for TaskSupervisor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the recurring loop for one key. Cancellation is observed at the
/// sleep await — aborting interrupts the remaining delay promptly.
fn spawn_notification_task(
    key: NotificationKey,
    schedule: CronSchedule,
    source: Arc<dyn OperationSource>,
    delivery_tx: mpsc::Sender<NotificationDelivery>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let delay = schedule::next_fire_delay(&schedule, Utc::now());
            tokio::time::sleep(delay).await;

            // Errors inside one tick are isolated: log and wait for the
            // next firing instead of letting the task die silently.
            let from = truncate_to_minute(Utc::now().timestamp());
            let filter = OperationFilter::upcoming(key.game_id, key.visibility, from);
            let operations = match source.select_operations(filter).await {
                Ok(ops) => ops,
                Err(e) => {
                    warn!(key = %key, error = %e, "operation query failed; will retry next fire");
                    continue;
                }
            };

            if operations.is_empty() {
                debug!(key = %key, "no upcoming operations at fire time");
                continue;
            }

            let delivery = NotificationDelivery {
                channel_id: key.channel_id,
                title: format!("{} Operations", key.visibility.label()),
                operations,
                options: MessageOptions::upcoming(),
            };
            if delivery_tx.send(delivery).await.is_err() {
                // Delivery side is gone — the process is shutting down.
                warn!(key = %key, "delivery channel closed; stopping task");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use opswatch_core::Visibility;

    struct EmptySource;

    #[async_trait]
    impl OperationSource for EmptySource {
        async fn select_operations(
            &self,
            _filter: OperationFilter,
        ) -> opswatch_core::Result<Vec<opswatch_core::Operation>> {
            Ok(Vec::new())
        }
    }

    fn supervisor() -> TaskSupervisor {
        let (tx, _rx) = mpsc::channel(8);
        TaskSupervisor::new(Arc::new(EmptySource), tx)
    }

    fn key() -> NotificationKey {
        NotificationKey::new(16, Visibility::Opsec, 555)
    }

    #[tokio::test]
    async fn upsert_creates_exactly_one_task() {
        let mut supervisor = supervisor();
        supervisor.create_or_replace(key(), "0 19 * * *").unwrap();

        assert_eq!(supervisor.task_count(), 1);
        assert!(supervisor.contains(key()));
        assert_eq!(supervisor.cron_for(key()), Some("0 19 * * *"));
    }

    #[tokio::test]
    async fn replacement_keeps_exactly_one_task() {
        let mut supervisor = supervisor();
        supervisor.create_or_replace(key(), "0 19 * * *").unwrap();
        supervisor.create_or_replace(key(), "0 20 * * *").unwrap();

        assert_eq!(supervisor.task_count(), 1);
        assert_eq!(supervisor.cron_for(key()), Some("0 20 * * *"));
    }

    #[tokio::test]
    async fn invalid_cron_leaves_existing_task_untouched() {
        let mut supervisor = supervisor();
        supervisor.create_or_replace(key(), "0 19 * * *").unwrap();

        assert!(supervisor.create_or_replace(key(), "bogus").is_err());
        assert_eq!(supervisor.task_count(), 1);
        assert_eq!(supervisor.cron_for(key()), Some("0 19 * * *"));
    }

    #[tokio::test]
    async fn cancel_unknown_key_is_noop() {
        let mut supervisor = supervisor();
        supervisor.create_or_replace(key(), "0 19 * * *").unwrap();

        assert!(!supervisor.cancel(NotificationKey::new(99, Visibility::Public, 1)));
        assert_eq!(supervisor.task_count(), 1);

        assert!(supervisor.cancel(key()));
        assert_eq!(supervisor.task_count(), 0);
    }

    #[tokio::test]
    async fn initialize_spawns_tasks_and_skips_bad_rows() {
        let mut supervisor = supervisor();
        let entries = vec![
            ScheduleEntry {
                key: key(),
                cron: "0 19 * * *".to_string(),
            },
            ScheduleEntry {
                key: NotificationKey::new(7, Visibility::Public, 777),
                cron: "*/15 * * * *".to_string(),
            },
            ScheduleEntry {
                key: NotificationKey::new(8, Visibility::Public, 778),
                cron: "not valid".to_string(),
            },
        ];

        supervisor.initialize(&entries);
        assert_eq!(supervisor.task_count(), 2);
        assert!(!supervisor.contains(NotificationKey::new(8, Visibility::Public, 778)));
    }

    #[tokio::test]
    async fn shutdown_cancels_everything() {
        let mut supervisor = supervisor();
        supervisor.create_or_replace(key(), "0 19 * * *").unwrap();
        supervisor
            .create_or_replace(NotificationKey::new(7, Visibility::Public, 777), "0 9 * * *")
            .unwrap();

        supervisor.shutdown();
        assert_eq!(supervisor.task_count(), 0);
    }
}
