use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tracing::info;

use opswatch_core::config::OpswatchConfig;
use opswatch_core::notify::NotificationDelivery;
use opswatch_core::source::OperationSource;
use opswatch_discord::{DiscordAdapter, NotifierContext};
use opswatch_opserv::OpservDb;
use opswatch_registry::ScheduleRegistry;
use opswatch_scheduler::{NotificationLedger, SweepNotifier, TaskSupervisor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opswatch=info".into()),
        )
        .init();

    // load config: explicit path via OPSWATCH_CONFIG > ./opswatch.toml
    let config_path = std::env::var("OPSWATCH_CONFIG").ok();
    let config = OpswatchConfig::load(config_path.as_deref())?;

    // notification ledger — local SQLite, schema created idempotently
    info!(path = %config.storage.ledger_path, "opening notification ledger");
    let conn = rusqlite::Connection::open(&config.storage.ledger_path)?;
    let ledger = NotificationLedger::new(conn)?;

    // durable schedule registry — missing file starts empty
    let registry = ScheduleRegistry::load(&config.storage.registry_path)?;
    info!(
        path = %config.storage.registry_path,
        schedules = registry.len(),
        "schedule registry loaded"
    );
    let registry = Arc::new(RwLock::new(registry));

    // read-only Opserv MySQL source
    let source: Arc<dyn OperationSource> = Arc::new(OpservDb::connect(&config.opserv).await?);

    // Notification channel: scheduler tasks + sweep → Discord delivery task
    let (delivery_tx, delivery_rx) = mpsc::channel::<NotificationDelivery>(256);

    // per-schedule notification tasks, one per registry entry
    let mut supervisor = TaskSupervisor::new(Arc::clone(&source), delivery_tx.clone());
    supervisor.initialize(&registry.read().await.entries());
    info!(tasks = supervisor.task_count(), "notification tasks started");
    let supervisor = Arc::new(Mutex::new(supervisor));

    // 30-minute sweep loop with its own shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep = SweepNotifier::new(
        Arc::clone(&registry),
        ledger,
        Arc::clone(&source),
        delivery_tx,
    );
    let sweep_handle = tokio::spawn(sweep.run(shutdown_rx));

    let ctx = Arc::new(NotifierContext {
        registry,
        supervisor,
    });

    // runs forever; reconnects on gateway drops
    DiscordAdapter::new(&config.discord, ctx).run(delivery_rx).await;

    // Unreachable in practice — kept so a future graceful-exit path tears
    // the sweep down properly.
    let _ = shutdown_tx.send(true);
    let _ = sweep_handle.await;
    Ok(())
}
