use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use opswatch_registry::ScheduleRegistry;
use opswatch_scheduler::TaskSupervisor;

/// Shared handles the command layer mutates: the durable schedule registry
/// and the supervisor owning the live notification tasks.
///
/// Per-entry tasks never touch these — they capture their cron at spawn —
/// so the locks are only contended on the command path.
pub struct NotifierContext {
    pub registry: Arc<RwLock<ScheduleRegistry>>,
    pub supervisor: Arc<Mutex<TaskSupervisor>>,
}
