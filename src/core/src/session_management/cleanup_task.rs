use crate::session_management::session_manager::SessionManager;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Spawns a task running [`SessionManager::cleanup`] every `every`.
///
/// The first pass happens one full period after the call. Abort the returned handle to
/// stop the task.
pub fn spawn_cleanup_task(manager: Arc<SessionManager>, every: Duration) -> JoinHandle<()> {
    info!(
        "Starting cleanup of '{}' every {}s",
        manager.cookie_name(),
        every.as_secs()
    );
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = manager.cleanup();
            debug!("Periodic cleanup pass removed {} session(s)", removed);
        }
    })
}
