use std::sync::Arc;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::policy::{TaskPolicy, UserContext};
use crate::recorder::Recorder;

/// Runs one virtual user: select a task, probe, record, wait, repeat.
///
/// Stops between iterations once `shutdown` flips to true (or its sender is
/// dropped). A probe still in flight at that moment is dropped unrecorded, so
/// every record the recorder sees belongs to a completed probe.
///
/// Returns the number of probes recorded.
pub async fn run_virtual_user(
    policy: Arc<TaskPolicy>,
    user: UserContext,
    recorder: Arc<dyn Recorder>,
    mut shutdown: watch::Receiver<bool>,
) -> u64 {
    debug!(user_id = user.user_id, base_url = %user.base_url, "Virtual user starting");
    recorder.user_started(user.user_id);

    let mut iterations: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let record = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            record = policy.select_and_run(&user) => record,
        };

        recorder.record(&record);
        iterations += 1;

        if let Some(reason) = record.outcome.reason() {
            warn!(
                user_id = user.user_id,
                task = %record.task,
                status_code = ?record.status_code,
                error_category = record.error_category.map(|c| c.label()).unwrap_or("none"),
                reason = %reason,
                "Probe failed"
            );
        }

        // Same wait whatever the task or its outcome.
        let wait = policy.sample_wait();
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = time::sleep(wait) => {}
        }
    }

    recorder.user_stopped(user.user_id);
    info!(
        user_id = user.user_id,
        iterations = iterations,
        "Virtual user stopped"
    );
    iterations
}
