//! Spawns virtual users at the configured rate and stops them at the end of
//! the run.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{self, Duration, Instant};
use tracing::{error, info};

use crate::client::{build_client, TransportConfig};
use crate::errors::ConfigError;
use crate::policy::TaskPolicy;
use crate::recorder::Recorder;
use crate::worker::run_virtual_user;

/// Run-level settings owned by the driver.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub base_url: String,
    pub num_users: usize,
    /// Users started per second during ramp-up
    pub spawn_rate: f64,
    pub run_time: Duration,
    pub transport: TransportConfig,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_users == 0 {
            return Err(ConfigError::invalid("NUM_USERS", "0", "Must be greater than 0."));
        }
        self.spawn_interval()?;
        self.deadline_from(Instant::now())?;
        Ok(())
    }

    /// Delay between two user spawns.
    fn spawn_interval(&self) -> Result<Duration, ConfigError> {
        if !(self.spawn_rate.is_finite() && self.spawn_rate > 0.0) {
            return Err(ConfigError::invalid(
                "SPAWN_RATE",
                self.spawn_rate.to_string(),
                "Must be a positive number of users per second.",
            ));
        }
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|_| {
            ConfigError::invalid(
                "SPAWN_RATE",
                self.spawn_rate.to_string(),
                "Too small: the delay between spawns does not fit in a duration.",
            )
        })
    }

    fn deadline_from(&self, start: Instant) -> Result<Instant, ConfigError> {
        start.checked_add(self.run_time).ok_or_else(|| {
            ConfigError::invalid(
                "RUN_TIME",
                format!("{}s", self.run_time.as_secs()),
                "Run time is too large.",
            )
        })
    }
}

/// What happened during a run. Outcome statistics live in the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub users_spawned: usize,
    pub probes_recorded: u64,
    /// True if the stop signal ended the run before `run_time`
    pub stopped_early: bool,
}

/// Runs the load test for `config.run_time`.
pub async fn run_load_test(
    config: &RunConfig,
    policy: Arc<TaskPolicy>,
    recorder: Arc<dyn Recorder>,
) -> Result<RunSummary, ConfigError> {
    run_load_test_until(config, policy, recorder, std::future::pending::<()>()).await
}

/// Runs the load test until `config.run_time` elapses or `stop` completes.
///
/// Configuration errors (including an unusable transport config) are returned
/// before any virtual user starts. Per-probe failures never end the run.
pub async fn run_load_test_until<F>(
    config: &RunConfig,
    policy: Arc<TaskPolicy>,
    recorder: Arc<dyn Recorder>,
    stop: F,
) -> Result<RunSummary, ConfigError>
where
    F: Future<Output = ()>,
{
    config.validate()?;
    // Fail fast on transport settings; each user still builds its own client.
    build_client(&config.transport)?;

    let start = Instant::now();
    let deadline = config.deadline_from(start)?;
    let spawn_interval = config.spawn_interval()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::pin!(stop);

    info!(
        base_url = %config.base_url,
        num_users = config.num_users,
        spawn_rate = config.spawn_rate,
        run_time_secs = config.run_time.as_secs_f64(),
        "Starting load test"
    );

    let mut handles = Vec::with_capacity(config.num_users);
    let mut stopped_early = false;
    let mut spawn_error = None;

    for user_id in 0..config.num_users {
        if Instant::now() >= deadline {
            break;
        }

        let user = match policy.on_session_start(user_id, &config.base_url, &config.transport) {
            Ok(user) => user,
            Err(e) => {
                spawn_error = Some(e);
                break;
            }
        };

        let handle = tokio::spawn(run_virtual_user(
            policy.clone(),
            user,
            recorder.clone(),
            shutdown_rx.clone(),
        ));
        handles.push(handle);

        if user_id + 1 < config.num_users {
            let next_spawn = Instant::now()
                .checked_add(spawn_interval)
                .map_or(deadline, |t| t.min(deadline));
            tokio::select! {
                _ = time::sleep_until(next_spawn) => {}
                _ = &mut stop => {
                    stopped_early = true;
                    break;
                }
            }
        }
    }

    let users_spawned = handles.len();
    if spawn_error.is_none() && !stopped_early {
        info!(users = users_spawned, "All users spawned");
        tokio::select! {
            _ = time::sleep_until(deadline) => {}
            _ = &mut stop => {
                stopped_early = true;
            }
        }
    }

    info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        stopped_early = stopped_early,
        "Signalling virtual users to stop"
    );
    let _ = shutdown_tx.send(true);

    let mut probes_recorded = 0;
    for handle in handles {
        match handle.await {
            Ok(iterations) => probes_recorded += iterations,
            Err(e) => error!(error = %e, "Virtual user task failed"),
        }
    }

    if let Some(e) = spawn_error {
        return Err(e);
    }

    Ok(RunSummary {
        users_spawned,
        probes_recorded,
        stopped_early,
    })
}
