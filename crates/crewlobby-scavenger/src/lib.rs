//! Presence sweep for crewlobby.
//!
//! Players prove they are alive by sending heartbeats
//! ([`LobbyService::refresh_player`]). The scavenger wakes up on a fixed
//! interval and sorts every player by how long it has been silent:
//!
//! ```text
//!   silent < W          active   nothing happens
//!   W <= silent < W+D   lagging  PLAYER_LAGGING is published (every sweep)
//!   silent >= W+D       evicted  removed through the normal leave path
//! ```
//!
//! `W` is [`ScavengerConfig::warning_after`], `D` is
//! [`ScavengerConfig::delete_after`]. Eviction goes through
//! [`LobbyService::remove_player`], so an evicted owner hands the lobby to
//! the next member and an evicted last member takes the lobby with it.
//!
//! A sweep is one transaction. Any error rolls the whole sweep back; the
//! loop logs it and tries again on the next tick.
//!
//! # Integration
//!
//! ```ignore
//! let handle = Scavenger::new(service.clone(), ScavengerConfig::default()).spawn();
//! // ... serve requests ...
//! handle.shutdown().await;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use crewlobby_lobby::{LeaveOutcome, LobbyError, LobbyService, RequestContext, UnitOfWork, events};
use crewlobby_messaging::Messenger;
use crewlobby_protocol::PlayerId;
use crewlobby_store::{Store, Transaction};
use rand::Rng;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{Instrument, debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Timing for the presence sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScavengerConfig {
    /// Time between two sweeps.
    pub interval: Duration,
    /// Silence after which a player is reported as lagging.
    pub warning_after: Duration,
    /// Additional silence, counted from `warning_after`, after which a
    /// lagging player is evicted.
    pub delete_after: Duration,
    /// Upper bound of the random delay added before the first sweep, so
    /// several instances started together do not sweep in lockstep.
    pub initial_jitter: Duration,
}

impl Default for ScavengerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            warning_after: Duration::from_secs(20),
            delete_after: Duration::from_secs(60),
            initial_jitter: Duration::from_millis(500),
        }
    }
}

impl ScavengerConfig {
    /// Shortest accepted sweep interval.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_warning_after(mut self, warning_after: Duration) -> Self {
        self.warning_after = warning_after;
        self
    }

    pub fn with_delete_after(mut self, delete_after: Duration) -> Self {
        self.delete_after = delete_after;
        self
    }

    pub fn with_initial_jitter(mut self, initial_jitter: Duration) -> Self {
        self.initial_jitter = initial_jitter;
        self
    }

    /// Fixes out-of-range values so the config is safe to run.
    ///
    /// Called automatically by [`Scavenger::new`]. An interval below
    /// [`Self::MIN_INTERVAL`] is raised to it.
    pub fn validated(mut self) -> Self {
        if self.interval < Self::MIN_INTERVAL {
            warn!(
                interval_ms = self.interval.as_millis(),
                min_ms = Self::MIN_INTERVAL.as_millis(),
                "sweep interval too short, raising"
            );
            self.interval = Self::MIN_INTERVAL;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Reports and metrics
// ---------------------------------------------------------------------------

/// What one sweep did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Players reported as lagging, oldest heartbeat first.
    pub lagging: Vec<PlayerId>,
    /// Players removed from their lobby, oldest heartbeat first.
    pub evicted: Vec<PlayerId>,
}

/// Totals across every sweep a [`Scavenger`] has run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepMetrics {
    pub total_sweeps: u64,
    /// Sweeps that were rolled back.
    pub failed_sweeps: u64,
    pub total_lagging: u64,
    pub total_evicted: u64,
}

type SharedMetrics = Arc<Mutex<SweepMetrics>>;

fn lock(metrics: &SharedMetrics) -> MutexGuard<'_, SweepMetrics> {
    metrics.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Scavenger
// ---------------------------------------------------------------------------

/// Finds silent players and warns about or evicts them.
///
/// Clones share their metrics, so a clone moved onto a task with
/// [`spawn`](Self::spawn) and one kept for manual sweeps report the same
/// totals.
pub struct Scavenger<S, M> {
    service: LobbyService<S, M>,
    config: ScavengerConfig,
    metrics: SharedMetrics,
}

impl<S, M> Clone for Scavenger<S, M> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            config: self.config.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<S: Store, M: Messenger> Scavenger<S, M> {
    pub fn new(service: LobbyService<S, M>, config: ScavengerConfig) -> Self {
        let config = config.validated();
        debug!(
            interval_ms = config.interval.as_millis(),
            warning_ms = config.warning_after.as_millis(),
            delete_ms = config.delete_after.as_millis(),
            "scavenger created"
        );
        Self {
            service,
            config,
            metrics: SharedMetrics::default(),
        }
    }

    pub fn config(&self) -> &ScavengerConfig {
        &self.config
    }

    /// Snapshot of the totals so far.
    pub fn metrics(&self) -> SweepMetrics {
        lock(&self.metrics).clone()
    }

    /// Runs one sweep now.
    ///
    /// # Errors
    /// Any error from the store or the leave path. The sweep's transaction
    /// is rolled back and nothing is published.
    pub async fn sweep(&self) -> Result<SweepReport, LobbyError> {
        let ctx = RequestContext::new();
        let result = async {
            let mut uow = self.service.begin(&ctx).await?;
            let result = self.sweep_in(&mut uow).await;
            self.service.finish(uow, result).await
        }
        .instrument(ctx.span("sweep"))
        .await;

        let mut metrics = lock(&self.metrics);
        metrics.total_sweeps += 1;
        match &result {
            Ok(report) => {
                metrics.total_lagging += report.lagging.len() as u64;
                metrics.total_evicted += report.evicted.len() as u64;
            }
            Err(_) => metrics.failed_sweeps += 1,
        }
        result
    }

    async fn sweep_in(&self, uow: &mut UnitOfWork<S::Tx>) -> Result<SweepReport, LobbyError> {
        let now = self.service.now();
        let warning_time = cutoff(now, self.config.warning_after);
        let delete_time = cutoff(warning_time, self.config.delete_after);

        let stale = uow
            .tx()
            .get_players_by_last_refresh_before(warning_time)
            .await
            .map_err(|source| LobbyError::Store {
                context: "loading stale players",
                source,
            })?;

        let mut report = SweepReport::default();
        for player in stale {
            if player.last_refresh < delete_time {
                let outcome = self.service.remove_player(uow, player.id, None).await?;
                if outcome != LeaveOutcome::NotFound {
                    debug!(player_id = %player.id, ?outcome, "player evicted");
                    report.evicted.push(player.id);
                }
            } else {
                uow.stage(events::player_lagging(&player));
                report.lagging.push(player.id);
            }
        }

        if !report.lagging.is_empty() || !report.evicted.is_empty() {
            info!(
                lagging = report.lagging.len(),
                evicted = report.evicted.len(),
                "sweep finished"
            );
        }
        Ok(report)
    }

    /// Sweeps on every tick until `shutdown` fires or its sender is dropped.
    ///
    /// Ticks missed while a sweep was running are skipped, not replayed.
    pub async fn run(self, mut shutdown: oneshot::Receiver<()>) {
        let start = Instant::now() + self.config.interval + self.jitter();
        let mut ticker = time::interval_at(start, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("scavenger stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep().await {
                        warn!(error = %err, "sweep failed, retrying next tick");
                    }
                }
            }
        }
    }

    /// Moves the scavenger onto its own task.
    pub fn spawn(self) -> ScavengerHandle {
        let (tx, rx) = oneshot::channel();
        let metrics = Arc::clone(&self.metrics);
        let task = tokio::spawn(self.run(rx));
        ScavengerHandle {
            shutdown: tx,
            task,
            metrics,
        }
    }

    fn jitter(&self) -> Duration {
        let max_ms = u64::try_from(self.config.initial_jitter.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..=max_ms))
    }
}

/// `from - window`, saturating at the earliest representable instant.
fn cutoff(from: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| from.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Controls a scavenger started with [`Scavenger::spawn`].
///
/// Dropping the handle stops the loop as well.
pub struct ScavengerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    metrics: SharedMetrics,
}

impl ScavengerHandle {
    pub fn metrics(&self) -> SweepMetrics {
        lock(&self.metrics).clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and waits for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            warn!(error = %err, "scavenger task ended abnormally");
        }
    }
}
