//! Fixed-interval scheduler for the housekeeping jobs.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::config::HousekeepingConfig;
use crate::error::ServiceError;
use crate::orders::OrderService;
use crate::store::InventoryStore;

use super::jobs::{auto_cancel_stale_orders, purge_completed_panel_items, HousekeepingJob, JobReport};

/// Scheduler runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub orders_cancelled: u64,
    pub orders_purged: u64,
    pub skipped: u64,
    /// Per-order failures inside otherwise successful runs.
    pub failed: u64,
    /// Job runs that failed after exhausting the job retry policy.
    pub job_errors: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

impl SchedulerStats {
    fn record(&mut self, report: &JobReport) {
        match report.job {
            HousekeepingJob::AutoCancel => self.orders_cancelled += report.affected as u64,
            HousekeepingJob::PurgeCompleted => self.orders_purged += report.affected as u64,
        }
        self.skipped += report.skipped as u64;
        self.failed += report.failed as u64;
    }
}

/// Handle to a running scheduler.
#[derive(Debug)]
pub struct HousekeepingHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl HousekeepingHandle {
    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Stop after the run in flight (if any) and wait for the task to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "housekeeping task ended abnormally");
        }
    }
}

/// Runs auto-cancel and purge on a fixed tick.
pub struct HousekeepingScheduler<S: InventoryStore> {
    service: OrderService<S>,
    config: HousekeepingConfig,
    stats: Arc<Mutex<SchedulerStats>>,
}

impl<S: InventoryStore + 'static> HousekeepingScheduler<S> {
    pub fn new(service: OrderService<S>, config: HousekeepingConfig) -> Self {
        Self {
            service,
            config,
            stats: Arc::new(Mutex::new(SchedulerStats::default())),
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Run every job once as of `now`. Jobs that still fail after the job retry policy
    /// are logged and left out of the result.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Vec<JobReport> {
        let mut reports = Vec::with_capacity(HousekeepingJob::ALL.len());
        for job in HousekeepingJob::ALL {
            match self.run_job(job, now).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(job = %job, code = e.code(), error = %e, "housekeeping job failed");
                    self.update_stats(|s| s.job_errors += 1);
                }
            }
        }

        self.update_stats(|s| {
            s.ticks += 1;
            s.last_run = Some(now);
            for report in &reports {
                s.record(report);
            }
        });
        reports
    }

    /// Run one job, re-running the whole job on failure per the job retry policy.
    pub async fn run_job(&self, job: HousekeepingJob, now: DateTime<Utc>) -> Result<JobReport, ServiceError> {
        let policy = &self.config.retry;
        let mut attempt = 0u32;
        loop {
            let result = match job {
                HousekeepingJob::AutoCancel => {
                    auto_cancel_stale_orders(&self.service, now, self.config.auto_cancel_window()).await
                }
                HousekeepingJob::PurgeCompleted => {
                    purge_completed_panel_items(&self.service, now, self.config.purge_window()).await
                }
            };
            match result {
                Ok(report) => return Ok(report),
                Err(e) if policy.should_retry(attempt) => {
                    attempt += 1;
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(job = %job, attempt, delay_ms = delay.as_millis() as u64, error = %e, "housekeeping job failed, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Spawn the scheduler on the current tokio runtime. The first run starts
    /// immediately.
    pub fn spawn(self) -> HousekeepingHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let stats = self.stats.clone();
        let interval = self.config.interval();

        let join = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "housekeeping scheduler started");
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_once(Utc::now()).await;
                        self.update_stats(|s| s.uptime_secs = started.elapsed().as_secs());
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("housekeeping scheduler stopped");
        });

        HousekeepingHandle {
            shutdown: shutdown_tx,
            join,
            stats,
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut SchedulerStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            f(&mut stats);
        }
    }
}
