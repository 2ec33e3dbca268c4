//! Background jobs of the notification subsystem
//!
//! | job                  | fires                | does                                          |
//! |----------------------|----------------------|-----------------------------------------------|
//! | `scheduledProcessor` | every minute         | replays due scheduled notifications           |
//! | `expiredCleaner`     | daily at 00:00       | deletes expired `sent`/`failed` notifications |
//! | `tokenCleaner`       | Sundays at 02:00     | deletes inactive and stale device tokens      |
//!
//! Times are evaluated in the configured zone. Each fire spawns its run as a
//! separate task, so a slow run can overlap the next one. There is no
//! cross-process lock: run a single scheduler per database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use jivbook_config::NotificationsConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::NotificationError;
use crate::schedule::JobSchedule;
use crate::service::NotificationService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    ScheduledProcessor,
    ExpiredCleaner,
    TokenCleaner,
}

impl Job {
    pub const ALL: [Job; 3] = [Job::ScheduledProcessor, Job::ExpiredCleaner, Job::TokenCleaner];

    pub fn name(&self) -> &'static str {
        match self {
            Job::ScheduledProcessor => "scheduledProcessor",
            Job::ExpiredCleaner => "expiredCleaner",
            Job::TokenCleaner => "tokenCleaner",
        }
    }

    pub fn from_name(name: &str) -> Option<Job> {
        Job::ALL.into_iter().find(|job| job.name() == name)
    }

    pub fn schedule(&self) -> JobSchedule {
        match self {
            Job::ScheduledProcessor => JobSchedule::EveryMinute,
            Job::ExpiredCleaner => JobSchedule::DailyAt { hour: 0, minute: 0 },
            Job::TokenCleaner => JobSchedule::WeeklyAt {
                weekday: Weekday::Sun,
                hour: 2,
                minute: 0,
            },
        }
    }

    async fn run(self, service: &NotificationService) {
        let outcome = match self {
            Job::ScheduledProcessor => service
                .process_scheduled_notifications()
                .await
                .map(|report| report.processed as u64),
            Job::ExpiredCleaner => service.cleanup_expired().await,
            Job::TokenCleaner => service.cleanup_stale_tokens().await,
        };
        match outcome {
            Ok(count) => debug!("Job {} finished ({} item(s))", self.name(), count),
            Err(err) => error!("Job {} failed: {}", self.name(), err),
        }
    }
}

/// Status line of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct JobStatus {
    pub name: String,
    /// Cron notation of the schedule.
    pub schedule: String,
    pub running: bool,
    pub next_run: Option<DateTime<Utc>>,
}

pub struct NotificationScheduler {
    service: Arc<NotificationService>,
    timezone: Tz,
    running: Mutex<HashMap<Job, CancellationToken>>,
}

impl NotificationScheduler {
    pub fn new(service: Arc<NotificationService>, timezone: Tz) -> Self {
        Self {
            service,
            timezone,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Uses the configured zone, falling back to UTC when it is unknown.
    pub fn from_config(service: Arc<NotificationService>, config: &NotificationsConfig) -> Self {
        let timezone = config.timezone.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "Unknown time zone '{}' for notification jobs, using UTC",
                config.timezone
            );
            Tz::UTC
        });
        Self::new(service, timezone)
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<Job, CancellationToken>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn start_all(&self) {
        for job in Job::ALL {
            self.start(job);
        }
        info!("Notification jobs started ({})", self.timezone);
    }

    pub fn stop_all(&self) {
        let stopped: Vec<(Job, CancellationToken)> = self.jobs().drain().collect();
        for (job, token) in stopped {
            token.cancel();
            debug!("Job {} stopped", job.name());
        }
    }

    /// Starts the named job. `false` if the name is unknown or it already runs.
    pub fn start_job(&self, name: &str) -> bool {
        Job::from_name(name).is_some_and(|job| self.start(job))
    }

    /// Stops the named job. `false` if the name is unknown or it was not running.
    pub fn stop_job(&self, name: &str) -> bool {
        let Some(job) = Job::from_name(name) else {
            return false;
        };
        match self.jobs().remove(&job) {
            Some(token) => {
                token.cancel();
                info!("Job {} stopped", job.name());
                true
            }
            None => false,
        }
    }

    pub fn jobs_status(&self) -> Vec<JobStatus> {
        let jobs = self.jobs();
        let now = Utc::now();
        Job::ALL
            .into_iter()
            .map(|job| {
                let running = jobs.contains_key(&job);
                JobStatus {
                    name: job.name().to_string(),
                    schedule: job.schedule().cron(),
                    running,
                    next_run: running.then(|| job.schedule().next_after(now, self.timezone)),
                }
            })
            .collect()
    }

    /// Runs one scheduled-notification pass now. `true` if the pass completed.
    pub async fn trigger_scheduled_processing(&self) -> bool {
        match self.service.process_scheduled_notifications().await {
            Ok(report) => {
                info!(
                    "Manual scheduled pass: {} processed, {} errors",
                    report.processed, report.errors
                );
                true
            }
            Err(err) => {
                error!("Manual scheduled pass failed: {}", err);
                false
            }
        }
    }

    pub async fn run_expired_cleanup(&self) -> Result<u64, NotificationError> {
        self.service.cleanup_expired().await
    }

    pub async fn run_token_cleanup(&self) -> Result<u64, NotificationError> {
        self.service.cleanup_stale_tokens().await
    }

    fn start(&self, job: Job) -> bool {
        let mut jobs = self.jobs();
        if jobs.contains_key(&job) {
            return false;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let service = Arc::clone(&self.service);
        let timezone = self.timezone;
        let schedule = job.schedule();

        tokio::spawn(async move {
            loop {
                let now = Utc::now();
                let next = schedule.next_after(now, timezone);
                let wait = (next - now).to_std().unwrap_or_default();

                tokio::select! {
                    _ = cancelled.cancelled() => {
                        debug!("Job {} loop exiting", job.name());
                        break;
                    }
                    _ = tokio::time::sleep(wait) => {
                        debug!("Job {} firing", job.name());
                        let service = Arc::clone(&service);
                        tokio::spawn(async move { job.run(&service).await });
                    }
                }
            }
        });

        jobs.insert(job, token);
        info!("Job {} started ({})", job.name(), schedule.cron());
        true
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        for (_, token) in self.jobs().drain() {
            token.cancel();
        }
    }
}
